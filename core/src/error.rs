//! Domain error types for profile authorization and balance lookups.

use thiserror::Error;

/// Failure of the sign-verify-write sequence.
///
/// All variants are terminal for the triggering submission; nothing retries
/// automatically.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Wallet unreachable, the user declined the sign request, or the request
    /// was cancelled before it resolved.
    #[error("wallet provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// The signature recovers to an account other than the active one.
    #[error("signature was produced by {recovered}, not the active account {active}")]
    SignatureMismatch { active: String, recovered: String },

    /// The profile store refused the write.
    #[error("profile store rejected the update: {0}")]
    StoreRejected(String),
}

/// Failure to produce a complete balance pair. No partial values accompany it.
#[derive(Debug, Error)]
pub enum BalanceError {
    #[error("balances unavailable: {0}")]
    ResolutionFailed(String),
}

/// Errors surfaced by the profile service to its callers (CLI, tests).
#[derive(Debug, Error)]
pub enum ProfileError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Balance(#[from] BalanceError),

    /// Form values failed validation before any signing happened.
    #[error("{0}")]
    InvalidForm(String),

    /// A submission is already being processed.
    #[error("a profile submission is already in progress")]
    SubmissionInFlight,

    /// Local cache or keystore persistence error.
    #[error("{0}")]
    Storage(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Alias for `std::result::Result<T, ProfileError>`.
pub type Result<T> = std::result::Result<T, ProfileError>;
