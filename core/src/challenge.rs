/// Proof-of-ownership gate for profile writes.
///
/// A profile write happens only after a signature over [`CHALLENGE_MESSAGE`]
/// recovers to the active account. Acquisition, verification and the write
/// run strictly in that order.
use std::sync::Arc;

use crate::address::{Address, Signature};
use crate::cache::{self, KeyValueCache, SignatureCacheScope, SignatureRecord};
use crate::error::AuthError;
use crate::form::ProfileForm;
use crate::profile_store::ProfileStore;
use crate::provider::{ProviderError, WalletProvider};

use tokio_util::sync::CancellationToken;

/// The fixed message every account signs. It carries no nonce, so a captured
/// signature stays valid indefinitely.
pub const CHALLENGE_MESSAGE: &str = "Please sign in to Alchemy";

impl From<ProviderError> for AuthError {
    fn from(e: ProviderError) -> Self {
        AuthError::ProviderUnavailable(e.to_string())
    }
}

pub struct ChallengeSigner {
    provider: Arc<dyn WalletProvider>,
    cache: Arc<dyn KeyValueCache>,
    store: Arc<dyn ProfileStore>,
    scope: SignatureCacheScope,
}

impl ChallengeSigner {
    pub fn new(
        provider: Arc<dyn WalletProvider>,
        cache: Arc<dyn KeyValueCache>,
        store: Arc<dyn ProfileStore>,
    ) -> Self {
        Self {
            provider,
            cache,
            store,
            scope: SignatureCacheScope::default(),
        }
    }

    pub fn with_cache_scope(mut self, scope: SignatureCacheScope) -> Self {
        self.scope = scope;
        self
    }

    pub fn cache_scope(&self) -> SignatureCacheScope {
        self.scope
    }

    /// Sign (or reuse the cached signature), verify against `active`, then write.
    pub async fn authorize_and_submit(
        &self,
        active: &Address,
        form: &ProfileForm,
        cancel: &CancellationToken,
    ) -> Result<(), AuthError> {
        let signature = self.acquire_signature(active, cancel).await?;

        let recovered = self
            .provider
            .recover(CHALLENGE_MESSAGE.as_bytes(), &signature)
            .map_err(|e| AuthError::SignatureMismatch {
                active: active.to_string(),
                recovered: format!("no account ({e})"),
            })?;
        if recovered != *active {
            tracing::warn!(
                active = %active,
                recovered = %recovered,
                "signing in failed: make sure the wallet is unlocked with an account you own"
            );
            return Err(AuthError::SignatureMismatch {
                active: active.to_string(),
                recovered: recovered.to_string(),
            });
        }

        self.store
            .update_profile(active, &form.name, &form.description, &signature)
            .await
            .map_err(|e| AuthError::StoreRejected(format!("{e:#}")))?;
        tracing::info!(account = %active, "profile updated");
        Ok(())
    }

    /// Cached signature if present, otherwise a fresh one from the wallet
    /// (which is then cached). A broken cache is treated as empty on read
    /// and does not fail the submission on write.
    async fn acquire_signature(
        &self,
        active: &Address,
        cancel: &CancellationToken,
    ) -> Result<Signature, AuthError> {
        let key = self.scope.key_for(active);
        match cache::load_signature(self.cache.as_ref(), &key) {
            Ok(Some(record)) => {
                tracing::debug!(key = %key, signer = %record.address, "reusing cached signature");
                return Ok(record.signature);
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %format!("{e:#}"), "signature cache unreadable"),
        }

        tracing::info!(account = %active, "requesting challenge signature from wallet");
        let signature = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ProviderError::Cancelled.into()),
            result = self.provider.personal_sign(CHALLENGE_MESSAGE.as_bytes(), active, cancel) => {
                result?
            }
        };

        let record = SignatureRecord {
            address: *active,
            message: CHALLENGE_MESSAGE.to_string(),
            signature,
        };
        if let Err(e) = cache::store_signature(self.cache.as_ref(), &key, &record) {
            tracing::warn!(error = %format!("{e:#}"), "failed to cache signature");
        }
        Ok(signature)
    }

    /// Drop the cached signature for `active` (the whole global slot in global scope).
    pub fn forget_signature(&self, active: &Address) -> anyhow::Result<()> {
        self.cache.remove(&self.scope.key_for(active))
    }
}
