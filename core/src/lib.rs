use std::path::{Path, PathBuf};

use anyhow::Context;

pub mod address;
pub mod balances;
pub mod cache;
pub mod challenge;
pub mod commands;
pub mod config;
pub mod display;
pub mod error;
pub mod form;
pub mod keystore;
pub mod keystore_file;
pub mod network;
pub mod profile_store;
pub mod provider;
pub mod resolver;
pub mod service;
pub mod signer;

pub use address::{Address, HexParseError, Signature};
pub use balances::{BalanceAggregator, BalancePair, Reputation};
pub use cache::{KeyValueCache, SignatureCacheScope, SqliteCache};
pub use challenge::{ChallengeSigner, CHALLENGE_MESSAGE};
pub use commands::Command;
pub use config::{Deployments, Network, NetworkConfig};
pub use error::{AuthError, BalanceError, ProfileError};
pub use form::ProfileForm;
pub use keystore::Keystore;
pub use network::{NetworkClient, OrganizationContext, VotingMachine, VotingMachineScope};
pub use profile_store::{HttpProfileStore, Profile, ProfileStore};
pub use provider::{LocalWalletProvider, ProviderError, WalletProvider};
pub use resolver::{ContractResolver, RpcContractResolver};
pub use service::ProfileService;
pub use signer::{recover_personal_signature, Signer, SoftwareSigner};

/// Reject key names containing path separators or traversal sequences.
pub fn validate_key_name(name: &str) -> anyhow::Result<()> {
    if name.is_empty() {
        anyhow::bail!("Key name cannot be empty.");
    }
    if name.contains('/') || name.contains('\\') || name.contains("..") {
        anyhow::bail!("Invalid key name '{name}'. Must not contain '/', '\\', or '..'.");
    }
    if name.contains(std::path::MAIN_SEPARATOR) {
        anyhow::bail!("Invalid key name '{name}'. Must not contain path separators.");
    }
    Ok(())
}

/// Names of the `*.key` files in a directory, sorted.
pub fn list_keystores(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .into_iter()
        .flatten()
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|e| e == "key"))
        .filter_map(|path| path.file_stem().map(|s| s.to_string_lossy().into_owned()))
        .collect();
    names.sort();
    names
}

/// Keystore path for `name` inside `dir`.
pub fn keystore_path(dir: &Path, name: &str) -> anyhow::Result<PathBuf> {
    validate_key_name(name)?;
    Ok(dir.join(format!("{name}.key")))
}

/// XDG-compliant data directory for keystores and the signature cache.
/// Linux: `~/.local/share/dao-profile/`, macOS: `~/Library/Application Support/dao-profile/`
pub fn data_dir() -> anyhow::Result<PathBuf> {
    let dir = dirs::data_dir()
        .context("Cannot determine data directory")?
        .join("dao-profile");
    Ok(dir)
}
