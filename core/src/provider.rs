/// Wallet provider: native balances, personal-message signing, and signer recovery.
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::address::{Address, Signature};
use crate::network::NetworkClient;
use crate::signer::{recover_personal_signature, Signer};

#[derive(Debug, Error)]
pub enum ProviderError {
    /// The wallet could not be reached or failed internally.
    #[error("wallet unreachable: {0}")]
    Unreachable(String),
    /// The sign request was refused (user declined, unknown account).
    #[error("sign request declined: {0}")]
    Declined(String),
    /// The caller cancelled before the wallet answered.
    #[error("sign request cancelled")]
    Cancelled,
    #[error("invalid signature: {0}")]
    InvalidSignature(String),
}

#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Native-currency balance in the smallest unit.
    async fn balance(&self, address: &Address) -> Result<u128, ProviderError>;

    /// Ask the wallet to sign `message` as `address`. May wait on the user
    /// indefinitely; `cancel` lets the caller abandon the request.
    async fn personal_sign(
        &self,
        message: &[u8],
        address: &Address,
        cancel: &CancellationToken,
    ) -> Result<Signature, ProviderError>;

    /// Recover the address that signed `message`.
    fn recover(&self, message: &[u8], signature: &Signature) -> Result<Address, ProviderError> {
        recover_personal_signature(message, signature)
            .map_err(|e| ProviderError::InvalidSignature(format!("{e:#}")))
    }
}

/// Provider that reads balances over JSON-RPC and signs with a local key.
pub struct LocalWalletProvider {
    network: Arc<NetworkClient>,
    signer: Arc<dyn Signer>,
}

impl LocalWalletProvider {
    pub fn new(network: Arc<NetworkClient>, signer: Arc<dyn Signer>) -> Self {
        Self { network, signer }
    }

    pub fn address(&self) -> &Address {
        self.signer.address()
    }
}

#[async_trait]
impl WalletProvider for LocalWalletProvider {
    async fn balance(&self, address: &Address) -> Result<u128, ProviderError> {
        self.network
            .balance(address)
            .await
            .map_err(|e| ProviderError::Unreachable(format!("{e:#}")))
    }

    async fn personal_sign(
        &self,
        message: &[u8],
        address: &Address,
        cancel: &CancellationToken,
    ) -> Result<Signature, ProviderError> {
        if cancel.is_cancelled() {
            return Err(ProviderError::Cancelled);
        }
        if address != self.signer.address() {
            return Err(ProviderError::Declined(format!(
                "account {address} is not managed by this wallet"
            )));
        }
        self.signer
            .sign_personal_message(message)
            .map_err(|e| ProviderError::Unreachable(format!("{e:#}")))
    }
}
