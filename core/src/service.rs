use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::address::Address;
use crate::balances::{BalanceAggregator, BalancePair, Reputation};
use crate::cache::{KeyValueCache, SignatureCacheScope};
use crate::challenge::ChallengeSigner;
use crate::error::{ProfileError, Result};
use crate::form::ProfileForm;
use crate::network::OrganizationContext;
use crate::profile_store::{Profile, ProfileStore};
use crate::provider::WalletProvider;
use crate::resolver::ContractResolver;

/// Profile screen logic for one active account: balances on load, signed
/// profile edits on submit.
pub struct ProfileService {
    address: Address,
    store: Arc<dyn ProfileStore>,
    signer: ChallengeSigner,
    balances: BalanceAggregator,
    submitting: AtomicBool,
}

/// Clears the in-flight flag however the submission ends.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl ProfileService {
    pub fn new(
        address: Address,
        provider: Arc<dyn WalletProvider>,
        resolver: Arc<dyn ContractResolver>,
        store: Arc<dyn ProfileStore>,
        cache: Arc<dyn KeyValueCache>,
    ) -> Self {
        Self {
            address,
            signer: ChallengeSigner::new(provider.clone(), cache, store.clone()),
            balances: BalanceAggregator::new(provider, resolver),
            store,
            submitting: AtomicBool::new(false),
        }
    }

    pub fn with_cache_scope(mut self, scope: SignatureCacheScope) -> Self {
        self.signer = self.signer.with_cache_scope(scope);
        self
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn cache_scope(&self) -> SignatureCacheScope {
        self.signer.cache_scope()
    }

    pub async fn balances(
        &self,
        organization: Option<&OrganizationContext>,
    ) -> Result<BalancePair> {
        Ok(self
            .balances
            .compute_balances(&self.address, organization)
            .await?)
    }

    pub async fn reputation(&self, organization: &OrganizationContext) -> Result<Reputation> {
        Ok(self.balances.reputation(&self.address, organization).await?)
    }

    pub async fn current_profile(&self) -> Result<Option<Profile>> {
        Ok(self.store.fetch_profile(&self.address).await?)
    }

    /// Validate the form, then sign, verify and write. Only one submission
    /// may run at a time.
    pub async fn submit_profile(
        &self,
        form: &ProfileForm,
        cancel: &CancellationToken,
    ) -> Result<()> {
        form.validate().map_err(ProfileError::InvalidForm)?;

        if self
            .submitting
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            return Err(ProfileError::SubmissionInFlight);
        }
        let _guard = InFlight(&self.submitting);

        self.signer
            .authorize_and_submit(&self.address, form, cancel)
            .await?;
        Ok(())
    }

    pub fn forget_signature(&self) -> Result<()> {
        self.signer
            .forget_signature(&self.address)
            .map_err(|e| ProfileError::Storage(format!("{e:#}")))
    }
}
