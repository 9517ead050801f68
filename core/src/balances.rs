/// Native and staking-token balances shown alongside a profile.
use std::sync::Arc;

use anyhow::Context;
use serde::Serialize;

use crate::address::Address;
use crate::display;
use crate::error::BalanceError;
use crate::network::{OrganizationContext, VotingMachineScope};
use crate::provider::WalletProvider;
use crate::resolver::ContractResolver;

/// Both balances in base units. Only ever constructed complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BalancePair {
    pub native: u128,
    pub secondary: u128,
}

impl BalancePair {
    pub fn native_display(&self) -> String {
        display::from_wei(self.native)
    }

    pub fn secondary_display(&self) -> String {
        display::from_wei(self.secondary)
    }
}

/// Reputation held in one organization, next to the organization's total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Reputation {
    pub held: u128,
    pub total: u128,
}

impl Reputation {
    /// Share of the organization's reputation, as a percentage with two decimals.
    pub fn score_display(&self) -> String {
        if self.total == 0 {
            return "0.00%".to_string();
        }
        let basis_points = match self.held.checked_mul(10_000) {
            Some(scaled) => scaled / self.total,
            None => self.held / (self.total / 10_000),
        };
        format!("{}.{:02}%", basis_points / 100, basis_points % 100)
    }

    pub fn held_display(&self) -> String {
        display::from_wei(self.held)
    }

    pub fn total_display(&self) -> String {
        display::from_wei(self.total)
    }
}

pub struct BalanceAggregator {
    provider: Arc<dyn WalletProvider>,
    resolver: Arc<dyn ContractResolver>,
}

impl BalanceAggregator {
    pub fn new(provider: Arc<dyn WalletProvider>, resolver: Arc<dyn ContractResolver>) -> Self {
        Self { provider, resolver }
    }

    /// Resolve both balances concurrently. Any failure discards the other result.
    pub async fn compute_balances(
        &self,
        address: &Address,
        organization: Option<&OrganizationContext>,
    ) -> Result<BalancePair, BalanceError> {
        let scope = VotingMachineScope::for_organization(organization);

        let native = async {
            self.provider
                .balance(address)
                .await
                .map_err(anyhow::Error::from)
                .context("native balance")
        };

        let secondary = async {
            let machine = self
                .resolver
                .resolve_voting_machine(&scope)
                .await
                .with_context(|| format!("voting machine ({scope})"))?;
            let token = self
                .resolver
                .staking_token(&machine)
                .await
                .context("staking token")?;
            let balance = self
                .resolver
                .balance_of(&token, address)
                .await
                .context("staking token balance")?;
            anyhow::Ok(balance)
        };

        let (native, secondary) = futures::try_join!(native, secondary).map_err(|e| {
            let error = format!("{e:#}");
            tracing::warn!(account = %address, %scope, %error, "balance lookup failed");
            BalanceError::ResolutionFailed(error)
        })?;

        Ok(BalancePair { native, secondary })
    }

    /// Reputation of `address` in `organization`.
    pub async fn reputation(
        &self,
        address: &Address,
        organization: &OrganizationContext,
    ) -> Result<Reputation, BalanceError> {
        self.resolver
            .reputation(organization, address)
            .await
            .map_err(|e| {
                let error = format!("{e:#}");
                tracing::warn!(
                    account = %address,
                    avatar = %organization.avatar,
                    %error,
                    "reputation lookup failed"
                );
                BalanceError::ResolutionFailed(error)
            })
    }
}
