/// Contract resolution: voting machine → staking token → token balance.
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;

use crate::address::Address;
use crate::balances::Reputation;
use crate::config::Deployments;
use crate::network::{NetworkClient, OrganizationContext, VotingMachine, VotingMachineScope};

#[async_trait]
pub trait ContractResolver: Send + Sync {
    /// Locate the voting machine for a scope. Both scopes yield the same handle type.
    async fn resolve_voting_machine(&self, scope: &VotingMachineScope) -> Result<VotingMachine>;

    /// Staking token configured on the voting machine. Errors when none is configured.
    async fn staking_token(&self, machine: &VotingMachine) -> Result<Address>;

    async fn balance_of(&self, token: &Address, owner: &Address) -> Result<u128>;

    /// Reputation `owner` holds in an organization, next to the organization's total.
    async fn reputation(
        &self,
        organization: &OrganizationContext,
        owner: &Address,
    ) -> Result<Reputation>;
}

/// Resolver backed by on-chain reads through [`NetworkClient`].
pub struct RpcContractResolver {
    network: Arc<NetworkClient>,
    deployments: Deployments,
}

impl RpcContractResolver {
    pub fn new(network: Arc<NetworkClient>, deployments: Deployments) -> Self {
        Self {
            network,
            deployments,
        }
    }
}

#[async_trait]
impl ContractResolver for RpcContractResolver {
    async fn resolve_voting_machine(&self, scope: &VotingMachineScope) -> Result<VotingMachine> {
        let address = match scope {
            VotingMachineScope::Default => self
                .deployments
                .genesis_protocol
                .context("Default voting machine deployment is not configured")?,
            VotingMachineScope::Organization(org) => {
                let scheme = self
                    .deployments
                    .contribution_reward
                    .context("ContributionReward deployment is not configured")?;
                self.network
                    .scheme_voting_machine(&scheme, &org.avatar)
                    .await?
            }
        };
        if address.is_zero() {
            bail!("No voting machine registered for {scope}");
        }
        Ok(VotingMachine { address })
    }

    async fn staking_token(&self, machine: &VotingMachine) -> Result<Address> {
        let token = self.network.staking_token(&machine.address).await?;
        if token.is_zero() {
            bail!("Voting machine {} has no configured staking token", machine.address);
        }
        Ok(token)
    }

    async fn balance_of(&self, token: &Address, owner: &Address) -> Result<u128> {
        self.network.token_balance(token, owner).await
    }

    async fn reputation(
        &self,
        organization: &OrganizationContext,
        owner: &Address,
    ) -> Result<Reputation> {
        let contract = self.network.native_reputation(&organization.avatar).await?;
        if contract.is_zero() {
            bail!("Organization {} has no native reputation", organization.avatar);
        }
        let (held, total) = futures::try_join!(
            self.network.token_balance(&contract, owner),
            self.network.total_supply(&contract),
        )
        .context("Failed to read reputation")?;
        Ok(Reputation { held, total })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::selector;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn addr(last: u8) -> Address {
        let mut bytes = [0u8; 20];
        bytes[19] = last;
        Address::new(bytes)
    }

    fn word_hex(address: &Address) -> String {
        format!("{}{}", "0".repeat(24), hex::encode(address.as_bytes()))
    }

    async fn mock_call(server: &MockServer, signature: &str, result: String) {
        Mock::given(method("POST"))
            .and(body_string_contains(hex::encode(selector(signature))))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0", "id": 1, "result": result
            })))
            .mount(server)
            .await;
    }

    fn resolver(server: &MockServer, deployments: Deployments) -> RpcContractResolver {
        let network = NetworkClient::new_custom(&server.uri(), true).unwrap();
        RpcContractResolver::new(Arc::new(network), deployments)
    }

    #[tokio::test]
    async fn default_scope_uses_deployment() {
        let server = MockServer::start().await;
        let r = resolver(
            &server,
            Deployments {
                genesis_protocol: Some(addr(0x10)),
                contribution_reward: None,
            },
        );
        let vm = r.resolve_voting_machine(&VotingMachineScope::Default).await.unwrap();
        assert_eq!(vm.address, addr(0x10));
    }

    #[tokio::test]
    async fn default_scope_without_deployment_fails() {
        let server = MockServer::start().await;
        let r = resolver(&server, Deployments::default());
        let err = r
            .resolve_voting_machine(&VotingMachineScope::Default)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not configured"));
    }

    #[tokio::test]
    async fn organization_scope_reads_scheme_parameters() {
        let server = MockServer::start().await;
        mock_call(
            &server,
            "getParametersFromController(address)",
            format!("0x{}", "ab".repeat(32)),
        )
        .await;
        mock_call(
            &server,
            "parameters(bytes32)",
            format!("0x{}{}{}", "0".repeat(64), "cd".repeat(32), word_hex(&addr(0x20))),
        )
        .await;

        let r = resolver(
            &server,
            Deployments {
                genesis_protocol: Some(addr(0x10)),
                contribution_reward: Some(addr(0x30)),
            },
        );
        let scope = VotingMachineScope::Organization(OrganizationContext::new(addr(0x40)));
        let vm = r.resolve_voting_machine(&scope).await.unwrap();
        assert_eq!(vm.address, addr(0x20));
    }

    #[tokio::test]
    async fn zero_staking_token_is_an_error() {
        let server = MockServer::start().await;
        mock_call(&server, "stakingToken()", format!("0x{}", "0".repeat(64))).await;

        let r = resolver(&server, Deployments::default());
        let err = r
            .staking_token(&VotingMachine { address: addr(0x20) })
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no configured staking token"));
    }

    #[tokio::test]
    async fn token_balance_decodes_uint() {
        let server = MockServer::start().await;
        mock_call(
            &server,
            "balanceOf(address)",
            format!("0x{:064x}", 5_000_000_000_000_000_000u128),
        )
        .await;

        let r = resolver(&server, Deployments::default());
        let balance = r.balance_of(&addr(0x50), &addr(0x01)).await.unwrap();
        assert_eq!(balance, 5_000_000_000_000_000_000);
    }

    #[tokio::test]
    async fn reputation_reads_the_avatars_native_reputation() {
        let server = MockServer::start().await;
        mock_call(&server, "nativeReputation()", format!("0x{}", word_hex(&addr(0x60)))).await;
        // balanceOf must hit the reputation contract, not some token
        Mock::given(method("POST"))
            .and(body_string_contains(hex::encode(selector("balanceOf(address)"))))
            .and(body_string_contains(hex::encode(addr(0x60).as_bytes())))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0", "id": 1, "result": format!("0x{:064x}", 25u128)
            })))
            .mount(&server)
            .await;
        mock_call(&server, "totalSupply()", format!("0x{:064x}", 200u128)).await;

        let r = resolver(&server, Deployments::default());
        let rep = r
            .reputation(&OrganizationContext::new(addr(0x40)), &addr(0x01))
            .await
            .unwrap();
        assert_eq!(rep, Reputation { held: 25, total: 200 });
    }

    #[tokio::test]
    async fn organization_without_reputation_is_an_error() {
        let server = MockServer::start().await;
        mock_call(&server, "nativeReputation()", format!("0x{}", "0".repeat(64))).await;

        let r = resolver(&server, Deployments::default());
        let err = r
            .reputation(&OrganizationContext::new(addr(0x40)), &addr(0x01))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("has no native reputation"));
    }
}
