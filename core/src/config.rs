/// Network selection and contract deployment configuration.
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::address::Address;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    #[default]
    Sepolia,
    /// Local development chain on `127.0.0.1:8545`.
    Local,
    Custom,
}

impl Network {
    /// Default JSON-RPC endpoint. `None` for custom networks.
    pub fn default_rpc_url(&self) -> Option<&'static str> {
        match self {
            Network::Mainnet => Some("https://cloudflare-eth.com"),
            Network::Sepolia => Some("https://rpc.sepolia.org"),
            Network::Local => Some("http://127.0.0.1:8545"),
            Network::Custom => None,
        }
    }
}

impl std::fmt::Display for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Network::Mainnet => write!(f, "mainnet"),
            Network::Sepolia => write!(f, "sepolia"),
            Network::Local => write!(f, "local"),
            Network::Custom => write!(f, "custom"),
        }
    }
}

impl std::str::FromStr for Network {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mainnet" => Ok(Network::Mainnet),
            "sepolia" => Ok(Network::Sepolia),
            "local" | "ganache" => Ok(Network::Local),
            "custom" => Ok(Network::Custom),
            other => Err(format!(
                "Unknown network '{other}'. Use mainnet, sepolia, local, or custom."
            )),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
pub struct NetworkConfig {
    pub network: Network,
    pub custom_url: Option<String>,
}

impl NetworkConfig {
    /// The effective RPC URL: custom URL when set, otherwise the network preset.
    pub fn rpc_url(&self) -> Result<String> {
        if let Some(url) = &self.custom_url {
            return Ok(url.clone());
        }
        match self.network.default_rpc_url() {
            Some(url) => Ok(url.to_string()),
            None => bail!("Custom network requires an RPC URL"),
        }
    }

    /// Plain-HTTP endpoints are only implicitly trusted for the local chain.
    pub fn allows_plain_http(&self) -> bool {
        self.network == Network::Local && self.custom_url.is_none()
    }
}

/// Addresses of the governance contracts used for staking-token lookup.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
pub struct Deployments {
    /// Platform-wide default voting machine.
    pub genesis_protocol: Option<Address>,
    /// Scheme whose per-organization parameters name the organization's voting machine.
    pub contribution_reward: Option<Address>,
}
