/// Profile persistence behind the profile API.
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::address::{Address, Signature};

/// Stored profile of an account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub ethereum_account_address: Address,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateProfileRequest<'a> {
    ethereum_account_address: &'a Address,
    name: &'a str,
    description: &'a str,
    signature: &'a Signature,
}

#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Write a profile. The signature proves control of `address`.
    async fn update_profile(
        &self,
        address: &Address,
        name: &str,
        description: &str,
        signature: &Signature,
    ) -> Result<()>;

    /// Current profile, or `None` when the account has not set one.
    async fn fetch_profile(&self, address: &Address) -> Result<Option<Profile>>;
}

/// JSON-over-HTTP profile API: `POST /api/accounts`, `GET /api/accounts/{address}`.
#[derive(Debug, Clone)]
pub struct HttpProfileStore {
    client: reqwest::Client,
    base_url: String,
}

impl HttpProfileStore {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl ProfileStore for HttpProfileStore {
    async fn update_profile(
        &self,
        address: &Address,
        name: &str,
        description: &str,
        signature: &Signature,
    ) -> Result<()> {
        let url = format!("{}/api/accounts", self.base_url);
        let resp = self
            .client
            .post(&url)
            .json(&UpdateProfileRequest {
                ethereum_account_address: address,
                name,
                description,
                signature,
            })
            .send()
            .await
            .context("Profile API unreachable")?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            bail!("Profile API returned HTTP {status}: {body}");
        }
        Ok(())
    }

    async fn fetch_profile(&self, address: &Address) -> Result<Option<Profile>> {
        let url = format!("{}/api/accounts/{address}", self.base_url);
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .context("Profile API unreachable")?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            bail!("Profile API returned HTTP {status}: {body}");
        }
        let profile = resp.json().await.context("Malformed profile response")?;
        Ok(Some(profile))
    }
}
