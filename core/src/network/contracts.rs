use anyhow::{Context, Result};

use super::abi::{
    address_word, decode_address_word, decode_bytes32_word, decode_uint_word, encode_call,
};
use super::NetworkClient;
use crate::address::Address;

impl NetworkClient {
    /// Voting machine configured for an organization's ContributionReward scheme.
    ///
    /// The scheme stores a parameters hash per avatar; the parameters tuple is
    /// `(orgNativeTokenFee, voteApproveParams, intVote)` and `intVote` is the
    /// voting machine.
    pub async fn scheme_voting_machine(
        &self,
        contribution_reward: &Address,
        avatar: &Address,
    ) -> Result<Address> {
        let data = encode_call("getParametersFromController(address)", &[address_word(avatar)]);
        let ret = self
            .eth_call(contribution_reward, &data)
            .await
            .context("Failed to read scheme parameters hash")?;
        let params_hash = decode_bytes32_word(&ret, 0)?;

        let data = encode_call("parameters(bytes32)", &[params_hash]);
        let ret = self
            .eth_call(contribution_reward, &data)
            .await
            .context("Failed to read scheme parameters")?;
        decode_address_word(&ret, 2).context("Malformed scheme parameters")
    }

    /// Staking token address configured on a voting machine.
    pub async fn staking_token(&self, voting_machine: &Address) -> Result<Address> {
        let ret = self
            .eth_call(voting_machine, &encode_call("stakingToken()", &[]))
            .await
            .context("Failed to read staking token")?;
        decode_address_word(&ret, 0)
    }

    /// ERC-20 balance of `owner`, in the token's base unit.
    pub async fn token_balance(&self, token: &Address, owner: &Address) -> Result<u128> {
        let ret = self
            .eth_call(token, &encode_call("balanceOf(address)", &[address_word(owner)]))
            .await
            .context("Failed to read token balance")?;
        decode_uint_word(&ret, 0)
    }

    /// Reputation contract minted by an organization's avatar.
    pub async fn native_reputation(&self, avatar: &Address) -> Result<Address> {
        let ret = self
            .eth_call(avatar, &encode_call("nativeReputation()", &[]))
            .await
            .context("Failed to read native reputation")?;
        decode_address_word(&ret, 0)
    }

    /// `totalSupply()` of a token or reputation contract.
    pub async fn total_supply(&self, token: &Address) -> Result<u128> {
        let ret = self
            .eth_call(token, &encode_call("totalSupply()", &[]))
            .await
            .context("Failed to read total supply")?;
        decode_uint_word(&ret, 0)
    }
}
