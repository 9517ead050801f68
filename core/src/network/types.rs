use serde::{Deserialize, Serialize};

use crate::address::Address;

/// An organization (DAO) identified by its avatar contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationContext {
    pub avatar: Address,
}

impl OrganizationContext {
    pub fn new(avatar: Address) -> Self {
        Self { avatar }
    }
}

/// Which voting machine to consult for the staking token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VotingMachineScope {
    /// The platform-wide deployment.
    Default,
    /// The voting machine registered for one organization.
    Organization(OrganizationContext),
}

impl VotingMachineScope {
    pub fn for_organization(organization: Option<&OrganizationContext>) -> Self {
        match organization {
            Some(org) => VotingMachineScope::Organization(*org),
            None => VotingMachineScope::Default,
        }
    }
}

impl std::fmt::Display for VotingMachineScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Default => write!(f, "default"),
            Self::Organization(org) => write!(f, "organization {}", org.avatar),
        }
    }
}

/// Resolved voting machine contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VotingMachine {
    pub address: Address,
}
