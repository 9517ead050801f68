/// Output formatting: base-unit conversion and display helpers.
///
/// Both the native currency and the staking token use 18 decimal places.
use crate::address::Address;
use crate::balances::{BalancePair, Reputation};
use crate::profile_store::Profile;

const WEI_PER_UNIT: u128 = 1_000_000_000_000_000_000;

/// Convert base units to a decimal string with trailing zeros trimmed.
/// Examples: 1_500_000_000_000_000_000 -> "1.5", 0 -> "0", 1 -> "0.000000000000000001"
#[must_use]
pub fn from_wei(wei: u128) -> String {
    let whole = wei / WEI_PER_UNIT;
    let frac = wei % WEI_PER_UNIT;
    if frac == 0 {
        return whole.to_string();
    }
    let frac = format!("{frac:018}");
    format!("{whole}.{}", frac.trim_end_matches('0'))
}

/// Balance summary, labelled the way the profile screen shows them.
/// The reputation line only appears for an organization.
#[must_use]
pub fn format_balances(pair: &BalancePair, reputation: Option<&Reputation>) -> String {
    let mut out = format!(
        "  GEN: {}\n  ETH: {}",
        pair.secondary_display(),
        pair.native_display()
    );
    if let Some(rep) = reputation {
        out.push_str(&format!(
            "\n  Rep. Score: {} ({} of {})",
            rep.score_display(),
            rep.held_display(),
            rep.total_display()
        ));
    }
    out
}

#[must_use]
pub fn format_balances_json(
    address: &Address,
    pair: &BalancePair,
    reputation: Option<&Reputation>,
) -> String {
    let reputation = reputation.map(|rep| {
        serde_json::json!({
            "held_wei": rep.held.to_string(),
            "held": rep.held_display(),
            "total_wei": rep.total.to_string(),
            "total": rep.total_display(),
            "score": rep.score_display(),
        })
    });
    serde_json::json!({
        "address": address.to_string(),
        "native_wei": pair.native.to_string(),
        "native": pair.native_display(),
        "staking_token_wei": pair.secondary.to_string(),
        "staking_token": pair.secondary_display(),
        "reputation": reputation,
    })
    .to_string()
}

#[must_use]
pub fn format_profile(address: &Address, profile: Option<&Profile>) -> String {
    match profile {
        Some(p) if !p.name.is_empty() => {
            let mut out = format!("  Name:        {}\n  Address:     {}", p.name, address.short());
            if !p.description.is_empty() {
                out.push_str(&format!("\n  Description: {}", p.description));
            }
            out
        }
        _ => format!(
            "No profile set for {}. Use 'set_profile <name> [| description]'.",
            address.short()
        ),
    }
}

#[must_use]
pub fn format_profile_json(address: &Address, profile: Option<&Profile>) -> String {
    serde_json::json!({
        "address": address.to_string(),
        "profile": profile,
    })
    .to_string()
}

#[must_use]
pub fn format_address_json(address: &Address) -> String {
    serde_json::json!({
        "address": address.to_string(),
    })
    .to_string()
}
