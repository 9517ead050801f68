/// Chain addresses and recoverable signatures, both rendered as `0x` hex.
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

pub const ADDRESS_LEN: usize = 20;
pub const SIGNATURE_LEN: usize = 65;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum HexParseError {
    #[error("'{0}' must be 0x-prefixed")]
    MissingPrefix(String),

    #[error("invalid hex '{value}': {reason}")]
    InvalidHex {
        value: String,
        reason: hex::FromHexError,
    },

    #[error("{kind} must be {expected} bytes, got {got}")]
    BadLength {
        kind: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("signature recovery id must be 0/1 or 27/28, got {0}")]
    BadRecoveryId(u8),
}

/// Decode a `0x`-prefixed hex string. Surrounding whitespace is ignored.
pub(crate) fn decode_hex_prefixed(value: &str) -> Result<Vec<u8>, HexParseError> {
    let trimmed = value.trim();
    let hex_part = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .ok_or_else(|| HexParseError::MissingPrefix(trimmed.to_string()))?;
    hex::decode(hex_part).map_err(|reason| HexParseError::InvalidHex {
        value: trimmed.to_string(),
        reason,
    })
}

/// 20-byte account address. Equality is byte equality, so checksummed and
/// lowercase renderings of the same account compare equal.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address([u8; ADDRESS_LEN]);

impl Address {
    pub const ZERO: Address = Address([0u8; ADDRESS_LEN]);

    pub const fn new(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, HexParseError> {
        let arr: [u8; ADDRESS_LEN] = bytes.try_into().map_err(|_| HexParseError::BadLength {
            kind: "address",
            expected: ADDRESS_LEN,
            got: bytes.len(),
        })?;
        Ok(Self(arr))
    }

    pub fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; ADDRESS_LEN]
    }

    /// First characters of the address for compact display, e.g. `0x9431cf5da0ce606646...`.
    pub fn short(&self) -> String {
        let full = self.to_string();
        format!("{}...", &full[..20])
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({self})")
    }
}

impl FromStr for Address {
    type Err = HexParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = decode_hex_prefixed(s)?;
        Self::from_slice(&bytes)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Recoverable ECDSA signature laid out as `r || s || v`.
/// `v` is stored in the 27/28 form wallets emit.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Signature([u8; SIGNATURE_LEN]);

impl Signature {
    pub fn from_slice(bytes: &[u8]) -> Result<Self, HexParseError> {
        let mut arr: [u8; SIGNATURE_LEN] =
            bytes.try_into().map_err(|_| HexParseError::BadLength {
                kind: "signature",
                expected: SIGNATURE_LEN,
                got: bytes.len(),
            })?;
        arr[64] = match arr[64] {
            0 | 1 => arr[64] + 27,
            27 | 28 => arr[64],
            other => return Err(HexParseError::BadRecoveryId(other)),
        };
        Ok(Self(arr))
    }

    pub fn as_bytes(&self) -> &[u8; SIGNATURE_LEN] {
        &self.0
    }

    /// The 64-byte `r || s` part.
    pub fn rs(&self) -> &[u8] {
        &self.0[..64]
    }

    /// Recovery id normalized to 0/1.
    pub fn recovery_id(&self) -> u8 {
        self.0[64] - 27
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({self})")
    }
}

impl FromStr for Signature {
    type Err = HexParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = decode_hex_prefixed(s)?;
        Self::from_slice(&bytes)
    }
}

impl Serialize for Signature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Signature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
