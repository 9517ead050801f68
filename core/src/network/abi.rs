/// Just enough contract ABI to call view functions with static arguments.
use anyhow::{bail, Result};
use sha3::{Digest, Keccak256};

use crate::address::Address;

const WORD: usize = 32;

/// 4-byte function selector: leading bytes of Keccak-256 of the canonical signature.
pub fn selector(signature: &str) -> [u8; 4] {
    let digest = Keccak256::digest(signature.as_bytes());
    [digest[0], digest[1], digest[2], digest[3]]
}

/// Encode a call: selector followed by each argument as a 32-byte word.
pub fn encode_call(signature: &str, args: &[[u8; WORD]]) -> Vec<u8> {
    let mut data = Vec::with_capacity(4 + args.len() * WORD);
    data.extend_from_slice(&selector(signature));
    for arg in args {
        data.extend_from_slice(arg);
    }
    data
}

/// Left-pad an address into a word.
pub fn address_word(address: &Address) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    word[12..].copy_from_slice(address.as_bytes());
    word
}

fn word_at(data: &[u8], index: usize) -> Result<&[u8]> {
    let start = index * WORD;
    match data.get(start..start + WORD) {
        Some(word) => Ok(word),
        None => bail!(
            "Return data too short: need word {index}, got {} bytes",
            data.len()
        ),
    }
}

/// Decode the `index`-th return word as an address. The high 12 bytes must be zero.
pub fn decode_address_word(data: &[u8], index: usize) -> Result<Address> {
    let word = word_at(data, index)?;
    if word[..12].iter().any(|b| *b != 0) {
        bail!("Word {index} is not an address");
    }
    Ok(Address::from_slice(&word[12..])?)
}

/// Decode the `index`-th return word as a uint that must fit in 128 bits.
pub fn decode_uint_word(data: &[u8], index: usize) -> Result<u128> {
    let word = word_at(data, index)?;
    if word[..16].iter().any(|b| *b != 0) {
        bail!("Word {index} exceeds 128 bits");
    }
    let mut low = [0u8; 16];
    low.copy_from_slice(&word[16..]);
    Ok(u128::from_be_bytes(low))
}

/// Decode the `index`-th return word verbatim (bytes32).
pub fn decode_bytes32_word(data: &[u8], index: usize) -> Result<[u8; WORD]> {
    let mut out = [0u8; WORD];
    out.copy_from_slice(word_at(data, index)?);
    Ok(out)
}
