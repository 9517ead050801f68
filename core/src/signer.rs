/// Signing abstraction that decouples personal-message signing from a concrete key type.
///
/// Messages are signed in the wallet "personal message" form: the payload is
/// prefixed with `"\x19Ethereum Signed Message:\n" + len` and hashed with Keccak-256.
use anyhow::{Context, Result};
use k256::ecdsa::{RecoveryId, Signature as EcdsaSignature, SigningKey, VerifyingKey};
use sha3::{Digest, Keccak256};
use zeroize::Zeroizing;

use crate::address::{Address, Signature};

pub trait Signer: Send + Sync {
    /// Sign an arbitrary message as a personal message.
    fn sign_personal_message(&self, msg: &[u8]) -> Result<Signature>;

    /// The on-chain address controlled by this signer.
    fn address(&self) -> &Address;
}

/// Keccak-256 of the prefixed personal message.
pub fn personal_message_hash(msg: &[u8]) -> [u8; 32] {
    let prefix = format!("\x19Ethereum Signed Message:\n{}", msg.len());
    let mut hasher = Keccak256::new();
    hasher.update(prefix.as_bytes());
    hasher.update(msg);
    hasher.finalize().into()
}

/// Derive the account address of a public key: last 20 bytes of the
/// Keccak-256 of the uncompressed point without its `0x04` tag.
pub fn address_from_verifying_key(key: &VerifyingKey) -> Result<Address> {
    let encoded = key.to_encoded_point(false);
    let pubkey = encoded.as_bytes();
    if pubkey.len() != 65 || pubkey[0] != 0x04 {
        anyhow::bail!("Unexpected public key encoding");
    }
    let digest = Keccak256::digest(&pubkey[1..]);
    Ok(Address::from_slice(&digest[12..])?)
}

/// Recover the address that produced `signature` over the personal message `msg`.
pub fn recover_personal_signature(msg: &[u8], signature: &Signature) -> Result<Address> {
    let sig = EcdsaSignature::from_slice(signature.rs())
        .map_err(|e| anyhow::anyhow!("Invalid ECDSA signature bytes: {e}"))?;
    let recovery_id = RecoveryId::from_byte(signature.recovery_id())
        .context("Invalid signature recovery id")?;
    let prehash = personal_message_hash(msg);
    let key = VerifyingKey::recover_from_prehash(&prehash, &sig, recovery_id)
        .map_err(|e| anyhow::anyhow!("Failed to recover signer from signature: {e}"))?;
    address_from_verifying_key(&key)
}

/// Software signer backed by an in-memory secp256k1 key.
pub struct SoftwareSigner {
    key: SigningKey,
    address: Address,
}

impl SoftwareSigner {
    pub fn new(key: SigningKey) -> Result<Self> {
        let address = address_from_verifying_key(key.verifying_key())?;
        Ok(Self { key, address })
    }

    pub fn from_secret_bytes(secret: &[u8]) -> Result<Self> {
        let key = SigningKey::from_slice(secret)
            .map_err(|e| anyhow::anyhow!("Invalid secp256k1 secret key: {e}"))?;
        Self::new(key)
    }

    /// Generate a fresh random key.
    pub fn generate() -> Result<Self> {
        // A uniformly random 32-byte string is a valid scalar with overwhelming
        // probability; retry on the rare zero/overflow case.
        loop {
            let bytes = Zeroizing::new(rand::random::<[u8; 32]>());
            if let Ok(key) = SigningKey::from_slice(&bytes[..]) {
                return Self::new(key);
            }
        }
    }

    /// Secret scalar as lowercase hex, for persisting into the keystore.
    pub fn secret_hex(&self) -> Zeroizing<String> {
        Zeroizing::new(hex::encode(self.key.to_bytes()))
    }
}

impl Signer for SoftwareSigner {
    fn sign_personal_message(&self, msg: &[u8]) -> Result<Signature> {
        let prehash = personal_message_hash(msg);
        let (sig, recovery_id) = self
            .key
            .sign_prehash_recoverable(&prehash)
            .map_err(|e| anyhow::anyhow!("Failed to sign message: {e}"))?;
        let mut bytes = sig.to_bytes().to_vec();
        bytes.push(recovery_id.to_byte() + 27);
        Ok(Signature::from_slice(&bytes)?)
    }

    fn address(&self) -> &Address {
        &self.address
    }
}
