/// Unlocked keystore: the decrypted secp256k1 key, its address and the stored network.
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, Zeroizing};

use crate::address::Address;
use crate::config::NetworkConfig;
use crate::keystore_file::{self, KeystoreFileError};
use crate::signer::{Signer, SoftwareSigner};

/// Serialized keystore contents, encrypted on disk.
#[derive(Serialize, Deserialize)]
struct KeystoreData {
    /// Hex-encoded 32-byte secret scalar.
    secret_key: String,
    #[serde(rename = "network", default)]
    network_config: NetworkConfig,
}

impl Drop for KeystoreData {
    fn drop(&mut self) {
        self.secret_key.zeroize();
    }
}

fn persist(path: &Path, data: &KeystoreData, password: &[u8]) -> Result<()> {
    let json = Zeroizing::new(serde_json::to_vec(data).context("Failed to serialize keystore")?);
    keystore_file::write_sealed(path, &json, password).context("Failed to save keystore file")?;
    Ok(())
}

fn signer_from_hex(secret_hex: &str) -> Result<SoftwareSigner> {
    let bytes = Zeroizing::new(
        hex::decode(secret_hex.trim().trim_start_matches("0x"))
            .context("Secret key is not valid hex")?,
    );
    SoftwareSigner::from_secret_bytes(&bytes)
}

/// Unlocked keystore. The signing key lives inside `signer`.
pub struct Keystore {
    data: KeystoreData,
    signer: std::sync::Arc<SoftwareSigner>,
    path: PathBuf,
}

impl Keystore {
    /// Create a keystore with a freshly generated key.
    pub fn create_new(
        path: PathBuf,
        password: &[u8],
        network_config: NetworkConfig,
    ) -> Result<Self> {
        let signer = SoftwareSigner::generate()?;
        let data = KeystoreData {
            secret_key: signer.secret_hex().to_string(),
            network_config,
        };
        persist(&path, &data, password)?;
        Ok(Self {
            data,
            signer: std::sync::Arc::new(signer),
            path,
        })
    }

    /// Create a keystore from an existing hex secret key (with or without `0x`).
    pub fn import(
        path: PathBuf,
        password: &[u8],
        secret_hex: &str,
        network_config: NetworkConfig,
    ) -> Result<Self> {
        let signer = signer_from_hex(secret_hex)?;
        let data = KeystoreData {
            secret_key: signer.secret_hex().to_string(),
            network_config,
        };
        persist(&path, &data, password)?;
        Ok(Self {
            data,
            signer: std::sync::Arc::new(signer),
            path,
        })
    }

    pub fn open(path: &Path, password: &[u8]) -> Result<Self> {
        let json = keystore_file::read_sealed(path, password)
            .context("Failed to open keystore. Wrong password or corrupt file?")?;
        let data: KeystoreData =
            serde_json::from_slice(&json).context("Failed to parse keystore contents")?;
        let signer = signer_from_hex(&data.secret_key)?;
        Ok(Self {
            data,
            signer: std::sync::Arc::new(signer),
            path: path.to_path_buf(),
        })
    }

    /// Re-encrypt the keystore under a new password after verifying the old one.
    pub fn change_password(path: &Path, old_password: &[u8], new_password: &[u8]) -> Result<()> {
        let plaintext = keystore_file::read_sealed(path, old_password).map_err(|e| match e {
            KeystoreFileError::DecryptionFailed => anyhow::anyhow!("Current password is incorrect"),
            other => anyhow::anyhow!("{other}"),
        })?;
        keystore_file::write_sealed(path, &plaintext, new_password)
            .context("Failed to save keystore with new password")?;
        Ok(())
    }

    pub fn address(&self) -> &Address {
        self.signer.address()
    }

    pub fn signer(&self) -> std::sync::Arc<SoftwareSigner> {
        self.signer.clone()
    }

    pub fn network_config(&self) -> &NetworkConfig {
        &self.data.network_config
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
