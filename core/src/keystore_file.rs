/// Encrypted keystore file persistence.
///
/// File format: magic `DPK1` (4 bytes) || salt (32 bytes) || nonce (12 bytes) || ciphertext
/// Key derivation: Argon2id from password + salt
/// Encryption: AES-256-GCM, with the magic bytes bound as associated data
use std::path::Path;

use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Nonce};
use argon2::{Algorithm, Argon2, Params, Version};
use thiserror::Error;
use zeroize::{Zeroize, Zeroizing};

const MAGIC: &[u8; 4] = b"DPK1";
const SALT_LEN: usize = 32;
const NONCE_LEN: usize = 12;
const KEY_LEN: usize = 32;
const HEADER_LEN: usize = MAGIC.len() + SALT_LEN + NONCE_LEN;

// Interactive-use Argon2id cost: 64 MiB, 3 passes, 1 lane
const ARGON2_M_COST: u32 = 65536;
const ARGON2_T_COST: u32 = 3;
const ARGON2_P_COST: u32 = 1;

#[derive(Debug, Error)]
pub enum KeystoreFileError {
    #[error("keystore file is too short to contain an encrypted key")]
    FileTooShort,
    #[error("not a keystore file (unknown header)")]
    BadMagic,
    #[error("decryption failed: wrong password or corrupt keystore")]
    DecryptionFailed,
    #[error("encryption failed")]
    EncryptionFailed,
    #[error("key derivation failed (argon2)")]
    KeyDerivationFailed,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn derive_cipher(password: &[u8], salt: &[u8]) -> Result<Aes256Gcm, KeystoreFileError> {
    let params = Params::new(ARGON2_M_COST, ARGON2_T_COST, ARGON2_P_COST, Some(KEY_LEN))
        .map_err(|_| KeystoreFileError::KeyDerivationFailed)?;
    let mut key = [0u8; KEY_LEN];
    Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
        .hash_password_into(password, salt, &mut key)
        .map_err(|_| KeystoreFileError::KeyDerivationFailed)?;
    let cipher = Aes256Gcm::new_from_slice(&key);
    key.zeroize();
    cipher.map_err(|_| KeystoreFileError::KeyDerivationFailed)
}

/// Encrypt plaintext. Returns magic || salt || nonce || ciphertext.
pub fn seal(plaintext: &[u8], password: &[u8]) -> Result<Vec<u8>, KeystoreFileError> {
    let salt: [u8; SALT_LEN] = rand::random();
    let nonce_bytes: [u8; NONCE_LEN] = rand::random();

    let cipher = derive_cipher(password, &salt)?;
    let ciphertext = cipher
        .encrypt(
            Nonce::from_slice(&nonce_bytes),
            Payload { msg: plaintext, aad: MAGIC },
        )
        .map_err(|_| KeystoreFileError::EncryptionFailed)?;

    let mut out = Vec::with_capacity(HEADER_LEN + ciphertext.len());
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&salt);
    out.extend_from_slice(&nonce_bytes);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

/// Decrypt data produced by [`seal`]. The plaintext is zeroized on drop.
pub fn open(data: &[u8], password: &[u8]) -> Result<Zeroizing<Vec<u8>>, KeystoreFileError> {
    if data.len() <= HEADER_LEN {
        return Err(KeystoreFileError::FileTooShort);
    }
    let (magic, rest) = data.split_at(MAGIC.len());
    if magic != MAGIC {
        return Err(KeystoreFileError::BadMagic);
    }
    let (salt, rest) = rest.split_at(SALT_LEN);
    let (nonce_bytes, ciphertext) = rest.split_at(NONCE_LEN);

    let cipher = derive_cipher(password, salt)?;
    let plaintext = cipher
        .decrypt(
            Nonce::from_slice(nonce_bytes),
            Payload { msg: ciphertext, aad: MAGIC },
        )
        .map_err(|_| KeystoreFileError::DecryptionFailed)?;
    Ok(Zeroizing::new(plaintext))
}

/// Encrypt and write atomically (temp file, fsync, rename).
/// Directory 0700 and file 0600 on Unix.
pub fn write_sealed(
    path: &Path,
    plaintext: &[u8],
    password: &[u8],
) -> Result<(), KeystoreFileError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(parent, std::fs::Permissions::from_mode(0o700))?;
        }
    }
    let sealed = seal(plaintext, password)?;
    let tmp_path = path.with_extension("key.tmp");

    #[cfg(unix)]
    {
        use std::io::Write;
        use std::os::unix::fs::OpenOptionsExt;
        let mut file = std::fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(&tmp_path)?;
        file.write_all(&sealed)?;
        file.sync_all()?;
    }
    #[cfg(not(unix))]
    {
        std::fs::write(&tmp_path, &sealed)?;
    }

    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

pub fn read_sealed(
    path: &Path,
    password: &[u8],
) -> Result<Zeroizing<Vec<u8>>, KeystoreFileError> {
    let data = std::fs::read(path)?;
    open(&data, password)
}
