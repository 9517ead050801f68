/// SQLite-backed key-value cache, persisted in the platform data directory.
///
/// Holds the cached challenge signature. Entries never expire; they go away
/// only through `remove` or `clear`.
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

use crate::address::{Address, Signature};

/// Minimal persistent key-value store.
pub trait KeyValueCache: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
    fn clear(&self) -> Result<()>;
}

/// Cached proof that `address` signed `message`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignatureRecord {
    pub address: Address,
    pub message: String,
    pub signature: Signature,
}

/// Which cache slot the signature lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SignatureCacheScope {
    /// One process-wide slot under a fixed key, shared by every account.
    #[default]
    Global,
    /// One slot per account address.
    PerAccount,
}

const GLOBAL_SIGNATURE_KEY: &str = "signature";

impl SignatureCacheScope {
    pub fn key_for(&self, address: &Address) -> String {
        match self {
            SignatureCacheScope::Global => GLOBAL_SIGNATURE_KEY.to_string(),
            SignatureCacheScope::PerAccount => format!("{GLOBAL_SIGNATURE_KEY}:{address}"),
        }
    }
}

/// Load the signature record stored under `key`. A value that no longer
/// parses is treated as absent.
pub fn load_signature(cache: &dyn KeyValueCache, key: &str) -> Result<Option<SignatureRecord>> {
    let Some(raw) = cache.get(key)? else {
        return Ok(None);
    };
    match serde_json::from_str(&raw) {
        Ok(record) => Ok(Some(record)),
        Err(e) => {
            tracing::warn!(key, error = %e, "discarding unreadable cached signature");
            Ok(None)
        }
    }
}

pub fn store_signature(
    cache: &dyn KeyValueCache,
    key: &str,
    record: &SignatureRecord,
) -> Result<()> {
    let json = serde_json::to_string(record).context("Failed to serialize signature record")?;
    cache.set(key, &json)
}

pub struct SqliteCache {
    conn: Mutex<Connection>,
}

/// Default DB location: platform data directory + `dao-profile/cache.db`
/// (Linux: `~/.local/share`, macOS: `~/Library/Application Support`)
fn default_db_path() -> Result<PathBuf> {
    Ok(crate::data_dir()?.join("cache.db"))
}

impl SqliteCache {
    /// Open (or create) the cache at its default location.
    pub fn open() -> Result<Self> {
        Self::open_at(&default_db_path()?)
    }

    pub fn open_at(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create cache directory")?;
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                std::fs::set_permissions(parent, std::fs::Permissions::from_mode(0o700))?;
            }
        }
        let conn = Connection::open(path).context("Failed to open cache database")?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
        }
        Self::with_connection(conn)
    }

    /// Open an in-memory cache.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS kv (
                key         TEXT    PRIMARY KEY,
                value       TEXT    NOT NULL,
                updated_at  INTEGER NOT NULL
            );",
        )
        .context("Failed to initialize cache schema")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow::anyhow!("Cache connection lock poisoned"))
    }
}

impl KeyValueCache for SqliteCache {
    fn get(&self, key: &str) -> Result<Option<String>> {
        self.conn()?
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get::<_, String>(0)
            })
            .optional()
            .context("Failed to read cache entry")
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as i64;
        self.conn()?
            .execute(
                "INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT (key) DO UPDATE SET
                     value = excluded.value,
                     updated_at = excluded.updated_at",
                params![key, value, now],
            )
            .context("Failed to write cache entry")?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.conn()?
            .execute("DELETE FROM kv WHERE key = ?1", params![key])
            .context("Failed to remove cache entry")?;
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.conn()?
            .execute("DELETE FROM kv", [])
            .context("Failed to clear cache")?;
        Ok(())
    }
}
