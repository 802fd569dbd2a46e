//! Secret store capability
//!
//! The credential layer only needs per-key get/set/remove on strings. The
//! platform keychain is one backend; this crate ships two portable ones:
//!
//! - `MemorySecretStore` keeps values for the life of the process.
//! - `FileSecretStore` keeps a JSON object of key -> value on disk. All writes
//!   use atomic temp-file + rename so no reader ever sees a half-written
//!   value, and a tokio Mutex serializes writers.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex as StdMutex;

use tokio::sync::Mutex;
use tracing::{debug, info};
use transport::BoxFuture;
use uuid::Uuid;

use crate::error::{Error, Result};

/// Abstraction over platform secret storage.
///
/// Each call is an independent atomic unit. Uses `Pin<Box<dyn Future>>`
/// return types for dyn-compatibility (`Arc<dyn SecretStore>`).
pub trait SecretStore: Send + Sync {
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<String>>>;

    /// Insert or overwrite the value under `key`.
    fn set<'a>(&'a self, key: &'a str, value: String) -> BoxFuture<'a, Result<()>>;

    /// Remove `key`. Removing an absent key succeeds.
    fn remove<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<()>>;
}

/// Process-local secret store.
#[derive(Debug, Default)]
pub struct MemorySecretStore {
    entries: StdMutex<HashMap<String, String>>,
}

impl MemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|_| Error::SecretStore("memory store lock poisoned".into()))
    }
}

impl SecretStore for MemorySecretStore {
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<String>>> {
        let value = self.entries().map(|entries| entries.get(key).cloned());
        Box::pin(async move { value })
    }

    fn set<'a>(&'a self, key: &'a str, value: String) -> BoxFuture<'a, Result<()>> {
        let result = self.entries().map(|mut entries| {
            entries.insert(key.to_owned(), value);
        });
        Box::pin(async move { result })
    }

    fn remove<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<()>> {
        let result = self.entries().map(|mut entries| {
            entries.remove(key);
        });
        Box::pin(async move { result })
    }
}

/// File-backed secret store with 0600 permissions.
///
/// The file is the single source of truth; the in-memory map mirrors it and
/// is only replaced after a successful write.
pub struct FileSecretStore {
    path: PathBuf,
    state: Mutex<HashMap<String, String>>,
}

impl FileSecretStore {
    /// Open the store at `path`.
    ///
    /// If the file doesn't exist, creates it as `{}`.
    pub async fn open(path: PathBuf) -> Result<Self> {
        let state = if path.exists() {
            let contents = tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| Error::SecretStore(format!("reading secret file: {e}")))?;
            let entries: HashMap<String, String> = serde_json::from_str(&contents)
                .map_err(|e| Error::SecretStore(format!("parsing secret file: {e}")))?;
            info!(path = %path.display(), entries = entries.len(), "opened secret store");
            entries
        } else {
            info!(path = %path.display(), "secret file not found, starting with empty store");
            let entries = HashMap::new();
            write_atomic(&path, &entries).await?;
            entries
        };

        Ok(Self {
            path,
            state: Mutex::new(state),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SecretStore for FileSecretStore {
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<String>>> {
        Box::pin(async move {
            let state = self.state.lock().await;
            Ok(state.get(key).cloned())
        })
    }

    fn set<'a>(&'a self, key: &'a str, value: String) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let mut state = self.state.lock().await;
            let mut next = state.clone();
            next.insert(key.to_owned(), value);
            write_atomic(&self.path, &next).await?;
            *state = next;
            debug!(key, "stored secret");
            Ok(())
        })
    }

    fn remove<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let mut state = self.state.lock().await;
            if !state.contains_key(key) {
                return Ok(());
            }
            let mut next = state.clone();
            next.remove(key);
            write_atomic(&self.path, &next).await?;
            *state = next;
            debug!(key, "removed secret");
            Ok(())
        })
    }
}

/// Write the secret map to a file atomically.
///
/// Writes to a temporary file in the same directory, then renames it over
/// the target. Sets file permissions to 0600 (owner read/write only) before
/// the rename so the target is never briefly world-readable.
async fn write_atomic(path: &Path, data: &HashMap<String, String>) -> Result<()> {
    let json = serde_json::to_string_pretty(data)
        .map_err(|e| Error::SecretStore(format!("serializing secrets: {e}")))?;

    let dir = path
        .parent()
        .ok_or_else(|| Error::SecretStore("secret path has no parent directory".into()))?;

    let file_name = path
        .file_name()
        .ok_or_else(|| Error::SecretStore("secret path has no file name".into()))?
        .to_string_lossy();
    // Unique per write: sibling stores in one directory never share a temp file
    let tmp_path = dir.join(format!(".{file_name}.tmp.{}", Uuid::new_v4().simple()));

    tokio::fs::write(&tmp_path, json.as_bytes())
        .await
        .map_err(|e| Error::SecretStore(format!("writing temp secret file: {e}")))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        tokio::fs::set_permissions(&tmp_path, perms)
            .await
            .map_err(|e| Error::SecretStore(format!("setting secret file permissions: {e}")))?;
    }

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| Error::SecretStore(format!("renaming temp secret file: {e}")))?;

    debug!(path = %path.display(), "persisted secrets");
    Ok(())
}
