//! Credential persistence.
//!
//! The client never caches tokens itself: every request reads the current
//! access token from a [`CredentialStore`], and the refresh path is the only
//! writer while a refresh cycle is running.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use tracing::debug;

use crate::error::{ClientError, ClientResult};

/// Logical keys held by a credential store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CredentialKey {
    AccessToken,
    RefreshToken,
    /// Cached JSON of the signed-in user
    User,
}

impl CredentialKey {
    pub const ALL: [CredentialKey; 3] = [
        CredentialKey::AccessToken,
        CredentialKey::RefreshToken,
        CredentialKey::User,
    ];

    /// Storage name of the key.
    pub fn as_str(&self) -> &'static str {
        match self {
            CredentialKey::AccessToken => "access_token",
            CredentialKey::RefreshToken => "refresh_token",
            CredentialKey::User => "user",
        }
    }
}

/// Durable key-value store for the credential pair and cached user.
pub trait CredentialStore: Send + Sync {
    fn get(&self, key: CredentialKey) -> ClientResult<Option<String>>;

    fn set(&self, key: CredentialKey, value: &str) -> ClientResult<()>;

    fn remove(&self, key: CredentialKey) -> ClientResult<()>;

    /// Store a freshly issued token pair.
    fn set_tokens(&self, access: &str, refresh: &str) -> ClientResult<()> {
        self.set(CredentialKey::AccessToken, access)?;
        self.set(CredentialKey::RefreshToken, refresh)
    }

    /// Forget everything: tokens and cached user.
    fn clear(&self) -> ClientResult<()> {
        for key in CredentialKey::ALL {
            self.remove(key)?;
        }
        Ok(())
    }
}

// =============================================================================
// In-memory store
// =============================================================================

/// Process-local store. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    entries: RwLock<HashMap<CredentialKey, String>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with a token pair.
    pub fn with_tokens(access: &str, refresh: &str) -> Self {
        let store = Self::new();
        {
            let mut entries = store.entries.write().unwrap_or_else(PoisonError::into_inner);
            entries.insert(CredentialKey::AccessToken, access.to_string());
            entries.insert(CredentialKey::RefreshToken, refresh.to_string());
        }
        store
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self, key: CredentialKey) -> ClientResult<Option<String>> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(&key).cloned())
    }

    fn set(&self, key: CredentialKey, value: &str) -> ClientResult<()> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key, value.to_string());
        Ok(())
    }

    fn remove(&self, key: CredentialKey) -> ClientResult<()> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.remove(&key);
        Ok(())
    }
}

// =============================================================================
// File store
// =============================================================================

/// JSON-object file store. Loaded once on open and written through on every
/// mutation, replacing the file atomically.
#[derive(Debug)]
pub struct FileCredentialStore {
    path: PathBuf,
    entries: RwLock<BTreeMap<String, String>>,
}

impl FileCredentialStore {
    /// Open (or lazily create) the store at `path`.
    pub fn open(path: impl Into<PathBuf>) -> ClientResult<Self> {
        let path = path.into();

        let entries = match fs::read_to_string(&path) {
            Ok(contents) if contents.trim().is_empty() => BTreeMap::new(),
            Ok(contents) => serde_json::from_str(&contents).map_err(|e| {
                ClientError::storage(format!(
                    "Credential file {} is corrupt: {}",
                    path.display(),
                    e
                ))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                return Err(ClientError::storage(format!(
                    "Failed to read {}: {}",
                    path.display(),
                    e
                )))
            }
        };

        debug!(path = %path.display(), keys = entries.len(), "Opened credential file");

        Ok(Self {
            path,
            entries: RwLock::new(entries),
        })
    }

    /// Open the store at `JOBLY_CREDENTIALS_PATH`, falling back to `default_path`.
    pub fn from_env(default_path: impl Into<PathBuf>) -> ClientResult<Self> {
        match std::env::var("JOBLY_CREDENTIALS_PATH") {
            Ok(p) if !p.trim().is_empty() => Self::open(p),
            _ => Self::open(default_path),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Apply `apply` to a copy, persist it, and only then publish it.
    fn mutate(&self, apply: impl FnOnce(&mut BTreeMap<String, String>)) -> ClientResult<()> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let mut updated = entries.clone();
        apply(&mut updated);
        self.persist(&updated)?;
        *entries = updated;
        Ok(())
    }

    /// Sibling temp file used for atomic replacement, e.g. `creds.json.tmp`.
    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn persist(&self, entries: &BTreeMap<String, String>) -> ClientResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                ClientError::storage(format!("Failed to create {}: {}", parent.display(), e))
            })?;
        }

        let json = serde_json::to_string_pretty(entries)?;
        let tmp = self.temp_path();
        fs::write(&tmp, json)
            .map_err(|e| ClientError::storage(format!("Failed to write {}: {}", tmp.display(), e)))?;
        restrict_permissions(&tmp);
        fs::rename(&tmp, &self.path).map_err(|e| {
            ClientError::storage(format!("Failed to replace {}: {}", self.path.display(), e))
        })
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) {
    use std::os::unix::fs::PermissionsExt;
    if let Err(e) = fs::set_permissions(path, fs::Permissions::from_mode(0o600)) {
        debug!("Could not restrict permissions on {}: {}", path.display(), e);
    }
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) {}

impl CredentialStore for FileCredentialStore {
    fn get(&self, key: CredentialKey) -> ClientResult<Option<String>> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key.as_str()).cloned())
    }

    fn set(&self, key: CredentialKey, value: &str) -> ClientResult<()> {
        self.mutate(|entries| {
            entries.insert(key.as_str().to_string(), value.to_string());
        })
    }

    fn remove(&self, key: CredentialKey) -> ClientResult<()> {
        self.mutate(|entries| {
            entries.remove(key.as_str());
        })
    }

    fn clear(&self) -> ClientResult<()> {
        // Single write instead of one per key.
        self.mutate(|entries| {
            for key in CredentialKey::ALL {
                entries.remove(key.as_str());
            }
        })
    }
}
