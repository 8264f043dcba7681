//! OAuth credential records and their persistence contract
//!
//! `CredentialStore` is the read/update/delete seam the manager talks to.
//! Two implementations ship: a JSON file written atomically and an
//! in-memory map. Both serialize writes behind a tokio Mutex; concurrent
//! refreshes for one identity resolve as last write wins.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::{Error, Result};

/// One user's OAuth credentials, keyed by `identity`.
///
/// `token_expiry` is a unix timestamp in milliseconds. `None` means the
/// access token does not expire.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialRecord {
    pub identity: String,
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub token_expiry: Option<u64>,
    pub client_id: String,
    pub client_secret: String,
    pub token_uri: String,
    pub scope: String,
}

impl CredentialRecord {
    /// Whether the access token has expired at `now_ms`.
    pub fn is_expired_at(&self, now_ms: u64) -> bool {
        self.token_expiry.is_some_and(|expiry| now_ms >= expiry)
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(now_millis())
    }
}

impl fmt::Debug for CredentialRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialRecord")
            .field("identity", &self.identity)
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "[REDACTED]"))
            .field("token_expiry", &self.token_expiry)
            .field("client_id", &self.client_id)
            .field("token_uri", &self.token_uri)
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}

/// Current time as unix milliseconds.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}

/// Boxed future returned by store operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Persistence contract for credential records.
///
/// Uses `Pin<Box<dyn Future>>` return types so stores can sit behind
/// `Arc<dyn CredentialStore>`.
pub trait CredentialStore: Send + Sync {
    /// Record for `identity`, if any.
    fn find<'a>(&'a self, identity: &'a str) -> StoreFuture<'a, Option<CredentialRecord>>;

    /// Insert or replace the record keyed by `record.identity`.
    fn upsert<'a>(&'a self, record: CredentialRecord) -> StoreFuture<'a, ()>;

    /// Remove the record for `identity`. Returns whether one existed.
    fn delete<'a>(&'a self, identity: &'a str) -> StoreFuture<'a, bool>;
}

/// Records held in memory only.
#[derive(Default)]
pub struct MemoryCredentialStore {
    records: Mutex<HashMap<String, CredentialRecord>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn find<'a>(&'a self, identity: &'a str) -> StoreFuture<'a, Option<CredentialRecord>> {
        Box::pin(async move { Ok(self.records.lock().await.get(identity).cloned()) })
    }

    fn upsert<'a>(&'a self, record: CredentialRecord) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            self.records
                .lock()
                .await
                .insert(record.identity.clone(), record);
            Ok(())
        })
    }

    fn delete<'a>(&'a self, identity: &'a str) -> StoreFuture<'a, bool> {
        Box::pin(async move { Ok(self.records.lock().await.remove(identity).is_some()) })
    }
}

/// Records persisted to a JSON file mapping identity to record.
///
/// Every write replaces the file atomically (temp file + rename) with 0600
/// permissions since it holds tokens. The in-memory map only changes once
/// the file write has succeeded.
pub struct FileCredentialStore {
    path: PathBuf,
    state: Mutex<HashMap<String, CredentialRecord>>,
}

impl FileCredentialStore {
    /// Load records from `path`, creating `{}` there if the file is missing.
    pub async fn load(path: PathBuf) -> Result<Self> {
        let state = if path.exists() {
            let contents = tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| Error::Io(format!("reading credential file: {e}")))?;
            let records: HashMap<String, CredentialRecord> = serde_json::from_str(&contents)
                .map_err(|e| Error::CredentialParse(format!("parsing credential file: {e}")))?;
            info!(path = %path.display(), records = records.len(), "Loaded OAuth credentials");
            records
        } else {
            info!(path = %path.display(), "Credential file not found, starting empty");
            let records = HashMap::new();
            write_atomic(&path, &records).await?;
            records
        };

        Ok(Self {
            path,
            state: Mutex::new(state),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl CredentialStore for FileCredentialStore {
    fn find<'a>(&'a self, identity: &'a str) -> StoreFuture<'a, Option<CredentialRecord>> {
        Box::pin(async move { Ok(self.state.lock().await.get(identity).cloned()) })
    }

    fn upsert<'a>(&'a self, record: CredentialRecord) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            let mut state = self.state.lock().await;
            debug!(identity = %record.identity, "Storing credentials");
            let mut next = state.clone();
            next.insert(record.identity.clone(), record);
            write_atomic(&self.path, &next).await?;
            *state = next;
            Ok(())
        })
    }

    fn delete<'a>(&'a self, identity: &'a str) -> StoreFuture<'a, bool> {
        Box::pin(async move {
            let mut state = self.state.lock().await;
            let mut next = state.clone();
            if next.remove(identity).is_none() {
                return Ok(false);
            }
            write_atomic(&self.path, &next).await?;
            *state = next;
            debug!(identity, "Removed credentials");
            Ok(true)
        })
    }
}

async fn write_atomic(path: &Path, records: &HashMap<String, CredentialRecord>) -> Result<()> {
    let json = serde_json::to_string_pretty(records)
        .map_err(|e| Error::CredentialParse(format!("serializing credentials: {e}")))?;

    let dir = path
        .parent()
        .ok_or_else(|| Error::Io("credential path has no parent directory".into()))?;
    let tmp_path = dir.join(format!(".oauth-credentials.tmp.{}", std::process::id()));

    tokio::fs::write(&tmp_path, json.as_bytes())
        .await
        .map_err(|e| Error::Io(format!("writing temp credential file: {e}")))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        tokio::fs::set_permissions(&tmp_path, perms)
            .await
            .map_err(|e| Error::Io(format!("setting credential file permissions: {e}")))?;
    }

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| Error::Io(format!("renaming temp credential file: {e}")))?;

    debug!(path = %path.display(), "Persisted credentials");
    Ok(())
}

#[cfg(test)]
pub(crate) fn test_record(identity: &str, expiry: Option<u64>) -> CredentialRecord {
    CredentialRecord {
        identity: identity.into(),
        access_token: format!("at_{identity}"),
        refresh_token: Some(format!("rt_{identity}")),
        token_expiry: expiry,
        client_id: "client-1".into(),
        client_secret: "shh".into(),
        token_uri: "http://127.0.0.1:9/token".into(),
        scope: crate::constants::CLOUDPRINT_SCOPE.into(),
    }
}
