use crate::error::BlacklistError;
use crate::models::{BlacklistEntry, BlacklistReason};
use chrono::Utc;
use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// JSON-file store of rejected ad ids.
///
/// The whole file is rewritten on every mutation. Mutations go through a
/// lock so read-modify-write cycles never interleave.
#[derive(Debug, Clone)]
pub struct BlacklistStore {
    path: PathBuf,
    lock: Arc<Mutex<()>>,
}

impl BlacklistStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create an empty store on disk if none exists yet.
    pub async fn ensure_exists(&self) -> Result<(), BlacklistError> {
        let _guard = self.lock.lock().await;
        match tokio::fs::metadata(&self.path).await {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => self.write(&[]).await,
            Err(e) => Err(e.into()),
        }
    }

    /// Read all entries. A missing file is an empty blacklist.
    pub async fn entries(&self) -> Result<Vec<BlacklistEntry>, BlacklistError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) if content.trim().is_empty() => Ok(Vec::new()),
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Ids to skip. Read failures are logged and yield an empty set.
    pub async fn ids_or_empty(&self) -> HashSet<String> {
        match self.entries().await {
            Ok(entries) => entries
                .into_iter()
                .map(|e| e.ad_id)
                .filter(|id| !id.is_empty())
                .collect(),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Could not read blacklist, treating as empty");
                HashSet::new()
            }
        }
    }

    pub async fn contains(&self, ad_id: &str) -> Result<bool, BlacklistError> {
        Ok(self.entries().await?.iter().any(|e| e.ad_id == ad_id))
    }

    /// Add an entry. Returns `Ok(false)` when the id is already present.
    pub async fn add(&self, ad_id: &str, reason: BlacklistReason) -> Result<bool, BlacklistError> {
        let _guard = self.lock.lock().await;
        let mut entries = self.entries().await?;

        if entries.iter().any(|e| e.ad_id == ad_id) {
            info!(ad_id, "Ad already blacklisted");
            return Ok(false);
        }

        entries.push(BlacklistEntry {
            ad_id: ad_id.to_string(),
            reason,
            added_at: Utc::now(),
        });
        self.write(&entries).await?;

        info!(ad_id, %reason, "🚫 Ad added to blacklist");
        Ok(true)
    }

    /// Remove an entry. Returns `Ok(false)` when the id was not present.
    pub async fn remove(&self, ad_id: &str) -> Result<bool, BlacklistError> {
        let _guard = self.lock.lock().await;
        let mut entries = self.entries().await?;
        let before = entries.len();
        entries.retain(|e| e.ad_id != ad_id);

        if entries.len() == before {
            return Ok(false);
        }

        self.write(&entries).await?;
        info!(ad_id, "Ad removed from blacklist");
        Ok(true)
    }

    async fn write(&self, entries: &[BlacklistEntry]) -> Result<(), BlacklistError> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir).await?;
        }

        let json = serde_json::to_string_pretty(entries)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}
