//! Team persistence
//!
//! The runtime only ever hands a store fully computed records; a failed commit
//! means the runtime keeps the old record, so stores never see partial updates.

use async_trait::async_trait;
use codevault_core::{Error, Result, TeamId, TeamRecord};
use dashmap::DashMap;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, info};

#[async_trait]
pub trait TeamStore: Send + Sync {
    async fn load_all(&self) -> Result<Vec<TeamRecord>>;

    /// Persist one team's record, replacing any previous version.
    async fn commit(&self, record: &TeamRecord) -> Result<()>;

    /// Persist several records as one unit.
    async fn commit_all(&self, records: &[TeamRecord]) -> Result<()>;
}

/// Keeps records in memory only.
#[derive(Default)]
pub struct MemoryStore {
    records: DashMap<TeamId, TeamRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: impl IntoIterator<Item = TeamRecord>) -> Self {
        let store = Self::new();
        for record in records {
            store.records.insert(record.id().clone(), record);
        }
        store
    }
}

#[async_trait]
impl TeamStore for MemoryStore {
    async fn load_all(&self) -> Result<Vec<TeamRecord>> {
        Ok(self.records.iter().map(|r| r.value().clone()).collect())
    }

    async fn commit(&self, record: &TeamRecord) -> Result<()> {
        self.records.insert(record.id().clone(), record.clone());
        Ok(())
    }

    async fn commit_all(&self, records: &[TeamRecord]) -> Result<()> {
        for record in records {
            self.records.insert(record.id().clone(), record.clone());
        }
        Ok(())
    }
}

/// All teams in one pretty-printed JSON array, rewritten on every commit.
///
/// Writes go to a sibling temp file that is then renamed over the original.
pub struct JsonFileStore {
    path: PathBuf,
    records: Mutex<BTreeMap<TeamId, TeamRecord>>,
}

impl JsonFileStore {
    /// Open `path`, starting empty if the file does not exist yet.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let records = match tokio::fs::read_to_string(&path).await {
            Ok(content) if content.trim().is_empty() => BTreeMap::new(),
            Ok(content) => {
                let list: Vec<TeamRecord> = serde_json::from_str(&content)?;
                list.into_iter().map(|r| (r.id().clone(), r)).collect()
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        info!("Team store {} ({} teams)", path.display(), records.len());
        Ok(Self {
            path,
            records: Mutex::new(records),
        })
    }

    async fn write(&self, records: &BTreeMap<TeamId, TeamRecord>) -> Result<()> {
        let list: Vec<&TeamRecord> = records.values().collect();
        let json = serde_json::to_string_pretty(&list)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| Error::storage(format!("write {}: {e}", tmp.display())))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| Error::storage(format!("rename to {}: {e}", self.path.display())))?;
        debug!("Wrote {} teams to {}", list.len(), self.path.display());
        Ok(())
    }
}

#[async_trait]
impl TeamStore for JsonFileStore {
    async fn load_all(&self) -> Result<Vec<TeamRecord>> {
        Ok(self.records.lock().await.values().cloned().collect())
    }

    async fn commit(&self, record: &TeamRecord) -> Result<()> {
        self.commit_all(std::slice::from_ref(record)).await
    }

    async fn commit_all(&self, records: &[TeamRecord]) -> Result<()> {
        let mut current = self.records.lock().await;
        let mut next = current.clone();
        for record in records {
            next.insert(record.id().clone(), record.clone());
        }
        self.write(&next).await?;
        *current = next;
        Ok(())
    }
}
