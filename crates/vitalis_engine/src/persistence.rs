//! Condition snapshots on disk
//!
//! One JSON file per snapshot, named by the tick counter
//! (`snapshot_0000000042.json`). Startup recovery loads the file with the
//! highest tick number. Transient per-tick fields are never written.
//! Older files beyond the retention count are removed after each save.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use vitalis_core::Condition;

const CURRENT_SNAPSHOT_VERSION: u32 = 1;
const FILE_PREFIX: &str = "snapshot_";
const FILE_SUFFIX: &str = ".json";

#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Persist the condition. Returns where it was written.
    async fn save(&self, condition: &Condition) -> Result<PathBuf>;

    /// The most recent snapshot by tick number, if any.
    async fn load_latest(&self) -> Result<Option<Condition>>;
}

#[derive(Serialize)]
struct SnapshotRef<'a> {
    version: u32,
    condition: &'a Condition,
}

#[derive(Deserialize)]
struct SnapshotFile {
    version: u32,
    condition: Condition,
}

#[derive(Debug, Clone)]
pub struct JsonSnapshotStore {
    dir: PathBuf,
    retain: usize,
}

impl JsonSnapshotStore {
    /// A store that keeps every snapshot it writes.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            retain: 0,
        }
    }

    /// Keep only the newest `retain` snapshots (0 keeps all).
    pub fn with_retention(mut self, retain: usize) -> Self {
        self.retain = retain;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn file_name(tick: u64) -> String {
        format!("{FILE_PREFIX}{tick:010}{FILE_SUFFIX}")
    }

    fn parse_tick(name: &str) -> Option<u64> {
        name.strip_prefix(FILE_PREFIX)?
            .strip_suffix(FILE_SUFFIX)?
            .parse()
            .ok()
    }

    /// Snapshot files by ascending tick.
    async fn list_snapshots(&self) -> Result<Vec<(u64, PathBuf)>> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("Failed to list snapshot dir: {}", self.dir.display())
                })
            }
        };

        let mut snapshots = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            if let Some(tick) = name.to_str().and_then(Self::parse_tick) {
                snapshots.push((tick, entry.path()));
            }
        }
        snapshots.sort_by_key(|(tick, _)| *tick);
        Ok(snapshots)
    }

    async fn latest_path(&self) -> Result<Option<PathBuf>> {
        Ok(self.list_snapshots().await?.pop().map(|(_, path)| path))
    }

    /// Remove all but the newest `retain` snapshots. Returns how many went.
    pub async fn prune(&self) -> Result<usize> {
        if self.retain == 0 {
            return Ok(0);
        }
        let snapshots = self.list_snapshots().await?;
        let excess = snapshots.len().saturating_sub(self.retain);
        for (_, path) in &snapshots[..excess] {
            tokio::fs::remove_file(path)
                .await
                .with_context(|| format!("Failed to remove snapshot: {}", path.display()))?;
        }
        Ok(excess)
    }
}

#[async_trait]
impl SnapshotStore for JsonSnapshotStore {
    async fn save(&self, condition: &Condition) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("Failed to create snapshot dir: {}", self.dir.display()))?;

        let data = serde_json::to_vec_pretty(&SnapshotRef {
            version: CURRENT_SNAPSHOT_VERSION,
            condition,
        })
        .context("Failed to serialize snapshot")?;

        let path = self.dir.join(Self::file_name(condition.tick_count));
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, data)
            .await
            .with_context(|| format!("Failed to write snapshot: {}", tmp.display()))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .with_context(|| format!("Failed to finalize snapshot: {}", path.display()))?;

        match self.prune().await {
            Ok(0) => {}
            Ok(n) => tracing::debug!("Pruned {} old snapshot(s)", n),
            Err(e) => tracing::warn!("Snapshot pruning failed: {:#}", e),
        }

        Ok(path)
    }

    async fn load_latest(&self) -> Result<Option<Condition>> {
        let Some(path) = self.latest_path().await? else {
            return Ok(None);
        };

        let content = tokio::fs::read(&path)
            .await
            .with_context(|| format!("Failed to read snapshot: {}", path.display()))?;
        let file: SnapshotFile = serde_json::from_slice(&content)
            .with_context(|| format!("Failed to parse snapshot: {}", path.display()))?;

        if file.version > CURRENT_SNAPSHOT_VERSION {
            anyhow::bail!(
                "Snapshot version {} is newer than supported version {}",
                file.version,
                CURRENT_SNAPSHOT_VERSION
            );
        }

        let mut condition = file.condition;
        condition.normalize();
        tracing::info!(
            "Recovered condition at tick {} from {}",
            condition.tick_count,
            path.display()
        );
        Ok(Some(condition))
    }
}
