//! Checkpoint persistence
//!
//! One checkpoint per run, created atomically by `start` and overwritten
//! after every transition. A store must tolerate independent runs saving
//! concurrently.

use crate::error::CheckpointError;
use crate::stage_name::StageName;
use argus_record::{CaseRecord, RunStatus};
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Where and why a run halted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageFailure {
    /// Failing stage
    pub stage: StageName,
    /// Rendered error
    pub message: String,
}

/// Persisted run state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Run identifier
    pub run_id: String,
    /// Record after the last completed stage
    pub record: CaseRecord,
    /// Stage to run next; `None` once the run has ended
    pub next: Option<StageName>,
    /// Set when the run halted on an error
    pub failure: Option<StageFailure>,
    /// Time of the last save
    pub updated_at: DateTime<Utc>,
}

impl Checkpoint {
    /// Snapshot stamped with the current time
    #[must_use]
    pub fn new(run_id: impl Into<String>, record: CaseRecord, next: Option<StageName>) -> Self {
        Self {
            run_id: run_id.into(),
            record,
            next,
            failure: None,
            updated_at: Utc::now(),
        }
    }

    /// Attach a failure
    #[must_use]
    pub fn with_failure(mut self, failure: StageFailure) -> Self {
        self.failure = Some(failure);
        self
    }

    /// Status of the stored record
    #[inline]
    #[must_use]
    pub fn status(&self) -> RunStatus {
        self.record.status()
    }
}

/// Keyed checkpoint storage
#[async_trait::async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Insert or replace the checkpoint for `checkpoint.run_id`
    async fn save(&self, checkpoint: &Checkpoint) -> Result<(), CheckpointError>;

    /// Store `checkpoint` only if its run has none yet.
    ///
    /// Returns `false` and leaves the store untouched when the run exists.
    /// The check and the insert are one atomic step.
    async fn create(&self, checkpoint: &Checkpoint) -> Result<bool, CheckpointError>;

    /// Latest checkpoint of a run
    async fn load(&self, run_id: &str) -> Result<Option<Checkpoint>, CheckpointError>;

    /// Stored run ids, sorted
    async fn runs(&self) -> Result<Vec<String>, CheckpointError>;
}

/// Process-local store
#[derive(Debug, Default)]
pub struct InMemoryCheckpointStore {
    entries: DashMap<String, Checkpoint>,
}

impl InMemoryCheckpointStore {
    /// Empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored runs
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no run is stored
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait::async_trait]
impl CheckpointStore for InMemoryCheckpointStore {
    async fn save(&self, checkpoint: &Checkpoint) -> Result<(), CheckpointError> {
        self.entries
            .insert(checkpoint.run_id.clone(), checkpoint.clone());
        Ok(())
    }

    async fn create(&self, checkpoint: &Checkpoint) -> Result<bool, CheckpointError> {
        match self.entries.entry(checkpoint.run_id.clone()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(checkpoint.clone());
                Ok(true)
            }
        }
    }

    async fn load(&self, run_id: &str) -> Result<Option<Checkpoint>, CheckpointError> {
        Ok(self.entries.get(run_id).map(|entry| entry.value().clone()))
    }

    async fn runs(&self) -> Result<Vec<String>, CheckpointError> {
        let mut ids: Vec<String> = self.entries.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        Ok(ids)
    }
}

/// One JSON file per run under a directory.
///
/// Writes go to a temporary sibling first and are renamed into place, so a
/// reader never observes a half-written checkpoint.
#[derive(Debug, Clone)]
pub struct FileCheckpointStore {
    dir: PathBuf,
}

impl FileCheckpointStore {
    /// Store rooted at `dir`; the directory is created on first save
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Root directory
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File holding the checkpoint of `run_id`
    pub fn path_for(&self, run_id: &str) -> Result<PathBuf, CheckpointError> {
        let valid = !run_id.is_empty()
            && !run_id.starts_with('.')
            && run_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
        if !valid {
            return Err(CheckpointError::InvalidRunId(run_id.to_string()));
        }
        Ok(self.dir.join(format!("{run_id}.json")))
    }

    fn io(path: &Path) -> impl FnOnce(std::io::Error) -> CheckpointError + '_ {
        move |source| CheckpointError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

#[async_trait::async_trait]
impl CheckpointStore for FileCheckpointStore {
    async fn save(&self, checkpoint: &Checkpoint) -> Result<(), CheckpointError> {
        let path = self.path_for(&checkpoint.run_id)?;
        let encoded = serde_json::to_vec_pretty(checkpoint).map_err(CheckpointError::Encode)?;

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(Self::io(&self.dir))?;
        let staging = path.with_extension("json.tmp");
        tokio::fs::write(&staging, &encoded)
            .await
            .map_err(Self::io(&staging))?;
        tokio::fs::rename(&staging, &path)
            .await
            .map_err(Self::io(&path))?;

        debug!(run_id = %checkpoint.run_id, path = %path.display(), bytes = encoded.len(), "checkpoint saved");
        Ok(())
    }

    async fn create(&self, checkpoint: &Checkpoint) -> Result<bool, CheckpointError> {
        let path = self.path_for(&checkpoint.run_id)?;
        let encoded = serde_json::to_vec_pretty(checkpoint).map_err(CheckpointError::Encode)?;

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(Self::io(&self.dir))?;
        let staging = path.with_extension(format!("{}.tmp", uuid::Uuid::new_v4()));
        tokio::fs::write(&staging, &encoded)
            .await
            .map_err(Self::io(&staging))?;

        // Linking fails if the target exists, unlike rename.
        let linked = tokio::fs::hard_link(&staging, &path).await;
        if let Err(e) = tokio::fs::remove_file(&staging).await {
            debug!(path = %staging.display(), error = %e, "could not remove staging file");
        }
        match linked {
            Ok(()) => {
                debug!(run_id = %checkpoint.run_id, path = %path.display(), "checkpoint created");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(Self::io(&path)(e)),
        }
    }

    async fn load(&self, run_id: &str) -> Result<Option<Checkpoint>, CheckpointError> {
        let path = self.path_for(run_id)?;
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Self::io(&path)(e)),
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| CheckpointError::Corrupt { path, source })
    }

    async fn runs(&self) -> Result<Vec<String>, CheckpointError> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Self::io(&self.dir)(e)),
        };
        let mut ids = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(Self::io(&self.dir))? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    ids.push(stem.to_string());
                }
            }
        }
        ids.sort();
        Ok(ids)
    }
}
