//! Snapshot persistence for the story collection.
//!
//! The whole collection and the active story id are written as one JSON
//! document. File writes go to a sibling temp file first and are renamed
//! into place, so a crash mid-write leaves the previous snapshot intact.

use crate::id::StoryId;
use crate::story::Story;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

/// Errors from persistence operations.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },
}

impl PersistError {
    /// Whether the stored document exists but could not be understood.
    pub fn is_malformed(&self) -> bool {
        matches!(self, PersistError::Json(_))
    }
}

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Everything that is durably stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// Format version for compatibility checking.
    #[serde(default = "default_version")]
    pub version: u32,

    /// All stories in creation order.
    #[serde(default)]
    pub stories: Vec<Story>,

    /// The selected story, `None` only when `stories` is empty.
    #[serde(default)]
    pub active_story_id: Option<StoryId>,
}

fn default_version() -> u32 {
    SNAPSHOT_VERSION
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            stories: Vec::new(),
            active_story_id: None,
        }
    }
}

impl Snapshot {
    /// Parse a snapshot document, refusing other format versions.
    pub fn from_json(content: &str) -> Result<Self, PersistError> {
        // Check the version before the full parse so a newer layout
        // reports a mismatch instead of looking malformed.
        #[derive(Deserialize)]
        struct Partial {
            #[serde(default = "default_version")]
            version: u32,
        }

        let partial: Partial = serde_json::from_str(content)?;
        if partial.version != SNAPSHOT_VERSION {
            return Err(PersistError::VersionMismatch {
                expected: SNAPSHOT_VERSION,
                found: partial.version,
            });
        }

        Ok(serde_json::from_str(content)?)
    }

    pub fn to_json(&self) -> Result<String, PersistError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Port through which the store reads and writes its durable snapshot.
pub trait SnapshotStore: Send + Sync {
    /// Read the stored snapshot, `Ok(None)` if nothing has been written yet.
    fn read(&self) -> Result<Option<Snapshot>, PersistError>;

    /// Replace the stored snapshot as a single atomic step.
    fn write(&self, snapshot: &Snapshot) -> Result<(), PersistError>;
}

/// Snapshot kept in a JSON file on disk.
#[derive(Debug, Clone)]
pub struct JsonFileSnapshot {
    path: PathBuf,
}

impl JsonFileSnapshot {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "stories.json".to_string());
        self.path
            .with_file_name(format!(".{file_name}.{}.tmp", Uuid::new_v4().simple()))
    }
}

impl SnapshotStore for JsonFileSnapshot {
    fn read(&self) -> Result<Option<Snapshot>, PersistError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        Snapshot::from_json(&content).map(Some)
    }

    fn write(&self, snapshot: &Snapshot) -> Result<(), PersistError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let content = snapshot.to_json()?;
        let temp_path = self.temp_path();

        let result = (|| -> Result<(), io::Error> {
            let mut file = fs::File::create(&temp_path)?;
            file.write_all(content.as_bytes())?;
            file.sync_all()?;
            fs::rename(&temp_path, &self.path)
        })();

        if let Err(e) = result {
            let _ = fs::remove_file(&temp_path);
            return Err(e.into());
        }

        debug!(
            path = %self.path.display(),
            stories = snapshot.stories.len(),
            "wrote snapshot"
        );
        Ok(())
    }
}
