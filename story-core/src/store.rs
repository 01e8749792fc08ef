//! The authoritative, persisted story collection.

use crate::id::{EntryId, StoryId};
use crate::persist::{PersistError, Snapshot, SnapshotStore};
use crate::story::{LogEntry, Story};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors from store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Story not found: {0}")]
    StoryNotFound(StoryId),

    #[error("Entry {entry} not found in story {story}")]
    EntryNotFound { story: StoryId, entry: EntryId },

    #[error("Persistence error: {0}")]
    Persist(#[from] PersistError),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StoreError::StoryNotFound(_) | StoreError::EntryNotFound { .. }
        )
    }
}

/// What `load` found in durable storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    /// At least one story was restored.
    Restored,
    /// Nothing usable was stored; the caller should prompt for a first story.
    Empty,
}

/// Owns every story and the active selection.
///
/// Each mutation is applied to a copy of the current snapshot, written
/// through the [`SnapshotStore`], and only then adopted. A failed write
/// leaves the in-memory state exactly as it was.
pub struct StoryStore {
    state: Snapshot,
    backend: Box<dyn SnapshotStore>,
}

impl std::fmt::Debug for StoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoryStore")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl StoryStore {
    /// Reconstruct the store from its durable snapshot.
    ///
    /// A missing or malformed document yields an empty store. A stored
    /// active id that no longer resolves falls back to the first story.
    pub fn load(backend: impl SnapshotStore + 'static) -> Result<(Self, LoadState), StoreError> {
        let mut state = match backend.read() {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => Snapshot::default(),
            Err(e) if e.is_malformed() => {
                warn!(error = %e, "discarding malformed snapshot");
                Snapshot::default()
            }
            Err(e) => {
                warn!(error = %e, "snapshot could not be loaded");
                return Err(e.into());
            }
        };

        let resolves = state
            .active_story_id
            .is_some_and(|id| state.stories.iter().any(|s| s.id == id));
        if !resolves {
            state.active_story_id = state.stories.first().map(|s| s.id);
        }

        let load_state = if state.stories.is_empty() {
            LoadState::Empty
        } else {
            LoadState::Restored
        };

        info!(stories = state.stories.len(), "loaded story store");

        Ok((
            Self {
                state,
                backend: Box::new(backend),
            },
            load_state,
        ))
    }

    /// Create a story, make it active, and persist.
    pub fn create(
        &mut self,
        title: impl Into<String>,
        theme: impl Into<String>,
        ruleset: impl Into<String>,
    ) -> Result<Story, StoreError> {
        let story = Story::new(title, theme, ruleset);
        for (field, value) in [
            ("title", &story.title),
            ("theme", &story.theme),
            ("ruleset", &story.ruleset),
        ] {
            if value.trim().is_empty() {
                return Err(StoreError::Validation(format!("story {field} must not be empty")));
            }
        }

        let created = story.clone();
        self.commit(move |state| {
            state.active_story_id = Some(story.id);
            state.stories.push(story);
            Ok(())
        })?;

        debug!(story = %created.id, title = %created.title, "created story");
        Ok(created)
    }

    /// Remove a story. If it was active, the first remaining story becomes
    /// active, or the store becomes empty.
    pub fn delete(&mut self, story_id: StoryId) -> Result<Story, StoreError> {
        let removed = self.commit(|state| {
            let index = state
                .stories
                .iter()
                .position(|s| s.id == story_id)
                .ok_or(StoreError::StoryNotFound(story_id))?;
            let removed = state.stories.remove(index);

            if state.active_story_id == Some(story_id) {
                state.active_story_id = state.stories.first().map(|s| s.id);
            }
            Ok(removed)
        })?;

        debug!(story = %story_id, active = ?self.state.active_story_id, "deleted story");
        Ok(removed)
    }

    /// Append an entry to the end of a story's log.
    pub fn append_entry(&mut self, story_id: StoryId, entry: LogEntry) -> Result<(), StoreError> {
        let entry_id = entry.id;
        self.commit(|state| {
            let story = find_mut(state, story_id)?;
            if story.entry(entry.id).is_some() {
                return Err(StoreError::Validation(format!(
                    "entry {} already exists in story {story_id}",
                    entry.id
                )));
            }
            story.log.push(entry);
            Ok(())
        })?;

        debug!(story = %story_id, entry = %entry_id, "appended entry");
        Ok(())
    }

    /// Remove one entry, keeping the others in order.
    pub fn remove_entry(
        &mut self,
        story_id: StoryId,
        entry_id: EntryId,
    ) -> Result<LogEntry, StoreError> {
        self.commit(|state| {
            let story = find_mut(state, story_id)?;
            let index = story
                .log
                .iter()
                .position(|e| e.id == entry_id)
                .ok_or(StoreError::EntryNotFound {
                    story: story_id,
                    entry: entry_id,
                })?;
            Ok(story.log.remove(index))
        })
    }

    pub fn set_active(&mut self, story_id: StoryId) -> Result<(), StoreError> {
        self.commit(|state| {
            if !state.stories.iter().any(|s| s.id == story_id) {
                return Err(StoreError::StoryNotFound(story_id));
            }
            state.active_story_id = Some(story_id);
            Ok(())
        })
    }

    /// All stories in creation order.
    pub fn stories(&self) -> &[Story] {
        &self.state.stories
    }

    pub fn story(&self, story_id: StoryId) -> Result<&Story, StoreError> {
        self.state
            .stories
            .iter()
            .find(|s| s.id == story_id)
            .ok_or(StoreError::StoryNotFound(story_id))
    }

    /// The active story id, `None` exactly when the store is empty.
    pub fn active_id(&self) -> Option<StoryId> {
        self.state.active_story_id
    }

    pub fn active_story(&self) -> Option<&Story> {
        self.active_id().and_then(|id| self.story(id).ok())
    }

    pub fn is_empty(&self) -> bool {
        self.state.stories.is_empty()
    }

    /// The current in-memory snapshot.
    pub fn snapshot(&self) -> &Snapshot {
        &self.state
    }

    fn commit<T>(
        &mut self,
        op: impl FnOnce(&mut Snapshot) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut next = self.state.clone();
        let result = op(&mut next)?;
        self.backend.write(&next)?;
        self.state = next;
        Ok(result)
    }
}

fn find_mut(state: &mut Snapshot, story_id: StoryId) -> Result<&mut Story, StoreError> {
    state
        .stories
        .iter_mut()
        .find(|s| s.id == story_id)
        .ok_or(StoreError::StoryNotFound(story_id))
}
