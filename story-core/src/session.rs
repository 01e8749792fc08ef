//! StorySession - the primary public API for story generation.
//!
//! This module wraps the [`StoryStore`], the context assembler and the
//! [`RequestDispatcher`] into a single handle that front ends share.
//! Generation requests for the same story run one at a time, so every
//! context includes the entries appended before it.

use crate::catalog::{CatalogError, PromptCatalog};
use crate::config::{ConfigError, StoryConfig};
use crate::context::assemble;
use crate::dispatch::{ChatService, CompletionService, RequestDispatcher, ServiceError};
use crate::id::{EntryId, StoryId};
use crate::persist::{JsonFileSnapshot, Snapshot};
use crate::store::{LoadState, StoreError, StoryStore};
use crate::story::{LogEntry, Prompt, Story};
use chat::ChatClient;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Errors from StorySession operations.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Service error: {0}")]
    Service(#[from] ServiceError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("No active story - create one first")]
    NoActiveStory,

    #[error("No API key configured - set OPENAI_API_KEY environment variable")]
    NoApiKey,
}

/// A shared handle over the story collection and the generation service.
pub struct StorySession {
    store: Mutex<StoryStore>,
    gates: std::sync::Mutex<HashMap<StoryId, Arc<Mutex<()>>>>,
    dispatcher: RequestDispatcher,
    catalog: PromptCatalog,
}

impl StorySession {
    /// Wrap an already loaded store.
    pub fn new(store: StoryStore, service: Arc<dyn CompletionService>) -> Self {
        Self {
            store: Mutex::new(store),
            gates: std::sync::Mutex::new(HashMap::new()),
            dispatcher: RequestDispatcher::new(service),
            catalog: PromptCatalog::default(),
        }
    }

    /// Load the snapshot named by `config` and attach `service`.
    pub fn open(
        config: &StoryConfig,
        service: Arc<dyn CompletionService>,
    ) -> Result<(Self, LoadState), SessionError> {
        let (store, state) = StoryStore::load(JsonFileSnapshot::new(&config.data_path))?;
        let mut session = Self::new(store, service);

        if let Some(path) = &config.catalog_path {
            session.catalog = PromptCatalog::load(path)?;
        }

        info!(
            path = %config.data_path.display(),
            state = ?state,
            "opened story session"
        );
        Ok((session, state))
    }

    /// Open a session from `STORY_*` settings and the `OPENAI_API_KEY` client.
    pub fn from_env() -> Result<(Self, LoadState), SessionError> {
        let config = StoryConfig::from_env()?;
        let client = ChatClient::from_env().map_err(|_| SessionError::NoApiKey)?;
        let service = ChatService::new(client, config.generation_settings());
        Self::open(&config, Arc::new(service))
    }

    /// Generate a new entry for `story_id` and append it to the log.
    ///
    /// On any failure the store is left untouched. If the story is deleted
    /// while the request is in flight the response is discarded and a
    /// not-found error is returned.
    pub async fn generate(
        &self,
        story_id: StoryId,
        prompt: Prompt,
    ) -> Result<LogEntry, SessionError> {
        // Gates exist only for stored stories. delete_story drops them
        // while holding the store lock.
        let gate = {
            let store = self.store.lock().await;
            store.story(story_id)?;
            self.gate(story_id)
        };
        let _turn = gate.lock().await;

        let messages = {
            let store = self.store.lock().await;
            assemble(store.story(story_id)?, &prompt)
        };

        debug!(story = %story_id, messages = messages.len(), "dispatching generation");
        let entry = self.dispatcher.dispatch(messages, prompt).await?;

        self.store
            .lock()
            .await
            .append_entry(story_id, entry.clone())?;
        Ok(entry)
    }

    /// [`generate`](Self::generate) against the active story.
    pub async fn generate_active(&self, prompt: Prompt) -> Result<LogEntry, SessionError> {
        let story_id = self
            .store
            .lock()
            .await
            .active_id()
            .ok_or(SessionError::NoActiveStory)?;
        self.generate(story_id, prompt).await
    }

    pub async fn create_story(
        &self,
        title: impl Into<String>,
        theme: impl Into<String>,
        ruleset: impl Into<String>,
    ) -> Result<Story, SessionError> {
        Ok(self.store.lock().await.create(title, theme, ruleset)?)
    }

    pub async fn delete_story(&self, story_id: StoryId) -> Result<Story, SessionError> {
        let mut store = self.store.lock().await;
        let removed = store.delete(story_id)?;
        self.gates
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&story_id);
        Ok(removed)
    }

    pub async fn set_active(&self, story_id: StoryId) -> Result<(), SessionError> {
        Ok(self.store.lock().await.set_active(story_id)?)
    }

    pub async fn remove_entry(
        &self,
        story_id: StoryId,
        entry_id: EntryId,
    ) -> Result<LogEntry, SessionError> {
        Ok(self.store.lock().await.remove_entry(story_id, entry_id)?)
    }

    /// All stories in creation order.
    pub async fn stories(&self) -> Vec<Story> {
        self.store.lock().await.stories().to_vec()
    }

    pub async fn story(&self, story_id: StoryId) -> Result<Story, SessionError> {
        Ok(self.store.lock().await.story(story_id)?.clone())
    }

    pub async fn active_story(&self) -> Option<Story> {
        self.store.lock().await.active_story().cloned()
    }

    /// A consistent copy of everything that is persisted.
    pub async fn snapshot(&self) -> Snapshot {
        self.store.lock().await.snapshot().clone()
    }

    pub fn catalog(&self) -> &PromptCatalog {
        &self.catalog
    }

    pub fn with_catalog(mut self, catalog: PromptCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    fn gate(&self, story_id: StoryId) -> Arc<Mutex<()>> {
        self.gates
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entry(story_id)
            .or_default()
            .clone()
    }
}
