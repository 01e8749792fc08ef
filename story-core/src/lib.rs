//! Story log engine for AI-assisted tabletop prompt generation.
//!
//! This crate provides:
//! - A persisted collection of stories, each an append-only log of
//!   generated snippets
//! - Context assembly that replays a story's full history on every request
//! - Dispatch of generation requests to a chat completions service
//! - A session facade that serializes requests per story
//!
//! # Quick Start
//!
//! ```ignore
//! use story_core::{LoadState, Prompt, StorySession};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let (session, state) = StorySession::from_env()?;
//!     if state == LoadState::Empty {
//!         session.create_story("Ruins", "Gothic Horror", "D&D 5e").await?;
//!     }
//!
//!     let entry = session
//!         .generate_active(Prompt::generate_with_keywords("Tavern", "smoky, haunted"))
//!         .await?;
//!     println!("{}", entry.response);
//!     Ok(())
//! }
//! ```

pub mod catalog;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod id;
pub mod persist;
pub mod session;
pub mod store;
pub mod story;
pub mod testing;

// Primary public API
pub use catalog::PromptCatalog;
pub use config::StoryConfig;
pub use dispatch::{ChatService, CompletionService, GenerationSettings, RequestDispatcher, ServiceError};
pub use id::{EntryId, StoryId};
pub use persist::{JsonFileSnapshot, PersistError, Snapshot, SnapshotStore};
pub use session::{SessionError, StorySession};
pub use store::{LoadState, StoreError, StoryStore};
pub use story::{LogEntry, Prompt, Story};
pub use testing::{MemorySnapshot, MockResponse, MockService};
