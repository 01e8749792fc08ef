//! Test doubles for the story engine.
//!
//! - `MockService` returns scripted completions without network calls
//! - `MemorySnapshot` keeps the durable snapshot in memory and can be told
//!   to fail writes

use crate::dispatch::{CompletionService, ServiceError};
use crate::persist::{PersistError, Snapshot, SnapshotStore};
use async_trait::async_trait;
use chat::{Choice, Message, Response};
use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// A scripted reply from the mock service.
#[derive(Debug)]
pub enum MockResponse {
    /// A response whose choices carry these contents (`None` = no text).
    Choices(Vec<Option<String>>),
    /// The call fails with this client error.
    Error(chat::Error),
}

impl MockResponse {
    /// A single-choice response.
    pub fn text(text: impl Into<String>) -> Self {
        MockResponse::Choices(vec![Some(text.into())])
    }

    pub fn choices(texts: Vec<&str>) -> Self {
        MockResponse::Choices(texts.into_iter().map(|t| Some(t.to_string())).collect())
    }

    /// A single choice with no text content.
    pub fn no_content() -> Self {
        MockResponse::Choices(vec![None])
    }

    pub fn error(error: chat::Error) -> Self {
        MockResponse::Error(error)
    }
}

#[derive(Default)]
struct MockState {
    responses: VecDeque<MockResponse>,
    calls: Vec<Vec<Message>>,
}

/// A completion service that replays scripted responses in order.
///
/// Clones share their script and call log.
#[derive(Clone, Default)]
pub struct MockService {
    state: Arc<Mutex<MockState>>,
    delay: Option<Duration>,
}

impl MockService {
    pub fn new(responses: Vec<MockResponse>) -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState {
                responses: responses.into(),
                calls: Vec::new(),
            })),
            delay: None,
        }
    }

    /// Sleep this long inside every call, to keep requests in flight.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn queue_response(&self, response: MockResponse) {
        lock(&self.state).responses.push_back(response);
    }

    /// Every message sequence received so far, in call order.
    pub fn calls(&self) -> Vec<Vec<Message>> {
        lock(&self.state).calls.clone()
    }
}

#[async_trait]
impl CompletionService for MockService {
    async fn complete(&self, messages: Vec<Message>) -> Result<Response, ServiceError> {
        let next = {
            let mut state = lock(&self.state);
            state.calls.push(messages);
            state.responses.pop_front()
        };

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let contents = match next {
            Some(MockResponse::Choices(contents)) => contents,
            Some(MockResponse::Error(e)) => return Err(e.into()),
            None => vec![Some("The mock service has no more scripted responses.".to_string())],
        };

        Ok(Response {
            id: None,
            model: None,
            choices: contents
                .into_iter()
                .map(|content| Choice {
                    content,
                    finish_reason: Some("stop".to_string()),
                })
                .collect(),
            usage: None,
        })
    }
}

#[derive(Default)]
struct MemoryState {
    snapshot: Option<Snapshot>,
    fail_writes: bool,
    writes: usize,
}

/// In-memory [`SnapshotStore`]. Clones share the same storage.
#[derive(Clone, Default)]
pub struct MemorySnapshot {
    state: Arc<Mutex<MemoryState>>,
}

impl MemorySnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with an already-stored snapshot.
    pub fn with_snapshot(snapshot: Snapshot) -> Self {
        let store = Self::new();
        lock(&store.state).snapshot = Some(snapshot);
        store
    }

    /// Make subsequent writes fail with an IO error.
    pub fn fail_writes(&self, fail: bool) {
        lock(&self.state).fail_writes = fail;
    }

    /// The last successfully written snapshot.
    pub fn stored(&self) -> Option<Snapshot> {
        lock(&self.state).snapshot.clone()
    }

    pub fn write_count(&self) -> usize {
        lock(&self.state).writes
    }
}

impl SnapshotStore for MemorySnapshot {
    fn read(&self) -> Result<Option<Snapshot>, PersistError> {
        Ok(lock(&self.state).snapshot.clone())
    }

    fn write(&self, snapshot: &Snapshot) -> Result<(), PersistError> {
        let mut state = lock(&self.state);
        if state.fail_writes {
            return Err(io::Error::other("simulated write failure").into());
        }
        state.snapshot = Some(snapshot.clone());
        state.writes += 1;
        Ok(())
    }
}
