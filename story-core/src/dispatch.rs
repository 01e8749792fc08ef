//! Generation requests against the remote completion service.

use crate::context::assemble;
use crate::story::{LogEntry, Prompt, Story};
use async_trait::async_trait;
use chat::{ChatClient, Message, Request, Response};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

/// Errors from a generation call.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Chat API error: {0}")]
    Api(#[from] chat::Error),

    #[error("Service returned no choices")]
    NoChoices,

    #[error("First choice has no text content")]
    MissingContent,
}

/// A remote service that completes a conversation.
#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn complete(&self, messages: Vec<Message>) -> Result<Response, ServiceError>;
}

/// Sampling settings applied to every request.
#[derive(Debug, Clone, Default)]
pub struct GenerationSettings {
    /// Overrides the client's default model.
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<usize>,
}

/// [`CompletionService`] backed by the chat completions client.
#[derive(Clone)]
pub struct ChatService {
    client: ChatClient,
    settings: GenerationSettings,
}

impl ChatService {
    pub fn new(client: ChatClient, settings: GenerationSettings) -> Self {
        Self { client, settings }
    }
}

#[async_trait]
impl CompletionService for ChatService {
    async fn complete(&self, messages: Vec<Message>) -> Result<Response, ServiceError> {
        let mut request = Request::new(messages);
        if let Some(model) = &self.settings.model {
            request = request.with_model(model.clone());
        }
        if let Some(temperature) = self.settings.temperature {
            request = request.with_temperature(temperature);
        }
        if let Some(max_tokens) = self.settings.max_tokens {
            request = request.with_max_tokens(max_tokens);
        }

        Ok(self.client.complete(request).await?)
    }
}

/// Performs one generation call and turns the reply into a log entry.
///
/// The dispatcher never touches the store; the caller appends the entry.
#[derive(Clone)]
pub struct RequestDispatcher {
    service: Arc<dyn CompletionService>,
}

impl RequestDispatcher {
    pub fn new(service: Arc<dyn CompletionService>) -> Self {
        Self { service }
    }

    /// Send `messages` and build an entry for `prompt` from the first choice.
    pub async fn dispatch(
        &self,
        messages: Vec<Message>,
        prompt: Prompt,
    ) -> Result<LogEntry, ServiceError> {
        let count = messages.len();
        let response = match self.service.complete(messages).await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "generation request failed");
                return Err(e);
            }
        };

        if response.choices.is_empty() {
            return Err(ServiceError::NoChoices);
        }
        let text = response.first_text().ok_or(ServiceError::MissingContent)?;

        let entry = LogEntry::new(prompt, text.trim());
        debug!(entry = %entry.id, messages = count, "generation succeeded");
        Ok(entry)
    }

    /// Assemble the context for `story` and dispatch it.
    pub async fn generate(&self, story: &Story, prompt: Prompt) -> Result<LogEntry, ServiceError> {
        let messages = assemble(story, &prompt);
        self.dispatch(messages, prompt).await
    }
}
