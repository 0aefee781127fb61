//! Briefing backend
//!
//! Analyst briefings come from an OpenAI chat completion. The backend owns
//! the analyst persona (system prompt, temperature and token budget) and
//! maps each analysis tier to the chat model serving it, so callers only
//! hand over the tier and the indicator prompt.

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequest,
        CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::{resolve_backend_model, Persona};

/// Briefing backend errors
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("OpenAI request failed: {0}")]
    Api(#[from] OpenAIError),

    #[error("missing OpenAI API key")]
    MissingKey,

    #[error("model returned an empty briefing")]
    EmptyResponse,
}

/// A briefing written by a backend
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub text: String,
    /// Chat model that served the request
    pub backend_model: String,
}

/// Writes briefings for an analysis tier
#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// Complete the indicator prompt at the given analysis tier
    async fn complete(&self, tier: &str, prompt: &str) -> Result<Completion, LlmError>;

    /// Provider name for logs
    fn provider(&self) -> &str;
}

/// Thread-safe reference to a briefing backend
pub type SharedBackend = Arc<dyn LlmBackend>;

/// OpenAI chat backend speaking as the analyst persona
pub struct OpenAIBackend {
    client: Client<OpenAIConfig>,
    system_prompt: String,
    temperature: f32,
    max_tokens: u32,
}

impl OpenAIBackend {
    pub fn new(api_key: &str, persona: &Persona) -> Result<Self, LlmError> {
        if api_key.trim().is_empty() {
            return Err(LlmError::MissingKey);
        }

        let config = OpenAIConfig::new().with_api_key(api_key);

        Ok(Self {
            client: Client::with_config(config),
            system_prompt: persona.system_prompt().to_string(),
            temperature: persona.prompt.temperature,
            max_tokens: persona.output.max_tokens,
        })
    }

    /// Shared backend, or `None` without a key
    pub fn shared(api_key: Option<&str>, persona: &Persona) -> Result<Option<SharedBackend>, LlmError> {
        match api_key {
            Some(key) => Ok(Some(Arc::new(Self::new(key, persona)?))),
            None => Ok(None),
        }
    }

    /// Chat request for `prompt` on the model serving `tier`
    fn request(&self, tier: &str, prompt: &str) -> Result<CreateChatCompletionRequest, LlmError> {
        let messages = vec![
            ChatCompletionRequestMessage::System(
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(self.system_prompt.as_str())
                    .build()?,
            ),
            ChatCompletionRequestMessage::User(
                ChatCompletionRequestUserMessageArgs::default()
                    .content(prompt)
                    .build()?,
            ),
        ];

        Ok(CreateChatCompletionRequestArgs::default()
            .model(resolve_backend_model(tier))
            .messages(messages)
            .temperature(self.temperature)
            .max_tokens(self.max_tokens)
            .build()?)
    }
}

#[async_trait]
impl LlmBackend for OpenAIBackend {
    async fn complete(&self, tier: &str, prompt: &str) -> Result<Completion, LlmError> {
        let request = self.request(tier, prompt)?;
        let backend_model = request.model.clone();
        debug!("Requesting briefing for tier {} from {}", tier, backend_model);

        let response = self.client.chat().create(request).await?;

        let text = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|text| !text.trim().is_empty())
            .ok_or(LlmError::EmptyResponse)?;

        Ok(Completion { text, backend_model })
    }

    fn provider(&self) -> &str {
        "OpenAI"
    }
}
