//! OpenAI-compatible chat completion client
//!
//! Serves OpenAI, Mistral and Qwen (DashScope compatible mode), which all
//! accept `POST {base}/chat/completions` with bearer auth.

use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::{ModelSettings, ProviderSettings};
use crate::credentials::Secret;
use crate::error::{Error, Result};

use super::http::{Auth, HttpEndpoint};
use super::{Capability, CapabilityKind};

// ─────────────────────────────────────────────────────────────────
// Request / Response
// ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CompletionRequest {
    pub messages: Vec<ChatMessage>,
    /// Overrides the client's configured temperature
    pub temperature: Option<f32>,
}

impl CompletionRequest {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self { messages, temperature: None }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Content of the system message, if any
    pub fn system_prompt(&self) -> Option<&str> {
        self.messages
            .iter()
            .find(|m| m.role == Role::System)
            .map(|m| m.content.as_str())
    }

    /// Content of the last user message, if any
    pub fn last_user_message(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

#[derive(Debug, Clone)]
pub struct Completion {
    pub content: String,
    pub model: String,
    pub finish_reason: Option<String>,
    pub usage: Option<TokenUsage>,
}

// ─────────────────────────────────────────────────────────────────
// Wire types
// ─────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ChatCompletionBody<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    model: Option<String>,
    choices: Vec<ChatChoice>,
    usage: Option<TokenUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

// ─────────────────────────────────────────────────────────────────
// Client
// ─────────────────────────────────────────────────────────────────

pub struct ChatCompletionClient {
    endpoint: HttpEndpoint,
    model: String,
    temperature: Option<f32>,
    total_tokens: RwLock<u64>,
}

impl ChatCompletionClient {
    pub fn new(provider: &ProviderSettings, model: &ModelSettings, api_key: &Secret) -> Result<Self> {
        let endpoint = HttpEndpoint::new(
            CapabilityKind::ModelCompletion,
            &provider.base_url,
            provider.timeout_secs,
            Auth::Bearer(api_key.clone()),
        )?;

        info!(
            provider = %model.provider,
            base_url = %endpoint.base_url(),
            model = %model.model,
            "Chat completion client created"
        );

        Ok(Self {
            endpoint,
            model: model.model.clone(),
            temperature: model.temperature,
            total_tokens: RwLock::new(0),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn total_tokens(&self) -> u64 {
        *self.total_tokens.read()
    }
}

#[async_trait]
impl Capability for ChatCompletionClient {
    type Request = CompletionRequest;
    type Response = Completion;

    fn kind(&self) -> CapabilityKind {
        CapabilityKind::ModelCompletion
    }

    fn describe(&self) -> String {
        format!("{} ({})", self.model, self.endpoint.base_url())
    }

    async fn invoke(&self, request: CompletionRequest) -> Result<Completion> {
        let body = ChatCompletionBody {
            model: &self.model,
            messages: &request.messages,
            temperature: request.temperature.or(self.temperature),
        };

        let url = self.endpoint.url("chat/completions");
        let builder = self.endpoint.request(Method::POST, &url).json(&body);
        let parsed: ChatCompletionResponse = self.endpoint.send_json(builder).await?;

        let choice = parsed.choices.into_iter().next().ok_or_else(|| {
            Error::malformed(CapabilityKind::ModelCompletion, "No choices in completion response")
        })?;

        let content = choice.message.content.ok_or_else(|| {
            Error::malformed(CapabilityKind::ModelCompletion, "Completion choice has no message content")
        })?;

        if let Some(ref usage) = parsed.usage {
            *self.total_tokens.write() += usage.total_tokens as u64;
        }

        debug!(
            model = %self.model,
            chars = content.len(),
            finish_reason = ?choice.finish_reason,
            "Completion received"
        );

        Ok(Completion {
            content,
            model: parsed.model.unwrap_or_else(|| self.model.clone()),
            finish_reason: choice.finish_reason,
            usage: parsed.usage,
        })
    }
}
