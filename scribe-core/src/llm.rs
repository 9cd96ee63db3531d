//! Transformation gateway: rewrites a draft session note into ABA-style
//! clinical documentation through a chat-completions API.
//!
//! One request per call. Failures are returned to the caller as
//! [`TransformationError`]; there is no retry and no fallback text, so a draft
//! is never passed off as a generated note.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::LlmConfig;

pub const SYSTEM_PROMPT: &str = "You are an experienced clinical therapist.";

// ============================================================================
// NoteGenerator trait
// ============================================================================

/// Abstraction over text-generation providers.
#[async_trait]
pub trait NoteGenerator: Send + Sync {
    /// Rewrite `draft_note` as a clinical note. The draft is embedded verbatim.
    async fn transform(&self, draft_note: &str) -> Result<String, TransformationError>;

    /// Provider name for logging.
    fn name(&self) -> &str;
}

// ============================================================================
// Error types
// ============================================================================

#[derive(Error, Debug)]
pub enum TransformationError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({code}): {message}")]
    Api { code: u16, message: String },

    #[error("Completion response contained no text")]
    EmptyCompletion,

    #[error("Missing API key")]
    MissingApiKey,
}

// ============================================================================
// Config
// ============================================================================

#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout_seconds: u64,
}

impl GeneratorConfig {
    pub fn new(api_key: impl Into<String>, llm: &LlmConfig) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: llm.base_url.trim_end_matches('/').to_string(),
            model: llm.model.clone(),
            max_tokens: llm.max_tokens,
            temperature: llm.temperature,
            timeout_seconds: llm.timeout_seconds,
        }
    }
}

/// The user message sent for every transformation.
pub fn build_prompt(draft_note: &str) -> String {
    format!(
        "You are an experienced clinical therapist. Transform the following draft session note \
         into a professional clinical note written in ABA (Applied Behavior Analysis) style.\n\n\
         Formatting rules:\n\
         - Write a single coherent paragraph.\n\
         - Use objective, professional clinical language.\n\
         - Do not include date, time, or signature fields.\n\
         - Keep the language clear, concise, and accurate for clinical documentation.\n\n\
         Draft note:\n{}",
        draft_note
    )
}

// ============================================================================
// Chat-completions API structs (private)
// ============================================================================

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: Option<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

// ============================================================================
// OpenAiNoteGenerator
// ============================================================================

/// OpenAI-compatible chat-completions client.
#[derive(Debug, Clone)]
pub struct OpenAiNoteGenerator {
    client: Client,
    config: GeneratorConfig,
}

impl OpenAiNoteGenerator {
    pub fn new(config: GeneratorConfig) -> Result<Self, TransformationError> {
        if config.api_key.trim().is_empty() {
            return Err(TransformationError::MissingApiKey);
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self { client, config })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }
}

#[async_trait]
impl NoteGenerator for OpenAiNoteGenerator {
    async fn transform(&self, draft_note: &str) -> Result<String, TransformationError> {
        let url = format!("{}/chat/completions", self.config.base_url);

        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: build_prompt(draft_note),
                },
            ],
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();

        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorResponse>(&error_body)
                .ok()
                .and_then(|e| e.error)
                .map(|e| e.message)
                .unwrap_or(error_body);

            tracing::debug!(code = status.as_u16(), message = %message, "Chat-completions API error");

            return Err(TransformationError::Api {
                code: status.as_u16(),
                message,
            });
        }

        let chat_response: ChatResponse = response.json().await?;

        chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|text| !text.trim().is_empty())
            .ok_or(TransformationError::EmptyCompletion)
    }

    fn name(&self) -> &str {
        "openai"
    }
}

// ============================================================================
// TESTS
// ============================================================================
