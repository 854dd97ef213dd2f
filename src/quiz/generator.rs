//! Adapters for the external text-generation services that write the analysis.
//!
//! Both adapters make exactly one request per call. Retries, rate limiting and
//! fallbacks are not their concern; `HeroAnalyst` absorbs every error they return.

use std::sync::Arc;

use async_trait::async_trait;
use chatgpt::{client::ChatGPT, config::ChatGPTEngine};
use chatgpt::types::CompletionResponse;
use reqwest::StatusCode;
use serde_json::{json, Value};
use thiserror::Error;

use crate::config::{Config, Provider};

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("ChatGPT error: {0}")]
    ChatGpt(#[from] chatgpt::err::Error),

    #[error("Analysis service responded with {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Analysis service error: {0}")]
    Service(String),

    #[error("Analysis service returned no text")]
    EmptyReply,

    #[error("Malformed analysis reply: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Analysis reply is not a JSON object")]
    NotAnObject,

    #[error("Analysis reply has no analysis text")]
    MissingAnalysis,
}

/// A prompt plus the JSON shape the reply must follow.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub prompt: String,
    pub response_schema: Value,
}

#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Returns the raw reply text, untrimmed and unparsed.
    async fn generate(&self, request: &GenerationRequest) -> Result<String, AnalysisError>;
}

pub fn generator_from_config(config: &Config) -> Result<Arc<dyn TextGenerator>, AnalysisError> {
    let generator: Arc<dyn TextGenerator> = match config.provider {
        Provider::Gemini => Arc::new(GeminiGenerator::new(config)?),
        Provider::ChatGpt => Arc::new(ChatGptGenerator::new(config)?),
    };
    log::info!(
        "Analysis service: {:?} with model {}",
        config.provider,
        config.model
    );
    Ok(generator)
}

pub struct GeminiGenerator {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl GeminiGenerator {
    pub fn new(config: &Config) -> Result<Self, AnalysisError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/{}:generateContent", GEMINI_API_BASE, self.model)
    }

    pub fn request_body(request: &GenerationRequest) -> Value {
        json!({
            "contents": [
                { "parts": [ { "text": request.prompt } ] }
            ],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": request.response_schema,
            }
        })
    }
}

#[async_trait]
impl TextGenerator for GeminiGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, AnalysisError> {
        log::debug!("Sending analysis request to Gemini model {}", self.model);

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&Self::request_body(request))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        read_gemini_reply(status, &body)
    }
}

const MAX_ERROR_BODY_CHARS: usize = 500;

/// Turns a raw `generateContent` HTTP response into the reply text.
pub fn read_gemini_reply(status: StatusCode, body: &str) -> Result<String, AnalysisError> {
    if !status.is_success() {
        return Err(AnalysisError::Status {
            status: status.as_u16(),
            body: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
        });
    }

    let json: Value = serde_json::from_str(body)?;
    extract_gemini_text(&json)
}

/// Joins the text parts of the first candidate.
pub fn extract_gemini_text(json: &Value) -> Result<String, AnalysisError> {
    if let Some(error) = json.get("error") {
        let message = error
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or("Unknown Gemini API error");
        return Err(AnalysisError::Service(message.to_string()));
    }

    let parts = json
        .pointer("/candidates/0/content/parts")
        .and_then(|p| p.as_array())
        .ok_or(AnalysisError::EmptyReply)?;

    let text = parts
        .iter()
        .filter_map(|part| part.get("text").and_then(|t| t.as_str()))
        .collect::<String>();

    if text.is_empty() {
        return Err(AnalysisError::EmptyReply);
    }
    Ok(text)
}

pub struct ChatGptGenerator {
    chat_gpt: ChatGPT,
}

impl ChatGptGenerator {
    pub fn new(config: &Config) -> Result<Self, AnalysisError> {
        let mut chat_gpt = ChatGPT::new(config.api_key.clone())?;

        chat_gpt.config.engine = engine_for(&config.model);
        if let Some(timeout) = config.timeout {
            chat_gpt.config.timeout = timeout;
        }

        Ok(Self { chat_gpt })
    }

    // The chat API takes no schema, so it travels inside the prompt.
    pub fn prompt_with_schema(request: &GenerationRequest) -> String {
        format!("{}\n{}", request.prompt, request.response_schema)
    }
}

fn engine_for(model: &str) -> ChatGPTEngine {
    if model.starts_with("gpt-4") {
        return ChatGPTEngine::Gpt4;
    }
    if model != "gpt-3.5-turbo" {
        log::warn!("Unsupported ChatGPT model {:?}, using gpt-3.5-turbo", model);
    }
    ChatGPTEngine::Gpt35Turbo
}

#[async_trait]
impl TextGenerator for ChatGptGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, AnalysisError> {
        log::debug!("Sending analysis request to ChatGPT");

        let response: CompletionResponse = self
            .chat_gpt
            .send_message(Self::prompt_with_schema(request))
            .await?;
        let content = response.message().clone().content;

        if content.is_empty() {
            return Err(AnalysisError::EmptyReply);
        }
        Ok(content)
    }
}
