// Chat request/response bodies for Bedrock InvokeModel (Nova messages schema)

use serde::{Deserialize, Serialize};

use crate::error::BedrockError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One content segment of a message.
///
/// Text is the only kind this crate produces or reads. Anything else the
/// model sends back (images, tool use, reasoning) lands in `Other`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContentBlock {
    Text { text: String },
    Other(serde_json::Map<String, serde_json::Value>),
}

impl ContentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        ContentBlock::Text { text: text.into() }
    }

    /// Name of the content kind, e.g. `text` or `image`
    pub fn kind(&self) -> &str {
        match self {
            ContentBlock::Text { .. } => "text",
            ContentBlock::Other(fields) => fields.keys().next().map(String::as_str).unwrap_or("unknown"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    #[serde(default)]
    pub content: Vec<ContentBlock>,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: vec![ContentBlock::text(text)],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InferenceConfig {
    #[serde(rename = "max_new_tokens", skip_serializing_if = "Option::is_none", default)]
    pub max_tokens: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub temperature: Option<f32>,
}

impl InferenceConfig {
    fn is_empty(&self) -> bool {
        self.max_tokens.is_none() && self.temperature.is_none()
    }
}

/// Stateless single exchange: system instruction plus user turns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub system: Vec<ContentBlock>,

    pub messages: Vec<ChatMessage>,

    #[serde(rename = "inferenceConfig", skip_serializing_if = "Option::is_none", default)]
    pub inference_config: Option<InferenceConfig>,
}

impl ChatRequest {
    /// System instruction plus exactly one user turn
    pub fn single_turn(system: &str, prompt: &str) -> Self {
        Self {
            system: vec![ContentBlock::text(system)],
            messages: vec![ChatMessage::user(prompt)],
            inference_config: None,
        }
    }

    pub fn with_inference(mut self, config: InferenceConfig) -> Self {
        self.inference_config = (!config.is_empty()).then_some(config);
        self
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub output: ChatOutput,

    #[serde(rename = "stopReason", default)]
    pub stop_reason: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatOutput {
    #[serde(default)]
    pub message: Option<ChatMessage>,
}

impl ChatResponse {
    /// First content segment of the reply, which must be text
    pub fn first_text(&self) -> Result<&str, BedrockError> {
        let block = self
            .output
            .message
            .as_ref()
            .and_then(|message| message.content.first())
            .ok_or(BedrockError::EmptyResponse)?;

        match block {
            ContentBlock::Text { text } => Ok(text.as_str()),
            other @ ContentBlock::Other(_) => {
                Err(BedrockError::UnsupportedContent(other.kind().to_string()))
            }
        }
    }
}
