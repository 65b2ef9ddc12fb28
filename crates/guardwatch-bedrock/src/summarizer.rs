// Summarizer
// Orchestrates: Prompt composition -> Request encoding -> Model invocation -> Reply extraction

use guardwatch_core::{CloudWatchAlarmPayload, ModelInvocationLog, SUMMARY_MODEL_ID};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::chat::{ChatRequest, ChatResponse, InferenceConfig};
use crate::error::BedrockError;
use crate::invoker::ModelInvoker;
use crate::prompt::{PromptComposer, SYSTEM_PROMPT};

/// Which model writes the summary and how
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSettings {
    #[serde(default = "default_model_id")]
    pub model_id: String,

    #[serde(default)]
    pub max_tokens: Option<u32>,

    #[serde(default)]
    pub temperature: Option<f32>,
}

fn default_model_id() -> String {
    SUMMARY_MODEL_ID.to_string()
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            model_id: default_model_id(),
            max_tokens: None,
            temperature: None,
        }
    }
}

impl ModelSettings {
    fn inference(&self) -> InferenceConfig {
        InferenceConfig {
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        }
    }
}

pub struct Summarizer<'a> {
    composer: &'a PromptComposer,
    invoker: &'a dyn ModelInvoker,
    settings: &'a ModelSettings,
}

impl<'a> Summarizer<'a> {
    pub fn new(
        composer: &'a PromptComposer,
        invoker: &'a dyn ModelInvoker,
        settings: &'a ModelSettings,
    ) -> Self {
        Self {
            composer,
            invoker,
            settings,
        }
    }

    /// Build the request for an alarm without sending it
    pub fn build_request(
        &self,
        alarm: &CloudWatchAlarmPayload,
        events: &[ModelInvocationLog],
    ) -> Result<ChatRequest, BedrockError> {
        let prompt = self.composer.render(alarm, events)?;
        debug!(prompt_len = prompt.len(), events = events.len(), "Prompt composed");
        Ok(ChatRequest::single_turn(SYSTEM_PROMPT, &prompt).with_inference(self.settings.inference()))
    }

    /// Ask the model for a human-readable summary of the alarm and its records
    pub async fn summarize(
        &self,
        alarm: &CloudWatchAlarmPayload,
        events: &[ModelInvocationLog],
    ) -> Result<String, BedrockError> {
        let request = self.build_request(alarm, events)?;
        let body = serde_json::to_vec(&request).map_err(BedrockError::RequestEncoding)?;

        let reply = self.invoker.invoke(&self.settings.model_id, body).await?;
        info!(
            model_id = %self.settings.model_id,
            provider = self.invoker.provider(),
            bytes = reply.len(),
            "Model replied"
        );

        parse_summary(&reply)
    }
}

/// Extract the summary text from a raw chat-completion reply
pub fn parse_summary(body: &[u8]) -> Result<String, BedrockError> {
    let response: ChatResponse =
        serde_json::from_slice(body).map_err(BedrockError::ResponseDecoding)?;
    response.first_text().map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_summary() {
        let body = br#"{
            "output": {"message": {"role": "assistant", "content": [{"text": "summary text"}]}},
            "stopReason": "end_turn",
            "usage": {"inputTokens": 812, "outputTokens": 96, "totalTokens": 908}
        }"#;
        assert_eq!(parse_summary(body).unwrap(), "summary text");
    }

    #[test]
    fn test_parse_summary_takes_first_segment() {
        let body = br#"{"output": {"message": {"role": "assistant", "content": [{"text": "one"}, {"text": "two"}]}}}"#;
        assert_eq!(parse_summary(body).unwrap(), "one");
    }

    #[test]
    fn test_parse_summary_invalid_json() {
        assert!(matches!(
            parse_summary(b"<html>bad gateway</html>"),
            Err(BedrockError::ResponseDecoding(_))
        ));
    }

    #[test]
    fn test_settings_defaults() {
        let settings = ModelSettings::default();
        assert_eq!(settings.model_id, "us.amazon.nova-pro-v1:0");
        assert_eq!(settings.inference(), InferenceConfig::default());
    }
}
