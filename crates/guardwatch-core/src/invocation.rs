//! Typed view over a Bedrock model invocation log line
//!
//! Only the fields used for filtering and prompting are modelled. Everything
//! else in the log line is ignored. Missing and `null` fields fall back to
//! empty values so that partial records still decode.

use serde::{Deserialize, Deserializer, Serialize};

use crate::{RecordError, GUARDRAIL_INTERVENED};

// null decodes like an absent field
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// One invocation record as written to the `aws/bedrock/modelinvocations` stream
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelInvocationLog {
    #[serde(default)]
    pub timestamp: Option<String>,

    #[serde(default)]
    pub request_id: Option<String>,

    #[serde(default)]
    pub operation: Option<String>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub identity: Identity,

    #[serde(default, deserialize_with = "null_as_default")]
    pub region: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub model_id: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub input: InvocationInput,

    #[serde(default, deserialize_with = "null_as_default")]
    pub output: InvocationOutput,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    #[serde(default, deserialize_with = "null_as_default")]
    pub arn: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationInput {
    #[serde(default, deserialize_with = "null_as_default")]
    pub input_body_json: InputBody,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InputBody {
    #[serde(default, deserialize_with = "null_as_default")]
    pub messages: Vec<ChatTurn>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationOutput {
    #[serde(default, deserialize_with = "null_as_default")]
    pub output_body_json: OutputBody,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputBody {
    #[serde(default, deserialize_with = "null_as_default")]
    pub output: OutputMessage,

    #[serde(default, deserialize_with = "null_as_default")]
    pub stop_reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputMessage {
    #[serde(default, deserialize_with = "null_as_default")]
    pub message: ChatTurn,
}

/// A role plus its content segments (user prompt or model reply)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    #[serde(default, deserialize_with = "null_as_default")]
    pub role: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub content: Vec<TextSegment>,
}

impl ChatTurn {
    /// All text segments of the turn joined by newlines
    pub fn text(&self) -> String {
        self.content
            .iter()
            .map(|segment| segment.text.as_str())
            .filter(|text| !text.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

// non-text segments (images, guard content) decode with an empty text
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextSegment {
    #[serde(default, deserialize_with = "null_as_default")]
    pub text: String,
}

impl ModelInvocationLog {
    /// Decode a single raw log line
    pub fn from_json(line: &str) -> Result<Self, RecordError> {
        Ok(serde_json::from_str(line)?)
    }

    pub fn stop_reason(&self) -> &str {
        &self.output.output_body_json.stop_reason
    }

    /// True when a guardrail stopped this invocation
    pub fn is_guardrail_intervened(&self) -> bool {
        self.stop_reason() == GUARDRAIL_INTERVENED
    }

    pub fn input_turns(&self) -> &[ChatTurn] {
        &self.input.input_body_json.messages
    }

    pub fn output_turn(&self) -> &ChatTurn {
        &self.output.output_body_json.output.message
    }
}

/// Decode every line and keep only guardrail interventions, in input order.
///
/// A single undecodable line fails the whole batch.
pub fn decode_intervened<I, S>(lines: I) -> Result<Vec<ModelInvocationLog>, RecordError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut retained = Vec::new();
    for line in lines {
        let record = ModelInvocationLog::from_json(line.as_ref())?;
        if record.is_guardrail_intervened() {
            retained.push(record);
        }
    }
    Ok(retained)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLOCKED: &str = r#"{
        "schemaType": "ModelInvocationLog",
        "timestamp": "2024-12-03T00:33:12Z",
        "identity": {"arn": "arn:aws:sts::111111111111:assumed-role/app/session"},
        "region": "us-west-2",
        "requestId": "b6c1c7a2-1111-2222-3333-444455556666",
        "operation": "Converse",
        "modelId": "anthropic.claude-3-haiku-20240307-v1:0",
        "input": {"inputBodyJson": {"messages": [{"role": "user", "content": [{"text": "you are useless"}]}]}},
        "output": {"outputBodyJson": {
            "output": {"message": {"role": "assistant", "content": [{"text": "Sorry, I can not respond to this."}]}},
            "stopReason": "guardrail_intervened"
        }}
    }"#;

    const COMPLETED: &str = r#"{
        "region": "us-west-2",
        "modelId": "anthropic.claude-3-haiku-20240307-v1:0",
        "output": {"outputBodyJson": {"stopReason": "end_turn"}}
    }"#;

    #[test]
    fn test_decode_blocked_record() {
        let record = ModelInvocationLog::from_json(BLOCKED).unwrap();
        assert!(record.is_guardrail_intervened());
        assert_eq!(record.identity.arn, "arn:aws:sts::111111111111:assumed-role/app/session");
        assert_eq!(record.input_turns().len(), 1);
        assert_eq!(record.input_turns()[0].text(), "you are useless");
        assert_eq!(record.output_turn().role, "assistant");
        assert_eq!(record.operation.as_deref(), Some("Converse"));
    }

    #[test]
    fn test_missing_sections_default_to_empty() {
        let record = ModelInvocationLog::from_json(COMPLETED).unwrap();
        assert!(!record.is_guardrail_intervened());
        assert!(record.input_turns().is_empty());
        assert_eq!(record.output_turn().text(), "");
    }

    #[test]
    fn test_null_fields_default_to_empty() {
        let line = r#"{
            "modelId": "m",
            "identity": null,
            "region": null,
            "input": {"inputBodyJson": {"messages": [{"role": "user", "content": [{"text": null}, {"text": "kept"}]}]}},
            "output": {"outputBodyJson": {"output": null, "stopReason": "guardrail_intervened"}}
        }"#;
        let records = decode_intervened([COMPLETED, line]).unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].identity.arn, "");
        assert_eq!(records[0].region, "");
        assert_eq!(records[0].input_turns()[0].text(), "kept");
        assert_eq!(records[0].output_turn().text(), "");

        let record = ModelInvocationLog::from_json(
            r#"{"modelId": "m", "input": null, "output": {"outputBodyJson": null}}"#,
        )
        .unwrap();
        assert!(record.input_turns().is_empty());
        assert_eq!(record.stop_reason(), "");
    }

    #[test]
    fn test_decode_intervened_filters_mixed_batch() {
        let records = decode_intervened([COMPLETED, BLOCKED, COMPLETED]).unwrap();
        assert_eq!(records.len(), 1);
        assert!(records.iter().all(|r| r.stop_reason() == GUARDRAIL_INTERVENED));
    }

    #[test]
    fn test_decode_failure_fails_whole_batch() {
        let result = decode_intervened([BLOCKED, "not json"]);
        assert!(matches!(result, Err(RecordError::Json(_))));
    }

    #[test]
    fn test_turn_text_skips_non_text_segments() {
        let turn: ChatTurn = serde_json::from_str(
            r#"{"role": "user", "content": [{"text": "first"}, {"image": {"format": "png"}}, {"text": "second"}]}"#,
        )
        .unwrap();
        assert_eq!(turn.text(), "first\nsecond");
    }
}
