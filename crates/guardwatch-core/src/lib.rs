//! Core types for guardrail alarm summarization
//! this crate contains the shared data structures used across all components.
pub mod alarm;
pub mod invocation;
pub mod window;

pub use alarm::{
    alarm_from_event, decode_alarm, first_message, parse_state_change_time, state_changed_at,
};
pub use aws_lambda_events::sns::{CloudWatchAlarmPayload, SnsEvent};
pub use invocation::{
    decode_intervened, ChatTurn, InputBody, InvocationInput, InvocationOutput, ModelInvocationLog,
    OutputBody, TextSegment,
};
pub use window::TimeWindow;

use thiserror::Error;

// FIXED IDENTIFIERS //

/// CloudWatch log group that receives Bedrock model invocation logs
pub const LOG_GROUP: &str = "bedrock";

/// Log stream inside [`LOG_GROUP`] holding the invocation records
pub const LOG_STREAM: &str = "aws/bedrock/modelinvocations";

/// Chat model used to write incident summaries (cross-region inference profile)
pub const SUMMARY_MODEL_ID: &str = "us.amazon.nova-pro-v1:0";

/// Chat model exercised by the guardrail probe tool
pub const PROBE_MODEL_ID: &str = "anthropic.claude-3-haiku-20240307-v1:0";

/// Stop reason written by Bedrock when a guardrail blocks the invocation
pub const GUARDRAIL_INTERVENED: &str = "guardrail_intervened";

/// Guardrail version provisioned by the infrastructure stack
pub const GUARDRAIL_VERSION: &str = "1";

/// Half-width of the fetch window around an alarm, in minutes
pub const FETCH_WINDOW_MINUTES: i64 = 5;

/// Half-width of the window used by the log inspection tool, in minutes
pub const DIAGNOSTIC_WINDOW_MINUTES: i64 = 20;

/// Maximum number of log events pulled per query
pub const FETCH_LIMIT: i32 = 5;

/// Deadline wrapped around a single log query, in seconds
pub const QUERY_TIMEOUT_SECONDS: u64 = 5 * 60;

/// Shared AWS profile used by the diagnostic tools
pub const DEFAULT_PROFILE: &str = "bedrock-guardrails-cw-metrics";

/// Region used by the diagnostic tools when nothing else is configured
pub const DEFAULT_REGION: &str = "us-west-2";

// ERRORS //

/// Errors raised while decoding alarm payloads and invocation records
#[derive(Error, Debug)]
pub enum RecordError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("notification envelope has no records")]
    EmptyEnvelope,

    #[error("unable to parse StateChangeTime '{value}': {source}")]
    Timestamp {
        value: String,
        #[source]
        source: chrono::ParseError,
    },
}
