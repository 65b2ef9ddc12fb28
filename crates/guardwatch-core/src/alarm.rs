//! CloudWatch alarm payloads delivered through SNS

use aws_lambda_events::sns::{CloudWatchAlarmPayload, SnsEvent};
use chrono::{DateTime, Utc};

use crate::RecordError;

/// Format of `StateChangeTime`, e.g. `2024-12-03T00:34:33.918+0000`.
/// Exactly three fraction digits are required.
pub const STATE_CHANGE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S.%3f%z";

/// Parse a CloudWatch `StateChangeTime` into a UTC instant
pub fn parse_state_change_time(value: &str) -> Result<DateTime<Utc>, RecordError> {
    DateTime::parse_from_str(value, STATE_CHANGE_TIME_FORMAT)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|source| RecordError::Timestamp {
            value: value.to_string(),
            source,
        })
}

/// State change instant of an alarm, when it carries a well-formed one
pub fn state_changed_at(alarm: &CloudWatchAlarmPayload) -> Result<DateTime<Utc>, RecordError> {
    parse_state_change_time(&alarm.state_change_time)
}

pub fn decode_alarm(message: &str) -> Result<CloudWatchAlarmPayload, RecordError> {
    Ok(serde_json::from_str(message)?)
}

/// Raw message of the first record (only one alarm is carried per notification)
pub fn first_message(event: &SnsEvent) -> Result<&str, RecordError> {
    event
        .records
        .first()
        .map(|record| record.sns.message.as_str())
        .ok_or(RecordError::EmptyEnvelope)
}

/// Decode the alarm embedded in the first record
pub fn alarm_from_event(event: &SnsEvent) -> Result<CloudWatchAlarmPayload, RecordError> {
    decode_alarm(first_message(event)?)
}
