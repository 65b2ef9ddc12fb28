//! Alarm handler: the per-notification entry point.
//!
//! Every step is fail-soft. A failure is logged with its stage and reported
//! through [`HandlerOutcome::Failed`], never as an error, so the notification
//! trigger does not redeliver.

use std::fmt;

use guardwatch_bedrock::{BedrockError, PromptComposer, Summarizer};
use guardwatch_core::{
    alarm_from_event, first_message, state_changed_at, CloudWatchAlarmPayload, RecordError, SnsEvent,
};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::backend::AlarmBackend;
use crate::config::AlarmConfig;
use crate::fetcher::LogFetcher;

/// Step at which an invocation stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    DecodeNotification,
    FetchLogs,
    ClientInit,
    Summarize,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::DecodeNotification => "decode_notification",
            Stage::FetchLogs => "fetch_logs",
            Stage::ClientInit => "client_init",
            Stage::Summarize => "summarize",
        }
    }

    fn describe(&self) -> &'static str {
        match self {
            Stage::DecodeNotification => "unable to decode alarm notification",
            Stage::FetchLogs => "unable to retrieve log events for alarm",
            Stage::ClientInit => "failed to initialize model client",
            Stage::Summarize => "summarization failed",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one handled notification
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum HandlerOutcome {
    Summarized {
        alarm: String,
        events: usize,
        summary: String,
    },
    Failed {
        stage: Stage,
        reason: String,
    },
}

impl HandlerOutcome {
    pub fn is_summarized(&self) -> bool {
        matches!(self, HandlerOutcome::Summarized { .. })
    }

    pub fn failed_stage(&self) -> Option<Stage> {
        match self {
            HandlerOutcome::Failed { stage, .. } => Some(*stage),
            HandlerOutcome::Summarized { .. } => None,
        }
    }
}

pub struct AlarmHandler<B> {
    backend: B,
    config: AlarmConfig,
    composer: PromptComposer,
}

impl<B: AlarmBackend> AlarmHandler<B> {
    /// Build a handler; the prompt template is compiled here, once
    pub fn new(backend: B, config: AlarmConfig) -> Result<Self, BedrockError> {
        let composer = match &config.prompt_template {
            Some(path) => PromptComposer::from_file(path)?,
            None => PromptComposer::new()?,
        };
        Ok(Self::with_composer(backend, config, composer))
    }

    pub fn with_composer(backend: B, config: AlarmConfig, composer: PromptComposer) -> Self {
        Self {
            backend,
            config,
            composer,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Handle one SNS notification carrying a CloudWatch alarm
    pub async fn handle(&self, notification: serde_json::Value) -> HandlerOutcome {
        let alarm = match decode_alarm(notification) {
            Ok(alarm) => alarm,
            Err(e) => return fail(Stage::DecodeNotification, e),
        };

        let alarm_time = match state_changed_at(&alarm) {
            Ok(at) => Some(at),
            Err(e) => {
                warn!(
                    state_change_time = %alarm.state_change_time,
                    error = %e,
                    "unable to parse StateChangeTime, using current time"
                );
                None
            }
        };

        let store = match self.backend.log_store().await {
            Ok(store) => store,
            Err(e) => return fail(Stage::FetchLogs, e),
        };
        let events = match LogFetcher::new(store.as_ref(), &self.config.logs)
            .fetch_around(alarm_time)
            .await
        {
            Ok(events) => events,
            Err(e) => return fail(Stage::FetchLogs, e),
        };
        info!(events = events.len(), "Guardrail interventions retained");

        let invoker = match self.backend.model_invoker().await {
            Ok(invoker) => invoker,
            Err(e) => return fail(Stage::ClientInit, e),
        };

        let summarizer = Summarizer::new(&self.composer, invoker.as_ref(), &self.config.model);
        let summary = match summarizer.summarize(&alarm, &events).await {
            Ok(summary) => summary,
            Err(e) => return fail(Stage::Summarize, e),
        };
        info!(alarm = %alarm.alarm_name, summary = %summary, "Summarization");

        HandlerOutcome::Summarized {
            alarm: alarm.alarm_name,
            events: events.len(),
            summary,
        }
    }
}

fn decode_alarm(notification: serde_json::Value) -> Result<CloudWatchAlarmPayload, RecordError> {
    let event: SnsEvent = serde_json::from_value(notification)?;
    // raw message is logged so it can be replayed as a fixture
    info!(raw = first_message(&event)?, "Alarm");
    alarm_from_event(&event)
}

fn fail(stage: Stage, err: impl fmt::Display) -> HandlerOutcome {
    let reason = err.to_string();
    error!(stage = %stage, error = %reason, "{}", stage.describe());
    HandlerOutcome::Failed { stage, reason }
}
