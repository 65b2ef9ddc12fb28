//! Prompt composition for alarm summaries.
//!
//! The alarm and each retained invocation record are flattened into plain
//! views and substituted into a Handlebars template. HTML escaping is off:
//! field contents are copied verbatim, never interpreted.

use std::path::Path;

use guardwatch_core::{ChatTurn, CloudWatchAlarmPayload, ModelInvocationLog};
use handlebars::Handlebars;
use serde::Serialize;

use crate::error::BedrockError;

const TEMPLATE_NAME: &str = "summarize";

/// Default user-turn template
pub const DEFAULT_TEMPLATE: &str = include_str!("../templates/prompt.hbs");

/// System instruction sent with every summarization request
pub const SYSTEM_PROMPT: &str = r#"Your role is to summarize CloudWatch Alarm setup for Bedrock GuardRail GuardrailIntervened metrics. The information provided to you will be in the format:
<alarm>
$ALARM_DETAILS
</alarm>
<events>
<event>
$BEDROCK_INVOCATION_DETAILS
</event>
...
</events>

Important Notes:
1. You should only respond with the summarization and nothing else.
2. If <events> is provided, you should include a summarize of the 'Input' as part of alarm summarization that includes the nature and insights of the 'Input'.

Example output:
- **Alarm Name:** GuardrailIntervenedAlarm
- **Description:** Triggers on guardrail intervention.
- **AWS Account ID:** 1111111111
- **Region:** US West (Oregon)
- **New State:** ALARM
- **Reason:** Threshold Crossed: 1 datapoint [30.0 (03/12/24 05:28:00)] > 0.0.
- **Events Summary:**
	- Blocked a comparison question about insurance policies.
	- Blocked an input containing a personal insult.
	- Blocked an input with derogatory language.
"#;

#[derive(Serialize)]
struct PromptContext<'a> {
    alarm: AlarmView<'a>,
    events: Vec<EventView<'a>>,
}

#[derive(Serialize)]
struct AlarmView<'a> {
    name: &'a str,
    description: &'a str,
    account_id: &'a str,
    region: &'a str,
    new_state: &'a str,
    reason: &'a str,
    state_change_time: &'a str,
}

#[derive(Serialize)]
struct EventView<'a> {
    identity: &'a str,
    region: &'a str,
    model_id: &'a str,
    input: Vec<TurnView<'a>>,
    output: TurnView<'a>,
    stop_reason: &'a str,
}

#[derive(Serialize)]
struct TurnView<'a> {
    role: &'a str,
    text: String,
}

impl<'a> From<&'a CloudWatchAlarmPayload> for AlarmView<'a> {
    fn from(alarm: &'a CloudWatchAlarmPayload) -> Self {
        Self {
            name: &alarm.alarm_name,
            description: &alarm.alarm_description,
            account_id: &alarm.aws_account_id,
            region: &alarm.region,
            new_state: &alarm.new_state_value,
            reason: &alarm.new_state_reason,
            state_change_time: &alarm.state_change_time,
        }
    }
}

impl<'a> From<&'a ChatTurn> for TurnView<'a> {
    fn from(turn: &'a ChatTurn) -> Self {
        Self {
            role: &turn.role,
            text: turn.text(),
        }
    }
}

impl<'a> From<&'a ModelInvocationLog> for EventView<'a> {
    fn from(record: &'a ModelInvocationLog) -> Self {
        Self {
            identity: &record.identity.arn,
            region: &record.region,
            model_id: &record.model_id,
            input: record.input_turns().iter().map(TurnView::from).collect(),
            output: TurnView::from(record.output_turn()),
            stop_reason: record.stop_reason(),
        }
    }
}

/// Renders the summarization prompt from an alarm and its invocation records
pub struct PromptComposer {
    handlebars: Handlebars<'static>,
}

impl PromptComposer {
    /// Composer with the built-in template
    pub fn new() -> Result<Self, BedrockError> {
        Self::with_template(DEFAULT_TEMPLATE)
    }

    /// Composer with a caller-provided template; syntax errors surface here
    pub fn with_template(template: &str) -> Result<Self, BedrockError> {
        let mut handlebars = Handlebars::new();
        handlebars.register_escape_fn(handlebars::no_escape);
        handlebars.register_template_string(TEMPLATE_NAME, template)?;
        Ok(Self { handlebars })
    }

    /// Composer with a template read from disk
    pub fn from_file(path: &Path) -> Result<Self, BedrockError> {
        let template = std::fs::read_to_string(path).map_err(|source| BedrockError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::with_template(&template)
    }

    pub fn render(
        &self,
        alarm: &CloudWatchAlarmPayload,
        events: &[ModelInvocationLog],
    ) -> Result<String, BedrockError> {
        let context = PromptContext {
            alarm: AlarmView::from(alarm),
            events: events.iter().map(EventView::from).collect(),
        };
        Ok(self.handlebars.render(TEMPLATE_NAME, &context)?)
    }
}
