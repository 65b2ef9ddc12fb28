//! Guardrail probing: replay test inputs through Converse with a guardrail
//! attached and tally how often the guardrail intervenes.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_bedrockruntime::error::DisplayErrorContext;
use aws_sdk_bedrockruntime::types::{
    ContentBlock as SdkContentBlock, ConversationRole, ConverseOutput as ConverseOutputKind,
    GuardrailConfiguration, GuardrailTrace, Message, SystemContentBlock,
};
use aws_sdk_bedrockruntime::Client;
use guardwatch_core::GUARDRAIL_INTERVENED;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use crate::error::BedrockError;

// TEST DATA //

/// `{"data": [{"guardrail_name": "...", "inputs": ["..."]}]}`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TestSuite {
    #[serde(default)]
    pub data: Vec<TestCase>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TestCase {
    pub guardrail_name: String,
    #[serde(default)]
    pub inputs: Vec<String>,
}

impl TestSuite {
    pub fn load(path: &Path) -> Result<Self, BedrockError> {
        read_json(path)
    }
}

#[derive(Debug, Clone, Deserialize)]
struct OutputValue {
    value: serde_json::Value,
}

/// Infrastructure deployment outputs: `{"name": {"value": ...}, ...}`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct DeploymentOutputs {
    outputs: HashMap<String, OutputValue>,
}

impl DeploymentOutputs {
    pub fn load(path: &Path) -> Result<Self, BedrockError> {
        read_json(path)
    }

    /// Guardrail name to guardrail id, from the `guardrail_ids` output
    pub fn guardrail_ids(&self) -> HashMap<String, String> {
        self.outputs
            .get("guardrail_ids")
            .and_then(|output| output.value.as_object())
            .map(|ids| {
                ids.iter()
                    .filter_map(|(name, id)| id.as_str().map(|id| (name.clone(), id.to_string())))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn aws_region(&self) -> Option<String> {
        self.outputs
            .get("aws_region")
            .and_then(|output| output.value.as_str())
            .map(str::to_string)
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, BedrockError> {
    let content = std::fs::read_to_string(path).map_err(|source| BedrockError::Io {
        path: path.display().to_string(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| BedrockError::InvalidFile {
        path: path.display().to_string(),
        source,
    })
}

// CONVERSE //

#[derive(Debug, Clone)]
pub struct ProbeRequest<'a> {
    pub model_id: &'a str,
    pub guardrail_id: &'a str,
    pub guardrail_version: &'a str,
    pub system_prompt: Option<&'a str>,
    pub input: &'a str,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProbeReply {
    pub stop_reason: String,
    pub text: Option<String>,
    // model output rewritten by the guardrail, from the trace
    pub guardrail_output: Vec<String>,
}

impl ProbeReply {
    /// Blocked by stop reason, or acted on according to the guardrail trace
    pub fn intervened(&self) -> bool {
        self.stop_reason == GUARDRAIL_INTERVENED || !self.guardrail_output.is_empty()
    }
}

/// Single-turn chat completion with a guardrail attached
#[async_trait]
pub trait GuardrailConverse: Send + Sync {
    async fn converse(&self, request: &ProbeRequest<'_>) -> Result<ProbeReply, BedrockError>;
}

#[derive(Debug, Clone)]
pub struct BedrockConverser {
    client: Client,
}

impl BedrockConverser {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn from_conf(config: &SdkConfig) -> Self {
        Self::new(Client::new(config))
    }
}

#[async_trait]
impl GuardrailConverse for BedrockConverser {
    async fn converse(&self, request: &ProbeRequest<'_>) -> Result<ProbeReply, BedrockError> {
        let message = Message::builder()
            .role(ConversationRole::User)
            .content(SdkContentBlock::Text(request.input.to_string()))
            .build()
            .map_err(|e| BedrockError::InvalidRequest(e.to_string()))?;

        let guardrail = GuardrailConfiguration::builder()
            .guardrail_identifier(request.guardrail_id)
            .guardrail_version(request.guardrail_version)
            .trace(GuardrailTrace::Enabled)
            .build();

        let mut call = self
            .client
            .converse()
            .model_id(request.model_id)
            .messages(message)
            .guardrail_config(guardrail);
        if let Some(system) = request.system_prompt {
            call = call.system(SystemContentBlock::Text(system.to_string()));
        }

        let output = call
            .send()
            .await
            .map_err(|e| BedrockError::Invocation(DisplayErrorContext(&e).to_string()))?;

        let text = match output.output() {
            Some(ConverseOutputKind::Message(message)) => {
                message.content().iter().find_map(|block| match block {
                    SdkContentBlock::Text(text) => Some(text.clone()),
                    _ => None,
                })
            }
            _ => None,
        };

        let guardrail_output = output
            .trace()
            .and_then(|trace| trace.guardrail())
            .map(|assessment| assessment.model_output().to_vec())
            .unwrap_or_default();

        Ok(ProbeReply {
            stop_reason: output.stop_reason().as_str().to_string(),
            text,
            guardrail_output,
        })
    }
}

// RUNNER //

/// Progress notifications emitted while probing
#[derive(Debug)]
pub enum ProbeEvent<'a> {
    GuardrailMissing { name: &'a str },
    GuardrailStarted { name: &'a str, id: &'a str },
    Reply { input: &'a str, reply: &'a ProbeReply },
}

/// Intervention counts for one guardrail
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GuardrailTally {
    pub guardrail_id: String,
    pub tests: usize,
    pub interventions: usize,
}

impl GuardrailTally {
    pub fn rate(&self) -> f64 {
        if self.tests == 0 {
            0.0
        } else {
            self.interventions as f64 / self.tests as f64
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProbeReport {
    pub guardrails: BTreeMap<String, GuardrailTally>,
    pub skipped: Vec<String>,
}

impl ProbeReport {
    pub fn total_invocations(&self) -> usize {
        self.guardrails.values().map(|t| t.tests).sum()
    }

    pub fn total_interventions(&self) -> usize {
        self.guardrails.values().map(|t| t.interventions).sum()
    }

    pub fn overall_rate(&self) -> f64 {
        let total = self.total_invocations();
        if total == 0 {
            0.0
        } else {
            self.total_interventions() as f64 / total as f64
        }
    }
}

pub struct ProbeRunner<'a> {
    converser: &'a dyn GuardrailConverse,
    model_id: String,
    guardrail_version: String,
    system_prompt: Option<String>,
    delay: Duration,
}

impl<'a> ProbeRunner<'a> {
    pub fn new(
        converser: &'a dyn GuardrailConverse,
        model_id: impl Into<String>,
        guardrail_version: impl Into<String>,
    ) -> Self {
        Self {
            converser,
            model_id: model_id.into(),
            guardrail_version: guardrail_version.into(),
            system_prompt: None,
            delay: Duration::ZERO,
        }
    }

    pub fn with_system_prompt(mut self, system_prompt: Option<String>) -> Self {
        self.system_prompt = system_prompt;
        self
    }

    /// Pause between consecutive calls to stay under throttling limits
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Run every test case against its guardrail.
    ///
    /// Cases whose guardrail has no deployed id are reported and skipped. The
    /// first upstream error aborts the run.
    pub async fn run<F>(
        &self,
        suite: &TestSuite,
        guardrail_ids: &HashMap<String, String>,
        mut on_event: F,
    ) -> Result<ProbeReport, BedrockError>
    where
        F: FnMut(ProbeEvent<'_>) + Send,
    {
        let mut report = ProbeReport::default();

        for case in &suite.data {
            let Some(guardrail_id) = guardrail_ids.get(&case.guardrail_name) else {
                on_event(ProbeEvent::GuardrailMissing {
                    name: &case.guardrail_name,
                });
                report.skipped.push(case.guardrail_name.clone());
                continue;
            };
            on_event(ProbeEvent::GuardrailStarted {
                name: &case.guardrail_name,
                id: guardrail_id,
            });
            // listed even when the case has no inputs
            report
                .guardrails
                .entry(case.guardrail_name.clone())
                .or_insert_with(|| GuardrailTally {
                    guardrail_id: guardrail_id.clone(),
                    ..Default::default()
                });

            for input in &case.inputs {
                let request = ProbeRequest {
                    model_id: &self.model_id,
                    guardrail_id,
                    guardrail_version: &self.guardrail_version,
                    system_prompt: self.system_prompt.as_deref(),
                    input,
                };
                let reply = self.converser.converse(&request).await?;
                debug!(guardrail = %case.guardrail_name, stop_reason = %reply.stop_reason, "Probe reply");

                let tally = report.guardrails.entry(case.guardrail_name.clone()).or_default();
                tally.tests += 1;
                if reply.intervened() {
                    tally.interventions += 1;
                }
                on_event(ProbeEvent::Reply {
                    input,
                    reply: &reply,
                });

                if !self.delay.is_zero() {
                    tokio::time::sleep(self.delay).await;
                }
            }
        }

        Ok(report)
    }
}
