// Guardwatch Bedrock - prompt composition, summarization and guardrail probing

pub mod chat;
pub mod error;
pub mod guardrail;
pub mod invoker;
pub mod prompt;
pub mod summarizer;

pub use chat::{ChatMessage, ChatRequest, ChatResponse, ContentBlock, InferenceConfig, Role};
pub use error::BedrockError;
pub use guardrail::{
    BedrockConverser, DeploymentOutputs, GuardrailConverse, ProbeEvent, ProbeReply, ProbeReport,
    ProbeRequest, ProbeRunner, TestCase, TestSuite,
};
pub use invoker::{BedrockInvoker, ModelInvoker};
pub use prompt::{PromptComposer, SYSTEM_PROMPT};
pub use summarizer::{parse_summary, ModelSettings, Summarizer};
