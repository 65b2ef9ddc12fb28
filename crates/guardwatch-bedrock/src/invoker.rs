// Model invocation seam
// Bedrock InvokeModel in production, canned replies in tests

use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_bedrockruntime::error::DisplayErrorContext;
use aws_sdk_bedrockruntime::primitives::Blob;
use aws_sdk_bedrockruntime::Client;
use tracing::debug;

use crate::error::BedrockError;

const JSON_CONTENT_TYPE: &str = "application/json";

/// Sends a raw JSON request body to a hosted model and returns the raw reply body
#[async_trait]
pub trait ModelInvoker: Send + Sync {
    async fn invoke(&self, model_id: &str, body: Vec<u8>) -> Result<Vec<u8>, BedrockError>;

    fn provider(&self) -> &str;
}

#[derive(Debug, Clone)]
pub struct BedrockInvoker {
    client: Client,
}

impl BedrockInvoker {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn from_conf(config: &SdkConfig) -> Self {
        Self::new(Client::new(config))
    }
}

#[async_trait]
impl ModelInvoker for BedrockInvoker {
    async fn invoke(&self, model_id: &str, body: Vec<u8>) -> Result<Vec<u8>, BedrockError> {
        debug!(model_id, bytes = body.len(), "Invoking model");

        let output = self
            .client
            .invoke_model()
            .model_id(model_id)
            .content_type(JSON_CONTENT_TYPE)
            .accept(JSON_CONTENT_TYPE)
            .body(Blob::new(body))
            .send()
            .await
            .map_err(|e| BedrockError::Invocation(DisplayErrorContext(&e).to_string()))?;

        Ok(output.body().as_ref().to_vec())
    }

    fn provider(&self) -> &str {
        "bedrock"
    }
}
