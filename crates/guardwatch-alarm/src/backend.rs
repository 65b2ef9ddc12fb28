// Client construction for each alarm invocation
// every call builds fresh clients, nothing is cached between invocations

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use guardwatch_bedrock::{BedrockInvoker, ModelInvoker};
use thiserror::Error;
use tracing::debug;

use crate::config::AwsSettings;
use crate::fetcher::{CloudWatchLogStore, FetchError, LogStore};

#[derive(Error, Debug)]
pub enum ClientInitError {
    #[error("no AWS region configured (set AWS_REGION or [aws].region)")]
    MissingRegion,
}

/// Source of the upstream clients used by the alarm handler
#[async_trait]
pub trait AlarmBackend: Send + Sync {
    async fn log_store(&self) -> Result<Box<dyn LogStore>, FetchError>;

    async fn model_invoker(&self) -> Result<Box<dyn ModelInvoker>, ClientInitError>;
}

/// Shared AWS config honouring an optional profile and region override
pub async fn load_sdk_config(settings: &AwsSettings) -> SdkConfig {
    let mut loader = aws_config::defaults(BehaviorVersion::latest());
    if let Some(profile) = &settings.profile {
        loader = loader.profile_name(profile);
    }
    if let Some(region) = &settings.region {
        loader = loader.region(Region::new(region.clone()));
    }
    loader.load().await
}

#[derive(Debug, Clone, Default)]
pub struct AwsBackend {
    settings: AwsSettings,
}

impl AwsBackend {
    pub fn new(settings: AwsSettings) -> Self {
        Self { settings }
    }

    async fn sdk_config(&self) -> Result<SdkConfig, ClientInitError> {
        let config = load_sdk_config(&self.settings).await;
        match config.region() {
            Some(region) => {
                debug!(region = %region, "AWS config loaded");
                Ok(config)
            }
            None => Err(ClientInitError::MissingRegion),
        }
    }
}

#[async_trait]
impl AlarmBackend for AwsBackend {
    async fn log_store(&self) -> Result<Box<dyn LogStore>, FetchError> {
        let config = self
            .sdk_config()
            .await
            .map_err(|e| FetchError::Client(e.to_string()))?;
        Ok(Box::new(CloudWatchLogStore::from_conf(&config)))
    }

    async fn model_invoker(&self) -> Result<Box<dyn ModelInvoker>, ClientInitError> {
        let config = self.sdk_config().await?;
        Ok(Box::new(BedrockInvoker::from_conf(&config)))
    }
}
