// AWS config and logging shared by the diagnostic binaries

use aws_config::{Region, SdkConfig};
use guardwatch_alarm::{load_sdk_config, AwsSettings};
use guardwatch_core::DEFAULT_REGION;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();
}

/// Load the shared config for `profile`.
///
/// An explicit `region` wins; otherwise the profile's region is used, then
/// `us-west-2`.
pub async fn load_config(profile: String, region: Option<String>) -> SdkConfig {
    let config = load_sdk_config(&AwsSettings {
        profile: Some(profile),
        region,
    })
    .await;
    if config.region().is_some() {
        return config;
    }
    config
        .into_builder()
        .region(Region::new(DEFAULT_REGION))
        .build()
}
