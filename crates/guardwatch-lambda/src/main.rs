// Guardwatch Lambda - summarizes guardrail interventions behind a CloudWatch alarm

use guardwatch_alarm::{AlarmConfig, AlarmHandler, AwsBackend};
use lambda_runtime::{Error, LambdaEvent, run, service_fn};
use serde_json::Value;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        // CloudWatch adds its own ingestion time
        .without_time()
        .with_target(false)
        .init();

    let config = AlarmConfig::from_env()?;
    info!(
        log_group = %config.logs.log_group,
        log_stream = %config.logs.log_stream,
        model_id = %config.model.model_id,
        "Configuration loaded"
    );

    let backend = AwsBackend::new(config.aws.clone());
    let handler = AlarmHandler::new(backend, config)?;
    let handler = &handler;

    run(service_fn(move |event: LambdaEvent<Value>| async move {
        info!(request_id = %event.context.request_id, "Alarm notification received");
        // failures are reported in the outcome, never returned to the runtime
        let outcome = handler.handle(event.payload).await;
        Ok::<Value, Error>(serde_json::to_value(outcome)?)
    }))
    .await
}
