//! Log fetching: query the invocation log stream around an alarm and keep
//! only guardrail interventions

use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_cloudwatchlogs::Client;
use aws_sdk_cloudwatchlogs::error::DisplayErrorContext;
use chrono::{DateTime, Utc};
use guardwatch_core::{ModelInvocationLog, RecordError, TimeWindow, decode_intervened};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::LogSourceConfig;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("log query failed: {0}")]
    Query(String),

    #[error("log query exceeded its {0:?} deadline")]
    Timeout(Duration),

    #[error("undecodable log record: {0}")]
    Decode(#[from] RecordError),

    #[error("log client unavailable: {0}")]
    Client(String),
}

// a single window query against one log stream
#[derive(Debug, Clone, PartialEq)]
pub struct LogQuery {
    pub log_group: String,
    pub log_stream: String,
    pub window: TimeWindow,
    pub limit: i32,
}

/// Returns raw log lines for a query
#[async_trait]
pub trait LogStore: Send + Sync {
    async fn get_log_events(&self, query: &LogQuery) -> Result<Vec<String>, FetchError>;
}

// CloudWatch Logs backed store
#[derive(Debug, Clone)]
pub struct CloudWatchLogStore {
    client: Client,
}

impl CloudWatchLogStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn from_conf(config: &SdkConfig) -> Self {
        Self::new(Client::new(config))
    }
}

#[async_trait]
impl LogStore for CloudWatchLogStore {
    async fn get_log_events(&self, query: &LogQuery) -> Result<Vec<String>, FetchError> {
        let output = self
            .client
            .get_log_events()
            .log_group_name(&query.log_group)
            .log_stream_name(&query.log_stream)
            .start_time(query.window.start_millis())
            .end_time(query.window.end_millis())
            .limit(query.limit)
            .send()
            .await
            .map_err(|e| FetchError::Query(DisplayErrorContext(&e).to_string()))?;

        Ok(output
            .events()
            .iter()
            .filter_map(|event| event.message().map(str::to_string))
            .collect())
    }
}

pub struct LogFetcher<'a> {
    store: &'a dyn LogStore,
    source: &'a LogSourceConfig,
}

impl<'a> LogFetcher<'a> {
    pub fn new(store: &'a dyn LogStore, source: &'a LogSourceConfig) -> Self {
        Self { store, source }
    }

    /// Interventions within the configured window around `at` (now when `None`)
    pub async fn fetch_around(
        &self,
        at: Option<DateTime<Utc>>,
    ) -> Result<Vec<ModelInvocationLog>, FetchError> {
        let window = TimeWindow::around_or_now(at, self.source.window_half_width());
        self.fetch_window(window).await
    }

    /// Interventions within an explicit window.
    ///
    /// The query runs under the configured deadline. Any undecodable line
    /// fails the whole fetch.
    pub async fn fetch_window(
        &self,
        window: TimeWindow,
    ) -> Result<Vec<ModelInvocationLog>, FetchError> {
        let query = LogQuery {
            log_group: self.source.log_group.clone(),
            log_stream: self.source.log_stream.clone(),
            window,
            limit: self.source.limit,
        };
        let deadline = self.source.query_timeout();

        let lines = tokio::time::timeout(deadline, self.store.get_log_events(&query))
            .await
            .map_err(|_| FetchError::Timeout(deadline))??;
        info!(
            fetched = lines.len(),
            start = %window.start,
            end = %window.end,
            "Log events fetched"
        );

        let records = decode_intervened(&lines)?;
        for record in &records {
            debug!(
                request_id = ?record.request_id,
                model_id = %record.model_id,
                "Guardrail intervention"
            );
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use guardwatch_core::GUARDRAIL_INTERVENED;
    use std::sync::Mutex;

    struct StaticStore {
        lines: Vec<String>,
        queries: Mutex<Vec<LogQuery>>,
    }

    impl StaticStore {
        fn new(lines: &[&str]) -> Self {
            Self {
                lines: lines.iter().map(|l| l.to_string()).collect(),
                queries: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl LogStore for StaticStore {
        async fn get_log_events(&self, query: &LogQuery) -> Result<Vec<String>, FetchError> {
            self.queries.lock().unwrap().push(query.clone());
            Ok(self.lines.clone())
        }
    }

    struct StalledStore;

    #[async_trait]
    impl LogStore for StalledStore {
        async fn get_log_events(&self, _query: &LogQuery) -> Result<Vec<String>, FetchError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(Vec::new())
        }
    }

    struct BrokenStore;

    #[async_trait]
    impl LogStore for BrokenStore {
        async fn get_log_events(&self, _query: &LogQuery) -> Result<Vec<String>, FetchError> {
            Err(FetchError::Query("AccessDeniedException".to_string()))
        }
    }

    const BLOCKED: &str = r#"{"modelId": "m", "output": {"outputBodyJson": {"stopReason": "guardrail_intervened"}}}"#;
    const COMPLETED: &str = r#"{"modelId": "m", "output": {"outputBodyJson": {"stopReason": "end_turn"}}}"#;
    const MAX_TOKENS: &str = r#"{"modelId": "m", "output": {"outputBodyJson": {"stopReason": "max_tokens"}}}"#;

    #[tokio::test]
    async fn test_query_window_around_alarm() {
        let store = StaticStore::new(&[]);
        let source = LogSourceConfig::default();
        let alarm_time = Utc.with_ymd_and_hms(2024, 12, 3, 0, 34, 33).unwrap();

        LogFetcher::new(&store, &source)
            .fetch_around(Some(alarm_time))
            .await
            .unwrap();

        let queries = store.queries.lock().unwrap();
        assert_eq!(queries.len(), 1);
        let query = &queries[0];
        assert_eq!(query.log_group, "bedrock");
        assert_eq!(query.log_stream, "aws/bedrock/modelinvocations");
        assert_eq!(query.limit, 5);
        assert_eq!(query.window.start, alarm_time - chrono::Duration::minutes(5));
        assert_eq!(query.window.end, alarm_time + chrono::Duration::minutes(5));
    }

    #[tokio::test]
    async fn test_never_returns_other_stop_reasons() {
        let store = StaticStore::new(&[COMPLETED, BLOCKED, MAX_TOKENS, BLOCKED, COMPLETED]);
        let source = LogSourceConfig::default();

        let records = LogFetcher::new(&store, &source).fetch_around(None).await.unwrap();

        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.stop_reason() == GUARDRAIL_INTERVENED));
    }

    #[tokio::test]
    async fn test_decode_failure_fails_fetch() {
        let store = StaticStore::new(&[BLOCKED, "{truncated"]);
        let source = LogSourceConfig::default();

        let result = LogFetcher::new(&store, &source).fetch_around(None).await;
        assert!(matches!(result, Err(FetchError::Decode(_))));
    }

    #[tokio::test]
    async fn test_query_failure_is_propagated() {
        let source = LogSourceConfig::default();
        let result = LogFetcher::new(&BrokenStore, &source).fetch_around(None).await;
        assert!(matches!(result, Err(FetchError::Query(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_query_deadline() {
        let source = LogSourceConfig::default();
        let result = LogFetcher::new(&StalledStore, &source).fetch_around(None).await;
        match result {
            Err(FetchError::Timeout(deadline)) => assert_eq!(deadline, Duration::from_secs(300)),
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
