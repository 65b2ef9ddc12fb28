//! Guardwatch alarm handling: fetch guardrail interventions around an alarm and summarize them

pub mod backend;
pub mod config;
pub mod fetcher;
pub mod handler;

pub use backend::{AlarmBackend, AwsBackend, ClientInitError, load_sdk_config};
pub use config::{AlarmConfig, AwsSettings, ConfigError, LogSourceConfig, load_config};
pub use fetcher::{CloudWatchLogStore, FetchError, LogFetcher, LogQuery, LogStore};
pub use handler::{AlarmHandler, HandlerOutcome, Stage};
