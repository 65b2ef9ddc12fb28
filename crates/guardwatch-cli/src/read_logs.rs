//! Print the guardrail interventions logged around the current time

mod aws;

use chrono::Utc;
use clap::Parser;
use colored::Colorize;
use guardwatch_alarm::{CloudWatchLogStore, LogFetcher, LogSourceConfig};
use guardwatch_core::{
    TimeWindow, DEFAULT_PROFILE, DIAGNOSTIC_WINDOW_MINUTES, FETCH_LIMIT, LOG_GROUP, LOG_STREAM,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "read-log-events")]
#[command(about = "Print guardrail interventions from the model invocation log")]
struct Args {
    /// Shared credentials profile
    #[arg(short, long, env = "AWS_PROFILE", default_value = DEFAULT_PROFILE)]
    profile: String,

    /// AWS region (default: profile, then us-west-2)
    #[arg(short, long, env = "AWS_REGION")]
    region: Option<String>,

    #[arg(long, default_value = LOG_GROUP)]
    log_group: String,

    #[arg(long, default_value = LOG_STREAM)]
    log_stream: String,

    /// Minutes either side of now
    #[arg(short, long, default_value_t = DIAGNOSTIC_WINDOW_MINUTES)]
    window_minutes: i64,

    /// Max events to read
    #[arg(short, long, default_value_t = FETCH_LIMIT)]
    limit: i32,
}

impl Args {
    fn source(&self) -> LogSourceConfig {
        LogSourceConfig {
            log_group: self.log_group.clone(),
            log_stream: self.log_stream.clone(),
            window_minutes: self.window_minutes,
            limit: self.limit,
            ..Default::default()
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    aws::init_tracing();
    let args = Args::parse();

    let config = aws::load_config(args.profile.clone(), args.region.clone()).await;
    let store = CloudWatchLogStore::from_conf(&config);
    let source = args.source();
    let window = TimeWindow::around(Utc::now(), source.window_half_width());

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    spinner.set_message(format!("Reading {}/{}", source.log_group, source.log_stream));
    spinner.enable_steady_tick(Duration::from_millis(100));
    let records = LogFetcher::new(&store, &source).fetch_window(window).await;
    spinner.finish_and_clear();
    let records = records?;

    if records.is_empty() {
        println!("{}", "No guardrail interventions found.".yellow());
        return Ok(());
    }

    for record in &records {
        println!("=======\nevent: {}\n", serde_json::to_string_pretty(record)?);
    }
    println!(
        "{} {} between {} and {}",
        "Found:".dimmed(),
        records.len().to_string().green(),
        window.start.format("%H:%M:%S"),
        window.end.format("%H:%M:%S")
    );

    Ok(())
}
