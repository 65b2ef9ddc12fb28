//! Guardrail probe
//! Replays test inputs through Converse with each deployed guardrail attached
//! and reports how often the guardrail intervened.

mod aws;

use clap::Parser;
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Table};
use guardwatch_bedrock::{
    BedrockConverser, DeploymentOutputs, ProbeEvent, ProbeReport, ProbeRunner, TestSuite,
};
use guardwatch_core::{DEFAULT_PROFILE, GUARDRAIL_INTERVENED, GUARDRAIL_VERSION, PROBE_MODEL_ID};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "converse-guardrails")]
#[command(about = "Exercise deployed guardrails with test inputs")]
struct Args {
    /// Test cases: {"data": [{"guardrail_name": ..., "inputs": [...]}]}
    #[arg(long, env = "GUARDWATCH_TEST_DATA", default_value = "test_data/bedrock_inputs.json")]
    test_data: PathBuf,

    /// Deployment outputs holding `guardrail_ids` and `aws_region`
    #[arg(long, env = "GUARDWATCH_TF_OUTPUT", default_value = "notebook/tf_output.json")]
    tf_output: PathBuf,

    /// Shared credentials profile
    #[arg(short, long, env = "AWS_PROFILE", default_value = DEFAULT_PROFILE)]
    profile: String,

    /// AWS region (default: deployment output, then profile, then us-west-2)
    #[arg(short, long, env = "AWS_REGION")]
    region: Option<String>,

    /// Model to converse with
    #[arg(short, long, default_value = PROBE_MODEL_ID)]
    model_id: String,

    /// Guardrail version, fixed by the provisioning config
    #[arg(long, default_value = GUARDRAIL_VERSION)]
    guardrail_version: String,

    /// File holding a system prompt sent with every input
    #[arg(short, long)]
    system_prompt: Option<PathBuf>,

    /// Seconds to wait between calls
    #[arg(short, long, default_value = "0")]
    delay: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    aws::init_tracing();
    let args = Args::parse();

    let suite = TestSuite::load(&args.test_data)?;
    let outputs = DeploymentOutputs::load(&args.tf_output)?;
    let guardrail_ids = outputs.guardrail_ids();
    let system_prompt = match &args.system_prompt {
        Some(path) => Some(std::fs::read_to_string(path)?),
        None => None,
    };
    println!(
        "{} {} test case(s), {} deployed guardrail(s)",
        "Loaded".dimmed(),
        suite.data.len().to_string().yellow(),
        guardrail_ids.len().to_string().yellow()
    );

    let region = args.region.clone().or_else(|| outputs.aws_region());
    let config = aws::load_config(args.profile.clone(), region).await;
    info!(region = ?config.region(), model_id = %args.model_id, "Bedrock client ready");
    let converser = BedrockConverser::from_conf(&config);

    println!("\n{}", "---- Test Bedrock Converse With Guardrail ----".cyan().bold());
    let report = ProbeRunner::new(&converser, &args.model_id, &args.guardrail_version)
        .with_system_prompt(system_prompt)
        .with_delay(Duration::from_secs(args.delay))
        .run(&suite, &guardrail_ids, print_event)
        .await?;

    println!("\n{}", "Guardrail Analysis".green().bold());
    println!("{}", analysis_table(&report));
    println!(
        "{} {} | {} {} | {} {}",
        "Invocations:".dimmed(),
        report.total_invocations().to_string().yellow(),
        "Interventions:".dimmed(),
        report.total_interventions().to_string().yellow(),
        "Overall rate:".dimmed(),
        format_rate(report.overall_rate()).cyan()
    );
    if !report.skipped.is_empty() {
        println!("{} {}", "Skipped:".dimmed(), report.skipped.join(", ").magenta());
    }

    Ok(())
}

fn print_event(event: ProbeEvent<'_>) {
    match event {
        ProbeEvent::GuardrailMissing { name } => {
            println!(
                "\n{} unable to find guardrail id for '{}', skipping",
                "Warning:".yellow().bold(),
                name
            );
        }
        ProbeEvent::GuardrailStarted { name, id } => {
            println!("\n\n== Guardrail Name: '{}', ID: '{}' ==", name.bold(), id);
        }
        ProbeEvent::Reply { input, reply } => {
            println!("\nInput: '{}'", input);
            if reply.intervened() {
                println!("Output: '{}'", reply.text.as_deref().unwrap_or_default());
            } else {
                println!(
                    "{} expected stop reason '{}' but got: '{}'",
                    "Error:".red().bold(),
                    GUARDRAIL_INTERVENED,
                    reply.stop_reason
                );
            }
        }
    }
}

fn analysis_table(report: &ProbeReport) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Guardrail", "ID", "Tests", "Interventions", "Rate"]);

    for (name, tally) in &report.guardrails {
        table.add_row(vec![
            name.clone(),
            tally.guardrail_id.clone(),
            tally.tests.to_string(),
            tally.interventions.to_string(),
            format_rate(tally.rate()),
        ]);
    }
    table
}

fn format_rate(rate: f64) -> String {
    format!("{:.2}%", rate * 100.0)
}
