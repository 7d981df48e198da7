use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use marketing_agents::config::{ConfigManager, FileConfigManager};
use marketing_agents::page::HttpPageFetcher;
use marketing_agents::{aggregate, providers, AgentRegistry, BatchFile, Credentials, Orchestrator};

#[derive(Debug, Parser)]
#[command(name = "marketing-agents")]
#[command(about = "Run marketing analysis agents against generation and search providers")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run every invocation in a batch file and print the report
    Run {
        /// Batch file (.json or .toml)
        #[arg(long)]
        batch: PathBuf,

        #[arg(long, default_value = "config.toml")]
        config: PathBuf,

        /// Overrides [batch] deadline_ms from the config file
        #[arg(long)]
        deadline_ms: Option<u64>,

        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// List the available agents
    Agents,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[tokio::main]
async fn main() -> ExitCode {
    // a missing .env is fine, real environment variables still apply
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let outcome = match cli.command {
        Command::Run {
            batch,
            config,
            deadline_ms,
            format,
        } => run(batch, config, deadline_ms, format).await,
        Command::Agents => list_agents(),
    };

    match outcome {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(
    batch_path: PathBuf,
    config_path: PathBuf,
    deadline_ms: Option<u64>,
    format: OutputFormat,
) -> anyhow::Result<ExitCode> {
    let config_manager = FileConfigManager::new(config_path.clone());
    let config = config_manager
        .load_config()
        .await
        .map_err(|e| anyhow!(e))
        .with_context(|| format!("loading configuration from {}", config_path.display()))?;

    let credentials = Credentials::from_env().map_err(|e| anyhow!(e))?;
    let gateway = providers::connect(&config, &credentials).map_err(|e| anyhow!(e))?;
    let registry = AgentRegistry::builtin().map_err(|e| anyhow!(e))?;
    let page_fetcher = HttpPageFetcher::new(&config.pages).map_err(|e| anyhow!(e))?;

    let batch_file = BatchFile::load(&batch_path).await.map_err(|e| anyhow!(e))?;
    let deadline = deadline_ms
        .map(Duration::from_millis)
        .unwrap_or_else(|| config.batch.deadline());

    tracing::info!(
        "Running {} invocations from {}",
        batch_file.invocations.len(),
        batch_path.display()
    );
    let orchestrator = Orchestrator::from_config(&config, Arc::new(gateway), Arc::new(registry))
        .with_page_fetcher(Arc::new(page_fetcher));
    let batch = orchestrator.run_batch(batch_file.invocations, deadline).await;
    let report = aggregate(&batch);

    match format {
        OutputFormat::Text => print!("{}", report.render_text()),
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&report).context("serializing report")?
        ),
    }

    Ok(if report.summary.overall_success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn list_agents() -> anyhow::Result<ExitCode> {
    let registry = AgentRegistry::builtin().map_err(|e| anyhow!(e))?;
    for descriptor in registry.iter() {
        println!(
            "{:<24} {:<10} requires: {:<28} {}",
            descriptor.name,
            descriptor.provider.to_string(),
            descriptor.required_inputs.join(", "),
            descriptor.description
        );
    }
    Ok(ExitCode::SUCCESS)
}
