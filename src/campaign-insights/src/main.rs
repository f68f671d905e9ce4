//! Campaign Insights: ads export analysis from the command line or over HTTP.
//!
//! Analysis commands print a JSON report; `serve` starts the HTTP API.

use anyhow::Context;
use campaign_api::ApiServer;
use campaign_core::config::AppConfig;
use campaign_engine::{CampaignPipeline, KeywordPipeline, MonthlyPipeline};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "campaign-insights")]
#[command(about = "Audit Google Ads exports and produce prioritized recommendations")]
#[command(version)]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true, env = "CAMPAIGN_INSIGHTS_CONFIG")]
    config: Option<PathBuf>,

    /// Write the JSON report here instead of stdout
    #[arg(long, short, global = true)]
    output: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyze a campaign performance export
    Campaigns { file: PathBuf },
    /// Analyze a search keyword export
    Keywords { file: PathBuf },
    /// Analyze a directory of monthly exports named like `Mar 2025.csv`
    Monthly { dir: PathBuf },
    /// Start the HTTP API
    Serve {
        /// HTTP port (overrides config)
        #[arg(long, env = "CAMPAIGN_INSIGHTS__API__HTTP_PORT")]
        http_port: Option<u16>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so a report on stdout stays valid JSON.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "campaign_insights=info,campaign_engine=info,tower_http=info".into()),
        )
        .with_writer(std::io::stderr)
        .json()
        .init();

    let cli = Cli::parse();
    let mut config = AppConfig::load(cli.config.as_deref())
        .with_context(|| match &cli.config {
            Some(path) => format!("loading configuration from {}", path.display()),
            None => "loading configuration from the environment".to_string(),
        })?;

    match cli.command {
        Command::Campaigns { file } => {
            let text = read_export(&file)?;
            let report = CampaignPipeline::new(&config.analysis).run_csv(&text)?;
            emit(&report, cli.output.as_deref())
        }
        Command::Keywords { file } => {
            let text = read_export(&file)?;
            let report = KeywordPipeline::new(&config.analysis).run_csv(&text)?;
            emit(&report, cli.output.as_deref())
        }
        Command::Monthly { dir } => {
            let report = MonthlyPipeline::new(&config.analysis).run_directory(&dir)?;
            emit(&report, cli.output.as_deref())
        }
        Command::Serve { http_port } => {
            if let Some(port) = http_port {
                config.api.http_port = port;
            }
            info!(
                http_port = config.api.http_port,
                metrics_port = config.metrics.port,
                currency = %config.analysis.currency,
                "Configuration loaded"
            );

            let api_server = ApiServer::new(config);
            if let Err(e) = api_server.start_metrics() {
                error!(error = %e, "Failed to start metrics exporter");
            }

            info!("Campaign Insights is ready to serve traffic");
            api_server.start_http().await
        }
    }
}

fn read_export(path: &Path) -> anyhow::Result<String> {
    info!(path = %path.display(), "Reading export");
    fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

fn emit<T: Serialize>(report: &T, output: Option<&Path>) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    match output {
        Some(path) => {
            fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
            info!(path = %path.display(), "Report written");
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(json.as_bytes())?;
            stdout.write_all(b"\n")?;
        }
    }
    Ok(())
}
