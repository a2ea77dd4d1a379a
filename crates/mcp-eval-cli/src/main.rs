//! mcp-eval — evaluate third-party MCP server packages.
//!
//! ## Commands
//!
//! - `evaluate`: acquire, scan and score a package in-line
//! - `report`: print a previously persisted report by job id

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mcp_eval_core::{init_tracing, EvalConfig, EvalRecord, EvalRequest, EvaluationPipeline};
use std::path::PathBuf;
use tracing::Level;

#[derive(Parser)]
#[command(name = "mcp-eval")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Security evaluation pipeline for MCP server packages", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a package: acquire source, optionally launch it, run
    /// the scanner battery and persist a trust-score report
    Evaluate {
        /// Package identifier: local path, git URL ending in .git,
        /// PyPI pin (name==version / wheel / sdist) or npm name
        package: String,

        /// Explicit launch command override (repeatable, in order)
        #[arg(long = "launch-command", num_args = 1..)]
        launch_command: Option<Vec<String>>,

        /// Port for the live runtime test; omitting it skips the launch
        #[arg(short, long)]
        port: Option<u16>,

        /// URL of the package's declared spec document
        #[arg(long)]
        spec_url: Option<String>,

        /// Comma-separated KEY=VALUE environment overrides
        #[arg(long)]
        env: Option<String>,

        /// Directory for persisted report JSON blobs
        #[arg(long)]
        reports_dir: Option<PathBuf>,

        /// Path to a TOML configuration file
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Print a previously persisted report
    Report {
        /// Job id returned by a prior evaluate run
        job_id: String,

        /// Directory holding persisted reports
        #[arg(long, default_value = "./reports")]
        reports_dir: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    init_tracing(cli.json, level);

    match cli.command {
        Commands::Evaluate {
            package,
            launch_command,
            port,
            spec_url,
            env,
            reports_dir,
            config,
        } => {
            let mut eval_config = match config {
                Some(path) => EvalConfig::from_file(&path)
                    .with_context(|| format!("load config {}", path.display()))?,
                None => EvalConfig::default(),
            };
            if let Some(dir) = reports_dir {
                eval_config.reports_dir = dir;
            }

            let pipeline = EvaluationPipeline::new(eval_config).context("build pipeline")?;

            let request = EvalRequest {
                package,
                launch_command,
                port,
                spec_url,
                env_overrides: env,
            };

            let response = pipeline.evaluate(&request).await.context("run evaluation")?;

            println!(
                "{}",
                serde_json::to_string_pretty(&response).context("render response")?
            );

            if response.record.is_error() {
                std::process::exit(1);
            }
        }

        Commands::Report {
            job_id,
            reports_dir,
        } => {
            let path = reports_dir.join(format!("{job_id}.json"));
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("no report at {}", path.display()))?;
            let record: EvalRecord = serde_json::from_str(&raw)
                .with_context(|| format!("malformed report {}", path.display()))?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
    }

    Ok(())
}
