use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use sentinel::RepoRef;

mod cli;

#[derive(Parser)]
#[command(name = "sentinel")]
#[command(about = "Security Sentinel - remediate code scanning findings with a remote agent")]
#[command(version)]
struct Cli {
    /// Directory holding .sentinel/config.toml (defaults to current directory)
    #[arg(short, long, global = true)]
    path: Option<PathBuf>,

    /// Path to the config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Claim open findings and dispatch them to remediation sessions
    Run {
        /// Repository owner
        owner: String,
        /// Repository name
        repo: String,

        /// Read batches from a JSON file instead of fetching findings
        #[arg(long)]
        batches: Option<PathBuf>,

        /// Minimum severity score for fetched findings
        #[arg(long)]
        min_severity: Option<f64>,

        /// Print the run report as JSON
        #[arg(long)]
        json: bool,
    },

    /// List open, unassigned findings
    Findings {
        /// Repository owner
        owner: String,
        /// Repository name
        repo: String,
    },

    /// Show active remote sessions against the configured ceiling
    Capacity,

    /// Pause (or terminate) sessions created by this tool
    Cleanup {
        /// Delete sessions instead of pausing them
        #[arg(long)]
        terminate: bool,

        /// Include sessions that are still working
        #[arg(long)]
        include_active: bool,

        /// Include sessions not created by this tool
        #[arg(long)]
        all: bool,
    },

    /// Initialize a new .sentinel/config.toml configuration file
    Init {
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let work_dir = cli.path.unwrap_or_else(|| PathBuf::from("."));

    if let Commands::Init { force } = cli.command {
        return cli::init::init_command(&work_dir, cli.config, force);
    }

    let mut config = cli::load_config(&work_dir, cli.config.as_deref())?;

    match cli.command {
        Commands::Run {
            owner,
            repo,
            batches,
            min_severity,
            json,
        } => {
            if let Some(min_severity) = min_severity {
                config.orchestrator.min_severity = min_severity;
            }
            cli::run::run_command(&config, RepoRef::new(owner, repo), batches.as_deref(), json)
                .await?;
        }
        Commands::Findings { owner, repo } => {
            cli::findings::findings_command(&config, RepoRef::new(owner, repo)).await?;
        }
        Commands::Capacity => {
            cli::capacity::capacity_command(&config).await?;
        }
        Commands::Cleanup {
            terminate,
            include_active,
            all,
        } => {
            let options = sentinel::session::cleanup::CleanupOptions {
                terminate,
                include_active,
                all,
            };
            cli::cleanup::cleanup_command(&config, options).await?;
        }
        Commands::Init { .. } => {}
    }

    Ok(())
}
