//! prun History CLI
//!
//! Operator tool that loads the history store through the plugin factory and
//! runs a single operation against the cluster.
//!
//! # Usage
//! ```bash
//! prun-history --config history.json put job-1 '{"exe":"sleep"}'
//! prun-history --config history.json delete job-1
//! prun-history --config history.json list [--json]
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use prun_history::{create_history, destroy_history, History, JobRecord, HISTORY_VERSION};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// prun History - inspect and edit the cluster job history
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// History config file (JSON with a `remotes` field)
    #[arg(short, long, env = "PRUN_HISTORY_CONFIG")]
    config: PathBuf,

    /// Enable verbose debug logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Store a job description under a job id
    Put { job_id: String, job_descr: String },

    /// Remove a job
    Delete { job_id: String },

    /// Print every stored job
    List {
        /// Print a JSON array instead of tab separated lines
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(args.verbose)
        .with_writer(std::io::stderr)
        .init();

    let history = create_history(HISTORY_VERSION)
        .context("history library rejected its own interface version")?;

    let outcome = history
        .initialize(&args.config)
        .with_context(|| format!("initializing history from {}", args.config.display()))
        .and_then(|()| run(history.as_ref(), args.command));

    destroy_history(history);
    outcome
}

fn run(history: &dyn History, command: Command) -> Result<()> {
    match command {
        Command::Put { job_id, job_descr } => {
            history
                .put(&job_id, &job_descr)
                .with_context(|| format!("storing {}", job_id))?;
            tracing::info!("Stored {}", job_id);
        }
        Command::Delete { job_id } => {
            history
                .delete(&job_id)
                .with_context(|| format!("deleting {}", job_id))?;
            tracing::info!("Deleted {}", job_id);
        }
        Command::List { json: false } => {
            history
                .get_all(&mut |job_id, job_descr| println!("{}\t{}", job_id, job_descr))
                .context("listing jobs")?;
        }
        Command::List { json: true } => {
            let mut records = Vec::new();
            history
                .get_all(&mut |job_id, job_descr| records.push(JobRecord::new(job_id, job_descr)))
                .context("listing jobs")?;
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
    }
    Ok(())
}
