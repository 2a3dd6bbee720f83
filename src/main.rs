//! git-commit-times - set file modification times from git history
//!
//! # Usage
//! ```bash
//! git-commit-times                     # every tracked file in the current repository
//! git-commit-times -C ~/src/project -p # another repository, with a progress bar
//! git-commit-times src/main.rs README  # only these files
//! git-commit-times --since 2020-01-01  # ignore older history
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use git_commit_times::config::{Overrides, Settings};
use git_commit_times::diagnostics::TracingDiagnostics;
use git_commit_times::git::WalkOrder;
use git_commit_times::models::ResolutionOutcome;
use git_commit_times::{Strategy, use_commit_times};

/// Set the modification time of tracked files to their last commit time
#[derive(Parser)]
#[command(name = "git-commit-times", version)]
#[command(about = "Set file modification times to the time of the last commit that changed them", long_about = None)]
struct Cli {
    /// Files to update, relative to the repository root (default: every tracked file)
    #[arg(value_name = "PATHS")]
    paths: Vec<String>,

    /// Working tree to operate on
    #[arg(short = 'C', long = "repo", value_name = "DIR", default_value = ".")]
    repo: PathBuf,

    /// Show a progress bar
    #[arg(short, long)]
    progress: bool,

    /// Walk history in-process instead of running `git log`
    #[arg(short = 'l', long)]
    libgit_walk: bool,

    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,

    /// Only visit commits more recent than this date
    #[arg(long, visible_alias = "after", value_name = "DATE")]
    since: Option<String>,

    /// Only visit commits older than this date
    #[arg(long, visible_alias = "before", value_name = "DATE")]
    until: Option<String>,

    /// Commit visiting order
    #[arg(long, value_enum)]
    order: Option<OrderArg>,

    /// Diff merges against their first parent only
    #[arg(long)]
    first_parent: bool,

    /// Worker threads applying times (0 applies inline)
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Settings file (default: ~/.git-commit-times.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Print the outcome as JSON on stdout
    #[arg(long)]
    json: bool,

    /// Exit with status 2 when some file's last commit was not found
    #[arg(long)]
    strict: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum OrderArg {
    Time,
    Native,
}

impl From<OrderArg> for WalkOrder {
    fn from(order: OrderArg) -> Self {
        match order {
            OrderArg::Time => WalkOrder::Time,
            OrderArg::Native => WalkOrder::Native,
        }
    }
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let mut settings = Settings::load(cli.config.as_deref()).context("Failed to load settings")?;
    settings.apply_cli(Overrides {
        strategy: cli.libgit_walk.then_some(Strategy::Revwalk),
        order: cli.order.map(WalkOrder::from),
        first_parent: cli.first_parent,
        jobs: cli.jobs,
        verbose: cli.verbose,
        progress: cli.progress,
        since: cli.since,
        until: cli.until,
    });

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| settings.log_level.clone()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let options = settings
        .sync_options(&cli.repo, cli.paths)
        .context("Invalid settings")?;
    let outcome = use_commit_times(&options, Arc::new(TracingDiagnostics))
        .with_context(|| format!("Failed to update {}", cli.repo.display()))?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    }
    report(&outcome);

    if cli.strict && !outcome.is_complete() {
        return Ok(ExitCode::from(2));
    }
    Ok(ExitCode::SUCCESS)
}

fn report(outcome: &ResolutionOutcome) {
    let unmatched = outcome.unmatched();
    if !unmatched.is_empty() {
        eprintln!(
            "Warning: the final commit for {} file(s) was not found.",
            unmatched.len()
        );
        for path in unmatched {
            eprintln!("  {}", path);
        }
    }
    for failure in &outcome.apply.failed {
        eprintln!("Error: {}: {}", failure.path, failure.error);
    }
}
