//! Command-line interface for the `vcsw` worker.
//!
//! Each subcommand runs one pass over the catalog and appends an audit
//! report to the store. Per-repository failures are logged and skipped; the
//! process exits non-zero only on fatal errors.

use std::{path::PathBuf, process, sync::Arc};

use clap::{ArgAction, Args, Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use vcsw::{
    Error, JsonStore, load_config,
    github::{FetchClient, OctocrabApi},
    jobs::{Job, RunContext, RunOptions, run_job},
};

/// Discover, track, and render terminal-editor color schemes.
#[derive(Debug, Parser,)]
#[command(name = "vcsw", version, about = "Discover, track, and render editor color schemes")]
struct Cli
{
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Debug, Subcommand,)]
/// Passes exposed by the CLI.
enum Command
{
    /// Search GitHub for candidate repositories and store new ones.
    Discover,
    /// Refresh metadata, star history and declared schemes.
    #[command(alias = "update")]
    Refresh,
    /// Render the schemes of update-valid repositories in a sandboxed editor.
    #[command(alias = "generate")]
    Render,
}

impl From<&Command,> for Job
{
    fn from(command: &Command,) -> Self
    {
        match command {
            Command::Discover => Job::Discover,
            Command::Refresh => Job::Refresh,
            Command::Render => Job::Render,
        }
    }
}

#[derive(Debug, Args,)]
/// Arguments shared by every pass.
struct CommonArgs
{
    /// Process repositories even when nothing changed since the last pass.
    #[arg(long = "force", global = true, action = ArgAction::SetTrue)]
    force: bool,

    /// Keep the sandbox and run the editor interactively.
    #[arg(long = "debug", global = true, action = ArgAction::SetTrue)]
    debug: bool,

    /// Restrict the pass to a single repository.
    #[arg(long = "repo", global = true, value_name = "OWNER/NAME")]
    repo: Option<String,>,

    /// Path to the YAML worker configuration.
    #[arg(long = "config", global = true, value_name = "PATH")]
    config: Option<PathBuf,>,

    /// Location of the JSON catalog, overriding the configuration.
    #[arg(long = "store", global = true, value_name = "PATH")]
    store: Option<PathBuf,>,

    /// GitHub token used for API requests.
    #[arg(long = "github-token", global = true, env = "GITHUB_TOKEN", hide_env_values = true)]
    github_token: Option<String,>,

    /// Soft cap on search results per discovery run.
    #[arg(
        long = "repository-count-limit",
        global = true,
        env = "GITHUB_REPOSITORY_COUNT_LIMIT",
        value_name = "COUNT"
    )]
    repository_count_limit: Option<usize,>,
}

/// Entry point that reports errors and sets the appropriate exit status.
#[tokio::main]
async fn main()
{
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info",),),)
        .with_writer(std::io::stderr,)
        .init();

    if let Err(error,) = run().await {
        error!("{}", error.to_display_string());
        process::exit(1,);
    }
}

/// Executes the selected pass.
///
/// # Errors
///
/// Propagates configuration, store and fatal pass errors.
async fn run() -> Result<(), Error,>
{
    let cli = Cli::parse();
    let args = cli.common;

    let mut config = load_config(args.config.as_deref(),)?;
    if let Some(store,) = args.store {
        config.store_path = store;
    }
    if let Some(limit,) = args.repository_count_limit {
        config.repository_count_limit = limit;
    }
    config.validate()?;

    if args.github_token.is_none() {
        warn!("GITHUB_TOKEN is not set, API requests are heavily rate limited");
    }

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, cancelling");
            on_signal.cancel();
        }
    },);

    let api = OctocrabApi::new(args.github_token.as_deref(),)?;
    let fetch = FetchClient::new(Arc::new(api,), cancel, config.file_count_limit,);
    let job = Job::from(&cli.command,);
    let store = JsonStore::open(&config.store_path,)?;
    match store.reports().iter().rev().find(|report| report.job == job.as_str(),) {
        Some(previous,) => info!(
            "Using catalog {}, previous {} run at {}",
            store.path().display(),
            job,
            previous.created_at
        ),
        None => info!("Using catalog {}", store.path().display()),
    }
    let options = RunOptions {
        force: args.force,
        debug: args.debug,
        repo:  args.repo,
    };

    let mut context = RunContext::new(config, fetch, Box::new(store,), options,)?;
    let report = run_job(&mut context, job,).await?;
    info!("{} report: {}", job, report.data);

    Ok((),)
}
