// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! The three passes of the worker and the context they share.
//!
//! Passes run strictly sequentially over the selected repositories. A failure
//! scoped to one repository is logged and the pass moves on; only store,
//! search, sandbox setup and cancellation errors end a run.

mod discover;
mod refresh;
mod render;

use std::{fmt, time::Instant};

use chrono::Utc;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

pub use self::{discover::repository_from_detail, render::apply_rendered};
use crate::{
    config::{WorkerConfig, parse_repository_key},
    error::Error,
    extractor::NameExtractor,
    github::FetchClient,
    model::Repository,
    store::{Report, RepositoryStore},
};

/// Pass selected on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash,)]
pub enum Job
{
    /// Search for candidate repositories and store new ones.
    Discover,
    /// Refresh metadata, history and declared schemes.
    Refresh,
    /// Render the schemes of update-valid repositories.
    Render,
}

impl Job
{
    pub fn as_str(self,) -> &'static str
    {
        match self {
            Self::Discover => "discover",
            Self::Refresh => "refresh",
            Self::Render => "render",
        }
    }
}

impl fmt::Display for Job
{
    fn fmt(&self, f: &mut fmt::Formatter<'_,>,) -> fmt::Result
    {
        f.write_str(self.as_str(),)
    }
}

/// Flags shared by every pass.
#[derive(Debug, Clone, Default, PartialEq, Eq,)]
pub struct RunOptions
{
    /// Process repositories even when nothing changed since the last pass.
    pub force: bool,
    /// Keep the sandbox and run the editor interactively.
    pub debug: bool,
    /// Restrict the pass to one `owner/name` repository.
    pub repo:  Option<String,>,
}

/// Everything a pass needs, passed explicitly instead of living in globals.
pub struct RunContext
{
    pub config:    WorkerConfig,
    pub fetch:     FetchClient,
    pub store:     Box<dyn RepositoryStore,>,
    pub extractor: NameExtractor,
    pub options:   RunOptions,
}

impl RunContext
{
    /// Assembles a context, compiling the extractor patterns once.
    ///
    /// # Errors
    ///
    /// Returns [`Error`] when the extractor patterns fail to compile.
    pub fn new(
        config: WorkerConfig,
        fetch: FetchClient,
        store: Box<dyn RepositoryStore,>,
        options: RunOptions,
    ) -> Result<Self, Error,>
    {
        Ok(Self {
            config,
            fetch,
            store,
            extractor: NameExtractor::new()?,
            options,
        },)
    }

    /// Narrows `candidates` to the `--repo` selection when one was given.
    ///
    /// A selected repository is looked up directly in the store, so the
    /// pass-specific listing filter does not apply to it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] when the selector is malformed or names
    /// a repository the store does not know.
    pub fn select(&self, candidates: Vec<Repository,>,) -> Result<Vec<Repository,>, Error,>
    {
        let Some(selector,) = self.options.repo.as_deref() else {
            return Ok(candidates,);
        };

        let (owner, name,) = parse_repository_key(selector,).ok_or_else(|| {
            Error::validation(format!("--repo expects owner/name, got '{selector}'"),)
        },)?;
        self.store
            .find_by_key(owner, name,)
            .map(|repository| vec![repository],)
            .ok_or_else(|| Error::validation(format!("repository {selector} is not in the catalog"),),)
    }
}

/// Runs `job` and appends its audit report to the store.
///
/// # Errors
///
/// Propagates fatal errors of the pass and store failures.
pub async fn run_job(context: &mut RunContext, job: Job,) -> Result<Report, Error,>
{
    info!("Starting {} job", job);
    let started = Instant::now();

    let data = match job {
        Job::Discover => discover::run(context,).await?,
        Job::Refresh => refresh::run(context,).await?,
        Job::Render => render::run(context,).await?,
    };

    let report = Report {
        job: job.as_str().to_owned(),
        elapsed_seconds: started.elapsed().as_secs_f64(),
        created_at: Utc::now(),
        data,
    };
    context.store.append_report(report.clone(),)?;
    info!("Finished {} job in {:.1}s", job, report.elapsed_seconds);

    Ok(report,)
}

fn spinner() -> ProgressBar
{
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.yellow} [{elapsed_precise}] {msg}",)
            .unwrap_or_else(|_| ProgressStyle::default_spinner(),),
    );
    pb
}
