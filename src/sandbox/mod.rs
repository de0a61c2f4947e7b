// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Ephemeral editor runtime used by the render pass.
//!
//! [`Sandbox::prepare`] runs once per pass and builds the directory layout:
//!
//! ```text
//! <work_dir>/
//!   runtime/                 stripped mirror of $VIMRUNTIME
//!   init.lua                 path header + render protocol
//!   pack/catalog/start/      helper plugins and the repository under test
//!   colors.json              render output, removed after every repository
//! ```
//!
//! [`Sandbox::render`] installs one repository, drives the editor and parses
//! the output. Any failure there belongs to that repository only.

mod git;
mod protocol;
mod runtime;

use std::{
    path::{Path, PathBuf},
    process::Stdio,
};

use masterror::AppError;
use tokio::process::Command;
use tracing::{debug, info, warn};

pub use self::{
    git::{clone_repository, github_clone_url},
    protocol::{RenderedSchemes, init_script, normalize_status_line, parse_output},
    runtime::{build_stripped_runtime, resolve_runtime},
};
use crate::{
    config::{SandboxConfig, parse_repository_key},
    file::{remove_directory, remove_file, reset_directory, write_file},
    model::Repository,
};

/// Locations inside the sandbox directory.
#[derive(Debug, Clone, PartialEq, Eq,)]
pub struct SandboxPaths
{
    pub root:    PathBuf,
    pub runtime: PathBuf,
    pub init:    PathBuf,
    pub install: PathBuf,
    pub output:  PathBuf,
}

impl SandboxPaths
{
    pub fn new(root: PathBuf,) -> Self
    {
        Self {
            runtime: root.join("runtime",),
            init: root.join("init.lua",),
            install: root.join("pack",).join("catalog",).join("start",),
            output: root.join("colors.json",),
            root,
        }
    }
}

/// Prepared editor runtime shared by every repository of a render pass.
#[derive(Debug,)]
pub struct Sandbox
{
    paths:   SandboxPaths,
    config:  SandboxConfig,
    skipped: Vec<String,>,
    debug:   bool,
}

impl Sandbox
{
    /// Builds the sandbox from scratch.
    ///
    /// In `debug` mode the editor later runs interactively and the directory
    /// survives [`teardown`](Self::teardown).
    ///
    /// # Errors
    ///
    /// Returns [`AppError`] when any setup step fails. The render pass cannot
    /// continue without a sandbox.
    pub async fn prepare(config: &SandboxConfig, debug: bool,) -> Result<Self, AppError,>
    {
        let root = std::path::absolute(&config.work_dir,).map_err(|e| {
            AppError::service(format!(
                "failed to resolve sandbox directory {}: {e}",
                config.work_dir.display()
            ),)
        },)?;
        let paths = SandboxPaths::new(root,);
        info!("Preparing editor sandbox in {}", paths.root.display());

        reset_directory(&paths.root,)?;

        let source = resolve_runtime(&config.editor, config.runtime_dir.as_deref(),).await?;
        build_stripped_runtime(&source, &paths.runtime, &config.fallback_scheme,)?;

        std::fs::create_dir_all(&paths.install,).map_err(|e| {
            AppError::service(format!("failed to create {}: {e}", paths.install.display()),)
        },)?;
        write_file(&paths.init, &init_script(&paths, &config.ignored_schemes,),)?;

        let mut skipped = Vec::with_capacity(config.ignored_schemes.len() + 1,);
        skipped.push(config.fallback_scheme.clone(),);
        skipped.extend(config.ignored_schemes.iter().cloned(),);

        let sandbox = Self {
            paths,
            config: config.clone(),
            skipped,
            debug,
        };

        for plugin in &config.helper_plugins {
            let (owner, name,) = parse_repository_key(plugin,).ok_or_else(|| {
                AppError::validation(format!("helper plugin '{plugin}' must be owner/name"),)
            },)?;
            debug!("Installing helper plugin {}", plugin);
            clone_repository(
                &config.git,
                &github_clone_url(plugin,),
                &sandbox.plugin_dir(owner, name,),
            )
            .await?;
        }

        Ok(sandbox,)
    }

    pub fn paths(&self,) -> &SandboxPaths
    {
        &self.paths
    }

    /// Install directory of the plugin `owner/name`.
    pub fn plugin_dir(&self, owner: &str, name: &str,) -> PathBuf
    {
        self.paths.install.join(format!("{owner}__{name}"),)
    }

    /// Renders every scheme `repository` ships.
    ///
    /// The repository directory and the output file are removed afterwards
    /// whether rendering succeeded or not.
    ///
    /// # Errors
    ///
    /// Returns [`AppError`] when the clone fails, the editor exits
    /// unsuccessfully, or the output is missing or malformed.
    pub async fn render(&self, repository: &Repository,) -> Result<RenderedSchemes, AppError,>
    {
        let plugin_dir = self.plugin_dir(&repository.owner.name, &repository.name,);
        remove_file(&self.paths.output,)?;

        let result = self.install_and_render(repository, &plugin_dir,).await;

        if let Err(error,) = remove_directory(&plugin_dir,) {
            warn!("Failed to clean up {}: {:?}", plugin_dir.display(), error);
        }
        if let Err(error,) = remove_file(&self.paths.output,) {
            warn!("Failed to clean up {}: {:?}", self.paths.output.display(), error);
        }

        result
    }

    /// Removes the sandbox directory, unless running in debug mode.
    ///
    /// # Errors
    ///
    /// Returns [`AppError`] when the directory cannot be removed.
    pub fn teardown(self,) -> Result<(), AppError,>
    {
        if self.debug {
            info!("Keeping sandbox at {}", self.paths.root.display());
            return Ok((),);
        }
        remove_directory(&self.paths.root,)
    }

    async fn install_and_render(
        &self,
        repository: &Repository,
        plugin_dir: &Path,
    ) -> Result<RenderedSchemes, AppError,>
    {
        let url = if repository.github_url.is_empty() {
            github_clone_url(&repository.key(),)
        } else {
            repository.github_url.clone()
        };
        clone_repository(&self.config.git, &url, plugin_dir,).await?;

        self.run_editor().await?;

        let text = match std::fs::read_to_string(&self.paths.output,) {
            Ok(text,) => text,
            Err(e,) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(AppError::service(format!(
                    "editor produced no output for {repository}"
                ),),);
            }
            Err(e,) => {
                return Err(AppError::service(format!(
                    "failed to read {}: {e}",
                    self.paths.output.display()
                ),),);
            }
        };

        parse_output(&text, &self.skipped,)
    }

    async fn run_editor(&self,) -> Result<(), AppError,>
    {
        let init = self.paths.init.to_string_lossy().into_owned();
        let mut command = Command::new(&self.config.editor,);
        command.env("VIMRUNTIME", &self.paths.runtime,);

        if self.debug {
            let status = command
                .args(["-u", init.as_str(), "-c", "lua CatalogRender()",],)
                .status()
                .await
                .map_err(|e| AppError::service(format!("failed to run {}: {e}", self.config.editor),),)?;
            return if status.success() {
                Ok((),)
            } else {
                Err(AppError::service(format!("{} exited with {status}", self.config.editor),),)
            };
        }

        let output = command
            .args(["--headless", "-u", init.as_str(), "-c", "lua CatalogRender()", "-c", "qa!",],)
            .stdin(Stdio::null(),)
            .output()
            .await
            .map_err(|e| AppError::service(format!("failed to run {}: {e}", self.config.editor),),)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr,);
            return Err(AppError::service(format!(
                "{} exited with {}: {stderr}",
                self.config.editor, output.status
            ),),);
        }
        Ok((),)
    }
}
