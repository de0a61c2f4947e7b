// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

/// Git operations for installing plugins into the sandbox.
///
/// Clones are shallow and never prompt for credentials, so a private or
/// deleted repository fails fast instead of blocking the run.
use std::path::Path;

use masterror::AppError;
use tokio::process::Command;
use tracing::debug;

/// Clone URL of a GitHub repository given as `owner/name`.
///
/// # Example
///
/// ```
/// assert_eq!(vcsw::sandbox::github_clone_url("rktjmp/lush.nvim"), "https://github.com/rktjmp/lush.nvim");
/// ```
pub fn github_clone_url(key: &str,) -> String
{
    format!("https://github.com/{}", key.trim_matches('/'))
}

/// Shallow-clones `url` into `destination`.
///
/// # Errors
///
/// Returns [`AppError`] when git cannot be spawned or the clone fails.
pub async fn clone_repository(git: &str, url: &str, destination: &Path,) -> Result<(), AppError,>
{
    debug!("Cloning {} into {}", url, destination.display());
    let destination = destination.to_string_lossy();
    run_git(git, &["clone", "--depth", "1", "--quiet", url, &destination],).await
}

async fn run_git(git: &str, args: &[&str],) -> Result<(), AppError,>
{
    let output = Command::new(git,)
        .args(args,)
        .env("GIT_TERMINAL_PROMPT", "0",)
        .output()
        .await
        .map_err(|e| AppError::service(format!("git command failed: {e}"),),)?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr,);
        return Err(AppError::service(format!("git {} failed: {stderr}", args.join(" "),),),);
    }

    Ok((),)
}

#[cfg(all(test, unix))]
mod tests
{
    use std::os::unix::fs::PermissionsExt;

    use tempfile::tempdir;

    use super::*;

    fn script(dir: &Path, body: &str,) -> String
    {
        let path = dir.join("git",);
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n"),).expect("failed to write script",);
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755,),)
            .expect("failed to mark script executable",);
        path.to_string_lossy().into_owned()
    }

    #[tokio::test]
    async fn clone_passes_shallow_arguments()
    {
        let dir = tempdir().expect("failed to create tempdir",);
        let log = dir.path().join("args.log",);
        let git = script(dir.path(), &format!("echo \"$@\" > '{}'", log.display()),);

        clone_repository(&git, "https://github.com/a/b", &dir.path().join("dest",),)
            .await
            .expect("clone succeeded",);

        let args = std::fs::read_to_string(&log,).expect("failed to read log",);
        assert!(args.starts_with("clone --depth 1 --quiet https://github.com/a/b "));
        assert!(args.trim_end().ends_with("dest"));
    }

    #[tokio::test]
    async fn failed_clone_reports_stderr()
    {
        let dir = tempdir().expect("failed to create tempdir",);
        let git = script(dir.path(), "echo 'repository not found' >&2\nexit 128",);

        let error = clone_repository(&git, "https://github.com/a/missing", &dir.path().join("dest",),)
            .await
            .expect_err("clone must fail",);
        assert!(format!("{error:?}").contains("repository not found"));
    }

    #[tokio::test]
    async fn missing_binary_is_an_error()
    {
        let dir = tempdir().expect("failed to create tempdir",);
        let result =
            clone_repository("/nonexistent/git", "https://github.com/a/b", &dir.path().join("dest",),)
                .await;
        assert!(result.is_err());
    }
}
