// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

/// Stripped copy of the editor runtime.
///
/// The editor's own runtime ships a set of built-in schemes that would show
/// up in every render. The sandbox mirrors the runtime through symlinks but
/// keeps only the fallback scheme in `colors/`.
use std::{
    fs, io,
    path::{Path, PathBuf},
};

use masterror::AppError;
use tokio::process::Command;
use tracing::debug;

/// Locates the runtime to mirror: `configured` when set, otherwise the
/// `$VIMRUNTIME` the editor reports.
///
/// # Errors
///
/// Returns [`AppError`] when the editor cannot be queried or reports a
/// directory that does not exist.
pub async fn resolve_runtime(editor: &str, configured: Option<&Path,>,) -> Result<PathBuf, AppError,>
{
    let runtime = match configured {
        Some(path,) => path.to_path_buf(),
        None => {
            let output = Command::new(editor,)
                .args(["--clean", "--headless", "-c", "lua io.stdout:write(vim.env.VIMRUNTIME)", "-c", "qa!",],)
                .output()
                .await
                .map_err(|e| AppError::service(format!("failed to run {editor}: {e}"),),)?;

            if !output.status.success() {
                let stderr = String::from_utf8_lossy(&output.stderr,);
                return Err(AppError::service(format!(
                    "{editor} failed to report its runtime: {stderr}"
                ),),);
            }
            PathBuf::from(String::from_utf8_lossy(&output.stdout,).trim(),)
        }
    };

    if !runtime.is_dir() {
        return Err(AppError::service(format!(
            "editor runtime {} is not a directory",
            runtime.display()
        ),),);
    }
    debug!("Using editor runtime at {}", runtime.display());
    Ok(runtime,)
}

/// Mirrors `source` into `target`, keeping only `fallback_scheme` among the
/// built-in schemes.
///
/// # Errors
///
/// Returns [`AppError`] when a directory cannot be read or a link cannot be
/// created.
pub fn build_stripped_runtime(
    source: &Path,
    target: &Path,
    fallback_scheme: &str,
) -> Result<(), AppError,>
{
    fs::create_dir_all(target,).map_err(|e| {
        AppError::service(format!("failed to create runtime {}: {e}", target.display()),)
    },)?;

    for entry in read_dir(source,)? {
        let name = entry.file_name();
        if name == "colors" {
            strip_colors(&entry.path(), &target.join("colors",), fallback_scheme,)?;
        } else {
            link(&entry.path(), &target.join(&name,),)?;
        }
    }
    Ok((),)
}

fn strip_colors(source: &Path, target: &Path, fallback_scheme: &str,) -> Result<(), AppError,>
{
    fs::create_dir_all(target,).map_err(|e| {
        AppError::service(format!("failed to create {}: {e}", target.display()),)
    },)?;

    for entry in read_dir(source,)? {
        let path = entry.path();
        if path.file_stem().is_some_and(|stem| stem == fallback_scheme,) {
            link(&path, &target.join(entry.file_name(),),)?;
        }
    }
    Ok((),)
}

fn read_dir(path: &Path,) -> Result<Vec<fs::DirEntry,>, AppError,>
{
    fs::read_dir(path,)
        .and_then(|entries| entries.collect::<io::Result<Vec<_,>,>>(),)
        .map_err(|e| AppError::service(format!("failed to read {}: {e}", path.display()),),)
}

fn link(original: &Path, link: &Path,) -> Result<(), AppError,>
{
    symlink(original, link,).map_err(|e| {
        AppError::service(format!(
            "failed to link {} to {}: {e}",
            link.display(),
            original.display()
        ),)
    },)
}

#[cfg(unix)]
fn symlink(original: &Path, link: &Path,) -> io::Result<(),>
{
    std::os::unix::fs::symlink(original, link,)
}

#[cfg(windows)]
fn symlink(original: &Path, link: &Path,) -> io::Result<(),>
{
    if original.is_dir() {
        std::os::windows::fs::symlink_dir(original, link,)
    } else {
        std::os::windows::fs::symlink_file(original, link,)
    }
}
