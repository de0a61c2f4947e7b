// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

/// Local file helpers for scheme scanning and the editor sandbox.
///
/// Provides extension filtering for candidate scheme files plus directory
/// lifecycle helpers used to build and tear down the ephemeral runtime.
use std::path::Path;

use masterror::AppError;

/// Extensions of files that may declare a color scheme.
pub const SCHEME_FILE_EXTENSIONS: &[&str] = &["vim", "lua", "erb"];

/// Returns `true` when `path` ends with one of `extensions`, ignoring case.
///
/// # Example
///
/// ```
/// use vcsw::{SCHEME_FILE_EXTENSIONS, has_extension};
///
/// assert!(has_extension("colors/Nord.VIM", SCHEME_FILE_EXTENSIONS));
/// assert!(!has_extension("README.md", SCHEME_FILE_EXTENSIONS));
/// ```
pub fn has_extension(path: &str, extensions: &[&str]) -> bool {
    path.rsplit_once('.')
        .filter(|(stem, _)| !stem.is_empty() && !stem.ends_with('/'))
        .is_some_and(|(_, extension)| {
            extensions
                .iter()
                .any(|candidate| candidate.eq_ignore_ascii_case(extension))
        })
}

/// Removes `path` if present and creates it again, empty.
///
/// # Errors
///
/// Returns [`AppError`] when the old tree cannot be removed or the directory
/// cannot be created.
pub fn reset_directory(path: &Path) -> Result<(), AppError> {
    remove_directory(path)?;
    std::fs::create_dir_all(path).map_err(|e| {
        AppError::service(format!("failed to create directory {}: {e}", path.display()))
    })
}

/// Removes `path` recursively. Missing directories are not an error.
///
/// # Errors
///
/// Returns [`AppError`] when removal fails for any other reason.
pub fn remove_directory(path: &Path) -> Result<(), AppError> {
    match std::fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(AppError::service(format!(
            "failed to remove directory {}: {e}",
            path.display()
        )))
    }
}

/// Removes a single file. Missing files are not an error.
///
/// # Errors
///
/// Returns [`AppError`] when removal fails for any other reason.
pub fn remove_file(path: &Path) -> Result<(), AppError> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(AppError::service(format!(
            "failed to remove file {}: {e}",
            path.display()
        )))
    }
}

/// Writes `contents` to `path`, creating parent directories.
///
/// # Errors
///
/// Returns [`AppError`] when the parent cannot be created or the write fails.
pub fn write_file(path: &Path, contents: &str) -> Result<(), AppError> {
    if let Some(parent) = path.parent()
        && !parent.exists()
    {
        std::fs::create_dir_all(parent).map_err(|e| {
            AppError::service(format!(
                "failed to create parent directories for {}: {e}",
                path.display()
            ))
        })?;
    }

    std::fs::write(path, contents)
        .map_err(|e| AppError::service(format!("failed to write {}: {e}", path.display())))
}
