//! Worker configuration document.
//!
//! Every field has a default so an empty or absent document yields a working
//! configuration. Command-line flags override the token, the store path and
//! the repository cap after loading; [`WorkerConfig::validate`] runs last.

use std::{fs, path::Path, path::PathBuf};

use serde::{Deserialize, Serialize};

use crate::{
    error::{self, Error},
    validity::ValidityPolicy,
};

/// Search queries used when the document does not list any.
pub const DEFAULT_QUERIES: &[&str] = &[
    "vim theme",
    "vim color scheme",
    "vim colorscheme",
    "vim colour scheme",
    "vim colourscheme",
    "neovim theme",
    "neovim color scheme",
    "neovim colorscheme",
    "neovim colour scheme",
    "neovim colourscheme",
];

/// Root configuration document.
///
/// # Examples
///
/// ```
/// use vcsw::WorkerConfig;
///
/// let yaml = r#"
/// repository_count_limit: 20
/// sandbox:
///   editor: /usr/local/bin/nvim
/// "#;
/// let config: WorkerConfig = serde_yaml::from_str(yaml,).expect("valid configuration",);
/// assert_eq!(config.repository_count_limit, 20);
/// assert_eq!(config.file_count_limit, 50);
/// assert_eq!(config.sandbox.editor, "/usr/local/bin/nvim");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize,)]
#[serde(default)]
pub struct WorkerConfig
{
    /// Free-text repository search queries.
    pub queries: Vec<String,>,

    /// Soft cap on search results per discovery run.
    pub repository_count_limit: usize,

    /// Repositories listing more files than this are not scanned.
    pub file_count_limit: usize,

    /// Number of daily points spanned by the trend.
    pub trend_window_days: usize,

    /// Whether an empty scheme list fails the update gate.
    pub require_schemes: bool,

    /// Location of the JSON catalog.
    pub store_path: PathBuf,

    /// Editor sandbox settings.
    pub sandbox: SandboxConfig,
}

impl Default for WorkerConfig
{
    fn default() -> Self
    {
        Self {
            queries:                DEFAULT_QUERIES.iter().map(|query| (*query).to_owned(),).collect(),
            repository_count_limit: 100,
            file_count_limit:       crate::github::DEFAULT_FILE_LIMIT,
            trend_window_days:      7,
            require_schemes:        true,
            store_path:             PathBuf::from("catalog.json",),
            sandbox:                SandboxConfig::default(),
        }
    }
}

/// Settings of the ephemeral editor runtime.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize,)]
#[serde(default)]
pub struct SandboxConfig
{
    /// Ephemeral directory, recreated on every render run.
    pub work_dir: PathBuf,

    /// Editor binary.
    pub editor: String,

    /// Git binary.
    pub git: String,

    /// Editor runtime to mirror. Queried from the editor when absent.
    pub runtime_dir: Option<PathBuf,>,

    /// `owner/name` of plugins installed before any repository.
    pub helper_plugins: Vec<String,>,

    /// Built-in scheme kept so the editor always starts.
    pub fallback_scheme: String,

    /// Scheme names dropped from render output.
    pub ignored_schemes: Vec<String,>,
}

impl Default for SandboxConfig
{
    fn default() -> Self
    {
        Self {
            work_dir:        PathBuf::from(".tmp",),
            editor:          "nvim".to_owned(),
            git:             "git".to_owned(),
            runtime_dir:     None,
            helper_plugins:  vec!["rktjmp/lush.nvim".to_owned(), "tjdevries/colorbuddy.nvim".to_owned()],
            fallback_scheme: "default".to_owned(),
            ignored_schemes: vec!["lush_template".to_owned(), "colorbuddy".to_owned()],
        }
    }
}

impl WorkerConfig
{
    /// Gate settings derived from the document.
    pub fn validity_policy(&self,) -> ValidityPolicy
    {
        ValidityPolicy {
            require_schemes: self.require_schemes,
        }
    }

    /// Checks invariants the passes rely on.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] describing the first violated rule.
    pub fn validate(&self,) -> Result<(), Error,>
    {
        if self.queries.iter().all(|query| query.trim().is_empty(),) {
            return Err(Error::validation("at least one search query is required",),);
        }
        if self.repository_count_limit == 0 {
            return Err(Error::validation("repository_count_limit must be positive",),);
        }
        if self.file_count_limit == 0 {
            return Err(Error::validation("file_count_limit must be positive",),);
        }
        if self.trend_window_days == 0 {
            return Err(Error::validation("trend_window_days must be positive",),);
        }
        if self.sandbox.editor.trim().is_empty() {
            return Err(Error::validation("sandbox.editor must not be empty",),);
        }
        if self.sandbox.git.trim().is_empty() {
            return Err(Error::validation("sandbox.git must not be empty",),);
        }
        if self.sandbox.fallback_scheme.trim().is_empty() {
            return Err(Error::validation("sandbox.fallback_scheme must not be empty",),);
        }
        for plugin in &self.sandbox.helper_plugins {
            if parse_repository_key(plugin,).is_none() {
                return Err(Error::validation(format!(
                    "helper plugin '{plugin}' must be written as owner/name"
                ),),);
            }
        }
        Ok((),)
    }
}

/// Splits an `owner/name` key.
///
/// # Example
///
/// ```
/// assert_eq!(vcsw::parse_repository_key("folke/tokyonight.nvim"), Some(("folke", "tokyonight.nvim")));
/// assert_eq!(vcsw::parse_repository_key("folke"), None);
/// ```
pub fn parse_repository_key(key: &str,) -> Option<(&str, &str,),>
{
    let (owner, name,) = key.trim().split_once('/',)?;
    if owner.is_empty() || name.is_empty() || name.contains('/',) {
        return None;
    }
    Some((owner, name,),)
}

/// Loads the configuration at `path`, or the defaults when `path` is `None`.
///
/// # Errors
///
/// Returns [`Error::Io`] when the file cannot be read and [`Error::Parse`]
/// when it is not valid YAML.
pub fn load_config(path: Option<&Path,>,) -> Result<WorkerConfig, Error,>
{
    match path {
        Some(path,) => {
            let contents =
                fs::read_to_string(path,).map_err(|source| error::io_error(path, source,),)?;
            parse_config(&contents,)
        }
        None => Ok(WorkerConfig::default(),),
    }
}

/// Parses a configuration document. Blank documents yield the defaults.
///
/// # Errors
///
/// Propagates [`Error::Parse`] when the YAML cannot be decoded.
pub fn parse_config(contents: &str,) -> Result<WorkerConfig, Error,>
{
    if contents.trim().is_empty() {
        return Ok(WorkerConfig::default(),);
    }
    Ok(serde_yaml::from_str(contents,)?,)
}
