#![allow(non_shorthand_field_patterns)]
// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Seam between the passes and the code-hosting API.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Failures reported by a [`CatalogApi`].
#[derive(Debug, masterror::Error)]
pub enum ApiError {
    /// The API refused the request until the quota resets. `reset_at` is
    /// `None` when the response did not carry the reset time.
    #[error("rate limit exceeded")]
    RateLimited {
        reset_at: Option<DateTime<Utc>>
    },
    /// Any other transport or API failure.
    #[error("request failed: {message}")]
    Request {
        message: String
    },
    /// A recursive listing crossed the configured file ceiling.
    #[error("repository lists more than {limit} files")]
    TooManyFiles {
        limit: usize
    },
    /// The run was cancelled while waiting for the quota to reset.
    #[error("cancelled during {operation}")]
    Cancelled {
        operation: String
    }
}

impl ApiError {
    pub fn request<M>(message: M) -> Self
    where
        M: Into<String>
    {
        Self::Request {
            message: message.into()
        }
    }
}

impl From<ApiError> for crate::Error {
    fn from(error: ApiError) -> Self {
        match error {
            ApiError::Cancelled {
                operation
            } => Self::Cancelled {
                message: operation
            },
            other => Self::service(other.to_string())
        }
    }
}

/// Account summary embedded in repository payloads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct OwnerDetail {
    pub login:      String,
    #[serde(default)]
    pub avatar_url: Option<String>
}

/// License summary embedded in repository payloads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct LicenseDetail {
    #[serde(default)]
    pub spdx_id: Option<String>
}

/// Repository payload shared by search results and direct lookups.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RepositoryDetail {
    pub id:               u64,
    pub name:             String,
    pub owner:            OwnerDetail,
    pub html_url:         String,
    #[serde(default)]
    pub homepage:         Option<String>,
    #[serde(default)]
    pub description:      Option<String>,
    #[serde(default)]
    pub default_branch:   Option<String>,
    #[serde(default)]
    pub stargazers_count: u32,
    #[serde(default)]
    pub created_at:       Option<DateTime<Utc>>,
    #[serde(default)]
    pub pushed_at:        Option<DateTime<Utc>>,
    #[serde(default)]
    pub license:          Option<LicenseDetail>
}

impl RepositoryDetail {
    /// SPDX id of the detected license. GitHub reports `NOASSERTION` for
    /// licenses it cannot classify, which is treated as absent.
    pub fn spdx_id(&self) -> Option<&str> {
        self.license
            .as_ref()
            .and_then(|license| license.spdx_id.as_deref())
            .filter(|id| !id.is_empty() && *id != "NOASSERTION")
    }
}

/// One page of repository search results.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SearchPage {
    pub total_count: u64,
    #[serde(default)]
    pub items:       Vec<RepositoryDetail>
}

/// Kind of a directory listing entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    File,
    Dir,
    Symlink,
    Submodule,
    #[serde(other)]
    Other
}

/// Entry of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ContentEntry {
    pub path:         String,
    #[serde(rename = "type")]
    pub kind:         ContentKind,
    #[serde(default)]
    pub download_url: Option<String>
}

/// Operations the passes need from the code-hosting API.
///
/// Every method reports quota exhaustion as [`ApiError::RateLimited`] and
/// leaves waiting to the caller.
#[async_trait]
pub trait CatalogApi: Send + Sync {
    /// Searches repositories sorted by stars.
    async fn search_repositories(
        &self,
        query: &str,
        page: u32,
        per_page: u32
    ) -> Result<SearchPage, ApiError>;

    async fn repository(&self, owner: &str, name: &str) -> Result<RepositoryDetail, ApiError>;

    /// Timestamp of the newest commit on `branch`, optionally restricted to
    /// commits touching `path`. `None` when the branch has no such commit.
    async fn latest_commit(
        &self,
        owner: &str,
        name: &str,
        branch: &str,
        path: Option<&str>
    ) -> Result<Option<DateTime<Utc>>, ApiError>;

    /// Lists one directory; `path` is empty for the repository root.
    async fn contents(
        &self,
        owner: &str,
        name: &str,
        path: &str
    ) -> Result<Vec<ContentEntry>, ApiError>;

    /// Downloads a raw file as text.
    async fn download(&self, url: &str) -> Result<String, ApiError>;

    /// Time at which the exhausted quota resets.
    async fn rate_limit_reset(&self) -> Result<DateTime<Utc>, ApiError>;
}
