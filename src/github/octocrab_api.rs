// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! [`CatalogApi`] backed by the GitHub REST API.
//!
//! REST calls go through `octocrab` with hand-written response types; raw
//! file downloads use a plain `reqwest` client since they are served outside
//! the API host.

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use masterror::AppError;
use octocrab::Octocrab;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{ApiError, CatalogApi, ContentEntry, RepositoryDetail, SearchPage};

const USER_AGENT: &str = concat!("vcsw/", env!("CARGO_PKG_VERSION"));

/// Wait applied when no quota bucket is exhausted, which is how secondary
/// limits present themselves.
const SECONDARY_LIMIT_BACKOFF: Duration = Duration::seconds(60,);

#[derive(Debug, Serialize,)]
struct SearchQuery<'a,>
{
    q:        &'a str,
    sort:     &'a str,
    order:    &'a str,
    page:     u32,
    per_page: u32,
}

#[derive(Debug, Serialize,)]
struct CommitQuery<'a,>
{
    sha:      &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    path:     Option<&'a str,>,
    per_page: u32,
}

#[derive(Debug, Deserialize,)]
struct CommitEntry
{
    commit: CommitBody,
}

#[derive(Debug, Deserialize,)]
struct CommitBody
{
    #[serde(default)]
    author:    Option<Signature,>,
    #[serde(default)]
    committer: Option<Signature,>,
}

#[derive(Debug, Deserialize,)]
struct Signature
{
    #[serde(default)]
    date: Option<DateTime<Utc,>,>,
}

#[derive(Debug, Deserialize,)]
struct RateLimitResponse
{
    resources: RateLimitResources,
}

#[derive(Debug, Deserialize,)]
struct RateLimitResources
{
    core:   RateLimitBucket,
    search: RateLimitBucket,
}

#[derive(Debug, Deserialize,)]
struct RateLimitBucket
{
    remaining: u64,
    reset:     i64,
}

/// GitHub client used by the binary.
#[derive(Clone,)]
pub struct OctocrabApi
{
    octocrab: Octocrab,
    http:     reqwest::Client,
}

impl OctocrabApi
{
    /// Builds the client, authenticated when `token` is provided.
    ///
    /// # Errors
    ///
    /// Returns [`AppError`] when either HTTP client cannot be initialized.
    pub fn new(token: Option<&str,>,) -> Result<Self, AppError,>
    {
        let builder = Octocrab::builder();
        let builder = match token {
            Some(token,) => builder.personal_token(token.to_owned(),),
            None => builder,
        };
        let octocrab = builder.build().map_err(|e| {
            AppError::unauthorized(format!("failed to initialize GitHub client: {e}"),)
        },)?;

        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT,)
            .build()
            .map_err(|e| AppError::service(format!("failed to initialize HTTP client: {e}"),),)?;

        Ok(Self {
            octocrab,
            http,
        },)
    }
}

/// Maps an octocrab failure, recognizing the two shapes of quota errors:
/// HTTP 429 and HTTP 403 with a rate limit message.
fn map_error(error: octocrab::Error,) -> ApiError
{
    if let octocrab::Error::GitHub {
        source, ..
    } = &error
    {
        let status = source.status_code.as_u16();
        let message = source.message.to_ascii_lowercase();
        if status == 429 || (status == 403 && message.contains("rate limit")) {
            return ApiError::RateLimited {
                reset_at: None,
            };
        }
    }
    ApiError::request(error.to_string(),)
}

/// Reset time of the exhausted bucket, or a fixed backoff from `now` when
/// every bucket still has quota left.
fn reset_time(resources: &RateLimitResources, now: DateTime<Utc,>,) -> DateTime<Utc,>
{
    latest_exhausted_reset(resources,).unwrap_or(now + SECONDARY_LIMIT_BACKOFF,)
}

fn latest_exhausted_reset(resources: &RateLimitResources,) -> Option<DateTime<Utc,>,>
{
    [&resources.core, &resources.search,]
        .into_iter()
        .filter(|bucket| bucket.remaining == 0,)
        .map(|bucket| bucket.reset,)
        .max()
        .and_then(|reset| Utc.timestamp_opt(reset, 0,).single(),)
}

#[async_trait]
impl CatalogApi for OctocrabApi
{
    async fn search_repositories(
        &self,
        query: &str,
        page: u32,
        per_page: u32,
    ) -> Result<SearchPage, ApiError,>
    {
        let params = SearchQuery {
            q: query,
            sort: "stars",
            order: "desc",
            page,
            per_page,
        };
        self.octocrab.get("/search/repositories", Some(&params,),).await.map_err(map_error,)
    }

    async fn repository(&self, owner: &str, name: &str,) -> Result<RepositoryDetail, ApiError,>
    {
        self.octocrab
            .get(format!("/repos/{owner}/{name}"), None::<&(),>,)
            .await
            .map_err(map_error,)
    }

    async fn latest_commit(
        &self,
        owner: &str,
        name: &str,
        branch: &str,
        path: Option<&str,>,
    ) -> Result<Option<DateTime<Utc,>,>, ApiError,>
    {
        let params = CommitQuery {
            sha: branch,
            path,
            per_page: 1,
        };
        let commits: Vec<CommitEntry,> = self
            .octocrab
            .get(format!("/repos/{owner}/{name}/commits"), Some(&params,),)
            .await
            .map_err(map_error,)?;

        Ok(commits.into_iter().next().and_then(|entry| {
            let body = entry.commit;
            body.author.and_then(|author| author.date,).or(body.committer.and_then(|c| c.date,),)
        },),)
    }

    async fn contents(
        &self,
        owner: &str,
        name: &str,
        path: &str,
    ) -> Result<Vec<ContentEntry,>, ApiError,>
    {
        let route = if path.is_empty() {
            format!("/repos/{owner}/{name}/contents")
        } else {
            format!("/repos/{owner}/{name}/contents/{path}")
        };
        self.octocrab.get(route, None::<&(),>,).await.map_err(map_error,)
    }

    async fn download(&self, url: &str,) -> Result<String, ApiError,>
    {
        debug!("Downloading {}", url);
        let response = self
            .http
            .get(url,)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status,)
            .map_err(|e| ApiError::request(format!("failed to download {url}: {e}"),),)?;

        response
            .text()
            .await
            .map_err(|e| ApiError::request(format!("failed to read {url}: {e}"),),)
    }

    async fn rate_limit_reset(&self,) -> Result<DateTime<Utc,>, ApiError,>
    {
        let response: RateLimitResponse =
            self.octocrab.get("/rate_limit", None::<&(),>,).await.map_err(map_error,)?;
        Ok(reset_time(&response.resources, Utc::now(),),)
    }
}
