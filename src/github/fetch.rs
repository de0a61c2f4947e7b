// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Rate-limit aware access to repository metadata and files.

use std::{collections::VecDeque, sync::Arc};

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::{ApiError, CatalogApi, ContentEntry, ContentKind, RepositoryDetail};
use crate::retry::retry_on_rate_limit;

/// Default ceiling of a recursive file listing.
pub const DEFAULT_FILE_LIMIT: usize = 50;

/// Client shared by every pass of a run.
///
/// Wraps a [`CatalogApi`] so that each call waits out rate limits and is
/// retried unchanged; cancelling the token aborts a pending wait.
#[derive(Clone)]
pub struct FetchClient {
    api:        Arc<dyn CatalogApi>,
    cancel:     CancellationToken,
    file_limit: usize
}

impl FetchClient {
    pub fn new(api: Arc<dyn CatalogApi>, cancel: CancellationToken, file_limit: usize) -> Self {
        Self {
            api,
            cancel,
            file_limit
        }
    }

    pub(crate) fn api(&self) -> &dyn CatalogApi {
        self.api.as_ref()
    }

    pub(crate) fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Fails once the run has been cancelled.
    ///
    /// Passes call this between repositories so an interrupt stops them
    /// outside rate-limit waits too.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Cancelled`] naming `operation` when the token has
    /// fired.
    pub fn check_cancelled(&self, operation: &str) -> Result<(), ApiError> {
        if self.cancel.is_cancelled() {
            return Err(ApiError::Cancelled {
                operation: operation.to_owned()
            });
        }
        Ok(())
    }

    /// Fetches repository metadata.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] for any failure other than a rate limit.
    pub async fn repository(&self, owner: &str, name: &str) -> Result<RepositoryDetail, ApiError> {
        let operation = format!("repository {owner}/{name}");
        retry_on_rate_limit(self.api(), &self.cancel, &operation, || {
            self.api.repository(owner, name)
        })
        .await
    }

    /// Timestamp of the newest commit on `branch`, optionally limited to
    /// commits touching `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] for any failure other than a rate limit.
    pub async fn last_commit_at(
        &self,
        owner: &str,
        name: &str,
        branch: &str,
        path: Option<&str>
    ) -> Result<Option<DateTime<Utc>>, ApiError> {
        let operation = match path {
            Some(path) => format!("last commit of {owner}/{name}:{path}"),
            None => format!("last commit of {owner}/{name}")
        };
        retry_on_rate_limit(self.api(), &self.cancel, &operation, || {
            self.api.latest_commit(owner, name, branch, path)
        })
        .await
    }

    /// Recursively lists every file of a repository.
    ///
    /// Directories are walked breadth first. Symlinks and submodules are
    /// skipped.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::TooManyFiles`] as soon as the listing holds more
    /// files than the configured ceiling, and any non rate-limit API error.
    pub async fn list_files(&self, owner: &str, name: &str) -> Result<Vec<ContentEntry>, ApiError> {
        let mut files = Vec::new();
        let mut pending = VecDeque::from([String::new()]);

        while let Some(path) = pending.pop_front() {
            let operation = format!("contents of {owner}/{name}/{path}");
            let entries = retry_on_rate_limit(self.api(), &self.cancel, &operation, || {
                self.api.contents(owner, name, &path)
            })
            .await?;

            for entry in entries {
                match entry.kind {
                    ContentKind::File => {
                        files.push(entry);
                        if files.len() > self.file_limit {
                            return Err(ApiError::TooManyFiles {
                                limit: self.file_limit
                            });
                        }
                    }
                    ContentKind::Dir => pending.push_back(entry.path),
                    _ => debug!("Skipping {} in {}/{}", entry.path, owner, name)
                }
            }
        }

        Ok(files)
    }

    /// Downloads a raw file.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] when the download fails.
    pub async fn download(&self, url: &str) -> Result<String, ApiError> {
        self.api.download(url).await
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::github::fake::{FakeApi, detail, dir, file};

    fn client(api: FakeApi, file_limit: usize) -> (FetchClient, Arc<FakeApi>) {
        let api = Arc::new(api);
        let client = FetchClient::new(api.clone(), CancellationToken::new(), file_limit);
        (client, api)
    }

    #[tokio::test(start_paused = true)]
    async fn repository_is_retried_after_rate_limit() {
        let api = FakeApi {
            repositories: vec![detail(1, "folke", "tokyonight.nvim", 5000)],
            ..FakeApi::default()
        }
        .rate_limit("repository", 2);
        let (client, api) = client(api, DEFAULT_FILE_LIMIT);

        let found = client.repository("folke", "tokyonight.nvim").await.expect("repository");

        assert_eq!(found.id, 1);
        assert_eq!(api.calls().len(), 3);
    }

    #[tokio::test]
    async fn last_commit_respects_path_filter() {
        let whole = Utc.with_ymd_and_hms(2024, 4, 2, 0, 0, 0).single().expect("valid time");
        let scoped = Utc.with_ymd_and_hms(2023, 1, 9, 0, 0, 0).single().expect("valid time");
        let api = FakeApi {
            commits: [
                ("a/b".to_owned(), whole),
                ("a/b:colors/b.vim".to_owned(), scoped)
            ]
            .into_iter()
            .collect(),
            ..FakeApi::default()
        };
        let (client, _) = client(api, DEFAULT_FILE_LIMIT);

        assert_eq!(client.last_commit_at("a", "b", "main", None).await.expect("commit"), Some(whole));
        assert_eq!(
            client.last_commit_at("a", "b", "main", Some("colors/b.vim")).await.expect("commit"),
            Some(scoped)
        );
        assert_eq!(client.last_commit_at("a", "c", "main", None).await.expect("commit"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn list_files_walks_directories() {
        let api = FakeApi {
            trees: [
                ("a/b/".to_owned(), vec![file("README.md"), dir("colors"), dir("lua")]),
                ("a/b/colors".to_owned(), vec![file("colors/b.vim")]),
                ("a/b/lua".to_owned(), vec![dir("lua/b"), file("lua/init.lua")]),
                ("a/b/lua/b".to_owned(), vec![file("lua/b/palette.lua")])
            ]
            .into_iter()
            .collect(),
            ..FakeApi::default()
        }
        .rate_limit("contents", 1);
        let (client, _) = client(api, DEFAULT_FILE_LIMIT);

        let files = client.list_files("a", "b").await.expect("listing");
        let paths: Vec<&str> = files.iter().map(|entry| entry.path.as_str()).collect();

        assert_eq!(paths, vec!["README.md", "colors/b.vim", "lua/init.lua", "lua/b/palette.lua"]);
    }

    #[test]
    fn check_cancelled_follows_the_token() {
        let (client, _) = client(FakeApi::default(), DEFAULT_FILE_LIMIT);
        assert!(client.check_cancelled("refresh").is_ok());

        client.cancel_token().cancel();
        let result = client.check_cancelled("refresh");
        assert!(matches!(result, Err(ApiError::Cancelled { ref operation }) if operation == "refresh"));
    }

    #[tokio::test]
    async fn list_files_aborts_past_the_ceiling() {
        let api = FakeApi {
            trees: [(
                "a/b/".to_owned(),
                (0..4).map(|index| file(&format!("colors/{index}.vim"))).collect()
            )]
            .into_iter()
            .collect(),
            ..FakeApi::default()
        };
        let (client, _) = client(api, 3);

        let result = client.list_files("a", "b").await;
        assert!(matches!(result, Err(ApiError::TooManyFiles { limit: 3 })));
    }
}
