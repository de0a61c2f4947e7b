// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! In-memory [`CatalogApi`] used by unit tests.

use std::{collections::HashMap, sync::Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{ApiError, CatalogApi, ContentEntry, ContentKind, RepositoryDetail, SearchPage};

#[derive(Default)]
pub(crate) struct FakeApi {
    /// Results per full query string, including the qualifier.
    pub searches:     HashMap<String, Vec<RepositoryDetail>>,
    /// Overrides the reported total of every search.
    pub total_count:  Option<u64>,
    pub repositories: Vec<RepositoryDetail>,
    /// Keyed by `owner/name` or `owner/name:path`.
    pub commits:      HashMap<String, DateTime<Utc>>,
    /// Keyed by `owner/name/path`, root listing under `owner/name/`.
    pub trees:        HashMap<String, Vec<ContentEntry>>,
    /// Raw file text per download URL.
    pub files:        HashMap<String, String>,
    /// Operations failing with a rate limit before succeeding, with the
    /// number of failures left.
    pub rate_limited: Mutex<HashMap<String, u32>>,
    pub calls:        Mutex<Vec<String>>
}

impl FakeApi {
    pub fn rate_limit(self, operation: &str, times: u32) -> Self {
        if let Ok(mut limited) = self.rate_limited.lock() {
            limited.insert(operation.to_owned(), times);
        }
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|calls| calls.clone()).unwrap_or_default()
    }

    fn record(&self, operation: &str, call: String) -> Result<(), ApiError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
        if let Ok(mut limited) = self.rate_limited.lock()
            && let Some(left) = limited.get_mut(operation)
            && *left > 0
        {
            *left -= 1;
            return Err(ApiError::RateLimited {
                reset_at: None
            });
        }
        Ok(())
    }
}

pub(crate) fn file(path: &str) -> ContentEntry {
    ContentEntry {
        path:         path.to_owned(),
        kind:         ContentKind::File,
        download_url: Some(format!("https://raw.example/{path}"))
    }
}

pub(crate) fn dir(path: &str) -> ContentEntry {
    ContentEntry {
        path:         path.to_owned(),
        kind:         ContentKind::Dir,
        download_url: None
    }
}

pub(crate) fn detail(id: u64, owner: &str, name: &str, stars: u32) -> RepositoryDetail {
    RepositoryDetail {
        id,
        name: name.to_owned(),
        owner: super::OwnerDetail {
            login:      owner.to_owned(),
            avatar_url: Some(format!("https://avatars.example/{owner}"))
        },
        html_url: format!("https://github.com/{owner}/{name}"),
        default_branch: Some("main".to_owned()),
        stargazers_count: stars,
        ..RepositoryDetail::default()
    }
}

#[async_trait]
impl CatalogApi for FakeApi {
    async fn search_repositories(
        &self,
        query: &str,
        page: u32,
        per_page: u32
    ) -> Result<SearchPage, ApiError> {
        self.record("search", format!("search {query} page={page} per_page={per_page}"))?;
        let all = self.searches.get(query).cloned().unwrap_or_default();
        let start = (page.saturating_sub(1) * per_page) as usize;
        let items = all.iter().skip(start).take(per_page as usize).cloned().collect();
        Ok(SearchPage {
            total_count: self.total_count.unwrap_or(all.len() as u64),
            items
        })
    }

    async fn repository(&self, owner: &str, name: &str) -> Result<RepositoryDetail, ApiError> {
        self.record("repository", format!("repository {owner}/{name}"))?;
        self.repositories
            .iter()
            .find(|detail| {
                detail.owner.login.eq_ignore_ascii_case(owner) && detail.name.eq_ignore_ascii_case(name)
            })
            .cloned()
            .ok_or_else(|| ApiError::request(format!("{owner}/{name} not found")))
    }

    async fn latest_commit(
        &self,
        owner: &str,
        name: &str,
        branch: &str,
        path: Option<&str>
    ) -> Result<Option<DateTime<Utc>>, ApiError> {
        let key = match path {
            Some(path) => format!("{owner}/{name}:{path}"),
            None => format!("{owner}/{name}")
        };
        self.record("latest_commit", format!("latest_commit {key}@{branch}"))?;
        Ok(self.commits.get(&key).copied())
    }

    async fn contents(
        &self,
        owner: &str,
        name: &str,
        path: &str
    ) -> Result<Vec<ContentEntry>, ApiError> {
        let key = format!("{owner}/{name}/{path}");
        self.record("contents", format!("contents {key}"))?;
        Ok(self.trees.get(&key).cloned().unwrap_or_default())
    }

    async fn download(&self, url: &str) -> Result<String, ApiError> {
        self.record("download", format!("download {url}"))?;
        self.files
            .get(url)
            .cloned()
            .ok_or_else(|| ApiError::request(format!("{url} not found")))
    }

    async fn rate_limit_reset(&self) -> Result<DateTime<Utc>, ApiError> {
        Ok(Utc::now() - chrono::Duration::seconds(1))
    }
}
