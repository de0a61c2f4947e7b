// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Repository persistence.
//!
//! The passes only see the [`RepositoryStore`] trait: point lookups, a
//! filtered listing, partial-field upserts by id and an append-only report
//! log. [`JsonStore`] keeps the whole catalog in one JSON document and
//! rewrites it atomically after every mutation, so a run interrupted midway
//! keeps every upsert committed before the interruption.

use std::{
    fs,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    error::{Error, io_error},
    history::StargazersHistory,
    model::{ColorScheme, Repository},
};

/// Audit record appended once per job run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize,)]
#[serde(rename_all = "camelCase")]
pub struct Report
{
    pub job:             String,
    pub elapsed_seconds: f64,
    pub created_at:      DateTime<Utc,>,
    /// Job specific payload, e.g. `{"repositoryCount": 12}`.
    pub data:            serde_json::Value,
}

/// Partial update of a stored repository. `None` fields are left untouched.
///
/// Nullable attributes use a nested option so that clearing a value is
/// distinguishable from leaving it alone.
#[derive(Debug, Clone, Default, PartialEq,)]
pub struct RepositoryPatch
{
    pub avatar_url:         Option<Option<String,>,>,
    pub homepage_url:       Option<Option<String,>,>,
    pub description:        Option<Option<String,>,>,
    pub license:            Option<Option<String,>,>,
    pub last_commit_at:     Option<Option<DateTime<Utc,>,>,>,
    pub stargazers_count:   Option<u32,>,
    pub stargazers_history: Option<StargazersHistory,>,
    pub trend:              Option<i64,>,
    pub schemes:            Option<Vec<ColorScheme,>,>,
    pub is_lua:             Option<bool,>,
    pub is_vim:             Option<bool,>,
    pub update_valid:       Option<bool,>,
    pub updated_at:         Option<DateTime<Utc,>,>,
    pub generate_valid:     Option<bool,>,
    pub generated_at:       Option<DateTime<Utc,>,>,
}

impl RepositoryPatch
{
    /// Writes every set field into `repository`.
    pub fn apply_to(self, repository: &mut Repository,)
    {
        fn set<T,>(slot: &mut T, value: Option<T,>,)
        {
            if let Some(value,) = value {
                *slot = value;
            }
        }

        set(&mut repository.owner.avatar_url, self.avatar_url,);
        set(&mut repository.homepage_url, self.homepage_url,);
        set(&mut repository.description, self.description,);
        set(&mut repository.license, self.license,);
        set(&mut repository.last_commit_at, self.last_commit_at,);
        set(&mut repository.stargazers_count, self.stargazers_count,);
        set(&mut repository.stargazers_history, self.stargazers_history,);
        set(&mut repository.trend, self.trend,);
        set(&mut repository.schemes, self.schemes,);
        set(&mut repository.is_lua, self.is_lua,);
        set(&mut repository.is_vim, self.is_vim,);
        set(&mut repository.update_valid, self.update_valid,);
        set(&mut repository.updated_at, self.updated_at.map(Some,),);
        set(&mut repository.generate_valid, self.generate_valid,);
        set(&mut repository.generated_at, self.generated_at.map(Some,),);
    }
}

/// Persistence consumed by the passes.
pub trait RepositoryStore: Send
{
    /// Every stored repository, in storage order.
    fn all(&self,) -> Vec<Repository,>;

    /// Looks a repository up by owner and name, ignoring case.
    fn find_by_key(&self, owner: &str, name: &str,) -> Option<Repository,>;

    /// Repositories whose last refresh left them update-valid.
    fn update_valid(&self,) -> Vec<Repository,>;

    /// Upserts discovery results by id.
    ///
    /// Known repositories only get their discovery fields refreshed (owner,
    /// name, URLs, description, creation date); everything the passes
    /// computed is preserved. Returns the number of new repositories.
    ///
    /// # Errors
    ///
    /// Returns [`Error`] when the catalog cannot be written.
    fn insert_discovered(&mut self, repositories: Vec<Repository,>,) -> Result<usize, Error,>;

    /// Applies a partial update to the repository with `id`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] for unknown ids and [`Error`] when the
    /// catalog cannot be written.
    fn apply(&mut self, id: u64, patch: RepositoryPatch,) -> Result<(), Error,>;

    /// Appends an audit record.
    ///
    /// # Errors
    ///
    /// Returns [`Error`] when the catalog cannot be written.
    fn append_report(&mut self, report: Report,) -> Result<(), Error,>;
}

#[derive(Debug, Default, Serialize, Deserialize,)]
struct Catalog
{
    #[serde(default)]
    repositories: Vec<Repository,>,
    #[serde(default)]
    reports:      Vec<Report,>,
}

/// [`RepositoryStore`] persisted as a single JSON document.
#[derive(Debug,)]
pub struct JsonStore
{
    path:    PathBuf,
    catalog: Catalog,
}

impl JsonStore
{
    /// Opens the catalog at `path`. A missing file yields an empty catalog;
    /// it is created on the first write.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] when the file exists but cannot be read and
    /// [`Error::Serialize`] when it is not a valid catalog.
    ///
    /// # Example
    ///
    /// ```
    /// use vcsw::{JsonStore, RepositoryStore};
    ///
    /// let dir = tempfile::tempdir().expect("tempdir",);
    /// let store = JsonStore::open(dir.path().join("catalog.json",),).expect("empty catalog",);
    /// assert!(store.all().is_empty());
    /// ```
    pub fn open(path: impl Into<PathBuf,>,) -> Result<Self, Error,>
    {
        let path = path.into();
        let catalog = match fs::read_to_string(&path,) {
            Ok(contents,) => serde_json::from_str(&contents,)?,
            Err(source,) if source.kind() == std::io::ErrorKind::NotFound => Catalog::default(),
            Err(source,) => return Err(io_error(&path, source,),),
        };
        debug!("Loaded {} repositories from {}", catalog.repositories.len(), path.display());

        Ok(Self {
            path,
            catalog,
        },)
    }

    pub fn path(&self,) -> &Path
    {
        &self.path
    }

    /// Audit records in append order.
    pub fn reports(&self,) -> &[Report]
    {
        &self.catalog.reports
    }

    fn persist(&self,) -> Result<(), Error,>
    {
        if let Some(parent,) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent,).map_err(|source| io_error(parent, source,),)?;
        }

        let contents = serde_json::to_string_pretty(&self.catalog,)?;
        let staging = self.path.with_extension("json.tmp",);
        fs::write(&staging, contents,).map_err(|source| io_error(&staging, source,),)?;
        fs::rename(&staging, &self.path,).map_err(|source| io_error(&self.path, source,),)
    }
}

impl RepositoryStore for JsonStore
{
    fn all(&self,) -> Vec<Repository,>
    {
        self.catalog.repositories.clone()
    }

    fn find_by_key(&self, owner: &str, name: &str,) -> Option<Repository,>
    {
        self.catalog.repositories.iter().find(|repository| repository.matches(owner, name,),).cloned()
    }

    fn update_valid(&self,) -> Vec<Repository,>
    {
        self.catalog
            .repositories
            .iter()
            .filter(|repository| repository.update_valid,)
            .cloned()
            .collect()
    }

    fn insert_discovered(&mut self, repositories: Vec<Repository,>,) -> Result<usize, Error,>
    {
        let mut added = 0;
        for discovered in repositories {
            match self.catalog.repositories.iter_mut().find(|stored| stored.id == discovered.id,) {
                Some(stored,) => {
                    stored.owner = discovered.owner;
                    stored.name = discovered.name;
                    stored.github_url = discovered.github_url;
                    stored.homepage_url = discovered.homepage_url;
                    stored.description = discovered.description;
                    stored.github_created_at = discovered.github_created_at;
                }
                None => {
                    self.catalog.repositories.push(discovered,);
                    added += 1;
                }
            }
        }

        self.persist()?;
        Ok(added,)
    }

    fn apply(&mut self, id: u64, patch: RepositoryPatch,) -> Result<(), Error,>
    {
        let repository = self
            .catalog
            .repositories
            .iter_mut()
            .find(|repository| repository.id == id,)
            .ok_or_else(|| Error::validation(format!("unknown repository id {id}"),),)?;

        patch.apply_to(repository,);
        self.persist()
    }

    fn append_report(&mut self, report: Report,) -> Result<(), Error,>
    {
        self.catalog.reports.push(report,);
        self.persist()
    }
}

#[cfg(test)]
mod tests
{
    use chrono::TimeZone;
    use tempfile::tempdir;

    use super::*;
    use crate::model::Owner;

    fn repository(id: u64, owner: &str, name: &str,) -> Repository
    {
        Repository {
            id,
            owner: Owner {
                name: owner.to_owned(), avatar_url: None,
            },
            name: name.to_owned(),
            github_url: format!("https://github.com/{owner}/{name}"),
            ..Repository::default()
        }
    }

    #[test]
    fn open_missing_file_yields_empty_catalog()
    {
        let dir = tempdir().expect("failed to create tempdir",);
        let store = JsonStore::open(dir.path().join("catalog.json",),).expect("open failed",);

        assert!(store.all().is_empty());
        assert!(!store.path().exists());
    }

    #[test]
    fn open_rejects_malformed_catalog()
    {
        let dir = tempdir().expect("failed to create tempdir",);
        let path = dir.path().join("catalog.json",);
        fs::write(&path, "{ not json",).expect("failed to write fixture",);

        assert!(matches!(JsonStore::open(&path), Err(Error::Serialize { .. })));
    }

    #[test]
    fn insert_discovered_preserves_computed_fields()
    {
        let dir = tempdir().expect("failed to create tempdir",);
        let path = dir.path().join("catalog.json",);
        let mut store = JsonStore::open(&path,).expect("open failed",);

        assert_eq!(store.insert_discovered(vec![repository(1, "a", "one",)],).expect("insert",), 1);
        store
            .apply(1, RepositoryPatch {
                update_valid: Some(true,),
                stargazers_count: Some(10,),
                ..RepositoryPatch::default()
            },)
            .expect("apply",);

        let mut rediscovered = repository(1, "a", "one",);
        rediscovered.description = Some("Dark theme".to_owned(),);
        let added = store
            .insert_discovered(vec![rediscovered, repository(2, "b", "two",)],)
            .expect("insert",);

        assert_eq!(added, 1);
        let reopened = JsonStore::open(&path,).expect("reopen failed",);
        let first = reopened.find_by_key("A", "ONE",).expect("stored repository",);
        assert!(first.update_valid);
        assert_eq!(first.stargazers_count, 10);
        assert_eq!(first.description.as_deref(), Some("Dark theme"));
        assert_eq!(reopened.all().len(), 2);
    }

    #[test]
    fn apply_clears_nullable_fields_and_filters_update_valid()
    {
        let dir = tempdir().expect("failed to create tempdir",);
        let mut store = JsonStore::open(dir.path().join("catalog.json",),).expect("open failed",);
        let mut licensed = repository(1, "a", "one",);
        licensed.license = Some("MIT".to_owned(),);
        store.insert_discovered(vec![licensed, repository(2, "b", "two",)],).expect("insert",);

        let updated_at = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0,).single().expect("valid time",);
        store
            .apply(1, RepositoryPatch {
                license: Some(None,),
                update_valid: Some(true,),
                updated_at: Some(updated_at,),
                ..RepositoryPatch::default()
            },)
            .expect("apply",);

        let valid = store.update_valid();
        assert_eq!(valid.len(), 1);
        assert_eq!(valid[0].license, None);
        assert_eq!(valid[0].updated_at, Some(updated_at));
    }

    #[test]
    fn apply_unknown_id_is_rejected()
    {
        let dir = tempdir().expect("failed to create tempdir",);
        let mut store = JsonStore::open(dir.path().join("catalog.json",),).expect("open failed",);

        let result = store.apply(99, RepositoryPatch::default(),);
        assert!(matches!(result, Err(Error::Validation { .. })));
    }

    #[test]
    fn reports_are_appended_and_persisted()
    {
        let dir = tempdir().expect("failed to create tempdir",);
        let path = dir.path().join("nested/catalog.json",);
        let mut store = JsonStore::open(&path,).expect("open failed",);

        store
            .append_report(Report {
                job:             "refresh".to_owned(),
                elapsed_seconds: 1.5,
                created_at:      Utc::now(),
                data:            serde_json::json!({ "repositoryCount": 3 }),
            },)
            .expect("append",);

        let reopened = JsonStore::open(&path,).expect("reopen failed",);
        assert_eq!(reopened.reports().len(), 1);
        assert_eq!(reopened.reports()[0].data["repositoryCount"], 3);
        assert!(!path.with_extension("json.tmp").exists());
    }
}
