// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Gates deciding whether a repository moves on to the next pass.
//!
//! Both gates are recomputed from the current record on every pass; nothing
//! here is persisted apart from the resulting booleans.

use std::fmt;

use chrono::NaiveDate;

use crate::model::Repository;

/// Tunables for the update gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq,)]
pub struct ValidityPolicy
{
    /// Reject repositories whose reconciled scheme list is empty.
    pub require_schemes: bool,
}

impl Default for ValidityPolicy
{
    fn default() -> Self
    {
        Self {
            require_schemes: true,
        }
    }
}

/// First failing check of a gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq,)]
pub enum InvalidReason
{
    MissingLastCommit,
    NoStars,
    EmptyHistory,
    StaleHistory,
    NoSchemes,
    NotUpdateValid,
    NothingRendered,
}

impl fmt::Display for InvalidReason
{
    fn fmt(&self, f: &mut fmt::Formatter<'_,>,) -> fmt::Result
    {
        let message = match self {
            Self::MissingLastCommit => "last commit date is unknown",
            Self::NoStars => "repository has no stars",
            Self::EmptyHistory => "stargazers history is empty",
            Self::StaleHistory => "stargazers history was not updated today",
            Self::NoSchemes => "no color schemes declared",
            Self::NotUpdateValid => "repository failed the update checks",
            Self::NothingRendered => "no color scheme rendered",
        };
        f.write_str(message,)
    }
}

/// Evaluates the update gate.
///
/// # Errors
///
/// Returns the first [`InvalidReason`] in check order: last commit, stars,
/// history presence, history freshness, schemes.
pub fn check_update(
    repository: &Repository,
    today: NaiveDate,
    policy: ValidityPolicy,
) -> Result<(), InvalidReason,>
{
    if repository.last_commit_at.is_none() {
        return Err(InvalidReason::MissingLastCommit,);
    }
    if repository.stargazers_count < 1 {
        return Err(InvalidReason::NoStars,);
    }
    let Some(newest,) = repository.stargazers_history.newest() else {
        return Err(InvalidReason::EmptyHistory,);
    };
    if newest.date != today {
        return Err(InvalidReason::StaleHistory,);
    }
    if policy.require_schemes && repository.schemes.is_empty() {
        return Err(InvalidReason::NoSchemes,);
    }
    Ok((),)
}

/// Evaluates the generate gate, which includes the update gate.
///
/// # Errors
///
/// Returns [`InvalidReason::NotUpdateValid`] when the update gate fails and
/// [`InvalidReason::NothingRendered`] when no scheme carries rendered data.
pub fn check_generate(
    repository: &Repository,
    today: NaiveDate,
    policy: ValidityPolicy,
) -> Result<(), InvalidReason,>
{
    check_update(repository, today, policy,).map_err(|_| InvalidReason::NotUpdateValid,)?;
    if !repository.schemes.iter().any(|scheme| scheme.is_rendered(),) {
        return Err(InvalidReason::NothingRendered,);
    }
    Ok((),)
}

pub fn is_update_valid(repository: &Repository, today: NaiveDate, policy: ValidityPolicy,) -> bool
{
    check_update(repository, today, policy,).is_ok()
}

pub fn is_generate_valid(
    repository: &Repository,
    today: NaiveDate,
    policy: ValidityPolicy,
) -> bool
{
    check_generate(repository, today, policy,).is_ok()
}

#[cfg(test)]
mod tests
{
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::{
        history::{HistoryEntry, StargazersHistory},
        model::{Background, ColorScheme, ColorTable, Dialect, SchemeSource},
    };

    fn today() -> NaiveDate
    {
        NaiveDate::from_ymd_opt(2024, 6, 10,).expect("valid date",)
    }

    fn valid_repository() -> Repository
    {
        Repository {
            id: 7,
            last_commit_at: Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0,).single(),
            stargazers_count: 12,
            stargazers_history: StargazersHistory::new(vec![HistoryEntry::new(today(), 12,)],),
            schemes: vec![ColorScheme::scanned(
                "nord",
                SchemeSource::default(),
                Dialect::Script,
                None,
            )],
            ..Repository::default()
        }
    }

    #[test]
    fn repository_meeting_every_condition_is_update_valid()
    {
        assert_eq!(check_update(&valid_repository(), today(), ValidityPolicy::default(),), Ok(()));
    }

    #[test]
    fn removing_any_single_condition_fails_the_update_gate()
    {
        let policy = ValidityPolicy::default();
        let cases: Vec<(fn(&mut Repository,), InvalidReason,),> = vec![
            (|repo| repo.last_commit_at = None, InvalidReason::MissingLastCommit,),
            (|repo| repo.stargazers_count = 0, InvalidReason::NoStars,),
            (|repo| repo.stargazers_history = StargazersHistory::default(), InvalidReason::EmptyHistory,),
            (
                |repo| {
                    let yesterday = today().pred_opt().expect("valid date",);
                    repo.stargazers_history =
                        StargazersHistory::new(vec![HistoryEntry::new(yesterday, 12,)],);
                },
                InvalidReason::StaleHistory,
            ),
            (|repo| repo.schemes.clear(), InvalidReason::NoSchemes,),
        ];

        for (mutate, expected,) in cases {
            let mut repository = valid_repository();
            mutate(&mut repository,);
            assert_eq!(check_update(&repository, today(), policy,), Err(expected));
            assert!(!is_update_valid(&repository, today(), policy));
        }
    }

    #[test]
    fn empty_scheme_list_passes_when_policy_allows_it()
    {
        let mut repository = valid_repository();
        repository.schemes.clear();
        let lenient = ValidityPolicy {
            require_schemes: false,
        };

        assert!(is_update_valid(&repository, today(), lenient));
    }

    #[test]
    fn generate_gate_needs_a_rendered_scheme()
    {
        let mut repository = valid_repository();
        assert_eq!(
            check_generate(&repository, today(), ValidityPolicy::default(),),
            Err(InvalidReason::NothingRendered)
        );

        let table: ColorTable = [("NormalBg".to_owned(), "#2e3440".to_owned(),)].into_iter().collect();
        repository.schemes[0].data.set(Background::Dark, table,);
        repository.schemes[0].valid = true;
        assert!(is_generate_valid(&repository, today(), ValidityPolicy::default()));

        repository.stargazers_count = 0;
        assert_eq!(
            check_generate(&repository, today(), ValidityPolicy::default(),),
            Err(InvalidReason::NotUpdateValid)
        );
    }
}
