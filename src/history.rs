// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Bounded daily star-count series.
//!
//! The series holds at most [`HISTORY_CAPACITY`] points, one per UTC calendar
//! day, newest first. Appending twice on the same day replaces the earlier
//! point so reruns of the refresh pass stay idempotent.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Maximum number of daily points retained.
pub const HISTORY_CAPACITY: usize = 31;

/// Star count observed on a given day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize,)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry
{
    /// UTC calendar day of the observation.
    pub date:             NaiveDate,
    /// Star count reported by GitHub on that day.
    pub stargazers_count: u32,
}

impl HistoryEntry
{
    pub fn new(date: NaiveDate, stargazers_count: u32,) -> Self
    {
        Self {
            date,
            stargazers_count,
        }
    }
}

/// Daily star-count series, newest entry first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize,)]
#[serde(transparent)]
pub struct StargazersHistory(Vec<HistoryEntry,>,);

impl StargazersHistory
{
    /// Wraps entries as stored; callers provide them newest first.
    pub fn new(entries: Vec<HistoryEntry,>,) -> Self
    {
        Self(entries,)
    }

    pub fn entries(&self,) -> &[HistoryEntry]
    {
        &self.0
    }

    pub fn len(&self,) -> usize
    {
        self.0.len()
    }

    pub fn is_empty(&self,) -> bool
    {
        self.0.is_empty()
    }

    /// Most recent observation.
    pub fn newest(&self,) -> Option<&HistoryEntry,>
    {
        self.0.first()
    }

    /// Returns the series with today's count recorded.
    ///
    /// An empty series is seeded with a zero-star point on the repository
    /// creation day so the first trend reflects growth since creation.
    /// Entries already dated `today` are replaced, and the oldest entries are
    /// evicted beyond [`HISTORY_CAPACITY`].
    ///
    /// # Examples
    ///
    /// ```
    /// use chrono::NaiveDate;
    /// use vcsw::StargazersHistory;
    ///
    /// let today = NaiveDate::from_ymd_opt(2024, 5, 2,).expect("valid date",);
    /// let history = StargazersHistory::default().append(None, 12, today,);
    /// let history = history.append(None, 15, today,);
    /// assert_eq!(history.len(), 1);
    /// assert_eq!(history.newest().map(|entry| entry.stargazers_count), Some(15));
    /// ```
    pub fn append(
        &self,
        created_at: Option<DateTime<Utc,>,>,
        stargazers_count: u32,
        today: NaiveDate,
    ) -> Self
    {
        let mut entries = self.0.clone();
        if entries.is_empty()
            && let Some(created_at,) = created_at
        {
            entries.push(HistoryEntry::new(created_at.date_naive(), 0,),);
        }

        entries.sort_by(|a, b| b.date.cmp(&a.date,),);
        entries.retain(|entry| entry.date != today,);
        entries.insert(0, HistoryEntry::new(today, stargazers_count,),);
        entries.truncate(HISTORY_CAPACITY,);

        Self(entries,)
    }

    /// Star delta between the newest point and the point `days - 1` entries
    /// back, clamped to the oldest available point. Empty series yield `0`.
    pub fn trend(&self, days: usize,) -> i64
    {
        let Some(newest,) = self.newest() else {
            return 0;
        };

        let old_index = days.saturating_sub(1,).min(self.0.len() - 1,);
        i64::from(newest.stargazers_count,) - i64::from(self.0[old_index].stargazers_count,)
    }
}
