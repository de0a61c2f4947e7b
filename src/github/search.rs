// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Discovers candidate repositories through the repository search API.
//!
//! Runs every configured query sorted by stars, pages through results up to
//! a soft cap and returns repositories deduplicated by id.

use std::collections::HashSet;

use tracing::{debug, info};

use super::{ApiError, FetchClient, RepositoryDetail};
use crate::retry::retry_on_rate_limit;

/// Qualifier appended to every query: skip dotfile repositories and require
/// at least one star.
pub const SEARCH_QUALIFIER: &str = "NOT dotfiles stars:>0";

/// The search API never returns results past this index.
pub const SEARCH_RESULT_HARD_LIMIT: u64 = 1000;

/// Largest page size accepted by the search API.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Number of pages needed to read `total` results, clamped to
/// `[1, ceiling]`.
///
/// # Example
///
/// ```
/// use vcsw::github::page_count;
///
/// assert_eq!(page_count(250, 100, 10,), 3);
/// assert_eq!(page_count(0, 100, 10,), 1);
/// assert_eq!(page_count(5_000, 100, 10,), 10);
/// ```
pub fn page_count(total: u64, page_size: u32, ceiling: u32,) -> u32
{
    let page_size = u64::from(page_size.max(1,),);
    let pages = total.div_ceil(page_size,);
    let pages = u32::try_from(pages,).unwrap_or(u32::MAX,);
    pages.clamp(1, ceiling.max(1,),)
}

impl FetchClient
{
    /// Runs `queries` and returns the unique repositories found.
    ///
    /// Pagination of a query stops after the pages needed for
    /// `min(total, soft_cap)` results; further queries are skipped once
    /// `soft_cap` results were collected overall. Rate limits are waited
    /// out and the same page is requested again.
    ///
    /// # Errors
    ///
    /// Any non rate-limit [`ApiError`] aborts the search.
    pub async fn search(
        &self,
        queries: &[String],
        soft_cap: usize,
    ) -> Result<Vec<RepositoryDetail,>, ApiError,>
    {
        let soft_cap = soft_cap.max(1,);
        let page_size = u32::try_from(soft_cap,).unwrap_or(MAX_PAGE_SIZE,).min(MAX_PAGE_SIZE,);
        let page_ceiling =
            u32::try_from(SEARCH_RESULT_HARD_LIMIT / u64::from(page_size,),).unwrap_or(u32::MAX,);

        let mut collected = 0usize;
        let mut discovered = Vec::with_capacity(soft_cap,);
        let mut seen = HashSet::with_capacity(soft_cap,);

        for query in queries {
            if collected >= soft_cap {
                break;
            }

            let query = format!("{query} {SEARCH_QUALIFIER}");
            info!("Searching repositories for \"{}\"", query);

            let mut page = 1u32;
            let mut pages = 1u32;

            loop {
                let operation = format!("search \"{query}\" page {page}");
                self.check_cancelled(&operation,)?;
                let result = retry_on_rate_limit(self.api(), self.cancel_token(), &operation, || {
                    self.api().search_repositories(&query, page, page_size,)
                },)
                .await?;

                if page == 1 {
                    let total = result.total_count.min(soft_cap as u64,);
                    pages = page_count(total, page_size, page_ceiling,);
                    debug!("{} results capped to {} over {} pages", result.total_count, total, pages);
                }

                let received = result.items.len();
                collected += received;
                for item in result.items {
                    if seen.insert(item.id,) {
                        discovered.push(item,);
                    }
                }

                if received == 0 || page >= pages || collected >= soft_cap {
                    break;
                }
                page += 1;
            }
        }

        info!("Discovered {} unique repositories", discovered.len());
        Ok(discovered,)
    }
}
