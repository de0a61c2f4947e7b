// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Rate-limit handling for API calls.
//!
//! A rate-limited call is never surfaced: the caller blocks until the quota
//! resets, polling once per second, and then repeats the identical request.
//! The wait is tied to a [`CancellationToken`] so a supervisor can abort a
//! stuck run.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::{Instant, sleep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::github::{ApiError, CatalogApi};

/// Interval between checks of the reset time.
pub const POLL_INTERVAL: Duration = Duration::from_secs(1,);

/// Sleeps until `reset_at` has passed, and for at least one
/// [`POLL_INTERVAL`] even when it already has.
///
/// # Errors
///
/// Returns [`ApiError::Cancelled`] when `cancel` fires before the reset.
pub async fn wait_for_reset(
    reset_at: DateTime<Utc,>,
    cancel: &CancellationToken,
    operation_name: &str,
) -> Result<(), ApiError,>
{
    info!("Rate limit hit during {}, sleeping until {}", operation_name, reset_at);

    let remaining = (reset_at - Utc::now()).to_std().unwrap_or(Duration::ZERO,);
    let deadline = Instant::now() + remaining;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                return Err(ApiError::Cancelled {
                    operation: operation_name.to_owned(),
                },);
            }
            _ = sleep(POLL_INTERVAL) => {}
        }

        let now = Instant::now();
        if now >= deadline {
            info!("Rate limit reset, resuming {}", operation_name);
            return Ok((),);
        }
        debug!("{}s left until rate limit reset", (deadline - now).as_secs());
    }
}

/// Executes an API call, waiting out rate limits and retrying it unchanged.
///
/// When the error carries no reset time it is looked up through
/// [`CatalogApi::rate_limit_reset`].
///
/// # Errors
///
/// Returns the first non rate-limit error, or [`ApiError::Cancelled`] when
/// the wait is aborted.
///
/// # Example
///
/// ```no_run
/// use tokio_util::sync::CancellationToken;
/// use vcsw::{
///     github::{ApiError, CatalogApi},
///     retry::retry_on_rate_limit,
/// };
///
/// # async fn example(api: &dyn CatalogApi,) -> Result<(), ApiError,> {
/// let cancel = CancellationToken::new();
/// let detail = retry_on_rate_limit(api, &cancel, "fetch nord-vim", || {
///     api.repository("nordtheme", "nord-vim",)
/// },)
/// .await?;
/// println!("{} stars", detail.stargazers_count);
/// # Ok(())
/// # }
/// ```
pub async fn retry_on_rate_limit<F, Fut, T,>(
    api: &dyn CatalogApi,
    cancel: &CancellationToken,
    operation_name: &str,
    mut f: F,
) -> Result<T, ApiError,>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, ApiError,>,>,
{
    let mut attempt = 1u32;

    loop {
        match f().await {
            Ok(result,) => {
                if attempt > 1 {
                    debug!("{} succeeded on attempt {}", operation_name, attempt);
                }
                return Ok(result,);
            }
            Err(ApiError::RateLimited {
                reset_at,
            },) => {
                let reset_at = match reset_at {
                    Some(reset_at,) => reset_at,
                    None => api.rate_limit_reset().await?,
                };
                wait_for_reset(reset_at, cancel, operation_name,).await?;
                attempt += 1;
            }
            Err(error,) => {
                warn!("{} failed: {}", operation_name, error);
                return Err(error,);
            }
        }
    }
}
