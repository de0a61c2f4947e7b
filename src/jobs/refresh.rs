// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

use chrono::{NaiveDate, Utc};
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use super::{RunContext, spinner};
use crate::{
    error::Error,
    extractor::SourceFile,
    file::{SCHEME_FILE_EXTENSIONS, has_extension},
    github::{ApiError, RepositoryDetail},
    model::{ColorScheme, Repository, SchemeSource},
    store::RepositoryPatch,
    sync::reconcile,
    validity::check_update,
};

/// Branch queried when the API does not report a default branch.
const FALLBACK_BRANCH: &str = "HEAD";

pub(super) async fn run(context: &mut RunContext,) -> Result<Value, Error,>
{
    let repositories = context.select(context.store.all(),)?;
    let today = Utc::now().date_naive();
    let total = repositories.len();
    let pb = spinner();

    let mut refreshed = 0usize;
    for (index, repository,) in repositories.iter().enumerate() {
        context.fetch.check_cancelled(&format!("refresh of {repository}"),)?;
        pb.set_message(format!("[{}/{}] Refreshing {}...", index + 1, total, repository),);

        let result = refresh_repository(context, repository, today,).await;
        match result {
            Ok(patch,) => {
                context.store.apply(repository.id, patch,)?;
                refreshed += 1;
            }
            Err(error @ ApiError::Cancelled { .. },) => return Err(error.into(),),
            Err(error,) => warn!("Skipping {} at metadata stage: {}", repository, error),
        }
    }

    info!("Refreshed {} of {} repositories", refreshed, total);
    pb.finish_with_message(format!("Refresh complete: {refreshed} repositories"),);
    Ok(json!({ "repositoryCount": refreshed }),)
}

/// Builds the patch for one repository.
///
/// Metadata failures skip the repository entirely. Scan failures keep the
/// fresh metadata but leave schemes, flags and `updated_at` untouched so the
/// next run scans again.
async fn refresh_repository(
    context: &RunContext,
    repository: &Repository,
    today: NaiveDate,
) -> Result<RepositoryPatch, ApiError,>
{
    let owner = repository.owner.name.as_str();
    let name = repository.name.as_str();

    let detail = context.fetch.repository(owner, name,).await?;
    let branch = detail.default_branch.clone().unwrap_or_else(|| FALLBACK_BRANCH.to_owned(),);
    let last_commit_at = context.fetch.last_commit_at(owner, name, &branch, None,).await?;

    let history =
        repository.stargazers_history.append(detail.created_at, detail.stargazers_count, today,);
    let trend = history.trend(context.config.trend_window_days,);

    let mut current = repository.clone();
    current.owner.avatar_url = detail.owner.avatar_url.clone();
    current.homepage_url = detail.homepage.clone().filter(|url| !url.trim().is_empty(),);
    current.description = detail.description.clone();
    current.license = detail.spdx_id().map(str::to_owned,);
    current.last_commit_at = last_commit_at;
    current.stargazers_count = detail.stargazers_count;
    current.stargazers_history = history;
    current.trend = trend;

    let mut patch = metadata_patch(&current,);

    let due = context.options.force
        || match (current.updated_at, current.last_commit_at,) {
            (Some(updated_at,), Some(last_commit_at,),) => updated_at <= last_commit_at,
            _ => true,
        };

    if due {
        match scan_schemes(context, &current, &detail, &branch,).await {
            Ok(scanned,) => {
                let reconciled = reconcile(scanned, std::mem::take(&mut current.schemes,),);
                debug!(
                    "{}: {} schemes ({} new, {} carried, {} removed)",
                    current,
                    reconciled.schemes.len(),
                    reconciled.added,
                    reconciled.carried,
                    reconciled.removed
                );
                current.schemes = reconciled.schemes;
                current.refresh_dialect_flags();
                let now = Utc::now();
                current.updated_at = Some(now,);

                patch.schemes = Some(current.schemes.clone(),);
                patch.is_lua = Some(current.is_lua,);
                patch.is_vim = Some(current.is_vim,);
                patch.updated_at = Some(now,);
            }
            Err(error @ ApiError::Cancelled { .. },) => return Err(error,),
            Err(error,) => {
                warn!("Skipping scan of {}: {}", current, error);
                return Ok(patch,);
            }
        }
    } else {
        debug!("{} unchanged since last scan", current);
    }

    let update_valid = match check_update(&current, today, context.config.validity_policy(),) {
        Ok((),) => true,
        Err(reason,) => {
            info!("{} is not update-valid: {}", current, reason);
            false
        }
    };
    patch.update_valid = Some(update_valid,);

    Ok(patch,)
}

fn metadata_patch(repository: &Repository,) -> RepositoryPatch
{
    RepositoryPatch {
        avatar_url: Some(repository.owner.avatar_url.clone(),),
        homepage_url: Some(repository.homepage_url.clone(),),
        description: Some(repository.description.clone(),),
        license: Some(repository.license.clone(),),
        last_commit_at: Some(repository.last_commit_at,),
        stargazers_count: Some(repository.stargazers_count,),
        stargazers_history: Some(repository.stargazers_history.clone(),),
        trend: Some(repository.trend,),
        ..RepositoryPatch::default()
    }
}

/// Lists, downloads and probes candidate files, returning the declared
/// schemes in listing order.
///
/// A failed download fails the whole scan, since reconciling a partial scan
/// would drop the schemes of the missing file.
async fn scan_schemes(
    context: &RunContext,
    repository: &Repository,
    detail: &RepositoryDetail,
    branch: &str,
) -> Result<Vec<ColorScheme,>, ApiError,>
{
    let owner = detail.owner.login.as_str();
    let name = detail.name.as_str();

    let entries = context.fetch.list_files(owner, name,).await?;
    let mut files = Vec::new();
    for entry in entries.into_iter().filter(|entry| has_extension(&entry.path, SCHEME_FILE_EXTENSIONS,),) {
        let Some(download_url,) = entry.download_url else {
            debug!("{} has no download URL for {}", repository, entry.path);
            continue;
        };
        let text = context.fetch.download(&download_url,).await.map_err(|error| {
            warn!("Failed to download {} of {}: {}", entry.path, repository, error);
            error
        },)?;
        files.push(SourceFile {
            path: entry.path,
            download_url,
            text,
        },);
    }
    debug!("{}: probing {} candidate files", repository, files.len());

    let mut schemes = Vec::new();
    for found in context.extractor.extract_all(&files,) {
        let source_updated_at =
            match context.fetch.last_commit_at(owner, name, branch, Some(found.path.as_str(),),).await {
                Ok(timestamp,) => timestamp,
                Err(error @ ApiError::Cancelled { .. },) => return Err(error,),
                Err(error,) => {
                    warn!("No commit date for {} in {}: {}", found.path, repository, error);
                    None
                }
            };
        schemes.push(ColorScheme::scanned(
            found.declaration.name,
            SchemeSource {
                path:         found.path,
                download_url: found.download_url,
            },
            found.declaration.dialect,
            source_updated_at,
        ),);
    }

    Ok(schemes,)
}
