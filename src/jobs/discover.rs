// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

use serde_json::{Value, json};
use tracing::info;

use super::{RunContext, spinner};
use crate::{
    error::Error,
    github::RepositoryDetail,
    model::{Owner, Repository},
};

/// Converts a search result into a catalog entry.
///
/// Only discovery fields are filled; the refresh pass computes the rest.
pub fn repository_from_detail(detail: RepositoryDetail,) -> Repository
{
    let license = detail.spdx_id().map(str::to_owned,);
    Repository {
        id: detail.id,
        owner: Owner {
            name:       detail.owner.login,
            avatar_url: detail.owner.avatar_url,
        },
        name: detail.name,
        github_url: detail.html_url,
        homepage_url: detail.homepage.filter(|url| !url.trim().is_empty(),),
        description: detail.description,
        license,
        github_created_at: detail.created_at,
        stargazers_count: detail.stargazers_count,
        ..Repository::default()
    }
}

pub(super) async fn run(context: &mut RunContext,) -> Result<Value, Error,>
{
    let pb = spinner();
    pb.set_message(format!("Searching {} queries...", context.config.queries.len()),);

    let details =
        context.fetch.search(&context.config.queries, context.config.repository_count_limit,).await?;
    let found = details.len();

    pb.set_message(format!("Storing {found} repositories..."),);
    let repositories = details.into_iter().map(repository_from_detail,).collect();
    let added = context.store.insert_discovered(repositories,)?;

    info!("Discovered {} repositories, {} new", found, added);
    pb.finish_with_message(format!("Discovery complete: {added} new repositories"),);

    Ok(json!({ "repositoryCount": found, "addedCount": added }),)
}

#[cfg(test)]
mod tests
{
    use std::{collections::HashMap, sync::Arc};

    use super::*;
    use crate::{
        github::{
            LicenseDetail, SEARCH_QUALIFIER,
            fake::{FakeApi, detail},
        },
        jobs::{Job, RunOptions, run_job, tests::context},
    };

    fn query(text: &str,) -> String
    {
        format!("{text} {SEARCH_QUALIFIER}")
    }

    #[test]
    fn detail_conversion_drops_blank_homepage_and_unknown_license()
    {
        let mut found = detail(7, "arctic", "nord.vim", 12,);
        found.homepage = Some("  ".to_owned(),);
        found.license = Some(LicenseDetail {
            spdx_id: Some("NOASSERTION".to_owned(),),
        },);

        let repository = repository_from_detail(found,);

        assert_eq!(repository.key(), "arctic/nord.vim");
        assert_eq!(repository.github_url, "https://github.com/arctic/nord.vim");
        assert_eq!(repository.homepage_url, None);
        assert_eq!(repository.license, None);
        assert_eq!(repository.stargazers_count, 12);
        assert!(!repository.update_valid);
    }

    #[tokio::test]
    async fn discover_stores_unique_results_and_reports()
    {
        let dir = tempfile::tempdir().expect("failed to create tempdir",);
        let api = Arc::new(FakeApi {
            searches: HashMap::from([
                (query("vim theme",), vec![detail(1, "a", "one", 3,), detail(2, "b", "two", 2,)],),
                (query("neovim theme",), vec![detail(2, "b", "two", 2,), detail(3, "c", "three", 1,)],),
            ],),
            ..FakeApi::default()
        },);
        let mut context = context(&dir, api, RunOptions::default(),);
        context.config.queries = vec!["vim theme".to_owned(), "neovim theme".to_owned()];

        let report = run_job(&mut context, Job::Discover,).await.expect("discover succeeded",);

        assert_eq!(report.job, "discover");
        assert_eq!(report.data["repositoryCount"], 3);
        assert_eq!(report.data["addedCount"], 3);
        assert_eq!(context.store.all().len(), 3);

        let again = run_job(&mut context, Job::Discover,).await.expect("discover succeeded",);
        assert_eq!(again.data["addedCount"], 0);
        assert_eq!(context.store.all().len(), 3);
    }
}
