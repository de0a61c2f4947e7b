// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

use chrono::Utc;
use indicatif::ProgressBar;
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use super::{RunContext, spinner};
use crate::{
    error::Error,
    extractor::scheme_key,
    model::{ColorScheme, Repository},
    sandbox::{RenderedSchemes, Sandbox},
    store::RepositoryPatch,
    validity::check_generate,
};

/// Copies rendered tables onto the schemes they belong to.
///
/// Editor names are matched through [`scheme_key`], so `Tokyo Night (Storm)`
/// lands on `tokyonightstorm`. Matched schemes become valid; schemes the
/// editor did not report keep their previous state. Returns the number of
/// matched schemes.
pub fn apply_rendered(schemes: &mut [ColorScheme], rendered: RenderedSchemes,) -> usize
{
    let mut matched = 0;
    for (editor_name, data,) in rendered {
        let Some(key,) = scheme_key(&editor_name,) else {
            continue;
        };
        match schemes.iter_mut().find(|scheme| scheme.name == key,) {
            Some(scheme,) => {
                scheme.data = data;
                scheme.valid = true;
                matched += 1;
            }
            None => debug!("Rendered {} matches no declared scheme", editor_name),
        }
    }
    matched
}

pub(super) async fn run(context: &mut RunContext,) -> Result<Value, Error,>
{
    let candidates = context.select(context.store.update_valid(),)?;
    let force = context.options.force;
    let due: Vec<Repository,> = candidates
        .into_iter()
        .filter(|repository| {
            force
                || match (repository.generated_at, repository.last_commit_at,) {
                    (Some(generated_at,), Some(last_commit_at,),) => generated_at <= last_commit_at,
                    _ => true,
                }
        },)
        .collect();

    if due.is_empty() {
        info!("No repositories to render");
        return Ok(json!({ "repositoryCount": 0 }),);
    }

    let pb = spinner();
    pb.set_message("Preparing editor sandbox...",);
    let sandbox = Sandbox::prepare(&context.config.sandbox, context.options.debug,).await?;
    debug!("Sandbox ready at {}", sandbox.paths().root.display());

    let total = due.len();
    let outcome = render_all(context, &sandbox, due, &pb,).await;
    let teardown = sandbox.teardown();
    let generated = outcome?;
    teardown?;

    info!("Rendered {} of {} repositories", generated, total);
    pb.finish_with_message(format!("Render complete: {generated} repositories"),);
    Ok(json!({ "repositoryCount": generated }),)
}

/// Renders every due repository and stores the outcome, returning the number
/// that passed the generate gate.
///
/// Stops at the first cancellation or store failure; the caller tears the
/// sandbox down either way.
async fn render_all(
    context: &mut RunContext,
    sandbox: &Sandbox,
    due: Vec<Repository,>,
    pb: &ProgressBar,
) -> Result<usize, Error,>
{
    let today = Utc::now().date_naive();
    let policy = context.config.validity_policy();
    let total = due.len();
    let mut generated = 0usize;

    for (index, mut repository,) in due.into_iter().enumerate() {
        context.fetch.check_cancelled(&format!("render of {repository}"),)?;
        pb.set_message(format!("[{}/{}] Rendering {}...", index + 1, total, repository),);

        let result = sandbox.render(&repository,).await;
        let patch = match result {
            Ok(rendered,) => {
                let matched = apply_rendered(&mut repository.schemes, rendered,);
                debug!("{}: rendered {} of {} schemes", repository, matched, repository.schemes.len());

                let generate_valid = match check_generate(&repository, today, policy,) {
                    Ok((),) => true,
                    Err(reason,) => {
                        info!("{} is not generate-valid: {}", repository, reason);
                        false
                    }
                };
                if generate_valid {
                    generated += 1;
                }
                RepositoryPatch {
                    schemes: Some(repository.schemes,),
                    generate_valid: Some(generate_valid,),
                    generated_at: Some(Utc::now(),),
                    ..RepositoryPatch::default()
                }
            }
            Err(error,) => {
                warn!("Skipping {} at render stage: {:?}", repository, error);
                RepositoryPatch {
                    generate_valid: Some(false,),
                    ..RepositoryPatch::default()
                }
            }
        };
        context.store.apply(repository.id, patch,)?;
    }

    Ok(generated,)
}
