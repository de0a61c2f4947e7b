// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Code-hosting API access: the [`CatalogApi`] seam, its GitHub
//! implementation and the rate-limit aware [`FetchClient`].

mod api;
#[cfg(test)]
pub(crate) mod fake;
mod fetch;
mod octocrab_api;
mod search;

pub use api::{
    ApiError, CatalogApi, ContentEntry, ContentKind, LicenseDetail, OwnerDetail, RepositoryDetail,
    SearchPage,
};
pub use fetch::{DEFAULT_FILE_LIMIT, FetchClient};
pub use octocrab_api::OctocrabApi;
pub use search::{MAX_PAGE_SIZE, SEARCH_QUALIFIER, SEARCH_RESULT_HARD_LIMIT, page_count};
