// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Catalog document types persisted by the repository store.
//!
//! A [`Repository`] is created on first discovery and mutated by the refresh
//! and render passes. Its [`ColorScheme`] entries are replaced wholesale on
//! every refresh; rendered [`ColorData`] survives only through
//! [`reconcile`](crate::reconcile).

use std::fmt;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::history::StargazersHistory;

/// Ordered mapping of highlight-group name to `#rrggbb` color.
pub type ColorTable = IndexMap<String, String,>;

/// Editor background mode a scheme was rendered against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,)]
#[serde(rename_all = "lowercase")]
pub enum Background
{
    /// `set background=light`.
    Light,
    /// `set background=dark`.
    Dark,
}

impl Background
{
    /// Both modes, in render order.
    pub const ALL: [Background; 2] = [Background::Light, Background::Dark,];

    /// Returns the editor option value for this mode.
    pub fn as_str(self,) -> &'static str
    {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }
}

impl fmt::Display for Background
{
    fn fmt(&self, f: &mut fmt::Formatter<'_,>,) -> fmt::Result
    {
        f.write_str(self.as_str(),)
    }
}

/// Language a scheme declaration is written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,)]
#[serde(rename_all = "snake_case")]
pub enum Dialect
{
    /// Vimscript `colors/*.vim` style declaration.
    Script,
    /// Lua module loaded through `require`.
    Module,
}

/// Rendered colors of a scheme on both backgrounds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize,)]
pub struct ColorData
{
    /// Table captured with a light background, when the scheme supports it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub light: Option<ColorTable,>,
    /// Table captured with a dark background, when the scheme supports it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dark:  Option<ColorTable,>,
}

impl ColorData
{
    /// Returns the table rendered for `background`.
    pub fn get(&self, background: Background,) -> Option<&ColorTable,>
    {
        match background {
            Background::Light => self.light.as_ref(),
            Background::Dark => self.dark.as_ref(),
        }
    }

    /// Stores the table rendered for `background`, replacing any prior one.
    pub fn set(&mut self, background: Background, table: ColorTable,)
    {
        match background {
            Background::Light => self.light = Some(table,),
            Background::Dark => self.dark = Some(table,),
        }
    }

    /// Returns `true` when no background produced a non-empty table.
    pub fn is_empty(&self,) -> bool
    {
        Background::ALL
            .iter()
            .all(|background| self.get(*background,).is_none_or(IndexMap::is_empty,),)
    }
}

/// Location of the file declaring a scheme.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize,)]
#[serde(rename_all = "camelCase")]
pub struct SchemeSource
{
    /// Path relative to the repository root.
    pub path:         String,
    /// Raw download URL reported by the contents API.
    pub download_url: String,
}

/// A named scheme declared by a repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize,)]
#[serde(rename_all = "camelCase")]
pub struct ColorScheme
{
    /// Identity key: lowercased name with spaces and parentheses stripped.
    pub name:              String,
    /// File the declaration was found in.
    pub source:            SchemeSource,
    /// Declaration dialect.
    pub dialect:           Dialect,
    /// Last commit touching the source file.
    #[serde(default)]
    pub source_updated_at: Option<DateTime<Utc,>,>,
    /// Rendered colors; empty until the first successful render.
    #[serde(default)]
    pub data:              ColorData,
    /// `true` once rendering succeeded for at least one background.
    #[serde(default)]
    pub valid:             bool,
}

impl ColorScheme
{
    /// Creates a freshly scanned scheme without rendered data.
    pub fn scanned(
        name: impl Into<String,>,
        source: SchemeSource,
        dialect: Dialect,
        source_updated_at: Option<DateTime<Utc,>,>,
    ) -> Self
    {
        Self {
            name: name.into(),
            source,
            dialect,
            source_updated_at,
            data: ColorData::default(),
            valid: false,
        }
    }

    /// Returns `true` when the scheme carries usable rendered data.
    pub fn is_rendered(&self,) -> bool
    {
        self.valid && !self.data.is_empty()
    }
}

/// Account owning a repository.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize,)]
#[serde(rename_all = "camelCase")]
pub struct Owner
{
    /// Login of the account.
    pub name:       String,
    /// Avatar image URL.
    #[serde(default)]
    pub avatar_url: Option<String,>,
}

/// Catalog entry for a discovered repository.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize,)]
#[serde(rename_all = "camelCase")]
pub struct Repository
{
    /// GitHub repository id.
    pub id:                 u64,
    /// Owning account.
    pub owner:              Owner,
    /// Repository name.
    pub name:               String,
    /// Origin URL used for cloning.
    pub github_url:         String,
    #[serde(default)]
    pub homepage_url:       Option<String,>,
    #[serde(default)]
    pub description:        Option<String,>,
    /// SPDX identifier of the license, when GitHub detected one.
    #[serde(default)]
    pub license:            Option<String,>,
    #[serde(default)]
    pub github_created_at:  Option<DateTime<Utc,>,>,
    /// Newest commit on the default branch.
    #[serde(default)]
    pub last_commit_at:     Option<DateTime<Utc,>,>,
    /// Last refresh pass that scanned the repository files.
    #[serde(default)]
    pub updated_at:         Option<DateTime<Utc,>,>,
    /// Last successful render pass.
    #[serde(default)]
    pub generated_at:       Option<DateTime<Utc,>,>,
    #[serde(default)]
    pub stargazers_count:   u32,
    #[serde(default)]
    pub stargazers_history: StargazersHistory,
    /// Star delta over the trailing trend window.
    #[serde(default)]
    pub trend:              i64,
    #[serde(default)]
    pub schemes:            Vec<ColorScheme,>,
    #[serde(default)]
    pub is_lua:             bool,
    #[serde(default)]
    pub is_vim:             bool,
    #[serde(default)]
    pub update_valid:       bool,
    #[serde(default)]
    pub generate_valid:     bool,
}

impl Repository
{
    /// Returns the `owner/name` key used in logs and the `--repo` selector.
    pub fn key(&self,) -> String
    {
        format!("{}/{}", self.owner.name, self.name)
    }

    /// Compares owner and name case-insensitively.
    pub fn matches(&self, owner: &str, name: &str,) -> bool
    {
        self.owner.name.eq_ignore_ascii_case(owner,) && self.name.eq_ignore_ascii_case(name,)
    }

    /// Recomputes the dialect summary flags from the scheme list.
    pub fn refresh_dialect_flags(&mut self,)
    {
        self.is_lua = self.schemes.iter().any(|scheme| scheme.dialect == Dialect::Module,);
        self.is_vim = self.schemes.iter().any(|scheme| scheme.dialect == Dialect::Script,);
    }
}

impl fmt::Display for Repository
{
    fn fmt(&self, f: &mut fmt::Formatter<'_,>,) -> fmt::Result
    {
        write!(f, "{}/{}", self.owner.name, self.name)
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    fn table(entries: &[(&str, &str,)],) -> ColorTable
    {
        entries.iter().map(|(k, v,)| ((*k).to_owned(), (*v).to_owned(),),).collect()
    }

    #[test]
    fn color_data_empty_until_a_table_has_entries()
    {
        let mut data = ColorData::default();
        assert!(data.is_empty());

        data.set(Background::Dark, ColorTable::new(),);
        assert!(data.is_empty());

        data.set(Background::Light, table(&[("NormalBg", "#ffffff",)],),);
        assert!(!data.is_empty());
        assert!(data.get(Background::Light).is_some());
    }

    #[test]
    fn color_data_skips_missing_backgrounds_when_serialized()
    {
        let mut data = ColorData::default();
        data.set(Background::Dark, table(&[("NormalBg", "#000000",)],),);

        let json = serde_json::to_string(&data,).expect("serialization failed",);
        assert_eq!(json, r##"{"dark":{"NormalBg":"#000000"}}"##);
    }

    #[test]
    fn repository_matches_ignores_case()
    {
        let repository = Repository {
            owner: Owner {
                name: "Folke".to_owned(), avatar_url: None,
            },
            name: "TokyoNight.nvim".to_owned(),
            ..Repository::default()
        };

        assert!(repository.matches("folke", "tokyonight.nvim"));
        assert!(!repository.matches("folke", "other"));
        assert_eq!(repository.to_string(), "Folke/TokyoNight.nvim");
    }

    #[test]
    fn dialect_flags_follow_schemes()
    {
        let mut repository = Repository::default();
        repository.schemes.push(ColorScheme::scanned(
            "gruvbox",
            SchemeSource::default(),
            Dialect::Module,
            None,
        ),);
        repository.refresh_dialect_flags();

        assert!(repository.is_lua);
        assert!(!repository.is_vim);
    }

    #[test]
    fn rendered_requires_valid_flag_and_data()
    {
        let mut scheme =
            ColorScheme::scanned("nord", SchemeSource::default(), Dialect::Script, None,);
        assert!(!scheme.is_rendered());

        scheme.data.set(Background::Dark, table(&[("NormalBg", "#2e3440",)],),);
        assert!(!scheme.is_rendered());

        scheme.valid = true;
        assert!(scheme.is_rendered());
    }
}
