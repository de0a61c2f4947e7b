// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! File-based protocol between the worker and the headless editor.
//!
//! The worker writes `init.lua`: a header assigning the sandbox paths
//! followed by the fixed render script. While the editor runs, a
//! `ColorScheme` callback merges every captured table into the output file:
//!
//! ```json
//! {"<scheme>": {"light": {"NormalBg": "#ffffff"}, "dark": {"NormalBg": "#1d2021"}}}
//! ```
//!
//! The file is read once after the editor exits.

use std::path::Path;

use indexmap::IndexMap;
use masterror::AppError;

use super::SandboxPaths;
use crate::model::{ColorData, ColorTable};

const RENDER_SCRIPT: &str = include_str!("render.lua");

/// Rendered tables keyed by the scheme name the editor reported.
pub type RenderedSchemes = IndexMap<String, ColorData,>;

/// Builds the `init.lua` contents for `paths`.
pub fn init_script(paths: &SandboxPaths, ignored_schemes: &[String],) -> String
{
    let ignored: Vec<String,> = ignored_schemes.iter().map(|name| lua_string(name,),).collect();
    let header = [
        format!("vim.env.MYVIMRC = {}", lua_path(&paths.init)),
        format!("vim.opt.runtimepath = {{ {} }}", lua_path(&paths.runtime)),
        format!("vim.opt.packpath = {{ {} }}", lua_path(&paths.root)),
        "vim.o.termguicolors = true".to_owned(),
        "vim.o.swapfile = false".to_owned(),
        format!("vim.g.catalog_install_path = {}", lua_path(&paths.install)),
        format!("vim.g.catalog_output_path = {}", lua_path(&paths.output)),
        format!("vim.g.catalog_ignored_schemes = {{ {} }}", ignored.join(", ")),
    ];

    let mut script = header.join("\n",);
    script.push_str("\n\n",);
    script.push_str(RENDER_SCRIPT,);
    script
}

/// Parses the output file, dropping `skipped` pseudo entries (compared
/// case-insensitively) and schemes that produced no colors.
///
/// # Errors
///
/// Returns [`AppError`] when the text is not a valid output document.
pub fn parse_output(text: &str, skipped: &[String],) -> Result<RenderedSchemes, AppError,>
{
    let raw: RenderedSchemes = serde_json::from_str(text,)
        .map_err(|e| AppError::service(format!("malformed render output: {e}"),),)?;

    Ok(raw
        .into_iter()
        .filter(|(name, _,)| !skipped.iter().any(|skip| skip.eq_ignore_ascii_case(name,),),)
        .filter_map(|(name, mut data,)| {
            for table in [data.light.as_mut(), data.dark.as_mut(),].into_iter().flatten() {
                normalize_status_line(table,);
            }
            if data.light.as_ref().is_some_and(IndexMap::is_empty,) {
                data.light = None;
            }
            if data.dark.as_ref().is_some_and(IndexMap::is_empty,) {
                data.dark = None;
            }
            (!data.is_empty()).then_some((name, data,),)
        },)
        .collect(),)
}

/// Replaces an invisible status line (same background and foreground) with
/// the `Normal` colors, each only when defined.
///
/// # Example
///
/// ```
/// use vcsw::{ColorTable, sandbox::normalize_status_line};
///
/// let mut table: ColorTable = [
///     ("NormalBg", "#000000",),
///     ("NormalFg", "#ffffff",),
///     ("StatusLineBg", "#333333",),
///     ("StatusLineFg", "#333333",),
/// ]
/// .into_iter()
/// .map(|(k, v,)| (k.to_owned(), v.to_owned(),),)
/// .collect();
///
/// normalize_status_line(&mut table,);
/// assert_eq!(table["StatusLineBg"], "#000000");
/// assert_eq!(table["StatusLineFg"], "#ffffff");
/// ```
pub fn normalize_status_line(table: &mut ColorTable,)
{
    let invisible = matches!(
        (table.get("StatusLineBg"), table.get("StatusLineFg")),
        (Some(bg), Some(fg)) if bg.eq_ignore_ascii_case(fg)
    );
    if !invisible {
        return;
    }

    if let Some(normal_bg,) = table.get("NormalBg",).cloned() {
        table.insert("StatusLineBg".to_owned(), normal_bg,);
    }
    if let Some(normal_fg,) = table.get("NormalFg",).cloned() {
        table.insert("StatusLineFg".to_owned(), normal_fg,);
    }
}

fn lua_path(path: &Path,) -> String
{
    lua_string(&path.to_string_lossy(),)
}

fn lua_string(value: &str,) -> String
{
    let escaped = value.replace('\\', "\\\\",).replace('"', "\\\"",);
    format!("\"{escaped}\"")
}
