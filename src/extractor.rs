// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Pattern-based detection of scheme declarations.
//!
//! Two probes run in priority order. The module probe only fires for Lua
//! files or Vimscript that shells out to Lua, and takes the name from the
//! first `require` literal. The script probe needs a literal `colors_name`
//! assignment and a separate reference to the `Normal` highlight group, since
//! plenty of plugins set the name without defining a renderable scheme.

use masterror::AppError;
use rayon::prelude::*;
use regex::Regex;

use crate::{file::has_extension, model::Dialect};

/// Modules that scheme files load as building blocks rather than as the
/// scheme itself.
const FRAMEWORK_MODULES: &[&str] = &["lush", "colorbuddy", "plenary"];

/// Scheme name and dialect found in a file.
#[derive(Debug, Clone, PartialEq, Eq,)]
pub struct Declaration
{
    /// Normalized identity key, see [`scheme_key`].
    pub name:    String,
    pub dialect: Dialect,
}

/// Downloaded candidate file handed to [`NameExtractor::extract_all`].
#[derive(Debug, Clone,)]
pub struct SourceFile
{
    pub path:         String,
    pub download_url: String,
    pub text:         String,
}

/// Declaration paired with the file it came from.
#[derive(Debug, Clone, PartialEq, Eq,)]
pub struct FoundDeclaration
{
    pub path:         String,
    pub download_url: String,
    pub declaration:  Declaration,
}

/// Compiled probes. Construct once per run and share.
#[derive(Debug, Clone,)]
pub struct NameExtractor
{
    script_name:   Regex,
    normal_group:  Regex,
    module_marker: Regex,
    require_call:  Regex,
}

impl NameExtractor
{
    /// Compiles the probe patterns.
    ///
    /// # Errors
    ///
    /// Returns [`AppError`] when a pattern fails to compile.
    pub fn new() -> Result<Self, AppError,>
    {
        Ok(Self {
            script_name:   compile(r#"\bcolors?_name\s*=\s*['"]([A-Za-z0-9_\- ()]+)['"]"#,)?,
            normal_group:  compile(r"\bNormal\b",)?,
            module_marker: compile(r"(?m)^\s*lua\b|\bvim\.(?:cmd|api|opt|o|g)\b",)?,
            require_call:  compile(r#"\brequire\s*\(?\s*['"]([A-Za-z0-9_\-.]+)['"]"#,)?,
        },)
    }

    /// Detects a scheme declaration in `text`.
    ///
    /// `filename` only contributes its extension: `.lua` files enable the
    /// module probe and are always reported as [`Dialect::Module`].
    ///
    /// # Examples
    ///
    /// ```
    /// use vcsw::{Dialect, NameExtractor};
    ///
    /// let extractor = NameExtractor::new().expect("patterns compile",);
    /// let text = "let g:colors_name = \"Foo Bar\"\nhi Normal guifg=#ffffff";
    /// let found = extractor.extract(text, "colors/foo.vim",).expect("declaration",);
    /// assert_eq!(found.name, "foobar");
    /// assert_eq!(found.dialect, Dialect::Script);
    /// ```
    pub fn extract(&self, text: &str, filename: &str,) -> Option<Declaration,>
    {
        let is_lua_file = has_extension(filename, &["lua"],);

        if (is_lua_file || self.module_marker.is_match(text,))
            && let Some(name,) = self.probe_module(text,)
        {
            return Some(Declaration {
                name,
                dialect: Dialect::Module,
            },);
        }

        let name = self.probe_script(text,)?;
        let dialect = if is_lua_file { Dialect::Module } else { Dialect::Script };
        Some(Declaration {
            name,
            dialect,
        },)
    }

    /// Runs [`extract`](Self::extract) over every file in parallel, keeping
    /// input order for the matches.
    pub fn extract_all(&self, files: &[SourceFile],) -> Vec<FoundDeclaration,>
    {
        files
            .par_iter()
            .filter_map(|file| {
                self.extract(&file.text, &file.path,).map(|declaration| FoundDeclaration {
                    path: file.path.clone(),
                    download_url: file.download_url.clone(),
                    declaration,
                },)
            },)
            .collect()
    }

    fn probe_module(&self, text: &str,) -> Option<String,>
    {
        self.require_call
            .captures_iter(text,)
            .filter_map(|captures| captures.get(1,),)
            .map(|literal| literal.as_str().split('.',).next().unwrap_or_default(),)
            .filter(|module| !FRAMEWORK_MODULES.contains(module,),)
            .find_map(scheme_key,)
    }

    fn probe_script(&self, text: &str,) -> Option<String,>
    {
        if !self.normal_group.is_match(text,) {
            return None;
        }

        let captures = self.script_name.captures(text,)?;
        scheme_key(captures.get(1,)?.as_str(),)
    }
}

/// Normalizes a declared name into its identity key: lowercase, with spaces
/// and parentheses removed. Returns `None` when nothing is left.
///
/// # Examples
///
/// ```
/// assert_eq!(vcsw::scheme_key("Hello (World)").as_deref(), Some("helloworld"));
/// assert_eq!(vcsw::scheme_key(" () "), None);
/// ```
pub fn scheme_key(raw: &str,) -> Option<String,>
{
    let key: String = raw
        .chars()
        .filter(|ch| !matches!(ch, '(' | ')' | ' '),)
        .flat_map(char::to_lowercase,)
        .collect();

    if key.is_empty() { None } else { Some(key,) }
}

fn compile(pattern: &str,) -> Result<Regex, AppError,>
{
    Regex::new(pattern,).map_err(|e| AppError::validation(format!("invalid regex: {e}"),),)
}

#[cfg(test)]
mod tests
{
    use proptest::prelude::*;

    use super::*;

    fn extractor() -> NameExtractor
    {
        NameExtractor::new().expect("patterns compile",)
    }

    #[test]
    fn script_probe_matches_literal_assignment_with_normal_group()
    {
        let text = r#"
            hi clear
            syntax reset
            let g:colors_name = "Foo Bar"
            hi Normal guifg=#c0c0c0 guibg=#101010
        "#;

        let found = extractor().extract(text, "colors/foo.vim",).expect("declaration",);
        assert_eq!(found, Declaration {
            name: "foobar".to_owned(), dialect: Dialect::Script,
        });
    }

    #[test]
    fn script_probe_requires_normal_group()
    {
        let text = r#"
            hi clear
            let g:colors_name = "Foo Bar"
            hi Comment guifg=#808080
        "#;

        assert_eq!(extractor().extract(text, "colors/foo.vim",), None);
    }

    #[test]
    fn script_probe_rejects_non_literal_assignments()
    {
        let text = r#"
            let g:colors_name = expand('<sfile>:t:r')
            hi Normal guifg=#ffffff
        "#;

        assert_eq!(extractor().extract(text, "colors/foo.vim",), None);
    }

    #[test]
    fn script_probe_accepts_variants_of_the_assignment()
    {
        let cases = [
            ("let g:colors_name = 'test'", "test",),
            ("let g:color_name=\"hello-world\"", "hello-world",),
            ("let colors_name = \"hello_world\"", "hello_world",),
            ("let g:colors_name = \"hello (World)\"", "helloworld",),
            ("let colors_name=\"TEst\"", "test",),
        ];

        for (assignment, expected,) in cases {
            let text = format!("{assignment}\nhi Normal ctermfg=15");
            let found = extractor().extract(&text, "colors/test.vim",).expect("declaration",);
            assert_eq!(found.name, expected, "assignment: {assignment}");
        }
    }

    #[test]
    fn script_probe_ignores_comparisons()
    {
        let text = "if g:colors_name == \"foo\"\n  hi Normal guifg=#ffffff\nendif";
        assert_eq!(extractor().extract(text, "plugin/foo.vim",), None);
    }

    #[test]
    fn module_probe_uses_require_literal_for_lua_files()
    {
        let text = "require(\"tokyonight\").load()";
        let found = extractor().extract(text, "colors/tokyonight.lua",).expect("declaration",);

        assert_eq!(found, Declaration {
            name: "tokyonight".to_owned(), dialect: Dialect::Module,
        });
    }

    #[test]
    fn module_probe_fires_on_lua_marker_inside_vimscript()
    {
        let text = "lua require('OneDark.highlights').setup()";
        let found = extractor().extract(text, "colors/onedark.vim",).expect("declaration",);

        assert_eq!(found.name, "onedark");
        assert_eq!(found.dialect, Dialect::Module);
    }

    #[test]
    fn module_probe_skips_framework_modules()
    {
        let text = "local lush = require('lush')\nlush(require('zenbones.specs'))";
        let found = extractor().extract(text, "colors/zenbones.lua",).expect("declaration",);

        assert_eq!(found.name, "zenbones");
    }

    #[test]
    fn module_probe_falls_back_to_script_probe()
    {
        let text = "vim.g.colors_name = \"Melange\"\nvim.api.nvim_set_hl(0, \"Normal\", {})";
        let found = extractor().extract(text, "colors/melange.lua",).expect("declaration",);

        assert_eq!(found.name, "melange");
        assert_eq!(found.dialect, Dialect::Module);
    }

    #[test]
    fn module_probe_is_skipped_without_marker_or_extension()
    {
        let text = "\" require('nothing')\nhi Normal guifg=#ffffff";
        assert_eq!(extractor().extract(text, "colors/plain.vim",), None);
    }

    #[test]
    fn extract_all_keeps_input_order()
    {
        let files = vec![
            SourceFile {
                path:         "colors/b.vim".to_owned(),
                download_url: "https://raw.example/b.vim".to_owned(),
                text:         "let g:colors_name = 'b'\nhi Normal".to_owned(),
            },
            SourceFile {
                path:         "README.md.vim".to_owned(),
                download_url: "https://raw.example/readme".to_owned(),
                text:         "nothing here".to_owned(),
            },
            SourceFile {
                path:         "colors/a.lua".to_owned(),
                download_url: "https://raw.example/a.lua".to_owned(),
                text:         "require('a').load()".to_owned(),
            },
        ];

        let found = extractor().extract_all(&files,);
        let names: Vec<&str,> =
            found.iter().map(|entry| entry.declaration.name.as_str(),).collect();
        assert_eq!(names, vec!["b", "a"]);
        assert_eq!(found[1].path, "colors/a.lua");
    }

    proptest! {
        #[test]
        fn scheme_key_never_keeps_spaces_or_uppercase(input in "[A-Za-z0-9_() -]{0,32}") {
            if let Some(key) = scheme_key(&input) {
                prop_assert!(!key.contains([' ', '(', ')']));
                prop_assert_eq!(key.clone(), key.to_lowercase());
                prop_assert_eq!(scheme_key(&key), Some(key));
            }
        }
    }
}
