// src/compile/minify.rs

//! clean-css style post-processing of compiled CSS.
//!
//! With `process_import`, local `@import` rules are inlined by the
//! lightningcss bundler; the result is then minified by lightningcss.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

use lightningcss::bundler::{Bundler, ResolveResult, SourceProvider};
use lightningcss::printer::PrinterOptions;
use lightningcss::rules::CssRule;
use lightningcss::stylesheet::{MinifyOptions, ParserOptions, StyleSheet};
use serde::Deserialize;
use tracing::{debug, warn};

use super::CompileError;
use crate::fs::{FileSystem, normalize};

/// Which `/*! ... */` comments survive minification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(try_from = "RawSpecialComments")]
pub enum SpecialComments {
    /// `0`
    None,
    /// `1`
    First,
    /// `"*"`
    #[default]
    All,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawSpecialComments {
    Count(i64),
    Text(String),
}

impl TryFrom<RawSpecialComments> for SpecialComments {
    type Error = String;

    fn try_from(raw: RawSpecialComments) -> Result<Self, Self::Error> {
        match raw {
            RawSpecialComments::Count(0) => Ok(SpecialComments::None),
            RawSpecialComments::Count(1) => Ok(SpecialComments::First),
            RawSpecialComments::Text(s) if s.trim() == "*" => Ok(SpecialComments::All),
            RawSpecialComments::Text(s) if s.trim() == "0" => Ok(SpecialComments::None),
            RawSpecialComments::Text(s) if s.trim() == "1" => Ok(SpecialComments::First),
            RawSpecialComments::Count(n) => Err(format!(
                "invalid keep_special_comments: {n} (expected 0, 1 or \"*\")"
            )),
            RawSpecialComments::Text(s) => Err(format!(
                "invalid keep_special_comments: {s:?} (expected 0, 1 or \"*\")"
            )),
        }
    }
}

/// Options of the clean-css minifier plugin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CleanCssOptions {
    pub enabled: bool,
    /// Structural optimisations (rule merging, shorthand folding).
    pub advanced: bool,
    pub keep_special_comments: SpecialComments,
    /// Inline local `@import` rules.
    pub process_import: bool,
}

impl Default for CleanCssOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            advanced: true,
            keep_special_comments: SpecialComments::All,
            process_import: true,
        }
    }
}

impl CleanCssOptions {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }
}

/// Minify `css`, which will be written to `destination`.
///
/// `base_dir` is where relative `@import`s resolve first; `include_paths`
/// are tried after it.
pub fn minify(
    fs: &dyn FileSystem,
    css: &str,
    destination: &Path,
    base_dir: &Path,
    include_paths: &[PathBuf],
    options: &CleanCssOptions,
) -> Result<String, CompileError> {
    if !options.enabled {
        return Ok(css.to_string());
    }

    let minify_err = |message: String| CompileError::Minify {
        path: destination.to_path_buf(),
        message,
    };

    let code = if options.process_import {
        let graph = ImportGraph::load(fs, css, destination, base_dir, include_paths)?;
        let mut bundler = Bundler::new(&graph, None, ParserOptions::default());
        let stylesheet = bundler
            .bundle(destination)
            .map_err(|e| minify_err(e.to_string()))?;
        finish(stylesheet, options).map_err(minify_err)?
    } else {
        let stylesheet = StyleSheet::parse(
            css,
            ParserOptions {
                filename: destination.to_string_lossy().to_string(),
                ..Default::default()
            },
        )
        .map_err(|e| minify_err(e.to_string()))?;
        finish(stylesheet, options).map_err(minify_err)?
    };

    debug!(
        destination = %destination.display(),
        before = css.len(),
        after = code.len(),
        "minified css"
    );
    Ok(code)
}

fn finish(mut stylesheet: StyleSheet<'_>, options: &CleanCssOptions) -> Result<String, String> {
    if options.advanced {
        stylesheet
            .minify(MinifyOptions::default())
            .map_err(|e| e.to_string())?;
    }

    match options.keep_special_comments {
        SpecialComments::None => stylesheet.license_comments.clear(),
        SpecialComments::First => stylesheet.license_comments.truncate(1),
        SpecialComments::All => {}
    }

    let result = stylesheet
        .to_css(PrinterOptions {
            minify: true,
            ..Default::default()
        })
        .map_err(|e| e.to_string())?;
    Ok(result.code)
}

/// Where one `@import` specifier points.
#[derive(Debug, Clone)]
enum Target {
    File(PathBuf),
    /// Remote, or a local file that does not exist; kept as an `@import`.
    External,
}

/// The compiled CSS and every local style sheet it imports, read up front.
///
/// Serves as the bundler's [`SourceProvider`]: sources are keyed by path
/// (the destination for the compiled CSS) and every import is resolved
/// against the importing file's directory, then the include paths.
#[derive(Debug, Default)]
struct ImportGraph {
    sources: HashMap<PathBuf, String>,
    targets: HashMap<(PathBuf, String), Target>,
}

impl ImportGraph {
    fn load(
        fs: &dyn FileSystem,
        css: &str,
        entry: &Path,
        base_dir: &Path,
        include_paths: &[PathBuf],
    ) -> Result<Self, CompileError> {
        let mut graph = Self::default();
        let mut pending = vec![(entry.to_path_buf(), css.to_string(), base_dir.to_path_buf())];

        while let Some((path, source, dir)) = pending.pop() {
            if graph.sources.contains_key(&path) {
                continue;
            }

            let specifiers = import_specifiers(&source, &path)?;
            let mut local_seen = false;
            let mut needs_hoist = false;
            for specifier in &specifiers {
                let target = if is_remote(specifier) {
                    Target::External
                } else {
                    match locate(fs, specifier, &dir, include_paths) {
                        Some(found) => Target::File(found),
                        None => {
                            warn!(
                                import = %specifier,
                                "imported css file not found; leaving @import in place"
                            );
                            Target::External
                        }
                    }
                };
                match &target {
                    Target::File(found) => {
                        local_seen = true;
                        if !graph.sources.contains_key(found) {
                            let text =
                                fs.read_to_string(found).map_err(|source| CompileError::Io {
                                    path: found.clone(),
                                    source,
                                })?;
                            let parent = found
                                .parent()
                                .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
                            pending.push((found.clone(), text, parent));
                        }
                    }
                    Target::External => needs_hoist |= local_seen,
                }
                graph.targets.insert((path.clone(), specifier.clone()), target);
            }

            let source = if needs_hoist {
                graph.hoist_external_imports(&source, &path)?
            } else {
                source
            };
            debug!(file = %path.display(), imports = specifiers.len(), "loaded css for bundling");
            graph.sources.insert(path, source);
        }

        Ok(graph)
    }

    /// Move kept `@import` rules ahead of the ones that get inlined.
    fn hoist_external_imports(&self, source: &str, path: &Path) -> Result<String, CompileError> {
        let mut stylesheet = parse_for_imports(source, path)?;
        let (external, rest): (Vec<_>, Vec<_>) =
            stylesheet.rules.0.drain(..).partition(|rule| match rule {
                CssRule::Import(import) => matches!(
                    self.targets.get(&(path.to_path_buf(), import.url.to_string())),
                    Some(Target::External)
                ),
                _ => false,
            });
        stylesheet.rules.0 = external.into_iter().chain(rest).collect();

        let result = stylesheet
            .to_css(PrinterOptions::default())
            .map_err(|e| CompileError::Minify {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        Ok(result.code)
    }
}

impl SourceProvider for ImportGraph {
    type Error = io::Error;

    fn read<'a>(&'a self, file: &Path) -> Result<&'a str, Self::Error> {
        self.sources.get(file).map(String::as_str).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} was not loaded", file.display()),
            )
        })
    }

    fn resolve(
        &self,
        specifier: &str,
        originating_file: &Path,
    ) -> Result<ResolveResult, Self::Error> {
        match self
            .targets
            .get(&(originating_file.to_path_buf(), specifier.to_string()))
        {
            Some(Target::File(path)) => Ok(ResolveResult::File(path.clone())),
            Some(Target::External) => Ok(ResolveResult::External(specifier.to_string())),
            None => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("unresolved @import {specifier:?} in {}", originating_file.display()),
            )),
        }
    }
}

fn parse_for_imports<'i>(source: &'i str, path: &Path) -> Result<StyleSheet<'i>, CompileError> {
    StyleSheet::parse(
        source,
        ParserOptions {
            filename: path.to_string_lossy().to_string(),
            ..Default::default()
        },
    )
    .map_err(|e| CompileError::Minify {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// `@import` urls of a style sheet, in order.
fn import_specifiers(source: &str, path: &Path) -> Result<Vec<String>, CompileError> {
    let stylesheet = parse_for_imports(source, path)?;
    Ok(stylesheet
        .rules
        .0
        .iter()
        .filter_map(|rule| match rule {
            CssRule::Import(import) => Some(import.url.to_string()),
            _ => None,
        })
        .collect())
}

fn locate(
    fs: &dyn FileSystem,
    target: &str,
    base_dir: &Path,
    include_paths: &[PathBuf],
) -> Option<PathBuf> {
    std::iter::once(base_dir)
        .chain(include_paths.iter().map(PathBuf::as_path))
        .map(|dir| normalize(&dir.join(target)))
        .find(|candidate| fs.is_file(candidate))
}

fn is_remote(target: &str) -> bool {
    target.starts_with("http://") || target.starts_with("https://") || target.starts_with("//")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    fn run(fs: &MockFileSystem, css: &str, options: CleanCssOptions) -> String {
        minify(fs, css, Path::new("out.css"), Path::new("."), &[], &options).unwrap()
    }

    #[test]
    fn whitespace_and_comments_are_removed() {
        let fs = MockFileSystem::new();
        let out = run(&fs, ".a {\n  color: red;\n}\n/* note */\n", CleanCssOptions::default());
        assert_eq!(out, ".a{color:red}");
    }

    #[test]
    fn advanced_merges_duplicate_rules() {
        let fs = MockFileSystem::new();
        let css = ".a {\n  color: red;\n}\n.a {\n  margin: 0;\n}\n";
        let advanced = run(&fs, css, CleanCssOptions::default());
        let basic = run(
            &fs,
            css,
            CleanCssOptions {
                advanced: false,
                ..CleanCssOptions::default()
            },
        );
        assert_eq!(advanced.matches(".a{").count(), 1);
        assert_eq!(basic.matches(".a{").count(), 2);
    }

    #[test]
    fn special_comments_follow_the_keep_setting() {
        let fs = MockFileSystem::new();
        let css = "/*! license */\n.a { color: red; }";
        let kept = run(&fs, css, CleanCssOptions::default());
        assert!(kept.contains("license"));

        let dropped = run(
            &fs,
            css,
            CleanCssOptions {
                keep_special_comments: SpecialComments::None,
                ..CleanCssOptions::default()
            },
        );
        assert!(!dropped.contains("license"));
    }

    #[test]
    fn local_imports_are_inlined_with_media() {
        let fs = MockFileSystem::new();
        fs.add_file("css/reset.css", "@charset \"utf-8\";\nbody { margin: 0; }");
        fs.add_file("css/print.css", "@import \"reset.css\";\n.p { color: black; }");

        let css = "@import url(\"print.css\") print;\n.a { color: red; }";
        let out = minify(
            &fs,
            css,
            Path::new("css/out.css"),
            Path::new("css"),
            &[],
            &CleanCssOptions::default(),
        )
        .unwrap();

        assert!(!out.contains("@import"));
        assert!(out.starts_with("@media print{"));
        assert!(out.contains("body{margin:0}"));
        assert!(out.contains(".a{color:red}"));
    }

    #[test]
    fn remote_imports_are_kept_first() {
        let fs = MockFileSystem::new();
        fs.add_file("local.css", ".l { color: blue; }");
        let css = "@import \"local.css\";\n@import url(//fonts.example.com/a.css);\n.a { color: red; }";
        let out = run(&fs, css, CleanCssOptions::default());
        assert!(out.starts_with("@import"));
        assert!(out.contains("fonts.example.com/a.css"));
        assert!(out.contains(".l{color:#00f}") || out.contains(".l{color:blue}"));
    }

    #[test]
    fn import_text_inside_strings_and_comments_is_left_alone() {
        let fs = MockFileSystem::new();
        let options = CleanCssOptions {
            keep_special_comments: SpecialComments::None,
            ..CleanCssOptions::default()
        };

        let out = run(&fs, ".a { content: \"@import 'x.css';\"; }", options);
        assert!(!out.starts_with("@import"), "{out}");
        assert!(out.contains("@import 'x.css';"), "{out}");

        let out = run(&fs, "/* @import \"x.css\"; */\n.a { color: red; }", options);
        assert_eq!(out, ".a{color:red}");
    }

    #[test]
    fn missing_local_imports_are_kept() {
        let fs = MockFileSystem::new();
        fs.add_file("local.css", ".l { margin: 0; }");
        let css = "@import \"local.css\";\n@import \"gone.css\";\n.a { color: red; }";
        let out = run(&fs, css, CleanCssOptions::default());
        assert!(out.starts_with("@import \"gone.css\""), "{out}");
        assert!(out.contains(".l{margin:0}"));
        assert!(out.contains(".a{color:red}"));
    }

    #[test]
    fn shared_imports_are_inlined_once() {
        let fs = MockFileSystem::new();
        fs.add_file("base.css", ".base { margin: 0; }");
        fs.add_file("a.css", "@import \"base.css\";\n.a { color: red; }");
        fs.add_file("b.css", "@import \"base.css\";\n.b { color: blue; }");
        let out = run(
            &fs,
            "@import \"a.css\";\n@import \"b.css\";",
            CleanCssOptions {
                advanced: false,
                ..CleanCssOptions::default()
            },
        );
        assert_eq!(out.matches(".base{").count(), 1, "{out}");
    }

    #[test]
    fn include_paths_are_searched_after_the_base_dir() {
        let fs = MockFileSystem::new();
        fs.add_file("vendor/grid.css", ".g { display: grid; }");
        let out = minify(
            &fs,
            "@import \"grid.css\";",
            Path::new("out.css"),
            Path::new("css"),
            &[PathBuf::from("vendor")],
            &CleanCssOptions::default(),
        )
        .unwrap();
        assert_eq!(out, ".g{display:grid}");
    }

    #[test]
    fn circular_imports_terminate() {
        let fs = MockFileSystem::new();
        fs.add_file("a.css", "@import \"b.css\";\n.a { color: red; }");
        fs.add_file("b.css", "@import \"a.css\";\n.b { color: blue; }");
        let out = run(&fs, "@import \"a.css\";", CleanCssOptions::default());
        assert!(out.contains(".a{color:red}"));
    }

    #[test]
    fn invalid_selector_is_a_minify_error() {
        let fs = MockFileSystem::new();
        let err = minify(
            &fs,
            "..a { color: red; }",
            Path::new("out.css"),
            Path::new("."),
            &[],
            &CleanCssOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, CompileError::Minify { path, .. } if path == Path::new("out.css")));
    }

    #[test]
    fn disabled_options_pass_css_through() {
        let fs = MockFileSystem::new();
        let css = ".a {\n  color: red;\n}\n";
        assert_eq!(run(&fs, css, CleanCssOptions::disabled()), css);
    }

    #[test]
    fn keep_special_comments_accepts_numbers_and_star() {
        #[derive(Deserialize)]
        struct Wrapper {
            keep: SpecialComments,
        }
        let parse = |s: &str| toml::from_str::<Wrapper>(s).map(|w| w.keep);
        assert_eq!(parse("keep = 0").unwrap(), SpecialComments::None);
        assert_eq!(parse("keep = 1").unwrap(), SpecialComments::First);
        assert_eq!(parse("keep = \"*\"").unwrap(), SpecialComments::All);
        assert!(parse("keep = 2").is_err());
    }
}
