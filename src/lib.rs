//! grepast: grep whose matches are shown inside the code structure that
//! encloses them.
//!
//! The per-file pipeline is [`grep_file`]: resolve the language, match lines,
//! parse, select context with a [`TreeContext`], render.

pub mod config;
pub mod context;
pub mod error;
pub mod format;
pub mod grep;
pub mod lang;
pub mod parse;
pub mod walk;

use std::path::{Path, PathBuf};

pub use config::{ChildSampling, ContextOptions};
pub use context::TreeContext;
pub use error::GrepAstError;
pub use grep::{LineMatcher, LineMatches, MatchOptions};
pub use lang::{Lang, LanguageRegistry};
pub use parse::ParsedSource;

/// Rendered context for one file that had at least one match.
#[derive(Debug)]
pub struct FileMatch {
    pub path: PathBuf,
    pub matched_lines: usize,
    pub rendered: String,
    /// Scope table, present when `ContextOptions::verbose` is set.
    pub scope_dump: Option<String>,
}

/// Search one file and render the context around its matches.
///
/// `Ok(None)` means the file was read and nothing matched. Files with no
/// grammar surface as skippable errors (see [`GrepAstError::is_skippable`]).
pub fn grep_file(
    registry: &LanguageRegistry,
    path: &Path,
    matcher: &LineMatcher,
    options: &ContextOptions,
) -> Result<Option<FileMatch>, GrepAstError> {
    registry.resolve(path)?;
    let source = parse::read_text(path)?;

    let matches = matcher.find(&source, options.color);
    if matches.is_empty() {
        return Ok(None);
    }

    let parsed = ParsedSource::parse(registry, path, source)?;
    Ok(Some(render_matches(&parsed, matches, options)))
}

/// Like [`grep_file`] for text already in memory.
pub fn grep_source(
    registry: &LanguageRegistry,
    path: &Path,
    source: String,
    matcher: &LineMatcher,
    options: &ContextOptions,
) -> Result<Option<FileMatch>, GrepAstError> {
    let matches = matcher.find(&source, options.color);
    if matches.is_empty() {
        registry.resolve(path)?;
        return Ok(None);
    }
    let parsed = ParsedSource::parse(registry, path, source)?;
    Ok(Some(render_matches(&parsed, matches, options)))
}

fn render_matches(parsed: &ParsedSource, matches: LineMatches, options: &ContextOptions) -> FileMatch {
    let matched_lines = matches.lines.len();
    let mut ctx = TreeContext::new(parsed, options);
    ctx.add_lines_of_interest(matches.lines);
    ctx.set_highlighted_lines(matches.highlighted);
    ctx.add_context();

    tracing::debug!(
        path = %parsed.path.display(),
        lang = %parsed.lang,
        matched_lines,
        shown = ctx.shown_lines().len(),
        "rendered context"
    );

    FileMatch {
        path: parsed.path.clone(),
        matched_lines,
        rendered: ctx.format(),
        scope_dump: options.verbose.then(|| ctx.scope_dump()),
    }
}
