//! Syntax-aware context around lines of interest.
//!
//! A `TreeContext` is built per file from a [`ParsedSource`]. Callers add lines
//! of interest, call [`TreeContext::add_context`] to select what to show, then
//! [`TreeContext::format`] to render it with collapsed gaps.

pub mod index;
mod render;
mod select;

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::config::ContextOptions;
use crate::parse::ParsedSource;

pub use index::SpanIndex;
pub use select::close_small_gaps;

/// Per-file selection state. Borrows the parsed source; nothing is shared
/// between instances, so files can be processed on separate threads.
pub struct TreeContext<'a> {
    lines: Vec<&'a str>,
    index: SpanIndex<'a>,
    options: ContextOptions,
    highlighted: HashMap<usize, String>,
    lines_of_interest: BTreeSet<usize>,
    show_lines: BTreeSet<usize>,
    done_parent_scopes: HashSet<usize>,
}

impl<'a> TreeContext<'a> {
    #[must_use]
    pub fn new(parsed: &'a ParsedSource, options: &ContextOptions) -> Self {
        let lines: Vec<&str> = parsed.source.lines().collect();
        let index = SpanIndex::build(parsed.tree.root_node(), lines.len(), options.header_max);

        Self {
            lines,
            index,
            options: options.clone(),
            highlighted: HashMap::new(),
            lines_of_interest: BTreeSet::new(),
            show_lines: BTreeSet::new(),
            done_parent_scopes: HashSet::new(),
        }
    }

    /// Union `lines` into the lines of interest. Selection is not recomputed.
    pub fn add_lines_of_interest(&mut self, lines: impl IntoIterator<Item = usize>) {
        self.lines_of_interest.extend(lines);
    }

    /// Replacement text for lines, shown instead of the source line.
    pub fn set_highlighted_lines(&mut self, highlighted: HashMap<usize, String>) {
        self.highlighted = highlighted;
    }

    #[must_use]
    pub fn lines_of_interest(&self) -> &BTreeSet<usize> {
        &self.lines_of_interest
    }

    /// Lines selected by the last `add_context` call.
    #[must_use]
    pub fn shown_lines(&self) -> &BTreeSet<usize> {
        &self.show_lines
    }

    #[must_use]
    pub fn num_lines(&self) -> usize {
        self.lines.len()
    }

    #[must_use]
    pub fn index(&self) -> &SpanIndex<'a> {
        &self.index
    }

    /// The scope table, one row per source line.
    #[must_use]
    pub fn scope_dump(&self) -> String {
        self.index.dump(&self.lines)
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use std::path::Path;

    use crate::lang::LanguageRegistry;
    use crate::parse::ParsedSource;

    /// `smallScope` spans lines 4-7, `largeScope` 9-19, `main` 21-24.
    pub(crate) const GO_SOURCE: &str = r#"package main

import "fmt"

func smallScope() {
	// short function that should be fully shown
	fmt.Println("short scope")
}

func largeScope() {
	// line 1
	// line 2
	// line 3
	// line 4
	fmt.Println("bigger scope!")
	// line 5
	// line 6
	// line 7
	// line 8
}

func main() {
	smallScope()
	largeScope()
}
"#;

    pub(crate) fn parse(name: &str, source: &str) -> ParsedSource {
        ParsedSource::parse(&LanguageRegistry::new(), Path::new(name), source.to_string())
            .expect("fixture parses")
    }

    /// A Rust function whose body is `body_lines` one-line statements.
    pub(crate) fn long_rust_fn(body_lines: usize) -> String {
        let mut src = String::from("fn big() {\n");
        for i in 0..body_lines {
            src.push_str(&format!("    let v{i} = {i};\n"));
        }
        src.push_str("}\n");
        src
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::{parse, GO_SOURCE};
    use super::*;

    #[test]
    fn test_lines_of_interest_accumulate() {
        let parsed = parse("example.go", GO_SOURCE);
        let mut ctx = TreeContext::new(&parsed, &ContextOptions::default());
        ctx.add_lines_of_interest([1, 3, 5]);
        ctx.add_lines_of_interest([3, 7]);
        assert_eq!(
            ctx.lines_of_interest().iter().copied().collect::<Vec<_>>(),
            vec![1, 3, 5, 7]
        );
        assert!(ctx.shown_lines().is_empty());
    }

    #[test]
    fn test_line_count_ignores_trailing_newline() {
        let parsed = parse("example.go", GO_SOURCE);
        let ctx = TreeContext::new(&parsed, &ContextOptions::default());
        assert_eq!(ctx.num_lines(), 25);
        assert_eq!(ctx.index().num_lines(), 25);
    }

    #[test]
    fn test_scope_dump_has_a_row_per_line() {
        let parsed = parse("example.go", GO_SOURCE);
        let ctx = TreeContext::new(&parsed, &ContextOptions::default());
        assert_eq!(ctx.scope_dump().lines().count(), ctx.num_lines());
    }
}
