//! Line matching over a file's source. Produces the lines of interest and,
//! when colored output is on, highlighted replacements for those lines.

use std::collections::{BTreeSet, HashMap};

use grep_matcher::Matcher;
use grep_regex::{RegexMatcher, RegexMatcherBuilder};
use grep_searcher::sinks::UTF8;
use grep_searcher::{BinaryDetection, SearcherBuilder};

use crate::error::GrepAstError;
use crate::format::{HIGHLIGHT, RESET};

#[derive(Debug, Clone, Copy, Default)]
pub struct MatchOptions {
    pub ignore_case: bool,
    /// Treat the pattern as a literal string rather than a regex.
    pub fixed_strings: bool,
}

/// Matching lines of one file (0-based) and their highlighted rendering.
#[derive(Debug, Default)]
pub struct LineMatches {
    pub lines: BTreeSet<usize>,
    pub highlighted: HashMap<usize, String>,
}

impl LineMatches {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// A compiled search pattern, shared read-only across files.
pub struct LineMatcher {
    matcher: RegexMatcher,
}

impl LineMatcher {
    pub fn new(pattern: &str, opts: MatchOptions) -> Result<Self, GrepAstError> {
        let escaped;
        let pattern = if opts.fixed_strings {
            escaped = regex_syntax::escape(pattern);
            escaped.as_str()
        } else {
            pattern
        };

        let matcher = RegexMatcherBuilder::new()
            .case_insensitive(opts.ignore_case)
            .line_terminator(Some(b'\n'))
            .build(pattern)
            .map_err(|e| GrepAstError::InvalidPattern {
                pattern: pattern.to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self { matcher })
    }

    /// Find every matching line in `source`.
    #[must_use]
    pub fn find(&self, source: &str, color: bool) -> LineMatches {
        let mut found = LineMatches::default();
        let mut searcher = SearcherBuilder::new()
            .binary_detection(BinaryDetection::none())
            .line_number(true)
            .build();

        let searched = searcher.search_slice(
            &self.matcher,
            source.as_bytes(),
            UTF8(|line_num, line| {
                let idx = (line_num as usize).saturating_sub(1);
                found.lines.insert(idx);
                if color {
                    let line = line.trim_end_matches(['\n', '\r']);
                    found.highlighted.insert(idx, self.highlight(line));
                }
                Ok(true)
            }),
        );
        if let Err(e) = searched {
            tracing::warn!("search stopped early: {e}");
        }

        found
    }

    /// Wrap every match span in `line` with highlight codes.
    ///
    /// Byte-level patterns can match inside a multi-byte character; such
    /// matches are left unhighlighted.
    fn highlight(&self, line: &str) -> String {
        let bytes = line.as_bytes();
        let mut out = String::with_capacity(line.len() + 16);
        let mut last = 0;
        let _ = self.matcher.find_iter(bytes, |m| {
            if m.is_empty()
                || m.start() < last
                || !line.is_char_boundary(m.start())
                || !line.is_char_boundary(m.end())
            {
                return true;
            }
            out.push_str(&line[last..m.start()]);
            out.push_str(HIGHLIGHT);
            out.push_str(&line[m.start()..m.end()]);
            out.push_str(RESET);
            last = m.end();
            true
        });
        out.push_str(&line[last..]);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = "fn alpha() {}\nfn beta() {}\n// Alpha again\nfn gamma() {}\n";

    #[test]
    fn test_find_lines_zero_based() {
        let matcher = LineMatcher::new("alpha", MatchOptions::default()).unwrap();
        let found = matcher.find(SOURCE, false);
        assert_eq!(found.lines.iter().copied().collect::<Vec<_>>(), vec![0]);
        assert!(found.highlighted.is_empty());
    }

    #[test]
    fn test_ignore_case() {
        let opts = MatchOptions {
            ignore_case: true,
            ..MatchOptions::default()
        };
        let matcher = LineMatcher::new("alpha", opts).unwrap();
        let found = matcher.find(SOURCE, false);
        assert_eq!(found.lines.iter().copied().collect::<Vec<_>>(), vec![0, 2]);
    }

    #[test]
    fn test_fixed_strings_escape_metacharacters() {
        let opts = MatchOptions {
            fixed_strings: true,
            ..MatchOptions::default()
        };
        let matcher = LineMatcher::new("beta()", opts).unwrap();
        let found = matcher.find(SOURCE, false);
        assert_eq!(found.lines.iter().copied().collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn test_highlight_wraps_each_match() {
        let matcher = LineMatcher::new("a", MatchOptions::default()).unwrap();
        let found = matcher.find("banana\n", true);
        let line = &found.highlighted[&0];
        assert_eq!(line.matches(HIGHLIGHT).count(), 3);
        assert!(line.starts_with('b'));
        assert!(line.ends_with(RESET));
    }

    #[test]
    fn test_invalid_pattern() {
        let err = LineMatcher::new("(unclosed", MatchOptions::default());
        assert!(matches!(err, Err(GrepAstError::InvalidPattern { .. })));
    }

    #[test]
    fn test_highlight_skips_matches_inside_a_character() {
        let matcher = LineMatcher::new("(?-u:.)", MatchOptions::default()).unwrap();
        let found = matcher.find("let s = \"é\";\n", true);
        let line = &found.highlighted[&0];
        assert!(line.contains('é'));
        assert_eq!(line.replace(HIGHLIGHT, "").replace(RESET, ""), "let s = \"é\";");
        assert!(line.starts_with(HIGHLIGHT));
    }

    #[test]
    fn test_highlight_non_ascii_match() {
        let matcher = LineMatcher::new("é", MatchOptions::default()).unwrap();
        let found = matcher.find("café au lait\n", true);
        assert_eq!(found.highlighted[&0], format!("caf{HIGHLIGHT}é{RESET} au lait"));
    }

    #[test]
    fn test_no_match() {
        let matcher = LineMatcher::new("delta", MatchOptions::default()).unwrap();
        assert!(matcher.find(SOURCE, true).is_empty());
    }
}
