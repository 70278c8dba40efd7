use std::cmp::Reverse;
use std::collections::{BTreeSet, HashSet};

use tree_sitter::Node;

use super::index::rows;
use super::TreeContext;

impl TreeContext<'_> {
    /// Select the lines to show around the lines of interest.
    ///
    /// Each call starts from an empty selection, so calling it twice yields
    /// the same result as calling it once. Does nothing when there are no
    /// lines of interest.
    pub fn add_context(&mut self) {
        if self.lines_of_interest.is_empty() {
            return;
        }
        self.show_lines.clear();
        self.done_parent_scopes.clear();

        let n = self.num_lines();
        let lois: Vec<usize> = self
            .lines_of_interest
            .iter()
            .copied()
            .filter(|&line| line < n)
            .collect();

        self.show_lines.extend(lois.iter().copied());

        let pad = self.options.loi_pad;
        if pad > 0 {
            let padded: Vec<usize> = self
                .show_lines
                .iter()
                .flat_map(|&line| line.saturating_sub(pad)..=(line + pad).min(n - 1))
                .collect();
            self.show_lines.extend(padded);
        }

        if self.options.last_line && n > 0 {
            self.show_lines.insert(n - 1);
            self.add_parent_scopes(n - 1);
        }

        if self.options.parent_context {
            for &line in &lois {
                self.add_parent_scopes(line);
            }
        }

        if self.options.child_context {
            for &line in &lois {
                self.add_child_context(line);
            }
        }

        self.show_lines.extend(0..self.options.margin.min(n));

        self.show_lines = close_small_gaps(&self.show_lines, &self.lines);

        tracing::debug!(
            lines_of_interest = lois.len(),
            shown = self.show_lines.len(),
            total = n,
            "selected context"
        );
    }

    /// Reveal the header of every scope containing `line`, and the full span
    /// of each scope that continues past its own start line.
    ///
    /// The scope opening the file only contributes its header, and only when
    /// `top_of_file_parent_scope` is set; its span is the whole file.
    fn add_parent_scopes(&mut self, line: usize) {
        if line >= self.num_lines() || !self.done_parent_scopes.insert(line) {
            return;
        }
        let Some(scopes) = self.index.scopes_at(line) else {
            return;
        };

        let n = self.lines.len();
        let top = self.index.top_of_file_line();
        for &scope_start in scopes {
            let (head_start, head_end) = self.index.header(scope_start);
            if scope_start == top {
                if self.options.top_of_file_parent_scope {
                    self.show_lines.extend(head_start..head_end.min(n));
                }
                continue;
            }
            self.show_lines.extend(head_start..head_end.min(n));

            let (start, end) = self.index.enclosing_scope(scope_start);
            if end == scope_start {
                continue;
            }
            self.show_lines.extend(start..=end.min(n - 1));
        }
    }

    /// Reveal a bounded sample of the block starting at `line`.
    ///
    /// Small blocks are shown whole. Larger ones get their biggest sub-nodes
    /// that still fit the budget, each with the headers of the scopes around
    /// it, until the budget of newly shown lines is spent.
    fn add_child_context(&mut self, line: usize) {
        if self.index.nodes_at(line).is_empty() {
            return;
        }
        let n = self.num_lines();
        let (_, last_line) = self.index.enclosing_scope(line);
        let size = last_line.saturating_sub(line);

        let sampling = &self.options.child_sampling;
        if size < sampling.small_scope {
            self.show_lines.extend(line..=last_line.min(n - 1));
            return;
        }

        let mut seen = HashSet::new();
        let mut children: Vec<Node<'_>> = Vec::new();
        for &node in self.index.nodes_at(line) {
            collect_descendants(node, &mut seen, &mut children);
        }
        children.sort_by_key(|&child| {
            let (start, end) = rows(child);
            Reverse(end - start)
        });

        let target = self.show_lines.len() + sampling.budget(size);
        for child in children {
            if self.show_lines.len() >= target {
                break;
            }
            let (start, end) = rows(child);
            if start >= n {
                continue;
            }
            let span = start..=end.min(n - 1);
            let fresh = span.clone().filter(|l| !self.show_lines.contains(l)).count();
            if self.show_lines.len() + fresh > target {
                continue;
            }
            self.show_lines.extend(span);
            self.add_scope_headers(start, target);
        }
    }

    /// Reveal header lines of the scopes containing `line`, stopping at `target`.
    fn add_scope_headers(&mut self, line: usize, target: usize) {
        let Some(scopes) = self.index.scopes_at(line) else {
            return;
        };
        let n = self.lines.len();
        let top = self.index.top_of_file_line();
        for &scope_start in scopes {
            if scope_start == top && !self.options.top_of_file_parent_scope {
                continue;
            }
            let (head_start, head_end) = self.index.header(scope_start);
            for l in head_start..head_end.min(n) {
                if self.show_lines.len() >= target {
                    return;
                }
                self.show_lines.insert(l);
            }
        }
    }
}

/// `node` and every named node below it, each once.
fn collect_descendants<'tree>(
    node: Node<'tree>,
    seen: &mut HashSet<usize>,
    out: &mut Vec<Node<'tree>>,
) {
    let mut cursor = node.walk();
    let mut stack = vec![node];
    while let Some(node) = stack.pop() {
        if !seen.insert(node.id()) {
            continue;
        }
        out.push(node);
        let children: Vec<Node<'tree>> = node.named_children(&mut cursor).collect();
        stack.extend(children.into_iter().rev());
    }
}

/// Fill every one-line gap between shown lines, in a single pass.
///
/// A gap before a blank final line is left open.
#[must_use]
pub fn close_small_gaps(show: &BTreeSet<usize>, lines: &[&str]) -> BTreeSet<usize> {
    let mut closed = show.clone();
    let sorted: Vec<usize> = show.iter().copied().collect();
    let last_line = lines.len().checked_sub(1);

    for pair in sorted.windows(2) {
        let (curr, next) = (pair[0], pair[1]);
        if next - curr != 2 {
            continue;
        }
        let trailing_blank =
            Some(next) == last_line && lines.get(next).is_some_and(|l| l.trim().is_empty());
        if trailing_blank {
            continue;
        }
        closed.insert(curr + 1);
    }
    closed
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::{long_rust_fn, parse, GO_SOURCE};
    use super::*;
    use crate::config::ContextOptions;

    fn bare_options() -> ContextOptions {
        ContextOptions {
            parent_context: false,
            child_context: false,
            margin: 0,
            loi_pad: 0,
            ..ContextOptions::default()
        }
    }

    fn shown(ctx: &TreeContext<'_>) -> Vec<usize> {
        ctx.shown_lines().iter().copied().collect()
    }

    #[test]
    fn test_empty_lois_is_noop() {
        let parsed = parse("example.go", GO_SOURCE);
        let mut ctx = TreeContext::new(&parsed, &ContextOptions::default());
        ctx.add_context();
        assert!(ctx.shown_lines().is_empty());
    }

    #[test]
    fn test_seed_and_padding() {
        let parsed = parse("example.go", GO_SOURCE);
        let opts = ContextOptions {
            loi_pad: 2,
            ..bare_options()
        };
        let mut ctx = TreeContext::new(&parsed, &opts);
        ctx.add_lines_of_interest([14]);
        ctx.add_context();
        assert_eq!(shown(&ctx), vec![12, 13, 14, 15, 16]);
    }

    #[test]
    fn test_padding_clamped_to_file() {
        let parsed = parse("example.go", GO_SOURCE);
        let opts = ContextOptions {
            loi_pad: 3,
            ..bare_options()
        };
        let mut ctx = TreeContext::new(&parsed, &opts);
        ctx.add_lines_of_interest([0, 24]);
        ctx.add_context();
        assert_eq!(shown(&ctx), vec![0, 1, 2, 3, 21, 22, 23, 24]);
    }

    #[test]
    fn test_margin_always_added() {
        let parsed = parse("example.go", GO_SOURCE);
        let opts = ContextOptions {
            margin: 3,
            ..bare_options()
        };
        let mut ctx = TreeContext::new(&parsed, &opts);
        ctx.add_lines_of_interest([14]);
        ctx.add_context();
        assert_eq!(shown(&ctx), vec![0, 1, 2, 14]);
    }

    #[test]
    fn test_out_of_range_loi_ignored() {
        let parsed = parse("example.go", GO_SOURCE);
        let mut ctx = TreeContext::new(&parsed, &ContextOptions::default());
        ctx.add_lines_of_interest([999]);
        ctx.add_context();
        // Only the margin survives.
        assert_eq!(shown(&ctx), vec![0, 1, 2]);
    }

    #[test]
    fn test_parent_context_reveals_enclosing_function() {
        let parsed = parse("example.go", GO_SOURCE);
        let opts = ContextOptions {
            parent_context: true,
            ..bare_options()
        };
        let mut ctx = TreeContext::new(&parsed, &opts);
        ctx.add_lines_of_interest([22]);
        ctx.add_context();
        let lines = ctx.shown_lines();
        assert!(lines.contains(&21), "main's header");
        assert!(lines.contains(&22));
        for sibling in (4..=7).chain(9..=19) {
            assert!(!lines.contains(&sibling), "line {sibling} belongs to a sibling");
        }
    }

    #[test]
    fn test_top_of_file_header_only_with_flag() {
        let parsed = parse("example.go", GO_SOURCE);
        let opts = ContextOptions {
            parent_context: true,
            header_max: 2,
            ..bare_options()
        };
        let mut ctx = TreeContext::new(&parsed, &opts);
        ctx.add_lines_of_interest([22]);
        ctx.add_context();
        assert!(!ctx.shown_lines().contains(&0));

        let opts = ContextOptions {
            top_of_file_parent_scope: true,
            ..opts
        };
        let mut ctx = TreeContext::new(&parsed, &opts);
        ctx.add_lines_of_interest([22]);
        ctx.add_context();
        assert!(ctx.shown_lines().contains(&0));
        assert!(ctx.shown_lines().contains(&1));
        // The file scope's body is never revealed wholesale.
        assert!(!ctx.shown_lines().contains(&6));
    }

    #[test]
    fn test_small_block_fully_revealed() {
        let parsed = parse("example.go", GO_SOURCE);
        let opts = ContextOptions {
            child_context: true,
            ..bare_options()
        };
        let mut ctx = TreeContext::new(&parsed, &opts);
        ctx.add_lines_of_interest([4]);
        ctx.add_context();
        assert_eq!(shown(&ctx), vec![4, 5, 6, 7]);
    }

    #[test]
    fn test_large_block_sampled_within_budget() {
        let source = long_rust_fn(400);
        let parsed = parse("big.rs", &source);
        let opts = ContextOptions {
            child_context: true,
            ..bare_options()
        };
        let mut ctx = TreeContext::new(&parsed, &opts);
        ctx.add_lines_of_interest([0]);
        ctx.add_context();
        // One seed line plus a full budget of 25 statements.
        assert_eq!(ctx.shown_lines().len(), 26);
        assert!(!ctx.shown_lines().contains(&401));
    }

    #[test]
    fn test_child_budget_scales_with_block() {
        let source = long_rust_fn(100);
        let parsed = parse("big.rs", &source);
        let opts = ContextOptions {
            child_context: true,
            ..bare_options()
        };
        let mut ctx = TreeContext::new(&parsed, &opts);
        ctx.add_lines_of_interest([0]);
        ctx.add_context();
        // round(0.10 * 102) = 10 new lines beside the seed.
        assert_eq!(ctx.shown_lines().len(), 11);
    }

    #[test]
    fn test_child_sampling_is_configurable() {
        let source = long_rust_fn(400);
        let parsed = parse("big.rs", &source);
        let mut opts = ContextOptions {
            child_context: true,
            ..bare_options()
        };
        opts.child_sampling.max_lines = 8;
        let mut ctx = TreeContext::new(&parsed, &opts);
        ctx.add_lines_of_interest([0]);
        ctx.add_context();
        assert_eq!(ctx.shown_lines().len(), 9);
    }

    #[test]
    fn test_last_line_with_its_scopes() {
        let parsed = parse("example.go", GO_SOURCE);
        let opts = ContextOptions {
            last_line: true,
            ..bare_options()
        };
        let mut ctx = TreeContext::new(&parsed, &opts);
        ctx.add_lines_of_interest([2]);
        ctx.add_context();
        assert_eq!(shown(&ctx), vec![2, 21, 22, 23, 24]);
    }

    #[test]
    fn test_add_context_idempotent() {
        let parsed = parse("example.go", GO_SOURCE);
        let mut ctx = TreeContext::new(&parsed, &ContextOptions::default());
        ctx.add_lines_of_interest([9, 22]);
        ctx.add_context();
        let once = ctx.shown_lines().clone();
        let rendered = ctx.format();
        ctx.add_context();
        assert_eq!(ctx.shown_lines(), &once);
        assert_eq!(ctx.format(), rendered);
    }

    #[test]
    fn test_close_single_line_gaps() {
        let lines = vec!["a", "b", "c", "d", "e"];
        let show: BTreeSet<usize> = [0, 2, 4].into_iter().collect();
        let closed = close_small_gaps(&show, &lines);
        assert_eq!(closed.into_iter().collect::<Vec<_>>(), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_wider_gaps_stay_open() {
        let lines = vec!["a"; 8];
        let show: BTreeSet<usize> = [0, 2, 5, 7].into_iter().collect();
        let closed = close_small_gaps(&show, &lines);
        assert_eq!(closed.into_iter().collect::<Vec<_>>(), vec![0, 1, 2, 5, 6, 7]);
    }

    #[test]
    fn test_gap_before_trailing_blank_line_stays_open() {
        let lines = vec!["a", "b", "c", "d", "  "];
        let show: BTreeSet<usize> = [2, 4].into_iter().collect();
        let closed = close_small_gaps(&show, &lines);
        assert_eq!(closed.into_iter().collect::<Vec<_>>(), vec![2, 4]);
    }

    #[test]
    fn test_gap_closing_is_single_pass() {
        let lines = vec!["x"; 7];
        let show: BTreeSet<usize> = [0, 2, 6].into_iter().collect();
        let closed = close_small_gaps(&show, &lines);
        assert_eq!(closed.into_iter().collect::<Vec<_>>(), vec![0, 1, 2, 6]);
    }
}
