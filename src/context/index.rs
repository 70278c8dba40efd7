//! Line-indexed tables over one parse tree: nodes starting on each line, the
//! scopes covering each line, and a bounded header window per scope start.

use std::collections::BTreeSet;
use std::fmt::Write;

use tree_sitter::Node;

/// Start and end row of a node, in source lines (end inclusive).
pub(crate) fn rows(node: Node<'_>) -> (usize, usize) {
    (node.start_position().row, node.end_position().row)
}

/// Immutable after `build`. Nodes are borrowed from the tree and never outlive it.
pub struct SpanIndex<'tree> {
    nodes: Vec<Vec<Node<'tree>>>,
    scopes: Vec<BTreeSet<usize>>,
    headers: Vec<(usize, usize)>,
    top_line: usize,
}

impl<'tree> SpanIndex<'tree> {
    /// Walk `root` pre-order over named children and fill the tables.
    ///
    /// When several multi-line nodes start on the same line, the one visited
    /// last (the innermost) decides that line's header window.
    #[must_use]
    pub fn build(root: Node<'tree>, num_lines: usize, header_max: usize) -> Self {
        let mut nodes: Vec<Vec<Node<'tree>>> = vec![Vec::new(); num_lines];
        let mut scopes: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); num_lines];
        let mut scope_ends: Vec<Option<usize>> = vec![None; num_lines];

        let mut cursor = root.walk();
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            let (start, end) = rows(node);
            if start >= num_lines {
                continue;
            }
            nodes[start].push(node);

            if end > start {
                scope_ends[start] = Some(end);
                for line in start..=end.min(num_lines - 1) {
                    scopes[line].insert(start);
                }
            }

            let children: Vec<Node<'tree>> = node.named_children(&mut cursor).collect();
            stack.extend(children.into_iter().rev());
        }

        let headers = scope_ends
            .iter()
            .enumerate()
            .map(|(line, end)| match *end {
                Some(end) if end - line > header_max => (line, line + header_max),
                Some(end) => (line, end),
                None => (line, line + 1),
            })
            .collect();

        Self {
            nodes,
            scopes,
            headers,
            top_line: root.start_position().row,
        }
    }

    #[must_use]
    pub fn num_lines(&self) -> usize {
        self.nodes.len()
    }

    /// Line the root node starts on. Its scope is the whole file.
    #[must_use]
    pub fn top_of_file_line(&self) -> usize {
        self.top_line
    }

    /// Nodes starting on `line`, parents before children.
    #[must_use]
    pub fn nodes_at(&self, line: usize) -> &[Node<'tree>] {
        self.nodes.get(line).map_or(&[], Vec::as_slice)
    }

    /// Start lines of every multi-line scope covering `line`.
    #[must_use]
    pub fn scopes_at(&self, line: usize) -> Option<&BTreeSet<usize>> {
        self.scopes.get(line)
    }

    /// Header window of the scope starting at `line`, as a half-open range.
    #[must_use]
    pub fn header(&self, line: usize) -> (usize, usize) {
        self.headers.get(line).copied().unwrap_or((line, line + 1))
    }

    /// Span of the block `line` sits in.
    ///
    /// Scans backward from `line` to the nearest line where a node starts that
    /// covers `line` and continues past it; of the nodes starting there, the one
    /// reaching furthest wins. A line with no node of its own, or one that no
    /// multi-line node covers, bounds itself.
    #[must_use]
    pub fn enclosing_scope(&self, line: usize) -> (usize, usize) {
        if self.nodes_at(line).is_empty() {
            return (line, line);
        }
        for start in (0..=line).rev() {
            let widest = self.nodes[start]
                .iter()
                .map(|&n| rows(n))
                .filter(|&(s, e)| s <= line && e > line)
                .max_by_key(|&(_, e)| e);
            if let Some(span) = widest {
                return span;
            }
        }
        (line, line)
    }

    /// Per line: scope starts, node kinds starting there, and the text.
    #[must_use]
    pub fn dump(&self, lines: &[&str]) -> String {
        let scope_strs: Vec<String> = self
            .scopes
            .iter()
            .map(|s| format!("{:?}", s.iter().collect::<Vec<_>>()))
            .collect();
        let kind_strs: Vec<String> = self
            .nodes
            .iter()
            .map(|ns| ns.iter().map(Node::kind).collect::<Vec<_>>().join(","))
            .collect();
        let scope_width = scope_strs.iter().map(String::len).max().unwrap_or(0);
        let kind_width = kind_strs.iter().map(String::len).max().unwrap_or(0);

        let mut out = String::new();
        for (i, (scopes, kinds)) in scope_strs.iter().zip(&kind_strs).enumerate() {
            let text = lines.get(i).copied().unwrap_or("");
            let _ = writeln!(
                out,
                "{scopes:<scope_width$} {i:>3} {kinds:<kind_width$} │{text}"
            );
        }
        out
    }
}
