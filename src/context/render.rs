use std::fmt::Write;

use super::TreeContext;
use crate::format::{self, ELLIPSIS, ELLIPSIS_NUMBERED, RESET};

impl TreeContext<'_> {
    /// Render the selected lines, collapsing each run of hidden lines into a
    /// single marker. Empty until `add_context` has selected something.
    #[must_use]
    pub fn format(&self) -> String {
        if self.show_lines.is_empty() {
            return String::new();
        }

        let marker = if self.options.line_numbers {
            ELLIPSIS_NUMBERED
        } else {
            ELLIPSIS
        };

        let mut out = String::new();
        if self.options.color {
            out.push_str(RESET);
            out.push('\n');
        }
        let mut pending_ellipsis = !self.show_lines.contains(&0);

        for (i, line) in self.lines.iter().enumerate() {
            if !self.show_lines.contains(&i) {
                if pending_ellipsis {
                    out.push_str(marker);
                    out.push('\n');
                    pending_ellipsis = false;
                }
                continue;
            }

            let is_loi = self.options.mark_lois && self.lines_of_interest.contains(&i);
            let spacer = format::spacer(is_loi, self.options.color);
            let text = self.highlighted.get(&i).map_or(*line, String::as_str);
            if self.options.line_numbers {
                let _ = writeln!(out, "{:>3}{spacer}{text}", i + 1);
            } else {
                let _ = writeln!(out, "{spacer}{text}");
            }

            pending_ellipsis = true;
        }

        out
    }
}
