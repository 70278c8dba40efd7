use std::path::Path;

/// Bold red, wrapped around each pattern match.
pub const HIGHLIGHT: &str = "\x1b[1;31m";
/// Red, for the line-of-interest marker.
pub const LOI_COLOR: &str = "\x1b[31m";
/// Bold magenta, for file headers.
pub const PATH_COLOR: &str = "\x1b[1;35m";
pub const RESET: &str = "\x1b[0m";

/// Spacer between the line number and text of a line of interest.
pub const LOI_MARK: &str = "█";
/// Spacer for every other shown line.
pub const SPACER: &str = "│";

/// Stands in for one or more omitted lines.
pub const ELLIPSIS: &str = "⋮...";
/// Same, aligned under a line-number column.
pub const ELLIPSIS_NUMBERED: &str = "...⋮...";

/// Build the header printed above each file's context: `path:`
pub fn file_header(path: &Path, color: bool) -> String {
    if color {
        format!("{PATH_COLOR}{}{RESET}:", path.display())
    } else {
        format!("{}:", path.display())
    }
}

/// The one-character spacer, colored when asked.
pub fn spacer(is_loi: bool, color: bool) -> String {
    match (is_loi, color) {
        (true, true) => format!("{LOI_COLOR}{LOI_MARK}{RESET}"),
        (true, false) => LOI_MARK.to_string(),
        (false, _) => SPACER.to_string(),
    }
}
