//! Context-selection options, loadable from a TOML file.
//!
//! Malformed numeric values never fail: negative counts clamp to zero and an
//! inverted sampling range collapses onto its upper bound.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::GrepAstError;

/// Config file looked up in the search root.
pub const CONFIG_FILE_NAME: &str = ".grepast.toml";

/// Knobs for the context selector and renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextOptions {
    /// ANSI colors for match highlights and the LOI marker.
    pub color: bool,
    /// Print the per-line scope table when a file is indexed.
    pub verbose: bool,
    pub line_numbers: bool,
    /// Mark lines of interest with a distinct glyph.
    pub mark_lois: bool,
    /// Reveal the headers of every scope enclosing a line of interest.
    pub parent_context: bool,
    /// Sample the body of a block whose start line is a line of interest.
    pub child_context: bool,
    /// Always show the file's final line.
    pub last_line: bool,
    /// Leading lines of the file that are always shown.
    #[serde(deserialize_with = "non_negative")]
    pub margin: usize,
    /// Lines shown above and below each line of interest.
    #[serde(deserialize_with = "non_negative")]
    pub loi_pad: usize,
    /// Cap on a scope's header window.
    #[serde(deserialize_with = "non_negative")]
    pub header_max: usize,
    /// Allow the header of the scope that opens the file to be shown.
    pub top_of_file_parent_scope: bool,
    pub child_sampling: ChildSampling,
}

impl Default for ContextOptions {
    fn default() -> Self {
        Self {
            color: false,
            verbose: false,
            line_numbers: true,
            mark_lois: true,
            parent_context: true,
            child_context: true,
            last_line: false,
            margin: 3,
            loi_pad: 1,
            header_max: 10,
            top_of_file_parent_scope: false,
            child_sampling: ChildSampling::default(),
        }
    }
}

/// Budget for revealing the inside of a large block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChildSampling {
    /// Blocks spanning fewer lines than this are shown whole.
    #[serde(deserialize_with = "non_negative")]
    pub small_scope: usize,
    #[serde(deserialize_with = "non_negative")]
    pub min_lines: usize,
    #[serde(deserialize_with = "non_negative")]
    pub max_lines: usize,
    /// Share of the block's size to reveal, before clamping.
    #[serde(deserialize_with = "non_negative_fraction")]
    pub fraction: f64,
}

impl Default for ChildSampling {
    fn default() -> Self {
        Self {
            small_scope: 5,
            min_lines: 5,
            max_lines: 25,
            fraction: 0.10,
        }
    }
}

impl ChildSampling {
    /// Lines that may be newly revealed inside a block of `size` lines.
    #[must_use]
    pub fn budget(&self, size: usize) -> usize {
        let raw = (size as f64 * self.fraction).round() as usize;
        let min = self.min_lines.min(self.max_lines);
        raw.clamp(min, self.max_lines)
    }
}

impl ContextOptions {
    /// Load options from a TOML file. Missing keys keep their defaults.
    pub fn load(path: &Path) -> Result<Self, GrepAstError> {
        let text = fs::read_to_string(path).map_err(|source| GrepAstError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text).map_err(|source| GrepAstError::Config {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Use `root/.grepast.toml` when present, defaults otherwise.
    pub fn discover(root: &Path) -> Result<Self, GrepAstError> {
        let dir = if root.is_file() {
            root.parent().unwrap_or(root)
        } else {
            root
        };
        let candidate = dir.join(CONFIG_FILE_NAME);
        if candidate.is_file() {
            tracing::debug!(path = %candidate.display(), "loading config");
            Self::load(&candidate)
        } else {
            Ok(Self::default())
        }
    }

    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }
}

/// Clamp a possibly negative integer to a count.
#[must_use]
pub fn clamp_count(value: i64) -> usize {
    usize::try_from(value).unwrap_or(0)
}

fn non_negative<'de, D>(deserializer: D) -> Result<usize, D::Error>
where
    D: Deserializer<'de>,
{
    i64::deserialize(deserializer).map(clamp_count)
}

fn non_negative_fraction<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = f64::deserialize(deserializer)?;
    Ok(if value.is_finite() && value > 0.0 { value } else { 0.0 })
}
