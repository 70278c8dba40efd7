use std::path::PathBuf;

/// Everything that can go wrong between reading a file and rendering its context.
#[derive(Debug, thiserror::Error)]
pub enum GrepAstError {
    #[error("{}: unrecognized file type", path.display())]
    UnrecognizedFileType { path: PathBuf },

    #[error("{}: unsupported language '{language}'", path.display())]
    UnsupportedLanguage {
        path: PathBuf,
        language: &'static str,
    },

    #[error("{}: binary file", path.display())]
    Binary { path: PathBuf },

    #[error("{}: tree-sitter produced no tree", path.display())]
    ParseFailed { path: PathBuf },

    #[error("invalid pattern \"{pattern}\": {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}: invalid config: {source}", path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("walk failed: {0}")]
    Walk(#[from] ignore::Error),

    #[error("invalid exclude glob: {0}")]
    Glob(#[from] globset::Error),
}

impl GrepAstError {
    /// Per-file conditions a batch run skips silently instead of reporting.
    #[must_use]
    pub fn is_skippable(&self) -> bool {
        matches!(
            self,
            Self::UnrecognizedFileType { .. } | Self::UnsupportedLanguage { .. } | Self::Binary { .. }
        )
    }
}
