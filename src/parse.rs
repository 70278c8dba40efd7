use std::fs;
use std::path::{Path, PathBuf};

use memmap2::Mmap;

use crate::error::GrepAstError;
use crate::lang::{Lang, LanguageRegistry};

/// Bytes inspected for NUL when deciding whether a file is binary.
const BINARY_SNIFF_LEN: usize = 8192;

/// Source text plus the tree-sitter tree parsed from it. The span index borrows
/// nodes from `tree`, so this value must outlive any `TreeContext` built on it.
pub struct ParsedSource {
    pub path: PathBuf,
    pub lang: Lang,
    pub source: String,
    pub tree: tree_sitter::Tree,
}

impl ParsedSource {
    /// Parse `source` with the grammar `registry` picks for `path`.
    ///
    /// Language resolution happens first; an unrecognized or unsupported file
    /// never reaches the parser.
    pub fn parse(
        registry: &LanguageRegistry,
        path: &Path,
        source: String,
    ) -> Result<Self, GrepAstError> {
        let lang = registry.resolve(path)?;

        let mut parser = tree_sitter::Parser::new();
        if parser.set_language(&lang.grammar()).is_err() {
            return Err(GrepAstError::UnsupportedLanguage {
                path: path.to_path_buf(),
                language: lang.name(),
            });
        }

        let Some(tree) = parser.parse(&source, None) else {
            return Err(GrepAstError::ParseFailed {
                path: path.to_path_buf(),
            });
        };

        Ok(Self {
            path: path.to_path_buf(),
            lang,
            source,
            tree,
        })
    }

    /// Read `path` from disk and parse it.
    pub fn read(registry: &LanguageRegistry, path: &Path) -> Result<Self, GrepAstError> {
        // Cheap rejection before touching the file contents.
        registry.resolve(path)?;
        let source = read_text(path)?;
        Self::parse(registry, path, source)
    }
}

/// Read a text file, memory-mapped. Binary content is rejected.
pub(crate) fn read_text(path: &Path) -> Result<String, GrepAstError> {
    let io_err = |source| GrepAstError::Io {
        path: path.to_path_buf(),
        source,
    };

    let meta = fs::metadata(path).map_err(io_err)?;
    // mmap on a 0-byte file may fail on some platforms
    if meta.len() == 0 {
        return Ok(String::new());
    }

    let file = fs::File::open(path).map_err(io_err)?;
    let mmap = unsafe { Mmap::map(&file) }.map_err(io_err)?;
    let buf = &mmap[..];

    if is_binary(buf) {
        return Err(GrepAstError::Binary {
            path: path.to_path_buf(),
        });
    }

    Ok(String::from_utf8_lossy(buf).into_owned())
}

fn is_binary(buf: &[u8]) -> bool {
    let head = &buf[..buf.len().min(BINARY_SNIFF_LEN)];
    memchr::memchr(0, head).is_some()
}
