use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use crate::error::GrepAstError;

/// Languages with a linked tree-sitter grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lang {
    Rust,
    JavaScript,
    TypeScript,
    Tsx,
    Python,
    Go,
    Java,
    C,
    Cpp,
    Ruby,
    Scala,
}

impl Lang {
    /// The grammar handed to `tree_sitter::Parser::set_language`.
    #[must_use]
    pub fn grammar(self) -> tree_sitter::Language {
        match self {
            Self::Rust => tree_sitter_rust::LANGUAGE.into(),
            Self::JavaScript => tree_sitter_javascript::LANGUAGE.into(),
            Self::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            Self::Tsx => tree_sitter_typescript::LANGUAGE_TSX.into(),
            Self::Python => tree_sitter_python::LANGUAGE.into(),
            Self::Go => tree_sitter_go::LANGUAGE.into(),
            Self::Java => tree_sitter_java::LANGUAGE.into(),
            Self::C => tree_sitter_c::LANGUAGE.into(),
            Self::Cpp => tree_sitter_cpp::LANGUAGE.into(),
            Self::Ruby => tree_sitter_ruby::LANGUAGE.into(),
            Self::Scala => tree_sitter_scala::LANGUAGE.into(),
        }
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Rust => "rust",
            Self::JavaScript => "javascript",
            Self::TypeScript => "typescript",
            Self::Tsx => "tsx",
            Self::Python => "python",
            Self::Go => "go",
            Self::Java => "java",
            Self::C => "c",
            Self::Cpp => "cpp",
            Self::Ruby => "ruby",
            Self::Scala => "scala",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "rust" => Self::Rust,
            "javascript" => Self::JavaScript,
            "typescript" => Self::TypeScript,
            "tsx" => Self::Tsx,
            "python" => Self::Python,
            "go" => Self::Go,
            "java" => Self::Java,
            "c" => Self::C,
            "cpp" => Self::Cpp,
            "ruby" => Self::Ruby,
            "scala" => Self::Scala,
            _ => return None,
        })
    }
}

impl fmt::Display for Lang {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Extension → language identifier. Identifiers without a grammar are still
/// listed so those files report "unsupported" rather than "unrecognized".
const EXTENSIONS: &[(&str, &str)] = &[
    ("bash", "bash"),
    ("sh", "bash"),
    ("c", "c"),
    ("h", "c"),
    ("cc", "cpp"),
    ("cpp", "cpp"),
    ("cxx", "cpp"),
    ("hpp", "cpp"),
    ("cl", "commonlisp"),
    ("cs", "c_sharp"),
    ("css", "css"),
    ("el", "elisp"),
    ("elm", "elm"),
    ("erl", "erlang"),
    ("ex", "elixir"),
    ("exs", "elixir"),
    ("go", "go"),
    ("gomod", "gomod"),
    ("hcl", "hcl"),
    ("hs", "haskell"),
    ("html", "html"),
    ("java", "java"),
    ("jl", "julia"),
    ("js", "javascript"),
    ("jsx", "javascript"),
    ("mjs", "javascript"),
    ("cjs", "javascript"),
    ("json", "json"),
    ("kt", "kotlin"),
    ("kts", "kotlin"),
    ("lua", "lua"),
    ("m", "objc"),
    ("mk", "make"),
    ("ml", "ocaml"),
    ("php", "php"),
    ("pl", "perl"),
    ("py", "python"),
    ("pyi", "python"),
    ("r", "r"),
    ("rb", "ruby"),
    ("rs", "rust"),
    ("rst", "rst"),
    ("scala", "scala"),
    ("sc", "scala"),
    ("sql", "sql"),
    ("swift", "swift"),
    ("toml", "toml"),
    ("ts", "typescript"),
    ("tsx", "tsx"),
    ("yaml", "yaml"),
    ("yml", "yaml"),
];

/// Well-known extensionless file names, matched case-insensitively.
const FILE_NAMES: &[(&str, &str)] = &[
    ("dockerfile", "dockerfile"),
    ("containerfile", "dockerfile"),
    ("makefile", "make"),
    ("gnumakefile", "make"),
    ("rakefile", "ruby"),
    ("gemfile", "ruby"),
    ("vagrantfile", "ruby"),
];

/// Process-wide parser-selection table. Built once at startup and shared by
/// reference; never mutated afterwards.
#[derive(Debug, Clone)]
pub struct LanguageRegistry {
    extensions: HashMap<&'static str, &'static str>,
    file_names: HashMap<&'static str, &'static str>,
}

impl Default for LanguageRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            extensions: EXTENSIONS.iter().copied().collect(),
            file_names: FILE_NAMES.iter().copied().collect(),
        }
    }

    /// Language identifier for `path`, whether or not a grammar is linked.
    #[must_use]
    pub fn identifier(&self, path: &Path) -> Option<&'static str> {
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            return self.extensions.get(ext.to_ascii_lowercase().as_str()).copied();
        }
        let name = path.file_name()?.to_str()?.to_ascii_lowercase();
        self.file_names.get(name.as_str()).copied()
    }

    /// Resolve the grammar for `path`.
    pub fn resolve(&self, path: &Path) -> Result<Lang, GrepAstError> {
        let Some(language) = self.identifier(path) else {
            return Err(GrepAstError::UnrecognizedFileType {
                path: path.to_path_buf(),
            });
        };
        Lang::from_name(language).ok_or_else(|| GrepAstError::UnsupportedLanguage {
            path: path.to_path_buf(),
            language,
        })
    }
}
