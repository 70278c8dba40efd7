use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{CommandFactory, Parser, ValueEnum};
use clap_complete::Shell;
use rayon::prelude::*;
use tracing_subscriber::EnvFilter;

use grepast::config::clamp_count;
use grepast::{
    format, grep_file, walk, ContextOptions, FileMatch, GrepAstError, LanguageRegistry,
    LineMatcher, MatchOptions,
};

/// grep that shows each match inside the code that encloses it.
#[derive(Parser)]
#[command(name = "grepast", version, about, long_about = None)]
struct Cli {
    /// Regex to search for.
    #[arg(required_unless_present = "completions")]
    pattern: Option<String>,

    /// Files or directories to search.
    #[arg(default_value = ".")]
    paths: Vec<PathBuf>,

    #[arg(short = 'i', long)]
    ignore_case: bool,

    /// Match the pattern literally.
    #[arg(short = 'F', long)]
    fixed_strings: bool,

    #[arg(long, value_enum, default_value_t = ColorChoice::Auto)]
    color: ColorChoice,

    #[arg(long)]
    no_line_numbers: bool,

    /// Do not mark matching lines.
    #[arg(long)]
    no_mark: bool,

    /// Do not show enclosing scopes.
    #[arg(long)]
    no_parent: bool,

    /// Do not sample the body of a matching block.
    #[arg(long)]
    no_child: bool,

    /// Always show the last line of each file.
    #[arg(long)]
    last_line: bool,

    /// Leading lines of each file to always show.
    #[arg(long, allow_negative_numbers = true)]
    margin: Option<i64>,

    /// Lines shown around each match.
    #[arg(long, allow_negative_numbers = true)]
    pad: Option<i64>,

    /// Longest header shown for an enclosing scope.
    #[arg(long, allow_negative_numbers = true)]
    header_max: Option<i64>,

    /// Also show the header of the scope that opens the file.
    #[arg(long)]
    top_scope: bool,

    /// Print each matching file's scope table to stderr.
    #[arg(long)]
    tree: bool,

    /// Options file (default: .grepast.toml in the first search path).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Skip paths matching this glob.
    #[arg(long, value_name = "GLOB")]
    exclude: Vec<String>,

    /// Increase log verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Print a shell completion script and exit.
    #[arg(long, value_enum, value_name = "SHELL")]
    completions: Option<Shell>,
}

#[derive(Clone, Copy, ValueEnum)]
enum ColorChoice {
    Auto,
    Always,
    Never,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(io::stderr)
        .init();

    if let Some(shell) = cli.completions {
        clap_complete::generate(shell, &mut Cli::command(), "grepast", &mut io::stdout());
        return ExitCode::SUCCESS;
    }

    match run(&cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            eprintln!("grepast: {e}");
            ExitCode::from(2)
        }
    }
}

/// Returns whether any file matched.
fn run(cli: &Cli) -> Result<bool, GrepAstError> {
    let Some(pattern) = cli.pattern.as_deref() else {
        return Ok(false);
    };

    let options = resolve_options(cli)?;
    let matcher = LineMatcher::new(
        pattern,
        MatchOptions {
            ignore_case: cli.ignore_case,
            fixed_strings: cli.fixed_strings,
        },
    )?;
    let excludes = walk::exclude_set(&cli.exclude)?;
    let files = walk::collect_files(&cli.paths, &excludes)?;
    tracing::info!(files = files.len(), "searching");

    let registry = LanguageRegistry::new();
    let results: Vec<Option<FileMatch>> = files
        .par_iter()
        .map(|path| match grep_file(&registry, path, &matcher, &options) {
            Ok(found) => found,
            Err(e) if e.is_skippable() => {
                tracing::debug!("skipping: {e}");
                None
            }
            Err(e) => {
                tracing::warn!("{e}");
                None
            }
        })
        .collect();

    let matched: Vec<&FileMatch> = results.iter().flatten().collect();
    if let Err(e) = print_matches(&matched, options.color) {
        if e.kind() != io::ErrorKind::BrokenPipe {
            return Err(GrepAstError::Io {
                path: PathBuf::from("<stdout>"),
                source: e,
            });
        }
    }

    Ok(!matched.is_empty())
}

fn resolve_options(cli: &Cli) -> Result<ContextOptions, GrepAstError> {
    let mut options = match &cli.config {
        Some(path) => ContextOptions::load(path)?,
        None => {
            let root = cli.paths.first().cloned().unwrap_or_else(|| PathBuf::from("."));
            ContextOptions::discover(&root)?
        }
    };

    options.color = match cli.color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => io::stdout().is_terminal(),
    };
    options.verbose |= cli.tree;
    options.last_line |= cli.last_line;
    if cli.no_line_numbers {
        options.line_numbers = false;
    }
    if cli.no_mark {
        options.mark_lois = false;
    }
    if cli.no_parent {
        options.parent_context = false;
    }
    if cli.no_child {
        options.child_context = false;
    }
    options.top_of_file_parent_scope |= cli.top_scope;
    if let Some(n) = cli.margin {
        options.margin = clamp_count(n);
    }
    if let Some(n) = cli.pad {
        options.loi_pad = clamp_count(n);
    }
    if let Some(n) = cli.header_max {
        options.header_max = clamp_count(n);
    }
    Ok(options)
}

fn print_matches(matched: &[&FileMatch], color: bool) -> io::Result<()> {
    let stdout = io::stdout();
    let mut out = io::BufWriter::new(stdout.lock());
    for (n, found) in matched.iter().enumerate() {
        if n > 0 {
            writeln!(out)?;
        }
        writeln!(out, "{}", format::file_header(&found.path, color))?;
        out.write_all(found.rendered.as_bytes())?;

        if let Some(dump) = &found.scope_dump {
            eprintln!("{}", format::file_header(&found.path, false));
            eprint!("{dump}");
        }
    }
    out.flush()
}
