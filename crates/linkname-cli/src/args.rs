//! Command-line surface
//!
//! `go:generate` lines are written with Go's flag conventions
//! (`-symbol S -def F`), so single-dash long flags are rewritten to clap's
//! `--symbol` form before parsing.

use clap::Parser;
use linkname_core::formatter::FormatterChoice;
use linkname_core::{GeneratorConfig, Request, Target};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "linkname-gen", version)]
#[command(about = "Generate vendor-compatible go:linkname bindings", long_about = None)]
#[command(override_usage = "linkname-gen [flags] -symbol S -def F [directory]\n       \
                            linkname-gen [flags] -symbol S -def F files... # Must be a single package")]
pub struct Cli {
    /// Name of the symbol to be bound to
    #[arg(long, value_name = "S")]
    pub symbol: String,

    /// Definition of the function to be bound to -symbol
    #[arg(long, value_name = "F")]
    pub def: String,

    /// Output file name; default srcdir/sym_linkname.go
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// go executable used to list imports and type-check the package
    #[arg(long, env = "LINKNAME_GEN_GO", default_value = "go")]
    pub go: PathBuf,

    /// Comma-separated build tags used to select files and passed to go
    #[arg(long, value_name = "TAGS", value_delimiter = ',')]
    pub tags: Vec<String>,

    /// Import formatter: auto, goimports or builtin
    #[arg(long, env = "LINKNAME_GEN_FORMATTER", default_value = "auto")]
    pub formatter: FormatterChoice,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Enable debug output
    #[arg(short, long)]
    pub debug: bool,

    /// Package directory, or Go files of a single package
    pub paths: Vec<PathBuf>,
}

const LONG_FLAGS: &[&str] = &[
    "symbol",
    "def",
    "output",
    "go",
    "tags",
    "formatter",
    "verbose",
    "debug",
    "help",
    "version",
];

const VALUE_FLAGS: &[&str] = &["symbol", "def", "output", "go", "tags", "formatter"];

/// Rewrite `-flag` and `-flag=value` into `--flag` forms. Values following a
/// flag, and everything after `--`, are left untouched.
pub fn normalize_go_flags<I>(args: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut iter = args.into_iter();
    let mut out: Vec<String> = iter.next().into_iter().collect();
    let mut expect_value = false;
    let mut positional_only = false;

    for arg in iter {
        if expect_value || positional_only {
            expect_value = false;
            out.push(arg);
            continue;
        }
        if arg == "--" {
            positional_only = true;
            out.push(arg);
            continue;
        }

        let (dashes, flag) = match arg.strip_prefix("--") {
            Some(flag) => ("--", flag),
            None => match arg.strip_prefix('-') {
                Some(flag) => ("-", flag),
                None => {
                    out.push(arg);
                    continue;
                }
            },
        };
        let name = flag.split('=').next().unwrap_or(flag);
        if !LONG_FLAGS.contains(&name) {
            out.push(arg);
            continue;
        }
        expect_value = VALUE_FLAGS.contains(&name) && !flag.contains('=');
        if dashes == "-" {
            out.push(format!("-{}", arg));
        } else {
            out.push(arg);
        }
    }
    out
}

impl Cli {
    /// Parse Go-style arguments, exiting with status 2 on usage errors
    pub fn parse_go_style<I>(args: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        Self::parse_from(normalize_go_flags(args))
    }

    pub fn try_parse_go_style<I>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = String>,
    {
        Self::try_parse_from(normalize_go_flags(args))
    }

    pub fn config(&self) -> GeneratorConfig {
        GeneratorConfig::new()
            .with_output(self.output.clone())
            .with_go_binary(self.go.clone())
            .with_formatter(self.formatter)
            .with_tags(self.tags.clone())
    }

    pub fn request(&self, invocation: Vec<String>) -> linkname_core::Result<Request> {
        let target = Target::from_args(&self.paths)?;
        Ok(Request::new(target, &self.symbol, &self.def)?.with_invocation(invocation))
    }
}
