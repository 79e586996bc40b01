//! Import normalization of generated source
//!
//! Formatting is best effort: when the formatter rejects the buffer the raw
//! text is kept so the user can compile the package and see what went wrong.

use crate::error::{LinknameError, Result};
use crate::source::{ImportSpec, SourceFile};
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::str::FromStr;
use tracing::{debug, warn};

pub trait SourceFormatter {
    fn name(&self) -> &str;
    fn format(&self, src: &str) -> Result<String>;
}

/// Which formatter to use
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FormatterChoice {
    /// `goimports` when it is on `PATH`, the builtin normalizer otherwise
    #[default]
    Auto,
    GoImports,
    Builtin,
}

impl FromStr for FormatterChoice {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "auto" => Ok(FormatterChoice::Auto),
            "goimports" => Ok(FormatterChoice::GoImports),
            "builtin" => Ok(FormatterChoice::Builtin),
            other => Err(format!(
                "unknown formatter '{}' (expected auto, goimports or builtin)",
                other
            )),
        }
    }
}

impl fmt::Display for FormatterChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormatterChoice::Auto => write!(f, "auto"),
            FormatterChoice::GoImports => write!(f, "goimports"),
            FormatterChoice::Builtin => write!(f, "builtin"),
        }
    }
}

pub fn select_formatter(choice: FormatterChoice) -> Box<dyn SourceFormatter> {
    match choice {
        FormatterChoice::Builtin => Box::new(ImportBlockFormatter),
        FormatterChoice::GoImports => Box::new(GoImportsFormatter::locate()),
        FormatterChoice::Auto => match which::which("goimports") {
            Ok(path) => Box::new(GoImportsFormatter::new(path)),
            Err(_) => {
                debug!("goimports not found in PATH, using builtin import formatter");
                Box::new(ImportBlockFormatter)
            }
        },
    }
}

/// Pipes the source through `goimports`
#[derive(Debug, Clone)]
pub struct GoImportsFormatter {
    binary: PathBuf,
}

impl GoImportsFormatter {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Resolve `goimports` through `PATH`, falling back to the bare name
    pub fn locate() -> Self {
        Self::new(which::which("goimports").unwrap_or_else(|_| PathBuf::from("goimports")))
    }
}

impl SourceFormatter for GoImportsFormatter {
    fn name(&self) -> &str {
        "goimports"
    }

    fn format(&self, src: &str) -> Result<String> {
        let mut child = Command::new(&self.binary)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| LinknameError::Format(format!("{}: {}", self.binary.display(), e)))?;

        child
            .stdin
            .take()
            .ok_or_else(|| LinknameError::Format("goimports stdin unavailable".to_string()))?
            .write_all(src.as_bytes())
            .map_err(|e| LinknameError::Format(e.to_string()))?;

        let output = child
            .wait_with_output()
            .map_err(|e| LinknameError::Format(e.to_string()))?;
        if !output.status.success() {
            return Err(LinknameError::Format(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }
        String::from_utf8(output.stdout).map_err(|e| LinknameError::Format(e.to_string()))
    }
}

/// In-process normalizer for the import block.
///
/// Produces: header comments, `package`, one import declaration (standard
/// library paths first, then paths whose first element contains a dot, each
/// group sorted and deduplicated), then the remaining declarations. Trailing
/// whitespace is dropped, blank-line runs collapse to one, and the file ends
/// with exactly one newline. Comments inside the import declarations are not
/// kept.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImportBlockFormatter;

impl SourceFormatter for ImportBlockFormatter {
    fn name(&self) -> &str {
        "builtin"
    }

    fn format(&self, src: &str) -> Result<String> {
        let file = SourceFile::parse(Path::new("<generated>"), src)
            .map_err(|e| LinknameError::Format(e.to_string()))?;

        let raw_header = &src[..file.package_offset];
        let header = tidy_lines(raw_header);
        let body = tidy_lines(&src[file.body_offset..]);

        let mut out = String::new();
        if !header.is_empty() {
            out.push_str(&header);
            // A comment touching the package clause is its doc comment; keep it attached
            let gap = &raw_header[raw_header.trim_end().len()..];
            out.push_str(if gap.matches('\n').count() >= 2 { "\n\n" } else { "\n" });
        }
        out.push_str("package ");
        out.push_str(&file.package);
        out.push('\n');

        let groups = import_groups(&file.imports);
        let count: usize = groups.iter().map(Vec::len).sum();
        if count == 1 {
            out.push('\n');
            out.push_str("import ");
            out.push_str(&render_spec(&groups.concat()[0]));
            out.push('\n');
        } else if count > 1 {
            out.push_str("\nimport (\n");
            let blocks: Vec<String> = groups
                .iter()
                .filter(|g| !g.is_empty())
                .map(|g| {
                    g.iter()
                        .map(|spec| format!("\t{}\n", render_spec(spec)))
                        .collect::<String>()
                })
                .collect();
            out.push_str(&blocks.join("\n"));
            out.push_str(")\n");
        }

        if !body.is_empty() {
            out.push('\n');
            out.push_str(&body);
            out.push('\n');
        }
        Ok(out)
    }
}

/// Standard-library-looking paths first, then everything else
fn import_groups(imports: &[ImportSpec]) -> [Vec<ImportSpec>; 2] {
    let mut std_group = Vec::new();
    let mut other = Vec::new();
    for spec in imports {
        let first = spec.path.split('/').next().unwrap_or_default();
        let group = if first.contains('.') {
            &mut other
        } else {
            &mut std_group
        };
        if !group.contains(spec) {
            group.push(spec.clone());
        }
    }
    for group in [&mut std_group, &mut other] {
        group.sort_by(|a, b| a.path.cmp(&b.path).then_with(|| a.name.cmp(&b.name)));
    }
    [std_group, other]
}

fn render_spec(spec: &ImportSpec) -> String {
    match &spec.name {
        Some(name) => format!("{} \"{}\"", name, spec.path),
        None => format!("\"{}\"", spec.path),
    }
}

/// Trim line ends, drop surrounding blank lines, collapse blank runs
fn tidy_lines(text: &str) -> String {
    let mut lines: Vec<&str> = Vec::new();
    for line in text.lines().map(str::trim_end) {
        if line.is_empty() && lines.last().map_or(true, |l| l.is_empty()) {
            continue;
        }
        lines.push(line);
    }
    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    lines.join("\n")
}

/// Result of the formatting stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Formatted {
    pub text: String,
    /// False when the formatter failed and `text` is the raw buffer
    pub formatted: bool,
}

/// Format `src`, falling back to the raw text with a warning
pub fn format_source(formatter: &dyn SourceFormatter, src: &str) -> Formatted {
    match formatter.format(src) {
        Ok(text) => {
            debug!("formatted generated source with {}", formatter.name());
            Formatted {
                text,
                formatted: true,
            }
        }
        Err(err) => {
            warn!("internal error: invalid Go generated: {}", err);
            warn!("compile the package to analyze the error");
            Formatted {
                text: src.to_string(),
                formatted: false,
            }
        }
    }
}
