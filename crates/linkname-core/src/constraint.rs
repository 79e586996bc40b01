//! Build constraints
//!
//! Decides whether a file of a package directory is compiled on the target
//! platform. Three sources are consulted, the same ones `go build` uses:
//! `_GOOS`/`_GOARCH` suffixes in the file name, a `//go:build` expression
//! in the file header, and the older `// +build` lines when no `//go:build`
//! line is present.

use crate::error::{LinknameError, Result};
use regex::Regex;
use std::path::Path;
use std::process::Command;
use std::sync::OnceLock;
use tracing::debug;

const KNOWN_OS: &[&str] = &[
    "aix", "android", "darwin", "dragonfly", "freebsd", "hurd", "illumos", "ios", "js", "linux",
    "nacl", "netbsd", "openbsd", "plan9", "solaris", "wasip1", "windows", "zos",
];

const KNOWN_ARCH: &[&str] = &[
    "386", "amd64", "amd64p32", "arm", "armbe", "arm64", "arm64be", "loong64", "mips", "mipsle",
    "mips64", "mips64le", "mips64p32", "mips64p32le", "ppc", "ppc64", "ppc64le", "riscv",
    "riscv64", "s390", "s390x", "sparc", "sparc64", "wasm",
];

const UNIX_OS: &[&str] = &[
    "aix", "android", "darwin", "dragonfly", "freebsd", "hurd", "illumos", "ios", "linux",
    "netbsd", "openbsd", "solaris",
];

/// Target platform and extra tags files are matched against
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildContext {
    pub goos: String,
    pub goarch: String,
    pub cgo: bool,
    /// Extra tags, as passed to `go build -tags`
    pub tags: Vec<String>,
}

impl BuildContext {
    pub fn new(goos: impl Into<String>, goarch: impl Into<String>) -> Self {
        Self {
            goos: goos.into(),
            goarch: goarch.into(),
            cgo: false,
            tags: Vec::new(),
        }
    }

    pub fn with_cgo(mut self, cgo: bool) -> Self {
        self.cgo = cgo;
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    /// Platform this binary runs on, overridden by `GOOS`, `GOARCH` and
    /// `CGO_ENABLED` from the environment
    pub fn host() -> Self {
        let goos = std::env::var("GOOS").unwrap_or_else(|_| host_goos().to_string());
        let goarch = std::env::var("GOARCH").unwrap_or_else(|_| host_goarch().to_string());
        let cgo = std::env::var("CGO_ENABLED").map_or(false, |v| v == "1");
        Self::new(goos, goarch).with_cgo(cgo)
    }

    /// Ask the toolchain for its target platform
    pub fn from_go_env(go_binary: &Path) -> Result<Self> {
        let output = Command::new(go_binary)
            .args(["env", "GOOS", "GOARCH", "CGO_ENABLED"])
            .output()
            .map_err(|e| crate::error::spawn_error(go_binary, e))?;
        if !output.status.success() {
            return Err(LinknameError::ProcessFailed(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let mut lines = stdout.lines().map(str::trim);
        match (lines.next(), lines.next(), lines.next()) {
            (Some(goos), Some(goarch), cgo) if !goos.is_empty() && !goarch.is_empty() => {
                Ok(Self::new(goos, goarch).with_cgo(cgo == Some("1")))
            }
            _ => Err(LinknameError::ProcessFailed(format!(
                "unexpected `go env` output: {:?}",
                stdout
            ))),
        }
    }

    /// `go env` when the toolchain answers, the host platform otherwise
    pub fn detect(go_binary: &Path, tags: &[String]) -> Self {
        let context = match Self::from_go_env(go_binary) {
            Ok(context) => context,
            Err(e) => {
                debug!("{}; matching build constraints against the host", e);
                Self::host()
            }
        };
        debug!("build context {}/{} cgo={}", context.goos, context.goarch, context.cgo);
        context.with_tags(tags.to_vec())
    }

    /// Whether `tag` is satisfied
    pub fn has_tag(&self, tag: &str) -> bool {
        if tag == self.goos || tag == self.goarch {
            return true;
        }
        match tag {
            "linux" if self.goos == "android" => true,
            "solaris" if self.goos == "illumos" => true,
            "darwin" if self.goos == "ios" => true,
            "unix" => UNIX_OS.contains(&self.goos.as_str()),
            "gc" => true,
            "cgo" => self.cgo,
            // Release tags: the installed toolchain is assumed to be current
            _ if is_release_tag(tag) => true,
            _ => self.tags.iter().any(|t| t == tag),
        }
    }

    /// Apply the `_GOOS`, `_GOARCH` and `_GOOS_GOARCH` file name rules.
    /// Everything up to the first `_` is the free-form part of the name.
    pub fn matches_file_name(&self, file_name: &str) -> bool {
        let stem = file_name.split('.').next().unwrap_or(file_name);
        let rest = match stem.find('_') {
            Some(i) => &stem[i..],
            None => return true,
        };
        let mut parts: Vec<&str> = rest.split('_').collect();
        if parts.last() == Some(&"test") {
            parts.pop();
        }

        match parts.as_slice() {
            [.., os, arch] if KNOWN_OS.contains(os) && KNOWN_ARCH.contains(arch) => {
                self.has_tag(os) && self.has_tag(arch)
            }
            [.., last] if KNOWN_OS.contains(last) || KNOWN_ARCH.contains(last) => {
                self.has_tag(last)
            }
            _ => true,
        }
    }

    /// Evaluate the constraint lines in the header of `src`. A file without
    /// constraints always matches.
    pub fn matches_source(&self, path: &Path, src: &str) -> Result<bool> {
        let header = Header::scan(src);
        if let Some(expr) = header.go_build {
            let expr = Expr::parse(expr).map_err(|message| LinknameError::BuildConstraint {
                file: path.to_path_buf(),
                message,
            })?;
            return Ok(expr.eval(&|tag| self.has_tag(tag)));
        }
        Ok(header
            .plus_build
            .iter()
            .all(|line| plus_build_line(line, &|tag| self.has_tag(tag))))
    }
}

fn host_goos() -> &'static str {
    match std::env::consts::OS {
        "macos" => "darwin",
        other => other,
    }
}

fn host_goarch() -> &'static str {
    match std::env::consts::ARCH {
        "x86_64" => "amd64",
        "x86" => "386",
        "aarch64" => "arm64",
        "powerpc64" if cfg!(target_endian = "little") => "ppc64le",
        "powerpc64" => "ppc64",
        "loongarch64" => "loong64",
        other => other,
    }
}

fn is_release_tag(tag: &str) -> bool {
    tag.strip_prefix("go1.")
        .is_some_and(|minor| !minor.is_empty() && minor.bytes().all(|b| b.is_ascii_digit()))
}

/// Constraint lines found before the package clause
#[derive(Debug, Default)]
struct Header<'a> {
    go_build: Option<&'a str>,
    plus_build: Vec<&'a str>,
}

impl<'a> Header<'a> {
    fn scan(src: &'a str) -> Self {
        static GO_BUILD: OnceLock<Regex> = OnceLock::new();
        static PLUS_BUILD: OnceLock<Regex> = OnceLock::new();
        let go_build = GO_BUILD
            .get_or_init(|| Regex::new(r"^//go:build(?:\s+(.*))?$").expect("valid go:build pattern"));
        let plus_build = PLUS_BUILD
            .get_or_init(|| Regex::new(r"^//\s*\+build(?:\s+(.*))?$").expect("valid +build pattern"));

        let mut header = Header::default();
        for line in src.lines().map(str::trim) {
            if line.is_empty() {
                continue;
            }
            if !line.starts_with("//") {
                break;
            }
            if let Some(caps) = go_build.captures(line) {
                if header.go_build.is_none() {
                    header.go_build = Some(caps.get(1).map_or("", |m| m.as_str()));
                }
            } else if let Some(caps) = plus_build.captures(line) {
                header.plus_build.push(caps.get(1).map_or("", |m| m.as_str()));
            }
        }
        header
    }
}

/// One `// +build` line: space-separated options are OR-ed, comma-separated
/// terms within an option are AND-ed, and a term may be negated with `!`
fn plus_build_line(line: &str, has_tag: &dyn Fn(&str) -> bool) -> bool {
    line.split_whitespace().any(|option| {
        option.split(',').all(|term| match term.strip_prefix('!') {
            Some(tag) => is_tag(tag) && !has_tag(tag),
            None => is_tag(term) && has_tag(term),
        })
    })
}

fn is_tag(word: &str) -> bool {
    !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '.')
}

/// A parsed `//go:build` expression
#[derive(Debug, Clone, PartialEq, Eq)]
enum Expr {
    Tag(String),
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
}

impl Expr {
    fn parse(text: &str) -> std::result::Result<Self, String> {
        let tokens = tokenize(text)?;
        let mut parser = ExprParser { tokens, pos: 0 };
        let expr = parser.or()?;
        match parser.tokens.get(parser.pos) {
            None => Ok(expr),
            Some(tok) => Err(format!("unexpected {} in //go:build line", tok)),
        }
    }

    fn eval(&self, has_tag: &dyn Fn(&str) -> bool) -> bool {
        match self {
            Expr::Tag(tag) => has_tag(tag),
            Expr::Not(inner) => !inner.eval(has_tag),
            Expr::And(lhs, rhs) => lhs.eval(has_tag) && rhs.eval(has_tag),
            Expr::Or(lhs, rhs) => lhs.eval(has_tag) || rhs.eval(has_tag),
        }
    }
}

fn tokenize(text: &str) -> std::result::Result<Vec<String>, String> {
    let mut tokens = Vec::new();
    let mut chars = text.char_indices().peekable();
    while let Some((start, c)) = chars.next() {
        match c {
            c if c.is_whitespace() => {}
            '(' | ')' | '!' => tokens.push(c.to_string()),
            '&' | '|' => {
                if chars.next_if(|&(_, next)| next == c).is_none() {
                    return Err(format!("invalid syntax at '{}' in //go:build line", c));
                }
                tokens.push(format!("{}{}", c, c));
            }
            c if c.is_alphanumeric() || c == '_' || c == '.' => {
                let mut end = start + c.len_utf8();
                while let Some(&(i, next)) = chars.peek() {
                    if !(next.is_alphanumeric() || next == '_' || next == '.') {
                        break;
                    }
                    end = i + next.len_utf8();
                    chars.next();
                }
                tokens.push(text[start..end].to_string());
            }
            other => return Err(format!("invalid character '{}' in //go:build line", other)),
        }
    }
    if tokens.is_empty() {
        return Err("empty //go:build line".to_string());
    }
    Ok(tokens)
}

struct ExprParser {
    tokens: Vec<String>,
    pos: usize,
}

impl ExprParser {
    fn peek(&self) -> Option<&str> {
        self.tokens.get(self.pos).map(String::as_str)
    }

    fn or(&mut self) -> std::result::Result<Expr, String> {
        let mut expr = self.and()?;
        while self.peek() == Some("||") {
            self.pos += 1;
            expr = Expr::Or(Box::new(expr), Box::new(self.and()?));
        }
        Ok(expr)
    }

    fn and(&mut self) -> std::result::Result<Expr, String> {
        let mut expr = self.not()?;
        while self.peek() == Some("&&") {
            self.pos += 1;
            expr = Expr::And(Box::new(expr), Box::new(self.not()?));
        }
        Ok(expr)
    }

    fn not(&mut self) -> std::result::Result<Expr, String> {
        if self.peek() == Some("!") {
            self.pos += 1;
            return Ok(Expr::Not(Box::new(self.not()?)));
        }
        self.atom()
    }

    fn atom(&mut self) -> std::result::Result<Expr, String> {
        let tok = self
            .peek()
            .ok_or_else(|| "unexpected end of //go:build line".to_string())?
            .to_string();
        self.pos += 1;
        match tok.as_str() {
            "(" => {
                let expr = self.or()?;
                if self.peek() != Some(")") {
                    return Err("missing ) in //go:build line".to_string());
                }
                self.pos += 1;
                Ok(expr)
            }
            ")" | "&&" | "||" => Err(format!("unexpected {} in //go:build line", tok)),
            _ => Ok(Expr::Tag(tok)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn linux() -> BuildContext {
        BuildContext::new("linux", "amd64")
    }

    fn matches(ctx: &BuildContext, src: &str) -> bool {
        ctx.matches_source(Path::new("x.go"), src).unwrap()
    }

    #[test]
    fn test_file_name_suffixes() {
        let ctx = linux();
        assert!(ctx.matches_file_name("now_linux.go"));
        assert!(!ctx.matches_file_name("now_windows.go"));
        assert!(ctx.matches_file_name("now_amd64.s"));
        assert!(!ctx.matches_file_name("now_arm64.s"));
        assert!(ctx.matches_file_name("now_linux_amd64.go"));
        assert!(!ctx.matches_file_name("now_linux_arm64.go"));
        assert!(!ctx.matches_file_name("now_windows_test.go"));
        // No underscore: the whole name is free-form
        assert!(ctx.matches_file_name("windows.go"));
        assert!(ctx.matches_file_name("sym_linkname.go"));
        assert!(ctx.matches_file_name("x_unix.go"));
    }

    #[test]
    fn test_os_aliases() {
        let android = BuildContext::new("android", "arm64");
        assert!(android.matches_file_name("x_linux.go"));
        assert!(android.has_tag("unix"));
        assert!(!BuildContext::new("windows", "amd64").has_tag("unix"));
        assert!(BuildContext::new("ios", "arm64").has_tag("darwin"));
    }

    #[test]
    fn test_go_build_expressions() {
        let ctx = linux();
        assert!(matches(&ctx, "//go:build linux\n\npackage p\n"));
        assert!(!matches(&ctx, "//go:build !linux\n\npackage p\n"));
        assert!(matches(&ctx, "//go:build (darwin || linux) && amd64\n\npackage p\n"));
        assert!(!matches(&ctx, "//go:build linux && !amd64\n\npackage p\n"));
        assert!(!matches(&ctx, "//go:build ignore\n\npackage main\n"));
        assert!(matches(&ctx, "//go:build go1.18 && gc\n\npackage p\n"));
        assert!(!matches(&ctx, "//go:build cgo\n\npackage p\n"));
        assert!(matches(&ctx.clone().with_cgo(true), "//go:build cgo\n\npackage p\n"));
        assert!(matches(&ctx.with_tags(vec!["integration".to_string()]), "//go:build integration\n\npackage p\n"));
    }

    #[test]
    fn test_go_build_takes_precedence_over_plus_build() {
        let src = "//go:build linux\n// +build windows\n\npackage p\n";
        assert!(matches(&linux(), src));
    }

    #[test]
    fn test_plus_build_lines() {
        let ctx = linux();
        assert!(matches(&ctx, "// +build linux darwin\n\npackage p\n"));
        assert!(!matches(&ctx, "// +build linux,386\n\npackage p\n"));
        assert!(!matches(&ctx, "// +build linux\n// +build !amd64\n\npackage p\n"));
        assert!(!matches(&ctx, "// +build ignore\n\npackage main\n"));
    }

    #[test]
    fn test_constraints_after_package_clause_are_ignored() {
        assert!(matches(&linux(), "package p\n\n//go:build windows\n"));
        assert!(matches(&linux(), "// Copyright\n\n//go:build linux\n\npackage p\n"));
    }

    #[test]
    fn test_malformed_go_build_line() {
        let err = linux()
            .matches_source(Path::new("x.go"), "//go:build linux &&\n\npackage p\n")
            .unwrap_err();
        assert!(matches!(err, LinknameError::BuildConstraint { .. }));
        assert!(Expr::parse("linux & amd64").is_err());
        assert!(Expr::parse("(linux").is_err());
        assert!(Expr::parse("").is_err());
    }

    #[test]
    fn test_expression_precedence() {
        // && binds tighter than ||
        assert_eq!(
            Expr::parse("a || b && c").unwrap(),
            Expr::Or(
                Box::new(Expr::Tag("a".to_string())),
                Box::new(Expr::And(
                    Box::new(Expr::Tag("b".to_string())),
                    Box::new(Expr::Tag("c".to_string()))
                ))
            )
        );
    }
}
