//! Matching a remote symbol against the package's direct imports
//!
//! The import list comes from the Go toolchain so that vendoring and module
//! path rewriting are already applied: `pkg/generator` may show up as
//! `example.com/app/vendor/pkg/generator`.

use crate::error::{LinknameError, Result};
use crate::symbol::SymbolRef;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, warn};

/// Source of a package's direct import paths
pub trait ImportLister {
    fn list_imports(&self, dir: &Path) -> Result<Vec<String>>;
}

/// Runs `go list -f '{{join .Imports "\n"}}' .` inside the package directory
#[derive(Debug, Clone)]
pub struct GoListImports {
    go_binary: PathBuf,
    tags: Vec<String>,
}

impl GoListImports {
    pub fn new(go_binary: impl Into<PathBuf>) -> Self {
        Self {
            go_binary: go_binary.into(),
            tags: Vec::new(),
        }
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }
}

impl Default for GoListImports {
    fn default() -> Self {
        Self::new("go")
    }
}

impl ImportLister for GoListImports {
    fn list_imports(&self, dir: &Path) -> Result<Vec<String>> {
        let mut cmd = Command::new(&self.go_binary);
        cmd.arg("list");
        if !self.tags.is_empty() {
            cmd.arg("-tags").arg(self.tags.join(","));
        }
        let output = cmd
            .args(["-f", r#"{{join .Imports "\n"}}"#, "."])
            .current_dir(dir)
            .output()
            .map_err(|e| LinknameError::ImportListing {
                dir: dir.to_path_buf(),
                message: format!("running {}: {}", self.go_binary.display(), e),
            })?;

        if !output.status.success() {
            return Err(LinknameError::ImportListing {
                dir: dir.to_path_buf(),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(parse_import_list(&String::from_utf8_lossy(&output.stdout)))
    }
}

/// A fixed import list, handy when the toolchain is not available
#[derive(Debug, Clone, Default)]
pub struct StaticImports(pub Vec<String>);

impl ImportLister for StaticImports {
    fn list_imports(&self, _dir: &Path) -> Result<Vec<String>> {
        Ok(self.0.clone())
    }
}

/// Newline-separated import paths; blank lines are dropped
pub fn parse_import_list(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// The import a symbol resolved to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportMatch {
    /// Canonical import path as seen by the package
    pub import_path: String,
    /// Every listed import that also matched, in listing order. The first
    /// entry is `import_path`.
    pub candidates: Vec<String>,
}

impl ImportMatch {
    pub fn is_ambiguous(&self) -> bool {
        self.candidates.len() > 1
    }
}

/// Find the first import whose path ends with the symbol's package path.
///
/// This is a plain string suffix test: `mypkg/generator` matches a request
/// for `pkg/generator` just as well as `vendor/pkg/generator` does, and the
/// earlier entry in `imports` wins.
pub fn find_import(imports: &[String], symbol: &SymbolRef) -> Result<ImportMatch> {
    let wanted = symbol.package_path();
    let candidates: Vec<String> = imports
        .iter()
        .filter(|dep| dep.ends_with(wanted))
        .cloned()
        .collect();

    let import_path = candidates
        .first()
        .cloned()
        .ok_or_else(|| LinknameError::NoSuchSymbol(symbol.raw().to_string()))?;

    if candidates.len() > 1 {
        warn!(
            "{} imports match `{}`; using {} (other candidates: {})",
            candidates.len(),
            wanted,
            import_path,
            candidates[1..].join(", ")
        );
    } else {
        debug!("`{}` resolved to {}", wanted, import_path);
    }

    Ok(ImportMatch {
        import_path,
        candidates,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn imports(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn symbol(s: &str) -> SymbolRef {
        SymbolRef::parse(s).unwrap()
    }

    #[test]
    fn test_vendored_match() {
        let deps = imports(&["fmt", "vendor/pkg/generator", "strings"]);
        let m = find_import(&deps, &symbol("pkg/generator.(*Generator).goTag")).unwrap();
        assert_eq!(m.import_path, "vendor/pkg/generator");
        assert!(!m.is_ambiguous());
    }

    #[test]
    fn test_exact_match() {
        let deps = imports(&["github.com/gogo/protobuf/protoc-gen-gogo/generator"]);
        let m = find_import(
            &deps,
            &symbol("github.com/gogo/protobuf/protoc-gen-gogo/generator.(*Generator).goTag"),
        )
        .unwrap();
        assert_eq!(m.import_path, deps[0]);
    }

    #[test]
    fn test_no_such_symbol() {
        let deps = imports(&["fmt", "os"]);
        let err = find_import(&deps, &symbol("pkg/generator.Foo")).unwrap_err();
        assert_eq!(err.to_string(), "no such symbol: `pkg/generator.Foo`");
    }

    #[test]
    fn test_empty_import_list() {
        let err = find_import(&[], &symbol("runtime.nanotime")).unwrap_err();
        assert!(matches!(err, LinknameError::NoSuchSymbol(_)));
    }

    // Suffix matching is order dependent: whichever candidate is listed first
    // wins, even when a later one is a closer match.
    #[test]
    fn test_first_suffix_match_wins_over_closer_match() {
        let deps = imports(&["example.com/mypkg/generator", "pkg/generator"]);
        let m = find_import(&deps, &symbol("pkg/generator.Foo")).unwrap();
        assert_eq!(m.import_path, "example.com/mypkg/generator");
        assert!(m.is_ambiguous());
        assert_eq!(m.candidates, deps);

        let reversed: Vec<String> = deps.iter().rev().cloned().collect();
        let m = find_import(&reversed, &symbol("pkg/generator.Foo")).unwrap();
        assert_eq!(m.import_path, "pkg/generator");
    }

    #[test]
    fn test_parse_import_list() {
        assert_eq!(
            parse_import_list("fmt\n\n  vendor/pkg/generator \nunsafe\n"),
            imports(&["fmt", "vendor/pkg/generator", "unsafe"])
        );
        assert!(parse_import_list("").is_empty());
    }

    #[test]
    fn test_static_imports() {
        let lister = StaticImports(imports(&["fmt"]));
        assert_eq!(lister.list_imports(Path::new(".")).unwrap(), imports(&["fmt"]));
    }

    #[test]
    #[ignore = "Requires go toolchain"]
    fn test_go_list_imports() {
        let tmp = tempfile::TempDir::new().unwrap();
        std::fs::write(tmp.path().join("go.mod"), "module example.com/m\n\ngo 1.21\n").unwrap();
        std::fs::write(
            tmp.path().join("main.go"),
            "package main\n\nimport (\n\t\"fmt\"\n\t\"strings\"\n)\n\nfunc main() { fmt.Println(strings.ToUpper(\"x\")) }\n",
        )
        .unwrap();

        let deps = GoListImports::default().list_imports(tmp.path()).unwrap();
        assert_eq!(deps, imports(&["fmt", "strings"]));
    }

    #[test]
    fn test_go_list_missing_binary() {
        let lister = GoListImports::new("/nonexistent/go-binary");
        let err = lister.list_imports(Path::new(".")).unwrap_err();
        assert!(matches!(err, LinknameError::ImportListing { .. }));
    }
}
