//! Package health check before generation
//!
//! Two layers: a cheap in-process pass over the scanned files that builds the
//! package's import and definition tables, and a full type check delegated
//! to the Go toolchain (`go vet`). The tables are informational; generation proceeds
//! only when both layers accept the package.

use crate::error::{spawn_error, LinknameError, Result};
use crate::package::{Package, Target};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

/// Full semantic check of a loaded package
pub trait TypeChecker {
    fn check(&self, package: &Package) -> Result<()>;
}

/// Type-checks the package with `go vet`.
///
/// `go vet` runs the same checker as `go/types` and never compiles or links
/// the package itself, so a body-less declaration backed by a `.s` file is
/// accepted in both directory and file mode.
#[derive(Debug, Clone)]
pub struct GoVetChecker {
    go_binary: PathBuf,
    tags: Vec<String>,
}

impl GoVetChecker {
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

    fn command(&self, package: &Package) -> Command {
        let mut cmd = Command::new(&self.go_binary);
        // Naming a single analyzer disables the others; type errors are
        // still reported
        cmd.args(["vet", "-buildtag"]);
        if !self.tags.is_empty() {
            cmd.arg("-tags").arg(self.tags.join(","));
        }

        match &package.origin {
            Target::Directory(dir) => {
                cmd.arg(".").current_dir(dir);
            }
            Target::Files(_) => {
                cmd.args(package.go_files());
            }
        }
        cmd
    }
}

impl Default for GoVetChecker {
    fn default() -> Self {
        Self::new("go")
    }
}

impl TypeChecker for GoVetChecker {
    fn check(&self, package: &Package) -> Result<()> {
        let output = self
            .command(package)
            .output()
            .map_err(|e| spawn_error(&self.go_binary, e))?;

        if !output.status.success() {
            return Err(LinknameError::TypeCheck(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }
        Ok(())
    }
}

/// Tables produced by the in-process pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    pub package: String,
    /// Every import path used by the package, cgo excluded
    pub imports: BTreeSet<String>,
    /// Top-level functions and the file declaring them
    pub definitions: BTreeMap<String, PathBuf>,
}

/// Build the import/definition tables and reject redeclarations, then hand
/// the package to `checker`
pub fn resolve(package: &Package, checker: &dyn TypeChecker) -> Result<Resolution> {
    let resolution = build_tables(package)?;
    debug!(
        "package {}: {} imports, {} top-level functions",
        resolution.package,
        resolution.imports.len(),
        resolution.definitions.len()
    );

    checker.check(package)?;
    Ok(resolution)
}

fn build_tables(package: &Package) -> Result<Resolution> {
    let mut resolution = Resolution {
        package: package.name.clone(),
        ..Default::default()
    };

    for file in &package.files {
        let mut named: HashMap<&str, &str> = HashMap::new();
        let mut unnamed: BTreeSet<&str> = BTreeSet::new();

        for spec in file.imports.iter().filter(|s| !s.is_cgo()) {
            match spec.name.as_deref() {
                Some("_") | Some(".") => {}
                Some(name) => {
                    if named.insert(name, &spec.path).is_some() {
                        return Err(redeclared(&file.path, name));
                    }
                }
                None => {
                    if !unnamed.insert(&spec.path) {
                        return Err(redeclared(&file.path, spec.binding()));
                    }
                }
            }
            resolution.imports.insert(spec.path.clone());
        }

        for def in &file.definitions {
            if def == "init" || def == "_" {
                continue;
            }
            if let Some(previous) = resolution.definitions.get(def) {
                return Err(LinknameError::TypeCheck(format!(
                    "{}: {} redeclared in this block (previous declaration in {})",
                    file.path.display(),
                    def,
                    previous.display()
                )));
            }
            resolution.definitions.insert(def.clone(), file.path.clone());
        }
    }

    Ok(resolution)
}

fn redeclared(file: &Path, name: &str) -> LinknameError {
    LinknameError::TypeCheck(format!(
        "{}: {} redeclared in this block",
        file.display(),
        name
    ))
}
