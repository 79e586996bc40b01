//! Parsing of the `-symbol` and `-def` arguments

use crate::error::{LinknameError, Result};
use std::fmt;
use std::str::FromStr;

/// A fully qualified remote symbol such as
/// `github.com/gogo/protobuf/protoc-gen-gogo/generator.(*Generator).goTag`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolRef {
    raw: String,
    package_path: String,
    member: String,
}

impl SymbolRef {
    /// Split on the last `/`; in the final element, the text before the
    /// first `.` is the package name and everything after it the member
    /// selector (which may carry a receiver, e.g. `(*Generator).goTag`).
    pub fn parse(symbol: &str) -> Result<Self> {
        let invalid = |reason: &str| LinknameError::InvalidSymbol {
            symbol: symbol.to_string(),
            reason: reason.to_string(),
        };

        if symbol.trim().is_empty() {
            return Err(invalid("symbol is empty"));
        }
        let (dir, last) = match symbol.rfind('/') {
            Some(i) => symbol.split_at(i + 1),
            None => ("", symbol),
        };
        let (package, member) = last
            .split_once('.')
            .ok_or_else(|| invalid("missing member selector after package path"))?;
        if package.is_empty() {
            return Err(invalid("missing package name"));
        }
        if member.is_empty() {
            return Err(invalid("missing member selector after package path"));
        }

        Ok(Self {
            raw: symbol.to_string(),
            package_path: format!("{}{}", dir, package),
            member: member.to_string(),
        })
    }

    /// The symbol exactly as given
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Package path without the member, e.g. `pkg/generator`
    pub fn package_path(&self) -> &str {
        &self.package_path
    }

    /// Member selector, e.g. `(*Generator).goTag`
    pub fn member(&self) -> &str {
        &self.member
    }

    /// The symbol re-rooted at `import_path`.
    ///
    /// The member selector is kept: the linker needs the full
    /// `path.(*Recv).name` target, not just the package path.
    pub fn qualified(&self, import_path: &str) -> String {
        format!("{}.{}", import_path, self.member)
    }
}

impl FromStr for SymbolRef {
    type Err = LinknameError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for SymbolRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// The user's local function declaration, kept verbatim
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionDef {
    text: String,
    name: String,
}

impl FunctionDef {
    /// The name is whatever sits between the `func` keyword and the first `(`
    pub fn parse(definition: &str) -> Result<Self> {
        let invalid = |reason: &str| LinknameError::InvalidDefinition {
            definition: definition.to_string(),
            reason: reason.to_string(),
        };

        let (keyword, rest) = definition
            .split_once(' ')
            .ok_or_else(|| invalid("must begin with `func `"))?;
        if keyword != "func" {
            return Err(invalid("must begin with `func `"));
        }
        if !rest.contains('(') {
            return Err(invalid("missing parameter list"));
        }
        let name = rest.split('(').next().unwrap_or_default().trim();
        if !is_identifier(name) {
            return Err(invalid("expected a function name before `(`"));
        }

        Ok(Self {
            text: definition.to_string(),
            name: name.to_string(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

impl FromStr for FunctionDef {
    type Err = LinknameError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c == '_' || c.is_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c == '_' || c.is_alphanumeric())
}
