//! Assembly of the generated Go source

use crate::matcher::ImportMatch;
use crate::source::ImportSpec;
use crate::symbol::{FunctionDef, SymbolRef};
use std::fmt;

/// Name of the generator as echoed in the generated header
pub const GENERATOR_NAME: &str = "linkname-gen";

/// `//go:linkname local remote`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinknameDirective {
    pub local: String,
    pub remote: String,
}

impl fmt::Display for LinknameDirective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "//go:linkname {} {}", self.local, self.remote)
    }
}

/// Everything that goes into the generated file, in output order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Emission {
    /// Arguments the generator was invoked with
    pub invocation: Vec<String>,
    pub package: String,
    pub imports: Vec<ImportSpec>,
    pub directive: LinknameDirective,
    /// The user's declaration, verbatim
    pub definition: String,
}

impl Emission {
    pub fn new(
        invocation: &[String],
        package: &str,
        import_match: &ImportMatch,
        symbol: &SymbolRef,
        definition: &FunctionDef,
    ) -> Self {
        Self {
            invocation: invocation.to_vec(),
            package: package.to_string(),
            imports: vec![
                ImportSpec::named("_", "unsafe"),
                ImportSpec::new(import_match.import_path.clone()),
            ],
            directive: LinknameDirective {
                local: definition.name().to_string(),
                remote: symbol.qualified(&import_match.import_path),
            },
            definition: definition.text().to_string(),
        }
    }

    pub fn header(&self) -> String {
        let mut command = GENERATOR_NAME.to_string();
        for arg in &self.invocation {
            command.push(' ');
            command.push_str(arg);
        }
        format!("// Code generated by \"{}\"; DO NOT EDIT.", command)
    }

    /// Unformatted source text
    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Emission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.header())?;
        writeln!(f)?;
        writeln!(f, "package {}", self.package)?;
        for spec in &self.imports {
            match &spec.name {
                Some(name) => writeln!(f, "import {} \"{}\"", name, spec.path)?,
                None => writeln!(f, "import \"{}\"", spec.path)?,
            }
        }
        writeln!(f)?;
        writeln!(f, "{}", self.directive)?;
        writeln!(f, "{}", self.definition)
    }
}
