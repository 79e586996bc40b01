//! Core of linkname-gen
//!
//! Given a Go package, a remote symbol and a local function declaration,
//! produce a self-contained Go file binding the declaration to the symbol
//! with a `//go:linkname` directive. The symbol's import path is taken from
//! the package's own import list, so vendored paths resolve correctly.
//!
//! # Example
//!
//! ```no_run
//! use linkname_core::{Generator, GeneratorConfig, Request, Target};
//!
//! let request = Request::new(
//!     Target::from_args(&[]).unwrap(),
//!     "github.com/gogo/protobuf/protoc-gen-gogo/generator.(*Generator).goTag",
//!     "func goTag(*generator.Generator, string) string",
//! )
//! .unwrap();
//!
//! let generated = Generator::new(GeneratorConfig::default()).run(&request).unwrap();
//! println!("{}", generated.output_path.display());
//! ```

pub mod config;
pub mod constraint;
pub mod emitter;
pub mod formatter;
pub mod generator;
pub mod matcher;
pub mod package;
pub mod resolver;
pub mod source;
pub mod symbol;
pub mod writer;

mod error;

pub use config::GeneratorConfig;
pub use constraint::BuildContext;
pub use error::{ErrorKind, LinknameError, Result};
pub use generator::{Generated, Generator, Request};
pub use package::{Package, Target};

/// Re-exports for convenience
pub mod prelude {
    pub use crate::config::GeneratorConfig;
    pub use crate::constraint::BuildContext;
    pub use crate::formatter::{FormatterChoice, ImportBlockFormatter, SourceFormatter};
    pub use crate::generator::{Generated, Generator, Request};
    pub use crate::matcher::{ImportLister, StaticImports};
    pub use crate::package::{Package, Target};
    pub use crate::resolver::TypeChecker;
    pub use crate::symbol::{FunctionDef, SymbolRef};
    pub use crate::{ErrorKind, LinknameError, Result};
}
