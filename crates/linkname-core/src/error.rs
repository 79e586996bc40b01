//! Error types for linkname generation

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, LinknameError>;

#[derive(Error, Debug)]
pub enum LinknameError {
    #[error("invalid symbol `{symbol}`: {reason}")]
    InvalidSymbol { symbol: String, reason: String },

    #[error("invalid definition `{definition}`: {reason}")]
    InvalidDefinition { definition: String, reason: String },

    #[error("cannot process directory {}: {source}", dir.display())]
    Directory {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot stat {}: {source}", path.display())]
    Stat {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}: no buildable Go files", dir.display())]
    NoBuildableFiles { dir: PathBuf },

    #[error("parsing package: {}:{line}:{column}: {message}", file.display())]
    Parse {
        file: PathBuf,
        line: usize,
        column: usize,
        message: String,
    },

    #[error("{}: {message}", file.display())]
    BuildConstraint { file: PathBuf, message: String },

    #[error("found packages {first} ({}) and {second} ({})", first_file.display(), second_file.display())]
    MixedPackages {
        first: String,
        first_file: PathBuf,
        second: String,
        second_file: PathBuf,
    },

    #[error("checking package: {0}")]
    TypeCheck(String),

    #[error("listing imports of {}: {message}", dir.display())]
    ImportListing { dir: PathBuf, message: String },

    #[error("no such symbol: `{0}`")]
    NoSuchSymbol(String),

    #[error("{0} executable not found in PATH")]
    ToolNotFound(String),

    #[error("formatting generated source: {0}")]
    Format(String),

    #[error("Process execution failed: {0}")]
    ProcessFailed(String),

    #[error("reading {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("writing output: {}: {source}", path.display())]
    WriteOutput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("writing assembly stub: {}: {source}", path.display())]
    WriteStub {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Coarse classification used by the binary to pick an exit status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Bad flag values
    Usage,
    /// Package discovery, parsing or import listing failed
    Load,
    /// The package does not type-check
    TypeCheck,
    /// The requested symbol has no matching import
    Symbol,
    /// The formatter rejected the generated buffer
    Format,
    /// Final writes failed
    Io,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Usage => write!(f, "USAGE"),
            ErrorKind::Load => write!(f, "LOAD"),
            ErrorKind::TypeCheck => write!(f, "TYPE_CHECK"),
            ErrorKind::Symbol => write!(f, "SYMBOL"),
            ErrorKind::Format => write!(f, "FORMAT"),
            ErrorKind::Io => write!(f, "IO"),
        }
    }
}

impl LinknameError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LinknameError::InvalidSymbol { .. } | LinknameError::InvalidDefinition { .. } => {
                ErrorKind::Usage
            }
            LinknameError::Directory { .. }
            | LinknameError::Stat { .. }
            | LinknameError::NoBuildableFiles { .. }
            | LinknameError::Parse { .. }
            | LinknameError::BuildConstraint { .. }
            | LinknameError::MixedPackages { .. }
            | LinknameError::ImportListing { .. }
            | LinknameError::ToolNotFound(_)
            | LinknameError::ProcessFailed(_)
            | LinknameError::Read { .. } => ErrorKind::Load,
            LinknameError::TypeCheck(_) => ErrorKind::TypeCheck,
            LinknameError::NoSuchSymbol(_) => ErrorKind::Symbol,
            LinknameError::Format(_) => ErrorKind::Format,
            LinknameError::WriteOutput { .. } | LinknameError::WriteStub { .. } => ErrorKind::Io,
        }
    }

    /// Process exit status for this error: 2 for usage problems, 1 otherwise
    pub fn exit_code(&self) -> u8 {
        match self.kind() {
            ErrorKind::Usage => 2,
            _ => 1,
        }
    }
}

/// Error for a toolchain binary that could not be started
pub(crate) fn spawn_error(binary: &Path, err: io::Error) -> LinknameError {
    if err.kind() == io::ErrorKind::NotFound {
        LinknameError::ToolNotFound(binary.display().to_string())
    } else {
        LinknameError::ProcessFailed(format!("{}: {}", binary.display(), err))
    }
}
