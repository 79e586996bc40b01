//! Writing the generated file and its companion stub

use crate::error::{LinknameError, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenFiles {
    pub output: PathBuf,
    pub stub: PathBuf,
}

/// Write `contents` to `output`, then truncate `stub` to an empty file.
/// The stub is rewritten on every run, whatever it held before.
pub fn write_outputs(output: &Path, stub: &Path, contents: &str) -> Result<WrittenFiles> {
    fs::write(output, contents).map_err(|source| LinknameError::WriteOutput {
        path: output.to_path_buf(),
        source,
    })?;
    debug!("wrote {} ({} bytes)", output.display(), contents.len());

    fs::write(stub, b"").map_err(|source| LinknameError::WriteStub {
        path: stub.to_path_buf(),
        source,
    })?;
    debug!("wrote {}", stub.display());

    Ok(WrittenFiles {
        output: output.to_path_buf(),
        stub: stub.to_path_buf(),
    })
}
