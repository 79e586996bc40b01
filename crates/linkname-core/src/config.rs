//! Generator configuration

use crate::formatter::FormatterChoice;
use std::path::{Path, PathBuf};

/// File written next to the package when no output path is given
pub const DEFAULT_OUTPUT_NAME: &str = "sym_linkname.go";

/// Empty assembly file that lets the compiler accept a body-less declaration
pub const STUB_NAME: &str = "linkname.s";

#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Explicit output path; overrides `output_name`
    pub output: Option<PathBuf>,
    /// Output file name inside the package directory
    pub output_name: String,
    pub stub_name: String,
    /// `go` executable used for import listing and type checking
    pub go_binary: PathBuf,
    pub formatter: FormatterChoice,
    /// Extra build tags for constraint matching and the toolchain
    pub tags: Vec<String>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            output: None,
            output_name: DEFAULT_OUTPUT_NAME.to_string(),
            stub_name: STUB_NAME.to_string(),
            go_binary: PathBuf::from("go"),
            formatter: FormatterChoice::default(),
            tags: Vec::new(),
        }
    }
}

impl GeneratorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_output(mut self, output: Option<PathBuf>) -> Self {
        self.output = output;
        self
    }

    pub fn with_go_binary(mut self, go_binary: impl Into<PathBuf>) -> Self {
        self.go_binary = go_binary.into();
        self
    }

    pub fn with_formatter(mut self, formatter: FormatterChoice) -> Self {
        self.formatter = formatter;
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn output_path(&self, dir: &Path) -> PathBuf {
        match &self.output {
            Some(path) => path.clone(),
            None => dir.join(self.output_name.to_lowercase()),
        }
    }

    pub fn stub_path(&self, dir: &Path) -> PathBuf {
        dir.join(&self.stub_name)
    }
}
