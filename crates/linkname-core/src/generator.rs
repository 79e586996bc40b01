//! The generation pipeline
//!
//! load → resolve → match → emit → format → write. Each stage takes the
//! previous stage's value and returns a new one; nothing is written to disk
//! until every earlier stage has succeeded.

use crate::config::GeneratorConfig;
use crate::constraint::BuildContext;
use crate::emitter::Emission;
use crate::error::Result;
use crate::formatter::{format_source, select_formatter, Formatted, SourceFormatter};
use crate::matcher::{find_import, GoListImports, ImportLister, ImportMatch};
use crate::package::{Package, Target};
use crate::resolver::{resolve, GoVetChecker, Resolution, TypeChecker};
use crate::symbol::{FunctionDef, SymbolRef};
use crate::writer::{write_outputs, WrittenFiles};
use std::path::PathBuf;
use tracing::{debug, info};

/// One invocation's worth of input
#[derive(Debug, Clone)]
pub struct Request {
    pub target: Target,
    pub symbol: SymbolRef,
    pub definition: FunctionDef,
    /// Raw command-line arguments, echoed in the generated header
    pub invocation: Vec<String>,
}

impl Request {
    pub fn new(target: Target, symbol: &str, definition: &str) -> Result<Self> {
        Ok(Self {
            target,
            symbol: SymbolRef::parse(symbol)?,
            definition: FunctionDef::parse(definition)?,
            invocation: Vec::new(),
        })
    }

    pub fn with_invocation(mut self, invocation: Vec<String>) -> Self {
        self.invocation = invocation;
        self
    }
}

/// Everything the pipeline produced
#[derive(Debug, Clone)]
pub struct Generated {
    pub package: Package,
    pub resolution: Resolution,
    pub import_match: ImportMatch,
    pub emission: Emission,
    pub source: Formatted,
    pub output_path: PathBuf,
    pub stub_path: PathBuf,
}

pub struct Generator {
    config: GeneratorConfig,
    /// Platform used to select files; detected from the toolchain when unset
    build: Option<BuildContext>,
    lister: Box<dyn ImportLister>,
    checker: Option<Box<dyn TypeChecker>>,
    formatter: Box<dyn SourceFormatter>,
}

impl Generator {
    /// Generator backed by the Go toolchain named in `config`
    pub fn new(config: GeneratorConfig) -> Self {
        Self {
            build: None,
            lister: Box::new(
                GoListImports::new(config.go_binary.clone()).with_tags(config.tags.clone()),
            ),
            checker: Some(Box::new(
                GoVetChecker::new(config.go_binary.clone()).with_tags(config.tags.clone()),
            )),
            formatter: select_formatter(config.formatter),
            config,
        }
    }

    pub fn with_import_lister(mut self, lister: impl ImportLister + 'static) -> Self {
        self.lister = Box::new(lister);
        self
    }

    pub fn with_type_checker(mut self, checker: impl TypeChecker + 'static) -> Self {
        self.checker = Some(Box::new(checker));
        self
    }

    /// Skip the toolchain type check; the in-process checks still run
    pub fn without_typecheck(mut self) -> Self {
        self.checker = None;
        self
    }

    pub fn with_formatter(mut self, formatter: impl SourceFormatter + 'static) -> Self {
        self.formatter = Box::new(formatter);
        self
    }

    /// Select files for `build` instead of asking the toolchain
    pub fn with_build_context(mut self, build: BuildContext) -> Self {
        self.build = Some(build);
        self
    }

    /// Run every stage except writing
    pub fn generate(&self, request: &Request) -> Result<Generated> {
        let build = match &self.build {
            Some(build) => build.clone(),
            None => BuildContext::detect(&self.config.go_binary, &self.config.tags),
        };
        let package = Package::load(&request.target, &build)?;

        let resolution = match &self.checker {
            Some(checker) => resolve(&package, checker.as_ref())?,
            None => resolve(&package, &SkipTypeCheck)?,
        };

        let imports = self.lister.list_imports(&package.dir)?;
        debug!("{} direct imports in {}", imports.len(), package.dir.display());
        let import_match = find_import(&imports, &request.symbol)?;

        let emission = Emission::new(
            &request.invocation,
            &package.name,
            &import_match,
            &request.symbol,
            &request.definition,
        );
        let source = format_source(self.formatter.as_ref(), &emission.render());

        let output_path = self.config.output_path(&package.dir);
        let stub_path = self.config.stub_path(&package.dir);

        Ok(Generated {
            package,
            resolution,
            import_match,
            emission,
            source,
            output_path,
            stub_path,
        })
    }

    /// Generate and write the output file plus the assembly stub
    pub fn run(&self, request: &Request) -> Result<Generated> {
        let generated = self.generate(request)?;
        let WrittenFiles { output, stub } = write_outputs(
            &generated.output_path,
            &generated.stub_path,
            &generated.source.text,
        )?;
        info!(
            "bound {} to {} in {} (stub {})",
            request.definition.name(),
            generated.emission.directive.remote,
            output.display(),
            stub.display()
        );
        Ok(generated)
    }
}

struct SkipTypeCheck;

impl TypeChecker for SkipTypeCheck {
    fn check(&self, package: &Package) -> Result<()> {
        debug!("type check of {} skipped", package.name);
        Ok(())
    }
}
