//! Package discovery
//!
//! Turns the command line's positional arguments into one Go package: either
//! every file of a directory that builds on the target platform, or an
//! explicit list of files that must all declare the same package.

use crate::constraint::BuildContext;
use crate::error::{LinknameError, Result};
use crate::source::SourceFile;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};
use walkdir::WalkDir;

/// What the user asked us to scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Directory(PathBuf),
    Files(Vec<PathBuf>),
}

impl Target {
    /// Interpret positional arguments. No arguments means the current
    /// directory; a single directory selects directory mode; anything else
    /// is a file list.
    pub fn from_args(args: &[PathBuf]) -> Result<Self> {
        let args: Vec<PathBuf> = if args.is_empty() {
            vec![PathBuf::from(".")]
        } else {
            args.to_vec()
        };

        if args.len() == 1 {
            let meta = std::fs::metadata(&args[0]).map_err(|source| LinknameError::Stat {
                path: args[0].clone(),
                source,
            })?;
            if meta.is_dir() {
                return Ok(Target::Directory(args[0].clone()));
            }
        }
        Ok(Target::Files(args))
    }

    /// Directory the package lives in; generated files go here
    pub fn dir(&self) -> PathBuf {
        match self {
            Target::Directory(dir) => dir.clone(),
            Target::Files(files) => files
                .first()
                .and_then(|f| f.parent())
                .filter(|p| !p.as_os_str().is_empty())
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from(".")),
        }
    }
}

/// A loaded Go package
#[derive(Debug, Clone)]
pub struct Package {
    pub dir: PathBuf,
    pub name: String,
    /// Parsed Go files in load order
    pub files: Vec<SourceFile>,
    /// How the package was selected
    pub origin: Target,
}

impl Package {
    pub fn load(target: &Target, build: &BuildContext) -> Result<Self> {
        match target {
            Target::Directory(dir) => Self::load_dir(dir, build),
            Target::Files(files) => Self::load_files(&target.dir(), files),
        }
    }

    /// Load the files of `dir` (non-recursive) that build on `build`'s
    /// platform
    pub fn load_dir(dir: &Path, build: &BuildContext) -> Result<Self> {
        let mut sources = Vec::new();
        for entry in WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| LinknameError::Directory {
                dir: dir.to_path_buf(),
                source: e.into(),
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let file_name = entry.file_name().to_string_lossy().into_owned();
            if !is_candidate(&file_name) {
                trace!("skipping {}", file_name);
                continue;
            }
            if !build.matches_file_name(&file_name) {
                debug!("{} excluded by file name ({}/{})", file_name, build.goos, build.goarch);
                continue;
            }

            let path = entry.into_path();
            let src = read_source(&path)?;
            if !build.matches_source(&path, &src)? {
                debug!("{} excluded by build constraint", path.display());
                continue;
            }
            sources.push((path, src));
        }

        Self::from_sources(dir, sources, Target::Directory(dir.to_path_buf()))
    }

    /// Load an explicit list of files. Names without a `.go` extension are
    /// skipped; build constraints are not applied, as with `go build a.go`.
    pub fn load_files(dir: &Path, names: &[PathBuf]) -> Result<Self> {
        let mut sources = Vec::new();
        for name in names {
            if name.extension().map_or(true, |ext| ext != "go") {
                continue;
            }
            sources.push((name.clone(), read_source(name)?));
        }
        Self::from_sources(dir, sources, Target::Files(names.to_vec()))
    }

    fn from_sources(dir: &Path, sources: Vec<(PathBuf, String)>, origin: Target) -> Result<Self> {
        let mut files: Vec<SourceFile> = Vec::new();

        for (path, src) in sources {
            let file = SourceFile::parse(&path, &src)?;

            if let Some(first) = files.first() {
                if first.package != file.package {
                    return Err(LinknameError::MixedPackages {
                        first: first.package.clone(),
                        first_file: first.path.clone(),
                        second: file.package,
                        second_file: file.path,
                    });
                }
            }
            files.push(file);
        }

        let name = match files.first() {
            Some(file) => file.package.clone(),
            None => {
                return Err(LinknameError::NoBuildableFiles {
                    dir: dir.to_path_buf(),
                })
            }
        };
        debug!(
            "loaded package {} from {} ({} files)",
            name,
            dir.display(),
            files.len()
        );

        Ok(Self {
            dir: dir.to_path_buf(),
            name,
            files,
            origin,
        })
    }

    pub fn go_files(&self) -> impl Iterator<Item = &Path> {
        self.files.iter().map(|f| f.path.as_path())
    }
}

fn read_source(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|source| LinknameError::Read {
        path: path.to_path_buf(),
        source,
    })
}

/// Go files `go build` would consider for the package, before build
/// constraints
fn is_candidate(file_name: &str) -> bool {
    if file_name.starts_with('_') || file_name.starts_with('.') {
        return false;
    }
    file_name.ends_with(".go") && !file_name.ends_with("_test.go")
}
