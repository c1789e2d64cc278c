//! Compilation orchestration: two coordinated passes per build.
//!
//! ```text
//! Templates ──► Orchestrator::bundle(build_id)
//!                 ├── server pass  (node, externals, IS_SERVER=true)
//!                 └── client pass  (browser, bundled, IS_SERVER=false)
//!                        │
//!                        ▼
//!   .kiln/builds/<id>/{templates,server,client,manifest.json}
//! ```
//!
//! The compiler itself is a collaborator behind [`Compiler`]; `esbuild` is
//! the production implementation.

mod esbuild;
mod externals;
mod manifest;
mod orchestrator;
#[cfg(test)]
pub(crate) mod testing;

pub use esbuild::Esbuild;
pub use externals::{FRAMEWORK_PACKAGES, manifest_dependencies, server_externals};
pub use manifest::{MANIFEST_FILE, Manifest};
pub use orchestrator::{Bundle, Orchestrator};

use std::fmt;
use std::path::{Path, PathBuf};

use crate::config::ModuleFormat;
use crate::error::CompilationError;

/// Which half of the application a pass produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
    Server,
    Client,
}

impl Target {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Server => "server",
            Self::Client => "client",
        }
    }

    pub const fn platform(self) -> Platform {
        match self {
            Self::Server => Platform::Node,
            Self::Client => Platform::Browser,
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Execution platform of the compiled output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Node,
    Browser,
}

impl Platform {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Node => "node",
            Self::Browser => "browser",
        }
    }
}

/// Everything one compile pass needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileRequest {
    pub target: Target,
    pub format: ModuleFormat,
    /// Generated entry source.
    pub entry: PathBuf,
    pub out_dir: PathBuf,
    pub minify: bool,
    pub sourcemap: bool,
    /// Split output into per-route chunks.
    pub splitting: bool,
    /// Compile-time constants, values are JS expressions.
    pub define: Vec<(String, String)>,
    /// Bare specifiers left for the runtime to resolve.
    pub external: Vec<String>,
    /// Import specifier rewrites.
    pub alias: Vec<(String, String)>,
    /// Extensions emitted as files and imported as URLs.
    pub file_loaders: Vec<String>,
    /// URL prefix of emitted files.
    pub public_path: String,
}

impl CompileRequest {
    /// Path of the compiled entry inside `out_dir`.
    pub fn output_entry(&self) -> PathBuf {
        let stem = self
            .entry
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.target.to_string());
        self.out_dir.join(format!("{stem}.js"))
    }
}

/// Output of one successful pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub target: Target,
    pub dir: PathBuf,
    /// Compiled entry module.
    pub entry: PathBuf,
}

impl Artifact {
    /// Entry path relative to `base`, `/`-separated.
    pub fn entry_relative(&self, base: &Path) -> Option<String> {
        crate::utils::path::relative_slash(&self.entry, base)
    }
}

/// Starts compiler services, one per target.
pub trait Compiler: Send + Sync {
    fn start(&self, target: Target) -> Result<Box<dyn CompileService>, CompilationError>;
}

/// A long-lived compiler handle reused across rebuilds.
pub trait CompileService: Send {
    fn compile(&mut self, request: &CompileRequest) -> Result<Artifact, CompilationError>;

    /// Release the handle. Called once, on dispose.
    fn stop(&mut self) {}
}
