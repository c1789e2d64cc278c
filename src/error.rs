//! Error taxonomy for the build pipeline and request handling.
//!
//! Pipeline stages return these typed errors; the CLI and dev loop wrap them
//! in `anyhow` with context.

use thiserror::Error;

use crate::compile::Target;
use crate::config::ConfigError;
use crate::route::{RouteConflict, format_conflicts};
use crate::utils::plural::plural_s;

/// Two or more page files claim the same pattern or identifier.
#[derive(Debug, Clone, Error)]
#[error(
    "{} route conflict{}\n{}",
    .conflicts.len(),
    plural_s(.conflicts.len()),
    format_conflicts(.conflicts)
)]
pub struct RouteConflictError {
    pub conflicts: Vec<RouteConflict>,
}

/// One compile pass failed; the previous generation stays live.
#[derive(Debug, Clone, Error)]
#[error("{target} bundle failed\n{message}")]
pub struct CompilationError {
    pub target: Target,
    pub message: String,
}

impl CompilationError {
    pub fn new(target: Target, message: impl Into<String>) -> Self {
        Self {
            target,
            message: message.into(),
        }
    }
}

/// A route loader rejected, panicked or timed out.
#[derive(Debug, Clone, Error)]
#[error("loader for `{route}` failed: {message}")]
pub struct LoaderError {
    /// Route pattern the loader belongs to.
    pub route: String,
    /// Full diagnostic (error chain or host stack trace).
    pub message: String,
}

/// Rendering the application root failed.
#[derive(Debug, Clone, Error)]
#[error("render failed: {message}")]
pub struct RenderError {
    pub message: String,
}

/// Why a single request could not produce a page.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error(transparent)]
    Loader(#[from] LoaderError),
    #[error(transparent)]
    Render(#[from] RenderError),
}

impl RequestError {
    /// Diagnostic shown in development responses.
    pub fn diagnostic(&self) -> String {
        self.to_string()
    }
}

/// A rebuild failed at one of its stages.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Route(#[from] RouteConflictError),
    #[error(transparent)]
    Compile(#[from] CompilationError),
    #[error("failed to load server module: {0}")]
    Module(String),
    #[error("no production build found, run `kiln build` first\n{0}")]
    NotBuilt(String),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("build output: {0}")]
    Io(#[from] std::io::Error),
}

impl BuildError {
    /// Short label for watch status lines.
    pub fn summary(&self) -> &'static str {
        match self {
            Self::Route(_) => "route conflict",
            Self::Compile(_) => "bundle failed",
            Self::Module(_) => "module load failed",
            Self::NotBuilt(_) => "no build",
            Self::Config(_) => "config error",
            Self::Io(_) => "build output error",
        }
    }
}
