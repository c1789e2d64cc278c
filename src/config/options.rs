//! Resolved, immutable build options.
//!
//! `BuildOptions` is derived once from `kiln.toml` plus command line
//! overrides and shared as `Arc<BuildOptions>` for the life of the process.

use std::fmt;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::KilnConfig;
use crate::utils::glob::Glob;

/// Development or production behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Development,
    Production,
}

/// Module format of the compiled output.
///
/// - `Cjs`: one bundle per target, pages bound synchronously
/// - `Esm`: client split into chunks, pages loaded on demand
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleFormat {
    #[default]
    Cjs,
    Esm,
}

impl ModuleFormat {
    /// Value of the compiler's `--format` flag.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cjs => "cjs",
            Self::Esm => "esm",
        }
    }
}

impl fmt::Display for ModuleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Process-wide configuration, fixed at startup.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Absolute project root.
    pub root: PathBuf,
    pub mode: Mode,
    pub pages_dir: PathBuf,
    pub public_dir: PathBuf,
    pub cache_dir: PathBuf,
    /// Extra watch globs, relative to `root`.
    pub watch: Vec<Glob>,
    pub format: ModuleFormat,
    pub interface: std::net::IpAddr,
    pub port: u16,
    /// First port tried for the live-reload socket.
    pub ws_port: u16,
    pub loader_timeout: Duration,
    /// Bundler command as configured (resolved when the compiler starts).
    pub compiler: String,
    pub node: String,
    /// Extra server-pass externals.
    pub externals: Vec<String>,
}

impl BuildOptions {
    /// Defaults rooted at `root`, without reading `kiln.toml`.
    pub fn new(root: impl AsRef<Path>, mode: Mode) -> Self {
        Self::from_config(root.as_ref(), mode, &KilnConfig::default())
    }

    /// Resolve every directory in `config` against `root`.
    ///
    /// Invalid watch globs are skipped here; `KilnConfig::validate` reports them.
    pub fn from_config(root: &Path, mode: Mode, config: &KilnConfig) -> Self {
        let root = crate::utils::path::normalize_path(root);
        let build = &config.build;
        Self {
            pages_dir: KilnConfig::resolve(&root, &build.pages),
            public_dir: KilnConfig::resolve(&root, &build.public),
            cache_dir: KilnConfig::resolve(&root, &build.cache),
            watch: build.watch.iter().filter_map(|g| Glob::new(g).ok()).collect(),
            format: build.format,
            interface: config.serve.interface,
            port: config.serve.port,
            ws_port: config.serve.ws_port,
            loader_timeout: Duration::from_secs(config.serve.loader_timeout),
            compiler: config.compiler.command.clone(),
            node: config.compiler.node.clone(),
            externals: build.externals.clone(),
            root,
            mode,
        }
    }

    #[inline]
    pub fn is_dev(&self) -> bool {
        self.mode == Mode::Development
    }

    /// Parent of all generation directories.
    pub fn builds_dir(&self) -> PathBuf {
        self.cache_dir.join("builds")
    }

    /// Path of the metadata file written by `build`.
    pub fn meta_path(&self) -> PathBuf {
        self.cache_dir.join("build.json")
    }

    pub fn http_addr(&self) -> SocketAddr {
        SocketAddr::new(self.interface, self.port)
    }

    /// Check whether a project-relative path matches an extra watch glob.
    pub fn is_watched(&self, relative: &str) -> bool {
        self.watch.iter().any(|g| g.is_match(relative))
    }
}
