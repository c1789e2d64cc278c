//! Command-line interface module.
//!
//! ```text
//! kiln dev   [dir]  ─► watch + rebuild + live reload + SSR
//! kiln build [dir]  ─► one production generation + build.json
//! kiln start [dir]  ─► SSR over the generation build.json names
//! ```

mod args;
mod build;
mod dev;
mod start;

pub use args::{Cli, Commands};

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::compile::Esbuild;
use crate::config::{BuildOptions, KilnConfig, Mode};
use crate::error::BuildError;
use crate::module::NodeLoader;
use crate::route::print_conflicts;
use crate::runtime::Runtime;
use crate::server::HttpServer;

/// How long actors and request workers get to wind down after Ctrl+C.
const SHUTDOWN_GRACE: Duration = Duration::from_millis(500);

/// Run the selected subcommand.
pub fn run(cli: &Cli) -> Result<()> {
    match &cli.command {
        Commands::Dev { .. } => dev::run(cli),
        Commands::Start { .. } => start::run(cli),
        Commands::Build { .. } => build::run(cli),
    }
}

/// Resolve the project root, read `kiln.toml` and apply command line flags.
fn load_config(cli: &Cli) -> Result<(PathBuf, KilnConfig)> {
    let root = resolve_root(cli.dir())?;
    let mut config = KilnConfig::load(&root)?;
    config.apply(&cli.overrides());
    config.validate()?;
    Ok((root, config))
}

fn resolve_root(dir: &Path) -> Result<PathBuf> {
    let root = dir
        .canonicalize()
        .with_context(|| format!("project directory `{}` not found", dir.display()))?;
    anyhow::ensure!(root.is_dir(), "`{}` is not a directory", root.display());
    Ok(root)
}

/// Runtime wired to the external bundler and the node module host.
fn new_runtime(options: BuildOptions) -> Arc<Runtime> {
    let compiler = Esbuild::new(options.compiler.clone(), options.root.clone());
    let loader = NodeLoader::new(options.node.clone(), options.root.clone());
    Arc::new(Runtime::new(
        Arc::new(options),
        Arc::new(compiler),
        Arc::new(loader),
    ))
}

fn load_options(cli: &Cli, mode: Mode) -> Result<BuildOptions> {
    let (root, config) = load_config(cli)?;
    Ok(BuildOptions::from_config(&root, mode, &config))
}

fn tokio_runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("kiln-rt")
        .build()
        .context("failed to start async runtime")
}

/// Print a build failure, listing every source of a route conflict.
fn report_build_error(err: &BuildError) {
    if let BuildError::Route(conflict) = err {
        print_conflicts(&conflict.conflicts);
    }
}

/// Serve requests on the calling thread until Ctrl+C, then release
/// compiler services and module hosts.
fn serve(
    server: HttpServer,
    runtime: Arc<Runtime>,
    rt: tokio::runtime::Runtime,
    actors: Option<tokio::task::JoinHandle<()>>,
) -> Result<()> {
    let result = server.run(Arc::clone(&runtime), rt.handle().clone());

    if let Some(actors) = actors {
        rt.block_on(async {
            let _ = tokio::time::timeout(SHUTDOWN_GRACE, actors).await;
        });
    }
    runtime.dispose();
    rt.shutdown_timeout(SHUTDOWN_GRACE);
    result
}
