//! `esbuild` command line compiler.
//!
//! Each pass runs the binary once. The service handle caches the resolved
//! binary and working directory so lookups happen once per process.

use std::path::{Path, PathBuf};

use crate::config::ModuleFormat;
use crate::debug;
use crate::error::CompilationError;
use crate::utils::exec::{Cmd, FilterRule};

use super::{Artifact, CompileRequest, CompileService, Compiler, Target};

/// Progress lines esbuild prints even at `warning` level.
static ESBUILD_FILTER: FilterRule = FilterRule::new(&["⚡ Done in"]);

/// Compiler backed by the `esbuild` executable.
#[derive(Debug, Clone)]
pub struct Esbuild {
    command: String,
    root: PathBuf,
}

impl Esbuild {
    pub fn new(command: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            command: command.into(),
            root: root.into(),
        }
    }

    /// Locate the binary.
    ///
    /// - `~` is expanded
    /// - paths with a separator resolve against the project root
    /// - bare names prefer `node_modules/.bin`, then `PATH`
    fn resolve_binary(&self) -> Option<PathBuf> {
        let expanded = shellexpand::tilde(&self.command).into_owned();
        let path = Path::new(&expanded);

        if path.components().count() > 1 {
            let full = if path.is_relative() {
                self.root.join(path)
            } else {
                path.to_path_buf()
            };
            return full.is_file().then_some(full);
        }

        let local = self.root.join("node_modules").join(".bin").join(&expanded);
        if local.is_file() {
            return Some(local);
        }
        which::which(&expanded).ok()
    }
}

impl Compiler for Esbuild {
    fn start(&self, target: Target) -> Result<Box<dyn CompileService>, CompilationError> {
        let bin = self.resolve_binary().ok_or_else(|| {
            CompilationError::new(
                target,
                format!(
                    "`{}` not found, install it with `npm install --save-dev esbuild` \
                     or set [compiler] command in kiln.toml",
                    self.command
                ),
            )
        })?;
        debug!("bundle"; "{} compiler: {}", target, bin.display());
        Ok(Box::new(EsbuildService {
            bin,
            cwd: self.root.clone(),
        }))
    }
}

struct EsbuildService {
    bin: PathBuf,
    cwd: PathBuf,
}

impl CompileService for EsbuildService {
    fn compile(&mut self, request: &CompileRequest) -> Result<Artifact, CompilationError> {
        let node_env = if request.minify { "production" } else { "development" };
        Cmd::new(&self.bin)
            .args(args(request))
            .cwd(&self.cwd)
            .envs([("NODE_ENV", node_env)])
            .filter(&ESBUILD_FILTER)
            .run()
            .map_err(|e| CompilationError::new(request.target, format!("{e:#}")))?;

        Ok(Artifact {
            target: request.target,
            dir: request.out_dir.clone(),
            entry: request.output_entry(),
        })
    }

    fn stop(&mut self) {
        debug!("bundle"; "released {}", self.bin.display());
    }
}

/// Browsers cannot load CommonJS; a single-file client build is an IIFE.
fn esbuild_format(request: &CompileRequest) -> &'static str {
    match (request.target, request.format) {
        (Target::Client, ModuleFormat::Cjs) => "iife",
        (_, format) => format.as_str(),
    }
}

/// Command line for one pass.
fn args(request: &CompileRequest) -> Vec<String> {
    let mut args = vec![
        request.entry.display().to_string(),
        "--bundle".to_string(),
        format!("--platform={}", request.target.platform().as_str()),
        format!("--format={}", esbuild_format(request)),
        format!("--outdir={}", request.out_dir.display()),
        "--jsx=automatic".to_string(),
        "--loader:.js=jsx".to_string(),
        "--log-level=warning".to_string(),
        format!("--public-path={}", request.public_path),
        "--asset-names=assets/[name]-[hash]".to_string(),
    ];

    if request.minify {
        args.push("--minify".to_string());
    }
    if request.sourcemap {
        args.push("--sourcemap".to_string());
    }
    if request.splitting {
        args.push("--splitting".to_string());
        args.push("--chunk-names=chunks/[name]-[hash]".to_string());
    }
    for (key, value) in &request.define {
        args.push(format!("--define:{key}={value}"));
    }
    for (from, to) in &request.alias {
        args.push(format!("--alias:{from}={to}"));
    }
    for ext in &request.file_loaders {
        args.push(format!("--loader:.{ext}=file"));
    }
    for package in &request.external {
        args.push(format!("--external:{package}"));
    }
    args
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn request(target: Target, format: ModuleFormat) -> CompileRequest {
        CompileRequest {
            target,
            format,
            entry: PathBuf::from("/b/templates/server-entry.jsx"),
            out_dir: PathBuf::from("/b/server"),
            minify: false,
            sourcemap: true,
            splitting: false,
            define: vec![("process.env.IS_SERVER".into(), "true".into())],
            external: vec!["react".into()],
            alias: vec![],
            file_loaders: vec!["svg".into()],
            public_path: "/_kiln/".into(),
        }
    }

    #[test]
    fn test_server_args() {
        let args = args(&request(Target::Server, ModuleFormat::Cjs));
        assert_eq!(args[0], "/b/templates/server-entry.jsx");
        assert!(args.contains(&"--platform=node".to_string()));
        assert!(args.contains(&"--format=cjs".to_string()));
        assert!(args.contains(&"--define:process.env.IS_SERVER=true".to_string()));
        assert!(args.contains(&"--external:react".to_string()));
        assert!(args.contains(&"--loader:.svg=file".to_string()));
        assert!(args.contains(&"--sourcemap".to_string()));
        assert!(!args.contains(&"--minify".to_string()));
    }

    #[test]
    fn test_cjs_client_is_iife() {
        let args = args(&request(Target::Client, ModuleFormat::Cjs));
        assert!(args.contains(&"--format=iife".to_string()));
    }

    #[test]
    fn test_server_entry_is_plain_js() {
        let req = request(Target::Server, ModuleFormat::Cjs);
        assert!(!args(&req).iter().any(|a| a.starts_with("--out-extension")));
        assert_eq!(req.output_entry(), PathBuf::from("/b/server/server-entry.js"));
    }

    #[test]
    fn test_client_splitting() {
        let mut req = request(Target::Client, ModuleFormat::Esm);
        req.splitting = true;
        req.minify = true;
        let args = args(&req);
        assert!(args.contains(&"--platform=browser".to_string()));
        assert!(args.contains(&"--splitting".to_string()));
        assert!(args.contains(&"--minify".to_string()));
        assert!(!args.iter().any(|a| a.starts_with("--out-extension")));
    }

    #[test]
    fn test_missing_binary_is_compilation_error() {
        let dir = TempDir::new().unwrap();
        let compiler = Esbuild::new("./no-such-esbuild", dir.path());
        let err = compiler.start(Target::Client).err().unwrap();
        assert_eq!(err.target, Target::Client);
        assert!(err.message.contains("no-such-esbuild"));
    }

    #[test]
    fn test_prefers_local_bin() {
        let dir = TempDir::new().unwrap();
        let bin = dir.path().join("node_modules/.bin");
        std::fs::create_dir_all(&bin).unwrap();
        std::fs::write(bin.join("esbuild"), "").unwrap();
        let compiler = Esbuild::new("esbuild", dir.path());
        assert_eq!(compiler.resolve_binary(), Some(bin.join("esbuild")));
    }
}
