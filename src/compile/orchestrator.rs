//! Two-pass bundling into per-build generation directories.
//!
//! A build writes only below its own `builds/<id>/` directory. Nothing a
//! previous build produced is touched until the runtime has switched to
//! the new generation, so requests never observe a half-written output.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;

use crate::config::{BuildOptions, ModuleFormat};
use crate::core::BuildId;
use crate::error::{BuildError, CompilationError};
use crate::route::RouteTable;
use crate::template::{APP_FILE, CLIENT_ENTRY_FILE, SERVER_ENTRY_FILE, Templates};
use crate::{debug, log};

use super::externals::server_externals;
use super::manifest::Manifest;
use super::{Artifact, CompileRequest, CompileService, Compiler, Target};

/// Asset extensions emitted as files rather than inlined.
const FILE_LOADERS: &[&str] = &["svg", "png", "jpg", "jpeg", "gif", "webp", "css", "woff", "woff2"];

/// URL prefix of compiled client files.
pub const PUBLIC_PATH: &str = "/_kiln/";

/// A complete, paired server and client build.
#[derive(Debug, Clone)]
pub struct Bundle {
    pub build_id: BuildId,
    pub format: ModuleFormat,
    /// Generation directory.
    pub dir: PathBuf,
    pub server: Artifact,
    pub client: Artifact,
    pub manifest: Manifest,
}

impl Bundle {
    /// Reopen a generation directory written by a previous process.
    pub fn open(dir: &Path) -> anyhow::Result<Self> {
        let manifest = Manifest::read(dir)?;
        let server = Artifact {
            target: Target::Server,
            dir: dir.join(Target::Server.as_str()),
            entry: dir.join(&manifest.server_entry),
        };
        let client = Artifact {
            target: Target::Client,
            dir: dir.join(Target::Client.as_str()),
            entry: dir.join(&manifest.client_entry),
        };
        if !server.entry.is_file() {
            anyhow::bail!("server entry {} is missing", server.entry.display());
        }
        Ok(Self {
            build_id: manifest.build_id,
            format: manifest.format,
            dir: dir.to_path_buf(),
            server,
            client,
            manifest,
        })
    }
}

/// Owns compiler services and drives both passes.
pub struct Orchestrator {
    options: Arc<BuildOptions>,
    compiler: Arc<dyn Compiler>,
    externals: Vec<String>,
    server: Mutex<Option<Box<dyn CompileService>>>,
    client: Mutex<Option<Box<dyn CompileService>>>,
}

impl Orchestrator {
    pub fn new(options: Arc<BuildOptions>, compiler: Arc<dyn Compiler>) -> Self {
        let externals = server_externals(&options.root, &options.externals);
        debug!("bundle"; "server externals: {}", externals.join(", "));
        Self {
            options,
            compiler,
            externals,
            server: Mutex::new(None),
            client: Mutex::new(None),
        }
    }

    /// Directory of the generation for `build_id`.
    pub fn generation_dir(&self, build_id: BuildId) -> PathBuf {
        self.options.builds_dir().join(build_id.to_string())
    }

    /// Compile requests for both passes of one build.
    pub fn requests(&self, dir: &Path) -> (CompileRequest, CompileRequest) {
        let templates = dir.join("templates");
        let dev = self.options.is_dev();
        let format = self.options.format;
        let node_env = if dev { "\"development\"" } else { "\"production\"" };
        let alias = vec![(
            "kiln".to_string(),
            crate::utils::path::to_import_specifier(&templates.join(APP_FILE)),
        )];

        let base = |target: Target, entry: &str| CompileRequest {
            target,
            format,
            entry: templates.join(entry),
            out_dir: dir.join(target.as_str()),
            minify: !dev,
            sourcemap: dev,
            splitting: false,
            define: vec![
                (
                    "process.env.IS_SERVER".to_string(),
                    (target == Target::Server).to_string(),
                ),
                ("process.env.NODE_ENV".to_string(), node_env.to_string()),
            ],
            external: Vec::new(),
            alias: alias.clone(),
            file_loaders: FILE_LOADERS.iter().map(|s| s.to_string()).collect(),
            public_path: PUBLIC_PATH.to_string(),
        };

        // Node resolves externals and pages synchronously: always CommonJS
        let server = CompileRequest {
            format: ModuleFormat::Cjs,
            external: self.externals.clone(),
            ..base(Target::Server, SERVER_ENTRY_FILE)
        };
        let client = CompileRequest {
            splitting: format == ModuleFormat::Esm,
            ..base(Target::Client, CLIENT_ENTRY_FILE)
        };
        (server, client)
    }

    /// Write templates, run both passes concurrently, then the manifest.
    ///
    /// On failure the generation directory is removed; earlier generations
    /// are left untouched.
    pub fn bundle(
        &self,
        build_id: BuildId,
        table: &RouteTable,
        templates: &Templates,
    ) -> Result<Bundle, BuildError> {
        let start = Instant::now();
        let dir = self.generation_dir(build_id);

        let result = self.bundle_into(&dir, build_id, table, templates);
        match &result {
            Ok(_) => log!("bundle"; "success in {}ms", start.elapsed().as_millis()),
            Err(_) => {
                if let Err(e) = fs::remove_dir_all(&dir) {
                    debug!("bundle"; "failed to clean {}: {}", dir.display(), e);
                }
            }
        }
        result
    }

    fn bundle_into(
        &self,
        dir: &Path,
        build_id: BuildId,
        table: &RouteTable,
        templates: &Templates,
    ) -> Result<Bundle, BuildError> {
        templates.write(&dir.join("templates"))?;
        let (server_req, client_req) = self.requests(dir);

        let (server, client) = rayon::join(
            || Self::run(&self.server, self.compiler.as_ref(), &server_req),
            || Self::run(&self.client, self.compiler.as_ref(), &client_req),
        );
        let (server, client) = (server?, client?);

        let relative = |artifact: &Artifact| {
            artifact
                .entry_relative(dir)
                .ok_or_else(|| CompilationError::new(artifact.target, "entry outside build dir"))
        };
        let manifest = Manifest {
            build_id,
            format: self.options.format,
            server_entry: relative(&server)?,
            client_entry: relative(&client)?,
            routes: table.routes().to_vec(),
        };
        manifest.write(dir)?;

        Ok(Bundle {
            build_id,
            format: self.options.format,
            dir: dir.to_path_buf(),
            server,
            client,
            manifest,
        })
    }

    /// Run one pass on the target's service, starting it on first use.
    fn run(
        slot: &Mutex<Option<Box<dyn CompileService>>>,
        compiler: &dyn Compiler,
        request: &CompileRequest,
    ) -> Result<Artifact, CompilationError> {
        let mut guard = slot.lock();
        let service = match guard.take() {
            Some(service) => service,
            None => compiler.start(request.target)?,
        };
        let service = guard.insert(service);
        fs::create_dir_all(&request.out_dir)
            .map_err(|e| CompilationError::new(request.target, e.to_string()))?;
        service.compile(request)
    }

    /// Delete generation directories other than `keep`.
    pub fn prune(&self, keep: &[BuildId]) -> usize {
        let Ok(entries) = fs::read_dir(self.options.builds_dir()) else {
            return 0;
        };
        let mut removed = 0;
        for entry in entries.filter_map(Result::ok) {
            let name = entry.file_name();
            let Some(id) = name.to_str().and_then(|s| s.parse::<BuildId>().ok()) else {
                continue;
            };
            if keep.contains(&id) {
                continue;
            }
            match fs::remove_dir_all(entry.path()) {
                Ok(()) => removed += 1,
                Err(e) => debug!("bundle"; "failed to prune {}: {}", id, e),
            }
        }
        removed
    }

    /// Stop held compiler services. Later builds start fresh ones.
    pub fn dispose(&self) {
        for slot in [&self.server, &self.client] {
            if let Some(mut service) = slot.lock().take() {
                service.stop();
            }
        }
    }
}

impl Drop for Orchestrator {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::testing::FakeCompiler;
    use crate::config::Mode;
    use crate::route::RouteDescriptor;
    use crate::template::{EmitOptions, emit};
    use tempfile::TempDir;

    fn setup(mode: Mode) -> (TempDir, Arc<FakeCompiler>, Orchestrator) {
        setup_with(mode, ModuleFormat::Cjs)
    }

    fn setup_with(mode: Mode, format: ModuleFormat) -> (TempDir, Arc<FakeCompiler>, Orchestrator) {
        let dir = TempDir::new().unwrap();
        let mut options = BuildOptions::new(dir.path(), mode);
        options.format = format;
        let options = Arc::new(options);
        let compiler = Arc::new(FakeCompiler::default());
        let orchestrator = Orchestrator::new(options, compiler.clone());
        (dir, compiler, orchestrator)
    }

    fn table() -> RouteTable {
        let pages = Path::new("/site/pages");
        RouteTable::build(vec![
            RouteDescriptor::new(pages, "index.tsx"),
            RouteDescriptor::new(pages, "docs/[id].tsx"),
        ])
        .unwrap()
    }

    fn templates(table: &RouteTable, id: BuildId) -> Templates {
        let options = EmitOptions {
            dev: true,
            format: ModuleFormat::Cjs,
            ws_port: 8080,
        };
        emit(table, id, &options)
    }

    #[test]
    fn test_requests_diverge_by_target() {
        let (_dir, _compiler, orchestrator) = setup(Mode::Development);
        let (server, client) = orchestrator.requests(Path::new("/b/1"));

        assert!(server.external.contains(&"react".to_string()));
        assert!(client.external.is_empty());
        assert!(server.define.contains(&("process.env.IS_SERVER".into(), "true".into())));
        assert!(client.define.contains(&("process.env.IS_SERVER".into(), "false".into())));
        assert!(server.sourcemap && client.sourcemap);
        assert!(!server.minify && !client.minify);
        assert!(!client.splitting);
    }

    #[test]
    fn test_esm_splits_client_only() {
        let (_dir, compiler, orchestrator) = setup_with(Mode::Development, ModuleFormat::Esm);
        let (server, client) = orchestrator.requests(Path::new("/b/1"));
        assert_eq!(server.format, ModuleFormat::Cjs);
        assert!(!server.splitting);
        assert_eq!(server.output_entry(), PathBuf::from("/b/1/server/server-entry.js"));
        assert_eq!(client.format, ModuleFormat::Esm);
        assert!(client.splitting);

        let table = table();
        let id = BuildId::new(7);
        let bundle = orchestrator.bundle(id, &table, &templates(&table, id)).unwrap();
        assert_eq!(bundle.format, ModuleFormat::Esm);
        assert_eq!(bundle.manifest.server_entry, "server/server-entry.js");

        let sent = compiler.requests();
        let server_sent: Vec<_> = sent.iter().filter(|r| r.target == Target::Server).collect();
        assert_eq!(server_sent.len(), 1);
        assert_eq!(server_sent[0].format, ModuleFormat::Cjs);
    }

    #[test]
    fn test_production_minifies() {
        let (_dir, _compiler, orchestrator) = setup(Mode::Production);
        let (server, client) = orchestrator.requests(Path::new("/b/1"));
        assert!(server.minify && client.minify);
        assert!(!server.sourcemap && !client.sourcemap);
    }

    #[test]
    fn test_bundle_writes_generation() {
        let (_dir, compiler, orchestrator) = setup(Mode::Development);
        let table = table();
        let id = BuildId::new(10);
        let bundle = orchestrator.bundle(id, &table, &templates(&table, id)).unwrap();

        assert!(bundle.dir.join("templates/server-entry.jsx").is_file());
        assert!(bundle.server.entry.is_file());
        assert!(bundle.client.entry.is_file());
        assert_eq!(bundle.manifest.routes.len(), 2);
        assert_eq!(bundle.manifest.server_entry, "server/server-entry.js");

        let reopened = Bundle::open(&bundle.dir).unwrap();
        assert_eq!(reopened.manifest, bundle.manifest);
        assert_eq!(compiler.started(), 2);
    }

    #[test]
    fn test_services_reused_across_builds() {
        let (_dir, compiler, orchestrator) = setup(Mode::Development);
        let table = table();
        for n in 1..=3 {
            let id = BuildId::new(n);
            orchestrator.bundle(id, &table, &templates(&table, id)).unwrap();
        }
        assert_eq!(compiler.started(), 2);
        assert_eq!(compiler.compiled(), 6);

        orchestrator.dispose();
        assert_eq!(compiler.stopped(), 2);
    }

    #[test]
    fn test_failed_pass_keeps_previous_generation() {
        let (_dir, compiler, orchestrator) = setup(Mode::Development);
        let table = table();
        let good = orchestrator
            .bundle(BuildId::new(1), &table, &templates(&table, BuildId::new(1)))
            .unwrap();

        compiler.fail(Target::Client, "Could not resolve \"./missing\"");
        let err = orchestrator
            .bundle(BuildId::new(2), &table, &templates(&table, BuildId::new(2)))
            .unwrap_err();

        assert!(matches!(err, BuildError::Compile(ref e) if e.target == Target::Client));
        assert!(good.server.entry.is_file());
        assert!(!orchestrator.generation_dir(BuildId::new(2)).exists());
    }

    #[test]
    fn test_prune_keeps_listed() {
        let (_dir, _compiler, orchestrator) = setup(Mode::Development);
        let table = table();
        for n in 1..=3 {
            let id = BuildId::new(n);
            orchestrator.bundle(id, &table, &templates(&table, id)).unwrap();
        }
        let removed = orchestrator.prune(&[BuildId::new(2), BuildId::new(3)]);
        assert_eq!(removed, 1);
        assert!(!orchestrator.generation_dir(BuildId::new(1)).exists());
        assert!(orchestrator.generation_dir(BuildId::new(3)).exists());
    }
}
