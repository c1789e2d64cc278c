//! The runtime instance: route state, compiler handles and the current
//! build generation.
//!
//! # Lifecycle
//!
//! ```text
//! Runtime::new ─► prepare ─► rebuild / open_latest ─► serve ─► dispose
//!                    ▲              │
//!                    └── file events (dev loop)
//! ```
//!
//! Requests dereference [`Runtime::current`]; a rebuild swaps it only
//! after both compile passes and the module load succeeded.

mod generation;

pub use generation::Generation;

use std::sync::Arc;
use std::sync::atomic::{AtomicU16, Ordering};

use arc_swap::ArcSwapOption;
use parking_lot::Mutex;

use crate::compile::{Bundle, Compiler, Orchestrator};
use crate::config::{BuildMeta, BuildOptions};
use crate::core::{BuildId, BuildIdSource};
use crate::error::BuildError;
use crate::module::ModuleLoader;
use crate::route::{PageEventKind, PageSet, RouteTable};
use crate::template::{EmitOptions, emit};
use crate::{debug, log};

pub struct Runtime {
    options: Arc<BuildOptions>,
    ids: BuildIdSource,
    pages: Mutex<PageSet>,
    orchestrator: Arc<Orchestrator>,
    loader: Arc<dyn ModuleLoader>,
    current: ArcSwapOption<Generation>,
    ws_port: AtomicU16,
}

impl Runtime {
    pub fn new(
        options: Arc<BuildOptions>,
        compiler: Arc<dyn Compiler>,
        loader: Arc<dyn ModuleLoader>,
    ) -> Self {
        let orchestrator = Arc::new(Orchestrator::new(options.clone(), compiler));
        Self {
            ws_port: AtomicU16::new(options.ws_port),
            pages: Mutex::new(PageSet::new(&options.pages_dir)),
            ids: BuildIdSource::from_clock(),
            orchestrator,
            loader,
            current: ArcSwapOption::empty(),
            options,
        }
    }

    #[inline]
    pub fn options(&self) -> &BuildOptions {
        &self.options
    }

    /// Port the live-reload socket actually bound, baked into dev templates.
    pub fn set_ws_port(&self, port: u16) {
        self.ws_port.store(port, Ordering::Relaxed);
    }

    pub fn ws_port(&self) -> u16 {
        self.ws_port.load(Ordering::Relaxed)
    }

    /// Scan the pages directory. A missing directory is an empty page set.
    pub fn prepare(&self) -> Result<usize, BuildError> {
        let scanned = PageSet::scan(&self.options.pages_dir);
        let count = scanned.len();
        let table = scanned.table();
        *self.pages.lock() = scanned;
        table?;
        debug!("route"; "{} pages in {}", count, self.options.pages_dir.display());
        Ok(count)
    }

    /// Record a page file event. Returns whether the URL space changed.
    pub fn apply_file_event(&self, kind: PageEventKind, relative: &str) -> bool {
        self.pages.lock().apply(kind, relative)
    }

    /// Whether `relative` is a known page file.
    pub fn is_page(&self, relative: &str) -> bool {
        self.pages.lock().contains(relative)
    }

    /// Map an absolute path to a page path, if it is one.
    pub fn page_relative(&self, path: &std::path::Path) -> Option<String> {
        self.pages.lock().page_relative(path)
    }

    /// Latest successfully loaded generation.
    pub fn current(&self) -> Option<Arc<Generation>> {
        self.current.load_full()
    }

    /// Route table, templates and both compile passes for a fresh build id.
    fn compile(&self) -> Result<(Bundle, RouteTable), BuildError> {
        let table = self.pages.lock().table()?;
        let build_id = self.ids.next();
        let templates = emit(
            &table,
            build_id,
            &EmitOptions {
                dev: self.options.is_dev(),
                format: self.options.format,
                ws_port: self.ws_port(),
            },
        );
        let bundle = self.orchestrator.bundle(build_id, &table, &templates)?;
        Ok((bundle, table))
    }

    /// Compile, load and switch to a new generation.
    ///
    /// On failure the current generation keeps serving.
    pub async fn rebuild(self: &Arc<Self>) -> Result<Arc<Generation>, BuildError> {
        let this = Arc::clone(self);
        let (bundle, table) = tokio::task::spawn_blocking(move || this.compile())
            .await
            .map_err(|e| BuildError::Module(format!("build task failed: {e}")))??;
        self.activate(bundle, table).await
    }

    async fn activate(
        &self,
        bundle: Bundle,
        table: RouteTable,
    ) -> Result<Arc<Generation>, BuildError> {
        let module = match self.loader.load(&bundle, &table).await {
            Ok(module) => module,
            Err(e) => {
                let _ = std::fs::remove_dir_all(&bundle.dir);
                return Err(BuildError::Module(format!("{e:#}")));
            }
        };
        let generation = Arc::new(Generation::new(&bundle, table, module));
        Ok(self.install(generation))
    }

    /// Swap in `generation` unless a newer one is already live.
    fn install(&self, generation: Arc<Generation>) -> Arc<Generation> {
        let previous = self.current.load_full();
        if let Some(prev) = &previous
            && prev.build_id > generation.build_id
        {
            debug!("runtime"; "discarding build {} older than {}", generation.build_id, prev.build_id);
            return Arc::clone(prev);
        }

        self.current.store(Some(Arc::clone(&generation)));
        let mut keep = vec![generation.build_id];
        keep.extend(previous.map(|p| p.build_id));
        let pruned = self.orchestrator.prune(&keep);
        if pruned > 0 {
            debug!("runtime"; "pruned {} old build{}", pruned, crate::utils::plural::plural_s(pruned));
        }
        generation
    }

    /// Production build: compile once and record the metadata `start` reads.
    pub fn build(&self) -> Result<BuildId, BuildError> {
        let (bundle, _) = self.compile()?;
        BuildMeta::new(bundle.build_id, bundle.format).write(&self.options.meta_path())?;
        self.orchestrator.prune(&[bundle.build_id]);
        log!("build"; "build {} written to {}", bundle.build_id, bundle.dir.display());
        Ok(bundle.build_id)
    }

    /// Load the generation recorded by the last `build`.
    pub async fn open_latest(&self) -> Result<Arc<Generation>, BuildError> {
        let meta = BuildMeta::read(&self.options.meta_path())
            .map_err(|e| BuildError::NotBuilt(format!("{:#}", anyhow::Error::from(e))))?;
        let dir = self.orchestrator.generation_dir(meta.build_id);
        let bundle = Bundle::open(&dir).map_err(|e| BuildError::NotBuilt(format!("{e:#}")))?;
        let table = RouteTable::build(bundle.manifest.routes.clone())?;

        let module = self
            .loader
            .load(&bundle, &table)
            .await
            .map_err(|e| BuildError::Module(format!("{e:#}")))?;
        let generation = Arc::new(Generation::new(&bundle, table, module));
        self.current.store(Some(Arc::clone(&generation)));
        Ok(generation)
    }

    /// Release compiler services and drop the live generation.
    pub fn dispose(&self) {
        self.orchestrator.dispose();
        self.current.store(None);
    }
}
