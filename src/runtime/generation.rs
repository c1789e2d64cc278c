//! Build generations: everything a request needs from one build.

use std::path::PathBuf;
use std::sync::Arc;

use crate::compile::Bundle;
use crate::config::ModuleFormat;
use crate::core::BuildId;
use crate::module::ServerModule;
use crate::route::RouteTable;

/// One successfully compiled and loaded build.
///
/// Requests hold an `Arc<Generation>` for their whole duration, so a swap
/// never pulls the module out from under an in-flight request.
pub struct Generation {
    pub build_id: BuildId,
    pub format: ModuleFormat,
    /// Route table the server entry was generated from.
    pub table: RouteTable,
    pub module: Arc<dyn ServerModule>,
    /// Compiled client files, served under `/_kiln/`.
    pub client_dir: PathBuf,
    pub dir: PathBuf,
}

impl Generation {
    pub fn new(bundle: &Bundle, table: RouteTable, module: Arc<dyn ServerModule>) -> Self {
        Self {
            build_id: bundle.build_id,
            format: bundle.format,
            table,
            module,
            client_dir: bundle.client.dir.clone(),
            dir: bundle.dir.clone(),
        }
    }

    /// URL of the client entry, cache-busted with the build id.
    pub fn client_entry_url(&self) -> String {
        format!("/_kiln/client-entry.js?t={}", self.build_id)
    }
}

impl std::fmt::Debug for Generation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Generation")
            .field("build_id", &self.build_id)
            .field("format", &self.format)
            .field("routes", &self.table.len())
            .field("dir", &self.dir)
            .finish_non_exhaustive()
    }
}
