//! Loading compiled server modules.
//!
//! A [`ServerModule`] is the server half of one build generation: it runs
//! route loaders and renders the application root. Two loaders produce
//! them:
//!
//! - [`RegistryLoader`]: pages implemented in Rust, registered by relative
//!   path. No code generation, used for embedding and tests.
//! - [`NodeLoader`]: runs the compiled server bundle in a `node` host
//!   process that lives as long as its generation.

mod node;
mod registry;

pub use node::NodeLoader;
pub use registry::{
    LoadContext, Loader, Page, PageRegistry, RegistryLoader, RenderScope, loader_fn, page_fn,
};

use std::sync::Arc;

use async_trait::async_trait;

use crate::compile::Bundle;
use crate::core::BuildId;
use crate::payload::Value;
use crate::route::{Params, RouteTable};
use crate::server::RequestContext;

/// Markup of the catch-all route. Must match the generated application.
pub const NOT_FOUND_MARKUP: &str = r#"<div data-kiln-not-found="">404</div>"#;

/// Server half of a build generation.
#[async_trait]
pub trait ServerModule: Send + Sync {
    fn build_id(&self) -> BuildId;

    /// Whether the route at `index` (matching order) exports a loader.
    fn has_loader(&self, index: usize) -> bool;

    /// Run the loader of the route at `index`.
    async fn load(&self, index: usize, params: &Params) -> anyhow::Result<Value>;

    /// Render the application root for `ctx.url`.
    ///
    /// May set `ctx.status_code` and fill `ctx.head`.
    async fn render(&self, ctx: &mut RequestContext) -> anyhow::Result<String>;
}

/// Turns a compiled bundle into a running [`ServerModule`].
#[async_trait]
pub trait ModuleLoader: Send + Sync {
    async fn load(
        &self,
        bundle: &Bundle,
        table: &RouteTable,
    ) -> anyhow::Result<Arc<dyn ServerModule>>;
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}
