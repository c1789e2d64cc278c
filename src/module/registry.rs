//! In-memory page registry.
//!
//! Pages and loaders are looked up by the page's relative path, so the same
//! registry serves every route table the file set produces.

use std::future::Future;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use anyhow::{anyhow, bail};
use async_trait::async_trait;
use rustc_hash::FxHashMap;

use crate::compile::Bundle;
use crate::core::{BuildId, RequestPath};
use crate::payload::Value;
use crate::route::{Params, RouteMatch, RouteTable};
use crate::server::{Head, RequestContext};

use super::{ModuleLoader, NOT_FOUND_MARKUP, ServerModule, panic_message};

/// Input of a route loader.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadContext {
    pub params: Params,
}

/// A renderable page component.
pub trait Page: Send + Sync {
    fn render(&self, scope: &mut RenderScope<'_>) -> anyhow::Result<String>;
}

/// A route's asynchronous data loader.
#[async_trait]
pub trait Loader: Send + Sync {
    async fn load(&self, ctx: LoadContext) -> anyhow::Result<Value>;
}

/// What a page sees while rendering.
pub struct RenderScope<'a> {
    ctx: &'a mut RequestContext,
    key: String,
    params: &'a Params,
}

impl RenderScope<'_> {
    pub fn url(&self) -> &RequestPath {
        &self.ctx.url
    }

    pub fn params(&self) -> &Params {
        self.params
    }

    /// Loader result for the current path, if the route has a loader.
    pub fn route_data(&self) -> Option<&Value> {
        self.ctx.route_data.get(&self.key)
    }

    pub fn set_status(&mut self, status: u16) {
        self.ctx.status_code = status;
    }

    pub fn head(&mut self) -> &mut Head {
        &mut self.ctx.head
    }
}

struct FnPage<F>(F);

impl<F> Page for FnPage<F>
where
    F: Fn(&mut RenderScope<'_>) -> anyhow::Result<String> + Send + Sync,
{
    fn render(&self, scope: &mut RenderScope<'_>) -> anyhow::Result<String> {
        (self.0)(scope)
    }
}

/// Page from a closure.
pub fn page_fn<F>(f: F) -> Arc<dyn Page>
where
    F: Fn(&mut RenderScope<'_>) -> anyhow::Result<String> + Send + Sync + 'static,
{
    Arc::new(FnPage(f))
}

struct FnLoader<F>(F);

#[async_trait]
impl<F, Fut> Loader for FnLoader<F>
where
    F: Fn(LoadContext) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<Value>> + Send,
{
    async fn load(&self, ctx: LoadContext) -> anyhow::Result<Value> {
        (self.0)(ctx).await
    }
}

/// Loader from an async closure.
pub fn loader_fn<F, Fut>(f: F) -> Arc<dyn Loader>
where
    F: Fn(LoadContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
{
    Arc::new(FnLoader(f))
}

#[derive(Clone)]
struct PageEntry {
    page: Arc<dyn Page>,
    loader: Option<Arc<dyn Loader>>,
}

/// Pages keyed by path relative to the pages directory.
#[derive(Clone, Default)]
pub struct PageRegistry {
    entries: FxHashMap<String, PageEntry>,
}

impl PageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, relative: &str, page: Arc<dyn Page>) -> Self {
        self.entries
            .insert(relative.to_string(), PageEntry { page, loader: None });
        self
    }

    pub fn page_with_loader(
        mut self,
        relative: &str,
        page: Arc<dyn Page>,
        loader: Arc<dyn Loader>,
    ) -> Self {
        self.entries.insert(
            relative.to_string(),
            PageEntry {
                page,
                loader: Some(loader),
            },
        );
        self
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Binds a registry to each generation's route table.
#[derive(Clone)]
pub struct RegistryLoader {
    registry: Arc<PageRegistry>,
}

impl RegistryLoader {
    pub fn new(registry: PageRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }
}

#[async_trait]
impl ModuleLoader for RegistryLoader {
    async fn load(
        &self,
        bundle: &Bundle,
        table: &RouteTable,
    ) -> anyhow::Result<Arc<dyn ServerModule>> {
        let entries = table
            .routes()
            .iter()
            .map(|route| self.registry.entries.get(&route.relative_path).cloned())
            .collect();
        Ok(Arc::new(RegistryModule {
            build_id: bundle.build_id,
            table: table.clone(),
            entries,
        }))
    }
}

/// One generation's view of the registry, aligned with its table.
struct RegistryModule {
    build_id: BuildId,
    table: RouteTable,
    entries: Vec<Option<PageEntry>>,
}

#[async_trait]
impl ServerModule for RegistryModule {
    fn build_id(&self) -> BuildId {
        self.build_id
    }

    fn has_loader(&self, index: usize) -> bool {
        self.entries
            .get(index)
            .is_some_and(|e| e.as_ref().is_some_and(|e| e.loader.is_some()))
    }

    async fn load(&self, index: usize, params: &Params) -> anyhow::Result<Value> {
        let loader = self
            .entries
            .get(index)
            .and_then(|e| e.as_ref())
            .and_then(|e| e.loader.clone());
        match loader {
            Some(loader) => {
                let ctx = LoadContext {
                    params: params.clone(),
                };
                loader.load(ctx).await
            }
            None => Ok(Value::Undefined),
        }
    }

    async fn render(&self, ctx: &mut RequestContext) -> anyhow::Result<String> {
        let url = ctx.url.clone();
        let (index, route, params, path) = match self.table.match_path(&url) {
            RouteMatch::Page {
                index,
                route,
                params,
                path,
            } => (index, route, params, path),
            RouteMatch::NotFound => {
                ctx.status_code = 404;
                return Ok(NOT_FOUND_MARKUP.to_string());
            }
        };

        let Some(Some(entry)) = self.entries.get(index) else {
            bail!("no page registered for `{}`", route.relative_path);
        };

        let mut scope = RenderScope {
            ctx,
            key: path,
            params: &params,
        };
        catch_unwind(AssertUnwindSafe(|| entry.page.render(&mut scope))).map_err(|payload| {
            anyhow!(
                "page `{}` panicked: {}",
                route.relative_path,
                panic_message(payload.as_ref())
            )
        })?
    }
}
