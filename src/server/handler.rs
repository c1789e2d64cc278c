//! Per-request handling: static mounts, matching, loading and rendering.
//!
//! ```text
//! request ─► /_kiln/* or public file? ─► file
//!        └─► match route ─► loader (timeout) ─► Accept json? ─► route data
//!                                              └─► render ─► document
//! ```
//!
//! Every failure past matching becomes a 500; development responses carry
//! the diagnostic, production responses a fixed message.

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::core::RequestPath;
use crate::error::{LoaderError, RenderError, RequestError};
use crate::log;
use crate::module::{ServerModule, panic_message};
use crate::payload::Value;
use crate::route::{Params, RouteMatch};
use crate::runtime::{Generation, Runtime};
use crate::utils::html::escape;
use crate::utils::mime::{self, types};

use super::document::render_document;
use super::path::resolve_static;
use super::{RequestContext, RouteData};

/// URL prefix of compiled client files.
const CLIENT_PREFIX: &str = "_kiln";

/// Response header naming the generation that served the request.
pub const BUILD_HEADER: &str = "X-Kiln-Build";

const GENERIC_ERROR: &str = "500 Internal Server Error";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Method {
    Get,
    Head,
    Other(String),
}

/// The parts of a request the handler looks at.
#[derive(Debug, Clone)]
pub struct Incoming {
    pub method: Method,
    /// Request target, with query.
    pub url: String,
    pub accept: Option<String>,
}

impl Incoming {
    pub fn get(url: &str) -> Self {
        Self {
            method: Method::Get,
            url: url.to_string(),
            accept: None,
        }
    }

    pub fn with_accept(mut self, accept: &str) -> Self {
        self.accept = Some(accept.to_string());
        self
    }

    fn wants_json(&self) -> bool {
        self.accept
            .as_deref()
            .is_some_and(|a| a.contains("application/json"))
    }
}

/// A complete response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub status: u16,
    pub headers: Vec<(&'static str, String)>,
    pub body: Vec<u8>,
}

impl Reply {
    fn new(status: u16, content_type: &'static str, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: vec![("Content-Type", content_type.to_string())],
            body: body.into(),
        }
    }

    fn header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }

    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Handle one request against the runtime's current generation.
pub async fn handle(runtime: &Runtime, request: &Incoming) -> Reply {
    let dev = runtime.options().is_dev();
    let reply = match request.method {
        Method::Get | Method::Head => dispatch(runtime, request).await,
        Method::Other(_) => {
            Reply::new(405, types::PLAIN, "405 Method Not Allowed").header("Allow", "GET, HEAD")
        }
    };

    let mut reply = if dev {
        reply.header("Cache-Control", "no-cache")
    } else {
        reply
    };
    if request.method == Method::Head {
        reply.body.clear();
    }
    reply
}

async fn dispatch(runtime: &Runtime, request: &Incoming) -> Reply {
    let path = RequestPath::from_browser(&request.url);
    let generation = runtime.current();

    if path.segments().first().is_some_and(|s| s == CLIENT_PREFIX) {
        let Some(generation) = generation else {
            return not_ready();
        };
        return match resolve_static(&generation.client_dir, &path.segments()[1..]) {
            Some(file) => serve_file(&file).header(BUILD_HEADER, generation.build_id.to_string()),
            None => Reply::new(404, types::PLAIN, "404 Not Found"),
        };
    }

    if let Some(file) = resolve_static(&runtime.options().public_dir, path.segments()) {
        return serve_file(&file);
    }

    let Some(generation) = generation else {
        return not_ready();
    };

    let timeout = runtime.options().loader_timeout;
    let reply = match render_page(&generation, path, request.wants_json(), timeout).await {
        Ok(reply) => reply,
        Err(e) => {
            log!("serve"; "{} failed: {}", request.url, e);
            error_reply(&e, runtime.options().is_dev(), request.wants_json())
        }
    };
    reply.header(BUILD_HEADER, generation.build_id.to_string())
}

/// Match, load and render one page.
async fn render_page(
    generation: &Generation,
    path: RequestPath,
    wants_json: bool,
    timeout: Duration,
) -> Result<Reply, RequestError> {
    let mut route_data = RouteData::new();
    let matched = generation.table.match_path(&path);
    let status = match &matched {
        RouteMatch::Page {
            index,
            route,
            params,
            path: key,
        } => {
            if generation.module.has_loader(*index) {
                let value = run_loader(
                    Arc::clone(&generation.module),
                    *index,
                    params.clone(),
                    route.pattern.as_str(),
                    timeout,
                )
                .await?;
                route_data.insert(key.clone(), value);
            }
            200
        }
        RouteMatch::NotFound => 404,
    };

    let mut ctx = RequestContext::new(path, route_data);
    if wants_json {
        let body = serde_json::to_vec(&ctx.route_data_value()).map_err(|e| RenderError {
            message: e.to_string(),
        })?;
        return Ok(Reply::new(status, types::JSON, body));
    }

    let markup = generation
        .module
        .render(&mut ctx)
        .await
        .map_err(|e| RenderError {
            message: format!("{e:#}"),
        })?;
    let document = render_document(
        &ctx,
        &markup,
        &generation.client_entry_url(),
        generation.format,
    );
    Ok(Reply::new(ctx.status_code, types::HTML, document))
}

/// Run a loader on its own task so a panic or hang stays contained.
async fn run_loader(
    module: Arc<dyn ServerModule>,
    index: usize,
    params: Params,
    route: &str,
    timeout: Duration,
) -> Result<Value, LoaderError> {
    let failed = |message: String| LoaderError {
        route: route.to_string(),
        message,
    };

    let mut task = tokio::spawn(async move { module.load(index, &params).await });
    match tokio::time::timeout(timeout, &mut task).await {
        Err(_) => {
            task.abort();
            Err(failed(format!("timed out after {}s", timeout.as_secs_f32())))
        }
        Ok(Err(join)) if join.is_panic() => {
            Err(failed(format!("panicked: {}", panic_message(join.into_panic().as_ref()))))
        }
        Ok(Err(join)) => Err(failed(join.to_string())),
        Ok(Ok(Err(e))) => Err(failed(format!("{e:#}"))),
        Ok(Ok(Ok(value))) => Ok(value),
    }
}

fn error_reply(error: &RequestError, dev: bool, json: bool) -> Reply {
    let detail = if dev {
        error.diagnostic()
    } else {
        GENERIC_ERROR.to_string()
    };
    if json {
        let body = serde_json::json!({ "error": detail }).to_string();
        return Reply::new(500, types::JSON, body);
    }
    let body = format!(
        "<!DOCTYPE html><html><head><meta charset=\"utf-8\"><title>500</title></head>\
         <body><h1>{GENERIC_ERROR}</h1><pre>{}</pre></body></html>",
        if dev { escape(&detail).into_owned() } else { String::new() }
    );
    Reply::new(500, types::HTML, body)
}

fn not_ready() -> Reply {
    Reply::new(503, types::PLAIN, "503 Service Unavailable: building").header("Retry-After", "1")
}

fn serve_file(path: &Path) -> Reply {
    match fs::read(path) {
        Ok(body) => Reply::new(200, mime::from_path(path), body),
        Err(e) => {
            log!("serve"; "failed to read {}: {}", path.display(), e);
            Reply::new(500, types::PLAIN, GENERIC_ERROR)
        }
    }
}
