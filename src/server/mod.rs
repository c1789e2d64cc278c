//! SSR request server.
//!
//! `tiny_http` accepts connections; a small rayon pool runs each request
//! to completion on the tokio runtime that owns loaders and module hosts.

mod context;
mod document;
mod handler;
mod lifecycle;
mod path;
mod response;

pub use context::{Head, RequestContext, RouteData};
pub use document::{MOUNT_ID, render_document};
pub use handler::{BUILD_HEADER, Incoming, Method, Reply, handle};

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use crossbeam::channel;
use tiny_http::Server;

use crate::config::BuildOptions;
use crate::core::{is_shutdown, register_server};
use crate::runtime::Runtime;
use crate::log;

/// Request worker threads.
const WORKERS: usize = 4;

/// A bound HTTP listener.
pub struct HttpServer {
    server: Arc<Server>,
    addr: SocketAddr,
    shutdown_rx: channel::Receiver<()>,
}

impl HttpServer {
    /// Bind the listener and register it for Ctrl+C shutdown.
    pub fn bind(options: &BuildOptions) -> Result<Self> {
        let (server, addr) = lifecycle::bind_with_retry(options.interface, options.port)?;
        let server = Arc::new(server);

        let (shutdown_tx, shutdown_rx) = channel::unbounded::<()>();
        register_server(Arc::clone(&server), shutdown_tx);

        log!("serve"; "http://{}", addr);
        Ok(Self {
            server,
            addr,
            shutdown_rx,
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Receiver notified once on shutdown.
    pub fn shutdown_signal(&self) -> channel::Receiver<()> {
        self.shutdown_rx.clone()
    }

    /// Serve requests until the listener is unblocked.
    pub fn run(&self, runtime: Arc<Runtime>, handle: tokio::runtime::Handle) -> Result<()> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(WORKERS)
            .thread_name(|i| format!("kiln-http-{i}"))
            .build()
            .context("failed to create request pool")?;

        for request in self.server.incoming_requests() {
            let runtime = Arc::clone(&runtime);
            let handle = handle.clone();
            pool.spawn(move || {
                let result = if is_shutdown() {
                    response::respond_unavailable(request)
                } else {
                    let incoming = response::incoming(&request);
                    let reply = handle.block_on(handler::handle(&runtime, &incoming));
                    response::respond(request, reply)
                };
                if let Err(e) = result {
                    log!("serve"; "request error: {e}");
                }
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests;
