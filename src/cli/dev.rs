//! `kiln dev`: watch, rebuild and serve with live reload.

use std::sync::Arc;

use anyhow::Result;

use super::{Cli, load_options, new_runtime, report_build_error, serve, tokio_runtime};
use crate::actor::Coordinator;
use crate::config::Mode;
use crate::logger::status_error;
use crate::server::HttpServer;
use crate::utils::plural::plural_count;
use crate::log;

pub fn run(cli: &Cli) -> Result<()> {
    let options = load_options(cli, Mode::Development)?;
    let rt = tokio_runtime()?;

    let runtime = new_runtime(options);
    // Socket first so its port lands in the first templates
    let coordinator = Coordinator::start(Arc::clone(&runtime))?;

    match runtime.prepare() {
        Ok(count) => log!("route"; "{}", plural_count(count, "page")),
        Err(e) => {
            report_build_error(&e);
            status_error(e.summary(), &e.to_string());
        }
    }

    let server = HttpServer::bind(runtime.options())?;
    // Requests get 503 until the first build lands
    let actors = rt.spawn(coordinator.run(server.shutdown_signal()));

    serve(server, runtime, rt, Some(actors))
}
