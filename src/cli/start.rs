//! `kiln start`: serve the generation recorded by the last `build`.

use anyhow::Result;

use super::{Cli, load_config, new_runtime, report_build_error, serve, tokio_runtime};
use crate::config::{BuildMeta, BuildOptions, Mode};
use crate::server::HttpServer;
use crate::log;

pub fn run(cli: &Cli) -> Result<()> {
    let (root, config) = load_config(cli)?;
    let mut options = BuildOptions::from_config(&root, Mode::Production, &config);
    // Script tags must match the format the client bundle was compiled with
    if let Ok(meta) = BuildMeta::read(&options.meta_path()) {
        options.format = meta.format;
    }

    let rt = tokio_runtime()?;
    let runtime = new_runtime(options);
    let generation = match rt.block_on(runtime.open_latest()) {
        Ok(generation) => generation,
        Err(e) => {
            report_build_error(&e);
            return Err(e.into());
        }
    };
    log!("start"; "serving build {} ({} routes)", generation.build_id, generation.table.len());

    let server = HttpServer::bind(runtime.options())?;
    serve(server, runtime, rt, None)
}
