//! `kiln build`: compile one production generation.

use std::time::Instant;

use anyhow::Result;

use super::{Cli, load_options, new_runtime, report_build_error};
use crate::config::Mode;
use crate::log;

pub fn run(cli: &Cli) -> Result<()> {
    let options = load_options(cli, Mode::Production)?;
    let format = options.format;
    let runtime = new_runtime(options);
    let started = Instant::now();

    let result = runtime.prepare().and_then(|_| runtime.build());
    runtime.dispose();

    match result {
        Ok(build_id) => {
            log!("build"; "{} ({}) done in {}ms", build_id, format, started.elapsed().as_millis());
            Ok(())
        }
        Err(e) => {
            report_build_error(&e);
            Err(e.into())
        }
    }
}
