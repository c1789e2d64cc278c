//! Per-generation manifest, written last so its presence marks a
//! complete build.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::ModuleFormat;
use crate::core::BuildId;
use crate::route::RouteDescriptor;

pub const MANIFEST_FILE: &str = "manifest.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub build_id: BuildId,
    pub format: ModuleFormat,
    /// Compiled server entry, relative to the generation directory.
    pub server_entry: String,
    /// Compiled client entry, relative to the generation directory.
    pub client_entry: String,
    /// Routes in matching order.
    pub routes: Vec<RouteDescriptor>,
}

impl Manifest {
    pub fn read(dir: &Path) -> anyhow::Result<Self> {
        let path = dir.join(MANIFEST_FILE);
        let content = fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn write(&self, dir: &Path) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(dir.join(MANIFEST_FILE), json)
    }
}
