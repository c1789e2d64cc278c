//! Build metadata persisted between `kiln build` and `kiln start`.
//!
//! ```json
//! { "buildId": 1729000000123, "format": "esm", "createdAt": "2024-10-15T13:46:40Z" }
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{ConfigError, ModuleFormat};
use crate::core::BuildId;
use crate::utils::date::DateTimeUtc;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildMeta {
    pub build_id: BuildId,
    pub format: ModuleFormat,
    pub created_at: String,
}

impl BuildMeta {
    pub fn new(build_id: BuildId, format: ModuleFormat) -> Self {
        Self {
            build_id,
            format,
            created_at: DateTimeUtc::now().to_iso_string(),
        }
    }

    /// Read metadata written by a previous `build`.
    pub fn read(path: &Path) -> Result<Self, ConfigError> {
        let content =
            fs::read_to_string(path).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        serde_json::from_str(&content).map_err(|e| ConfigError::Meta(path.to_path_buf(), e))
    }

    pub fn write(&self, path: &Path) -> Result<(), ConfigError> {
        let io_err = |e| ConfigError::Io(path.to_path_buf(), e);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let json =
            serde_json::to_string_pretty(self).map_err(|e| ConfigError::Meta(path.to_path_buf(), e))?;
        fs::write(path, json).map_err(io_err)
    }
}
