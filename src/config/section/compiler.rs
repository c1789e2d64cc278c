//! `[compiler]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [compiler]
//! command = "node_modules/.bin/esbuild"   # `~` is expanded, bare names use PATH
//! node = "node"                           # Runs the server module host
//! ```

use serde::{Deserialize, Serialize};

/// External tool settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerSection {
    pub command: String,
    pub node: String,
}

impl Default for CompilerSection {
    fn default() -> Self {
        Self {
            command: "esbuild".to_string(),
            node: "node".to_string(),
        }
    }
}
