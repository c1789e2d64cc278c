//! Route descriptors: one per page file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::pattern::Pattern;

/// One routable page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteDescriptor {
    /// URL pattern derived from `relative_path`.
    pub pattern: Pattern,
    /// Path relative to the pages directory, `/`-separated.
    pub relative_path: String,
    /// Absolute path of the page source.
    pub source_path: PathBuf,
    /// Identifier-safe name used for generated bindings.
    pub identifier: String,
}

impl RouteDescriptor {
    /// Describe the page at `relative` inside `pages_dir`.
    pub fn new(pages_dir: &Path, relative: &str) -> Self {
        Self {
            pattern: Pattern::from_relative(relative),
            relative_path: relative.to_string(),
            source_path: pages_dir.join(relative),
            identifier: identifier_for(relative),
        }
    }

    /// Binding name used in generated entry modules.
    pub fn binding(&self) -> String {
        format!("Route_{}", self.identifier)
    }
}

/// Replace every non-alphanumeric ASCII character with `_`.
///
/// Non-ASCII letters are replaced as well, so the result is always a valid
/// JS identifier tail.
pub fn identifier_for(relative: &str) -> String {
    relative
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}
