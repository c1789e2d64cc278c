//! `[build]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [build]
//! pages = "pages"             # Page sources, one route per file
//! public = "public"           # Static files served as-is
//! cache = ".kiln"             # Generated entries and build generations
//! format = "cjs"              # "cjs" (single bundle) or "esm" (split chunks)
//! watch = ["components/**/*.tsx"]
//! externals = ["sharp"]       # Never bundled into the server pass
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::config::ModuleFormat;

/// Build settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildSection {
    pub pages: PathBuf,
    pub public: PathBuf,
    pub cache: PathBuf,
    pub format: ModuleFormat,
    /// Extra globs, relative to the project root, that trigger a recompile.
    pub watch: Vec<String>,
    /// Extra packages kept external in the server pass.
    pub externals: Vec<String>,
}

impl Default for BuildSection {
    fn default() -> Self {
        Self {
            pages: PathBuf::from("pages"),
            public: PathBuf::from("public"),
            cache: PathBuf::from(".kiln"),
            format: ModuleFormat::Cjs,
            watch: Vec::new(),
            externals: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use crate::config::{ModuleFormat, test_parse_config};

    #[test]
    fn test_build_defaults() {
        let config = test_parse_config("");
        assert_eq!(config.build.pages, PathBuf::from("pages"));
        assert_eq!(config.build.cache, PathBuf::from(".kiln"));
        assert_eq!(config.build.format, ModuleFormat::Cjs);
        assert!(config.build.watch.is_empty());
    }

    #[test]
    fn test_build_override() {
        let config = test_parse_config(
            "[build]\npages = \"src/routes\"\nformat = \"esm\"\nwatch = [\"lib/**/*.ts\"]",
        );
        assert_eq!(config.build.pages, PathBuf::from("src/routes"));
        assert_eq!(config.build.format, ModuleFormat::Esm);
        assert_eq!(config.build.watch, ["lib/**/*.ts"]);
    }
}
