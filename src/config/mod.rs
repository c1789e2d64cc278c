//! Project configuration for `kiln.toml`.
//!
//! # Module Structure
//!
//! ```text
//! config/
//! ├── section/       # [build], [serve], [compiler]
//! ├── error.rs       # ConfigError
//! ├── meta.rs        # .kiln/build.json written by `build`, read by `start`
//! ├── options.rs     # BuildOptions, Mode, ModuleFormat
//! └── mod.rs         # KilnConfig (this file)
//! ```
//!
//! The config file is optional: a project without `kiln.toml` runs on
//! defaults. Command line flags override file values.

mod error;
mod meta;
mod options;
pub mod section;

pub use error::ConfigError;
pub use meta::BuildMeta;
pub use options::{BuildOptions, Mode, ModuleFormat};
pub use section::{BuildSection, CompilerSection, ServeSection};

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::log;

/// Config file name, looked up in the project root.
pub const CONFIG_FILE: &str = "kiln.toml";

/// Root configuration structure representing kiln.toml
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KilnConfig {
    pub build: BuildSection,
    pub serve: ServeSection,
    pub compiler: CompilerSection,
}

/// Command line values that take precedence over `kiln.toml`.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub port: Option<u16>,
    pub format: Option<ModuleFormat>,
    /// Appended to `[build].watch`, not replacing it.
    pub watch: Vec<String>,
}

impl KilnConfig {
    /// Load `kiln.toml` from `root`, or defaults when the file is absent.
    pub fn load(root: &Path) -> Result<Self> {
        let path = root.join(CONFIG_FILE);
        if !path.is_file() {
            return Ok(Self::default());
        }
        Self::from_path(&path)
    }

    fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        let (config, ignored) = Self::parse_with_ignored(&content)?;

        if !ignored.is_empty() {
            Self::print_unknown_fields_warning(&ignored, path);
        }
        config.validate()?;
        Ok(config)
    }

    /// Parse config and collect the paths of fields serde skipped.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>), ConfigError> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })?;
        Ok((config, ignored))
    }

    fn print_unknown_fields_warning(fields: &[String], path: &Path) {
        let display_path = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_else(|| path.to_string_lossy());
        log!("warning"; "unknown fields in {}, ignoring:", display_path);
        for field in fields {
            eprintln!("- {}", field);
        }
    }

    /// Apply command line overrides.
    pub fn apply(&mut self, overrides: &Overrides) {
        Self::update_option(&mut self.serve.port, overrides.port.as_ref());
        Self::update_option(&mut self.build.format, overrides.format.as_ref());
        for glob in &overrides.watch {
            if !self.build.watch.contains(glob) {
                self.build.watch.push(glob.clone());
            }
        }
    }

    fn update_option<T: Clone>(config_option: &mut T, cli_option: Option<&T>) {
        if let Some(option) = cli_option {
            *config_option = option.clone();
        }
    }

    /// Reject settings that cannot work together.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.serve.port == self.serve.ws_port {
            return Err(ConfigError::Validation(format!(
                "[serve] port and ws_port are both {}",
                self.serve.port
            )));
        }
        if self.serve.loader_timeout == 0 {
            return Err(ConfigError::Validation(
                "[serve] loader_timeout must be at least 1 second".into(),
            ));
        }
        for (name, dir) in [("pages", &self.build.pages), ("cache", &self.build.cache)] {
            if dir.as_os_str().is_empty() {
                return Err(ConfigError::Validation(format!("[build] {name} is empty")));
            }
        }
        for glob in &self.build.watch {
            crate::utils::glob::Glob::new(glob).map_err(|e| {
                ConfigError::Validation(format!("[build] watch glob `{glob}`: {e}"))
            })?;
        }
        Ok(())
    }

    /// Resolve a configured directory against the project root.
    pub fn resolve(root: &Path, dir: &Path) -> PathBuf {
        crate::utils::path::normalize_path(&root.join(dir))
    }
}

/// Parse a config body for tests; fails on unknown fields.
#[cfg(test)]
pub fn test_parse_config(extra: &str) -> KilnConfig {
    let (parsed, ignored) = KilnConfig::parse_with_ignored(extra).unwrap();
    assert!(
        ignored.is_empty(),
        "test config has unknown fields: {:?}",
        ignored
    );
    parsed
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let config = KilnConfig::load(dir.path()).unwrap();
        assert_eq!(config, KilnConfig::default());
    }

    #[test]
    fn test_load_from_file() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(CONFIG_FILE), "[serve]\nport = 4000\n").unwrap();
        let config = KilnConfig::load(dir.path()).unwrap();
        assert_eq!(config.serve.port, 4000);
    }

    #[test]
    fn test_invalid_toml() {
        assert!(KilnConfig::parse_with_ignored("invalid toml [[[").is_err());
    }

    #[test]
    fn test_unknown_fields_detected() {
        let content = "[build]\npages = \"p\"\nunknown_field = 1\n[unknown_section]\nx = 1";
        let (config, ignored) = KilnConfig::parse_with_ignored(content).unwrap();
        assert_eq!(config.build.pages, PathBuf::from("p"));
        assert!(ignored.iter().any(|f| f.contains("unknown_field")));
        assert!(ignored.iter().any(|f| f.contains("unknown_section")));
    }

    #[test]
    fn test_overrides() {
        let mut config = test_parse_config("[build]\nwatch = [\"lib/**\"]");
        config.apply(&Overrides {
            port: Some(5000),
            format: Some(ModuleFormat::Esm),
            watch: vec!["lib/**".into(), "styles/*.css".into()],
        });
        assert_eq!(config.serve.port, 5000);
        assert_eq!(config.build.format, ModuleFormat::Esm);
        assert_eq!(config.build.watch, ["lib/**", "styles/*.css"]);
    }

    #[test]
    fn test_overrides_absent_keep_file_values() {
        let mut config = test_parse_config("[serve]\nport = 4100");
        config.apply(&Overrides::default());
        assert_eq!(config.serve.port, 4100);
    }

    #[test]
    fn test_validate_port_collision() {
        let config = test_parse_config("[serve]\nport = 8080\nws_port = 8080");
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_validate_zero_timeout() {
        let config = test_parse_config("[serve]\nloader_timeout = 0");
        assert!(config.validate().is_err());
    }
}
