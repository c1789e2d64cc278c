//! Server-pass externals.
//!
//! The server process resolves these from `node_modules` at run time, so
//! bundling them would only duplicate code and break native addons.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::Map;

use crate::debug;

/// Packages the generated entries import directly.
pub const FRAMEWORK_PACKAGES: &[&str] = &["react", "react-dom", "react-router-dom", "react-helmet"];

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PackageJson {
    #[serde(default)]
    dependencies: Map<String, serde_json::Value>,
    #[serde(default)]
    peer_dependencies: Map<String, serde_json::Value>,
}

/// Nearest `package.json` at or above `root`.
fn find_package_json(root: &Path) -> Option<PathBuf> {
    root.ancestors()
        .map(|dir| dir.join("package.json"))
        .find(|path| path.is_file())
}

/// Dependency names declared by the embedding application.
///
/// A missing or unreadable manifest contributes nothing.
pub fn manifest_dependencies(root: &Path) -> Vec<String> {
    let Some(path) = find_package_json(root) else {
        return Vec::new();
    };
    let parsed = fs::read_to_string(&path)
        .ok()
        .and_then(|content| serde_json::from_str::<PackageJson>(&content).ok());
    let Some(package) = parsed else {
        debug!("bundle"; "ignoring unreadable {}", path.display());
        return Vec::new();
    };
    package
        .dependencies
        .into_iter()
        .chain(package.peer_dependencies)
        .map(|(name, _)| name)
        .collect()
}

/// Framework packages, manifest dependencies, then configured extras.
/// Deduplicated, first occurrence wins.
pub fn server_externals(root: &Path, extra: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    let candidates = FRAMEWORK_PACKAGES
        .iter()
        .map(|s| s.to_string())
        .chain(manifest_dependencies(root))
        .chain(extra.iter().cloned());
    for name in candidates {
        if !out.contains(&name) {
            out.push(name);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_no_manifest() {
        let dir = TempDir::new().unwrap();
        let externals = server_externals(dir.path(), &[]);
        assert!(externals.starts_with(&["react".to_string()]));
        assert_eq!(externals.len(), FRAMEWORK_PACKAGES.len());
    }

    #[test]
    fn test_manifest_found_walking_upward() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("package.json"),
            r#"{"dependencies":{"react":"^18","sharp":"^0.33"},"peerDependencies":{"pg":"*"}}"#,
        )
        .unwrap();
        let app = dir.path().join("apps/site");
        fs::create_dir_all(&app).unwrap();

        let externals = server_externals(&app, &["bcrypt".to_string()]);
        assert!(externals.contains(&"sharp".to_string()));
        assert!(externals.contains(&"pg".to_string()));
        assert_eq!(externals.last().map(String::as_str), Some("bcrypt"));
        assert_eq!(externals.iter().filter(|e| *e == "react").count(), 1);
    }

    #[test]
    fn test_invalid_manifest_ignored() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("package.json"), "{ not json").unwrap();
        assert!(manifest_dependencies(dir.path()).is_empty());
    }
}
