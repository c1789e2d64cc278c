//! Request path to static file resolution.

use std::path::{Path, PathBuf};

/// Resolve decoded path segments below `root`.
///
/// Returns `None` for anything that is not a regular file inside `root`,
/// including `..` segments and symlinks pointing elsewhere.
pub fn resolve_static(root: &Path, segments: &[String]) -> Option<PathBuf> {
    if segments.is_empty() {
        return None;
    }
    // Decoded segments may contain separators (`%2F`, `%5C`)
    let suspicious = |s: &String| s == ".." || s == "." || s.contains(['/', '\\', '\0']);
    if segments.iter().any(suspicious) {
        return None;
    }

    let local = segments.iter().fold(root.to_path_buf(), |p, s| p.join(s));

    // Canonicalize to resolve symlinks and verify the path is under root
    let canonical = local.canonicalize().ok()?;
    let root_canonical = root.canonicalize().ok()?;
    if !canonical.starts_with(&root_canonical) {
        return None;
    }

    canonical.is_file().then_some(canonical)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn segs(path: &str) -> Vec<String> {
        path.split('/').filter(|s| !s.is_empty()).map(str::to_string).collect()
    }

    #[test]
    fn test_resolves_files_only() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("img")).unwrap();
        fs::write(dir.path().join("img/logo.svg"), "<svg/>").unwrap();

        assert!(resolve_static(dir.path(), &segs("/img/logo.svg")).is_some());
        assert!(resolve_static(dir.path(), &segs("/img")).is_none());
        assert!(resolve_static(dir.path(), &segs("/img/missing.svg")).is_none());
        assert!(resolve_static(dir.path(), &[]).is_none());
    }

    #[test]
    fn test_rejects_traversal() {
        let dir = TempDir::new().unwrap();
        let public = dir.path().join("public");
        fs::create_dir_all(&public).unwrap();
        fs::write(dir.path().join("secret.txt"), "x").unwrap();

        assert!(resolve_static(&public, &segs("/../secret.txt")).is_none());
        assert!(resolve_static(&public, &["../secret.txt".to_string()]).is_none());
        assert!(resolve_static(&public, &["..\\secret.txt".to_string()]).is_none());
    }
}
