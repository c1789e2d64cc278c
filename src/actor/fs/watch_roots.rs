use std::path::PathBuf;

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use rustc_hash::FxHashSet;

use crate::config::BuildOptions;
use crate::debug;

/// Directories watched recursively: the pages directory plus the fixed
/// prefix of every extra glob. Nested roots collapse into their parent.
pub(super) fn collect_roots(options: &BuildOptions) -> Vec<PathBuf> {
    let mut roots = vec![options.pages_dir.clone()];
    roots.extend(
        options
            .watch
            .iter()
            .map(|glob| options.root.join(glob.base_dir())),
    );
    roots.sort();
    roots.dedup();

    let all = roots.clone();
    roots.retain(|root| !all.iter().any(|other| other != root && root.starts_with(other)));
    roots
}

/// Keeps watch roots attached across deletion and recreation.
pub(super) struct WatchRoots {
    desired: Vec<PathBuf>,
    attached: FxHashSet<PathBuf>,
}

impl WatchRoots {
    pub(super) fn new(desired: Vec<PathBuf>) -> Self {
        Self {
            desired,
            attached: FxHashSet::default(),
        }
    }

    /// Attach every root that exists now; missing ones wait for `maintain`.
    pub(super) fn attach_existing(&mut self, watcher: &mut RecommendedWatcher) -> notify::Result<()> {
        for root in &self.desired {
            if root.exists() {
                watcher.watch(root, RecursiveMode::Recursive)?;
                self.attached.insert(root.clone());
            }
        }
        Ok(())
    }

    pub(super) fn maintain(&mut self, watcher: &mut RecommendedWatcher) {
        self.attached.retain(|root| root.exists());

        for root in &self.desired {
            if self.attached.contains(root) || !root.exists() {
                continue;
            }
            if watcher.watch(root, RecursiveMode::Recursive).is_ok() {
                debug!("watch"; "attached {}", root.display());
                self.attached.insert(root.clone());
            }
        }
    }

    pub(super) fn attached(&self) -> usize {
        self.attached.len()
    }
}
