use std::path::{Component, Path, PathBuf};

use rustc_hash::FxHashMap;

use super::types::ChangeKind;
use crate::actor::messages::WatchEvent;
use crate::config::BuildOptions;
use crate::debug;
use crate::route::{PageEventKind, is_page_source};
use crate::utils::path::relative_slash;

/// Turns debounced path changes into [`WatchEvent`]s.
///
/// Pipeline: correct_by_existence → order → categorize (pages, resources, noise).
pub(super) struct EventClassifier<'a> {
    options: &'a BuildOptions,
    /// Whether a page path is already part of the page set.
    tracked: &'a dyn Fn(&str) -> bool,
}

impl<'a> EventClassifier<'a> {
    pub(super) fn new(options: &'a BuildOptions, tracked: &'a dyn Fn(&str) -> bool) -> Self {
        Self { options, tracked }
    }

    /// Removals come first so a rename drops the old route before adding
    /// the new one.
    pub(super) fn classify(&self, raw: FxHashMap<PathBuf, ChangeKind>) -> Vec<WatchEvent> {
        let mut changes: Vec<_> = raw
            .into_iter()
            .filter_map(|(path, kind)| Some((correct_by_existence(&path, kind)?, path)))
            .collect();
        changes.sort_by(|(a_kind, a), (b_kind, b)| {
            (*a_kind != ChangeKind::Removed, a).cmp(&(*b_kind != ChangeKind::Removed, b))
        });

        changes
            .into_iter()
            .filter_map(|(kind, path)| self.categorize(path, kind))
            .collect()
    }

    fn categorize(&self, path: PathBuf, kind: ChangeKind) -> Option<WatchEvent> {
        if self.is_ignored(&path) {
            return None;
        }
        if kind != ChangeKind::Removed && !path.is_file() {
            return None;
        }

        if let Some(relative) = relative_slash(&path, &self.options.pages_dir) {
            if !is_page_source(&relative) {
                return Some(WatchEvent::Resource(path));
            }
            let tracked = (self.tracked)(&relative);
            let kind = match kind {
                ChangeKind::Removed if !tracked => {
                    debug!("watch"; "removed untracked page: {}", relative);
                    return None;
                }
                ChangeKind::Removed => PageEventKind::Removed,
                // Editors that write-then-rename report a new page as modified
                _ if !tracked => PageEventKind::Added,
                _ => PageEventKind::Changed,
            };
            return Some(WatchEvent::Page { kind, relative });
        }

        let relative = relative_slash(&path, &self.options.root)?;
        self.options
            .is_watched(&relative)
            .then_some(WatchEvent::Resource(path))
    }

    /// Build output and installed packages never trigger a rebuild.
    fn is_ignored(&self, path: &Path) -> bool {
        path.starts_with(&self.options.cache_dir)
            || path
                .components()
                .any(|c| c == Component::Normal("node_modules".as_ref()))
    }
}

/// Reconcile the reported kind with what is on disk now.
///
/// Returns `None` for a file that appeared and vanished again.
fn correct_by_existence(path: &Path, kind: ChangeKind) -> Option<ChangeKind> {
    let exists = path.exists();
    match kind {
        ChangeKind::Created if !exists => None,
        ChangeKind::Modified if !exists => Some(ChangeKind::Removed),
        // Atomic saves remove and recreate
        ChangeKind::Removed if exists => Some(ChangeKind::Modified),
        kind => Some(kind),
    }
}
