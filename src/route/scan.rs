//! Page discovery and incremental file-set maintenance.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use jwalk::WalkDir;

use crate::debug;
use crate::error::RouteConflictError;
use crate::utils::path::relative_slash;

use super::descriptor::RouteDescriptor;
use super::pattern::is_page_source;
use super::table::RouteTable;

/// Kind of change observed for a page file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageEventKind {
    Added,
    Changed,
    Removed,
}

/// Current set of page files, relative to the pages directory.
#[derive(Debug, Clone)]
pub struct PageSet {
    pages_dir: PathBuf,
    files: BTreeSet<String>,
}

impl PageSet {
    /// Empty set rooted at `pages_dir`.
    pub fn new(pages_dir: impl Into<PathBuf>) -> Self {
        Self {
            pages_dir: pages_dir.into(),
            files: BTreeSet::new(),
        }
    }

    /// Walk `pages_dir` for page sources. A missing directory yields no pages.
    pub fn scan(pages_dir: impl Into<PathBuf>) -> Self {
        let mut set = Self::new(pages_dir);
        if !set.pages_dir.is_dir() {
            debug!("route"; "pages directory {} not found", set.pages_dir.display());
            return set;
        }

        set.files = WalkDir::new(&set.pages_dir)
            .skip_hidden(true)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file())
            .filter_map(|e| relative_slash(&e.path(), &set.pages_dir))
            .filter(|rel| is_page_source(rel))
            .collect();
        set
    }

    #[inline]
    pub fn pages_dir(&self) -> &Path {
        &self.pages_dir
    }

    /// Relative paths in sorted order.
    pub fn files(&self) -> impl Iterator<Item = &str> {
        self.files.iter().map(String::as_str)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Relative page path for an absolute file path, if it names a page.
    pub fn page_relative(&self, path: &Path) -> Option<String> {
        relative_slash(path, &self.pages_dir).filter(|rel| is_page_source(rel))
    }

    pub fn contains(&self, relative: &str) -> bool {
        self.files.contains(relative)
    }

    /// Apply one file event. Returns whether the URL space changed.
    ///
    /// `Changed` never alters the set; its only effect is a recompile.
    pub fn apply(&mut self, kind: PageEventKind, relative: &str) -> bool {
        match kind {
            PageEventKind::Added => self.files.insert(relative.to_string()),
            PageEventKind::Removed => self.files.remove(relative),
            PageEventKind::Changed => false,
        }
    }

    /// Apply one file event and rebuild the table.
    pub fn apply_file_event(
        &mut self,
        kind: PageEventKind,
        relative: &str,
    ) -> Result<RouteTable, RouteConflictError> {
        self.apply(kind, relative);
        self.table()
    }

    /// Derive the route table for the current file set.
    pub fn table(&self) -> Result<RouteTable, RouteConflictError> {
        let routes = self
            .files
            .iter()
            .map(|rel| RouteDescriptor::new(&self.pages_dir, rel))
            .collect();
        RouteTable::build(routes)
    }
}

/// Scan `pages_dir` and build its route table.
pub fn scan(pages_dir: &Path) -> Result<RouteTable, RouteConflictError> {
    PageSet::scan(pages_dir).table()
}
