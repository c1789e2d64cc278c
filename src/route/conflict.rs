//! Route conflict detection: several page files claiming one pattern or
//! one generated identifier.

use std::fmt;

use rustc_hash::FxHashMap;
use serde::Serialize;

use super::descriptor::RouteDescriptor;
use crate::log;
use crate::utils::plural::plural_s;

/// What the conflicting sources share.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictKind {
    Pattern,
    Identifier,
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pattern => "pattern",
            Self::Identifier => "identifier",
        })
    }
}

/// Multiple page files claim the same key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteConflict {
    pub kind: ConflictKind,
    /// The shared pattern shape (parameter names erased) or identifier.
    pub key: String,
    /// Relative paths of all claiming pages, sorted.
    pub sources: Vec<String>,
}

/// Detect pattern and identifier collisions.
///
/// Output is sorted by kind then key, so repeated scans report identically.
pub fn detect_conflicts(routes: &[RouteDescriptor]) -> Vec<RouteConflict> {
    let mut by_pattern: FxHashMap<String, Vec<String>> = FxHashMap::default();
    let mut by_ident: FxHashMap<String, Vec<String>> = FxHashMap::default();

    for route in routes {
        by_pattern
            .entry(route.pattern.shape())
            .or_default()
            .push(route.relative_path.clone());
        by_ident
            .entry(route.identifier.clone())
            .or_default()
            .push(route.relative_path.clone());
    }

    let mut conflicts: Vec<_> = collect(ConflictKind::Pattern, by_pattern)
        .chain(collect(ConflictKind::Identifier, by_ident))
        .collect();
    conflicts.sort_by(|a, b| (a.kind as u8, &a.key).cmp(&(b.kind as u8, &b.key)));
    conflicts
}

fn collect(
    kind: ConflictKind,
    map: FxHashMap<String, Vec<String>>,
) -> impl Iterator<Item = RouteConflict> {
    map.into_iter()
        .filter(|(_, sources)| sources.len() > 1)
        .map(move |(key, mut sources)| {
            sources.sort();
            RouteConflict {
                kind,
                key,
                sources,
            }
        })
}

/// Print conflicts using the standard log format.
///
/// ```text
/// [error] route conflicts (1 pattern, 2 sources)
/// [route] pattern /about (2 sources)
///   - about.tsx
///   - about/index.tsx
/// ```
pub fn print_conflicts(conflicts: &[RouteConflict]) {
    if conflicts.is_empty() {
        return;
    }

    let total_sources: usize = conflicts.iter().map(|c| c.sources.len()).sum();
    log!("error"; "route conflicts ({} key{}, {} source{})",
        conflicts.len(), plural_s(conflicts.len()),
        total_sources, plural_s(total_sources));

    for conflict in conflicts {
        log!("route"; "{} {} ({} source{})", conflict.kind, conflict.key,
            conflict.sources.len(), plural_s(conflict.sources.len()));
        for source in &conflict.sources {
            eprintln!("  - {source}");
        }
    }
}

/// Format conflicts as a string (for error messages).
pub fn format_conflicts(conflicts: &[RouteConflict]) -> String {
    conflicts
        .iter()
        .map(|c| {
            let mut lines = vec![format!("{} {} ({})", c.kind, c.key, c.sources.len())];
            lines.extend(c.sources.iter().map(|s| format!("  - {s}")));
            lines.join("\n")
        })
        .collect::<Vec<_>>()
        .join("\n")
}
