//! File-based routing.
//!
//! Page files under the pages directory map to URL patterns; the route
//! table orders them by specificity and matches request paths.
//!
//! # Module Structure
//!
//! - [`pattern`]: pattern derivation and segment matching
//! - [`descriptor`]: one descriptor per page file
//! - [`table`]: ordered table and `match_path`
//! - [`scan`]: directory walk and incremental file events
//! - [`conflict`]: duplicate pattern / identifier detection

mod conflict;
mod descriptor;
mod pattern;
mod scan;
mod table;

pub use conflict::{ConflictKind, RouteConflict, detect_conflicts, format_conflicts, print_conflicts};
pub use descriptor::{RouteDescriptor, identifier_for};
pub use pattern::{
    Params, Pattern, SOURCE_EXTENSIONS, Segment, WILDCARD_KEY, derive_pattern, is_page_source,
};
pub use scan::{PageEventKind, PageSet, scan};
pub use table::{RouteMatch, RouteTable};
