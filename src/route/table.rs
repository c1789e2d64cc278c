//! Route table: ordered descriptors plus deterministic matching.

use crate::core::RequestPath;
use crate::error::RouteConflictError;

use super::conflict::detect_conflicts;
use super::descriptor::RouteDescriptor;
use super::pattern::Params;

/// Ordered set of routes.
///
/// Declaration order is the relative path order; matching order sorts that
/// stably by specificity, so static segments win over params and params
/// win over catch-alls, independent of file enumeration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteTable {
    routes: Vec<RouteDescriptor>,
}

/// Result of matching a request path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteMatch<'a> {
    Page {
        /// Position in [`RouteTable::routes`].
        index: usize,
        route: &'a RouteDescriptor,
        params: Params,
        /// Concrete path the pattern matched, used as the route data key.
        path: String,
    },
    /// No page matched; the catch-all renders.
    NotFound,
}

impl RouteTable {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a table, rejecting duplicate patterns or identifiers.
    pub fn build(mut routes: Vec<RouteDescriptor>) -> Result<Self, RouteConflictError> {
        routes.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));

        let conflicts = detect_conflicts(&routes);
        if !conflicts.is_empty() {
            return Err(RouteConflictError { conflicts });
        }

        routes.sort_by(|a, b| a.pattern.cmp_specificity(&b.pattern));
        Ok(Self { routes })
    }

    /// Routes in matching order.
    #[inline]
    pub fn routes(&self) -> &[RouteDescriptor] {
        &self.routes
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// First route whose pattern matches, in specificity order.
    pub fn match_path(&self, path: &RequestPath) -> RouteMatch<'_> {
        for (index, route) in self.routes.iter().enumerate() {
            if let Some(params) = route.pattern.matches(path.segments()) {
                let path = route.pattern.resolve(&params);
                return RouteMatch::Page {
                    index,
                    route,
                    params,
                    path,
                };
            }
        }
        RouteMatch::NotFound
    }
}
