//! Request classification and the routing table.
//!
//! Routing is data, not inline conditionals: an ordered list of
//! (predicate, strategy) rows evaluated in fixed priority, first match
//! wins. The default table has three rows — images, documents, everything
//! else — and each row can be tested in isolation. The cross-origin check
//! happens before the table is consulted at all.

use intercache_core::Request;

/// The three fetch/cache strategies a request can be routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    /// Cache-first with detached background refresh (images).
    StaleWhileRevalidate,
    /// Network-first with cache fallback (documents and navigations).
    NetworkFirst,
    /// Cache-first with network fallback (everything else same-origin).
    CacheFirst,
}

/// A pure predicate over an intercepted request's URL and mode.
#[derive(Debug, Clone)]
pub enum Predicate {
    /// URL path ends in one of these extensions (case-insensitive).
    PathExtensionIn(Vec<String>),
    /// Path extension matches, or the request is a top-level navigation.
    PathExtensionInOrNavigation(Vec<String>),
    /// Matches every request.
    Any,
}

impl Predicate {
    /// Whether the request matches this predicate.
    pub fn matches(&self, request: &Request) -> bool {
        match self {
            Self::PathExtensionIn(extensions) => has_extension(request.url.path(), extensions),
            Self::PathExtensionInOrNavigation(extensions) => {
                request.is_navigation() || has_extension(request.url.path(), extensions)
            }
            Self::Any => true,
        }
    }
}

/// Path extension test. `/v1.2/data` has no extension; `/img/a.webp`
/// has extension `webp`.
fn has_extension(path: &str, extensions: &[String]) -> bool {
    let Some((_, ext)) = path.rsplit_once('.') else {
        return false;
    };
    if ext.contains('/') {
        return false;
    }
    extensions.iter().any(|e| e.eq_ignore_ascii_case(ext))
}

/// One row of the routing table.
#[derive(Debug, Clone)]
pub struct Route {
    pub predicate: Predicate,
    pub strategy: StrategyKind,
}

/// Ordered routing table; rows are evaluated top to bottom and exactly
/// one strategy executes per request.
#[derive(Debug, Clone)]
pub struct RoutingTable {
    routes: Vec<Route>,
}

impl RoutingTable {
    /// Build the default three-row table from the configured extension
    /// lists: images → stale-while-revalidate, documents/navigations →
    /// network-first, everything else → cache-first.
    pub fn new(image_extensions: Vec<String>, document_extensions: Vec<String>) -> Self {
        Self {
            routes: vec![
                Route {
                    predicate: Predicate::PathExtensionIn(image_extensions),
                    strategy: StrategyKind::StaleWhileRevalidate,
                },
                Route {
                    predicate: Predicate::PathExtensionInOrNavigation(document_extensions),
                    strategy: StrategyKind::NetworkFirst,
                },
                Route { predicate: Predicate::Any, strategy: StrategyKind::CacheFirst },
            ],
        }
    }

    /// Build a table from explicit rows, in evaluation order.
    pub fn from_routes(routes: Vec<Route>) -> Self {
        Self { routes }
    }

    /// The strategy for a request: first matching row wins. `None` only
    /// if no row matches (the default table always ends in a match-all).
    pub fn route(&self, request: &Request) -> Option<StrategyKind> {
        self.routes
            .iter()
            .find(|route| route.predicate.matches(request))
            .map(|route| route.strategy)
    }

    /// The rows, in evaluation order.
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }
}
