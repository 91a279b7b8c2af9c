//! Route table for the presentation views.
//!
//! Maps URL paths to the three views and resolves the root redirect.

use std::fmt;

/// A top-level view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum View {
    MetricManagement,
    TableManagement,
    SqlQuery,
}

impl View {
    /// All views, in navigation order.
    pub const ALL: [View; 3] = [View::MetricManagement, View::TableManagement, View::SqlQuery];

    /// Path the view is mounted at.
    pub fn path(&self) -> &'static str {
        match self {
            Self::MetricManagement => "/metrics",
            Self::TableManagement => "/tables",
            Self::SqlQuery => "/query",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::MetricManagement => "MetricManagement",
            Self::TableManagement => "TableManagement",
            Self::SqlQuery => "SqlQuery",
        }
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Where the root path sends the user.
pub const ROOT_REDIRECT: View = View::MetricManagement;

/// Outcome of looking up a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    View(View),
    Redirect { from: &'static str, to: &'static str },
    NotFound,
}

/// Looks up a single path without following redirects.
///
/// Trailing slashes are ignored, so `/tables/` resolves like `/tables`.
pub fn resolve(path: &str) -> Resolved {
    let trimmed = path.trim_end_matches('/');

    if trimmed.is_empty() {
        return Resolved::Redirect {
            from: "/",
            to: ROOT_REDIRECT.path(),
        };
    }

    View::ALL
        .into_iter()
        .find(|view| view.path() == trimmed)
        .map_or(Resolved::NotFound, Resolved::View)
}

/// Resolves a path to its final view, following the root redirect.
pub fn navigate(path: &str) -> Option<View> {
    match resolve(path) {
        Resolved::View(view) => Some(view),
        Resolved::Redirect { to, .. } => match resolve(to) {
            Resolved::View(view) => Some(view),
            _ => None,
        },
        Resolved::NotFound => None,
    }
}
