//! Route identification over the label graph.
//!
//! A route is a maximal simple path: it starts at an entry label and follows
//! links until it reaches a label with no outgoing links, or a label whose
//! every outgoing link leads back onto the current path.
//!
//! # Contracts
//! - **Termination**: traversal uses an explicit stack and an on-path set, so
//!   cycles and self-loops never recurse. Work is bounded by
//!   [`RouteLimits::max_routes`](crate::config::RouteLimits::max_routes) and
//!   `max_steps`.
//! - **Determinism**: entries are visited in order and links in link-id
//!   order, so the same graph yields the same routes, ids and colors.

use std::collections::BTreeSet;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::config::AnalysisConfig;
use crate::diagnostics::{AnalysisDiagnostic, DiagnosticKind, Diagnostics};
use crate::graph::{LabelGraph, LinkId};

/// Conventional entry label of a story.
pub const DEFAULT_START_LABEL: &str = "start";

/// One discovered path through the label graph.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct IdentifiedRoute {
    /// Enumeration index, stable within one run.
    pub id: u32,
    pub color: String,
    pub link_ids: Vec<LinkId>,
    /// Labels visited in order, `start` first and `end` last.
    pub labels: Vec<String>,
    pub start: String,
    pub end: String,
    /// True when the route stopped because every way forward revisits a
    /// label already on the route.
    pub ends_in_cycle: bool,
}

/// Output of route identification.
#[derive(Clone, Debug, Default)]
pub struct RouteSet {
    pub entry_labels: Vec<String>,
    pub routes: Vec<IdentifiedRoute>,
    pub truncated: bool,
    pub diagnostics: Diagnostics,
}

// =============================================================================
// Entry Selection
// =============================================================================

/// Picks entry labels.
///
/// Configured entries win when at least one of them exists; missing ones are
/// reported. Otherwise the defaults are `start` (when defined) followed by
/// every label with in-degree zero in node order. A non-empty graph where
/// every label has incoming links falls back to its first label.
pub fn select_entries(graph: &LabelGraph, configured: &[String]) -> (Vec<String>, Diagnostics) {
    let mut diagnostics = Diagnostics::new();
    let mut entries: Vec<String> = Vec::new();

    for name in configured {
        if !graph.contains(name) {
            diagnostics.push(AnalysisDiagnostic::new(
                DiagnosticKind::UnknownEntryLabel,
                format!("configured entry label '{name}' is not defined"),
            ));
        } else if !entries.contains(name) {
            entries.push(name.clone());
        }
    }
    if !entries.is_empty() {
        return (entries, diagnostics);
    }

    if graph.contains(DEFAULT_START_LABEL) {
        entries.push(DEFAULT_START_LABEL.to_string());
    }
    for root in graph.roots() {
        if root != DEFAULT_START_LABEL {
            entries.push(root.to_string());
        }
    }
    if entries.is_empty() {
        if let Some(first) = graph.nodes().first() {
            entries.push(first.clone());
        }
    }
    (entries, diagnostics)
}

// =============================================================================
// Enumeration
// =============================================================================

#[derive(Debug, Clone, Copy)]
struct PathFrame {
    node: usize,
    /// Next outgoing link to try.
    cursor: usize,
    /// Whether any link from this node extended the path.
    extended: bool,
    /// Whether a link from this node pointed back onto the path.
    saw_back_edge: bool,
}

impl PathFrame {
    fn new(node: usize) -> Self {
        Self {
            node,
            cursor: 0,
            extended: false,
            saw_back_edge: false,
        }
    }
}

/// Enumerates routes from the selected entries.
///
/// Entries with no outgoing links produce no route, since a route is a
/// sequence of links.
#[instrument(skip_all, fields(labels = graph.len(), links = graph.links().len()))]
pub fn identify_routes(graph: &LabelGraph, config: &AnalysisConfig) -> RouteSet {
    let (entry_labels, mut diagnostics) = select_entries(graph, &config.entry_labels);
    let limits = &config.routes;

    let mut routes: Vec<IdentifiedRoute> = Vec::new();
    let mut truncated = false;
    let mut steps = 0usize;
    let mut on_path = vec![false; graph.len()];

    'entries: for entry in &entry_labels {
        let Some(start) = graph.index_of(entry) else {
            continue;
        };
        let mut stack = vec![PathFrame::new(start)];
        let mut path_links: Vec<LinkId> = Vec::new();
        on_path[start] = true;

        while let Some(top) = stack.last_mut() {
            steps += 1;
            if steps > limits.max_steps {
                truncated = true;
                break 'entries;
            }

            if let Some(link) = graph.outgoing_at(top.node).nth(top.cursor) {
                top.cursor += 1;
                let Some(target) = graph.index_of(&link.target) else {
                    continue;
                };
                if on_path[target] {
                    top.saw_back_edge = true;
                    continue;
                }
                top.extended = true;
                on_path[target] = true;
                path_links.push(link.id);
                stack.push(PathFrame::new(target));
                continue;
            }

            let Some(done) = stack.pop() else {
                break;
            };
            if !done.extended && !path_links.is_empty() {
                if routes.len() >= limits.max_routes {
                    truncated = true;
                    break 'entries;
                }
                let labels: Vec<String> = stack
                    .iter()
                    .map(|frame| frame.node)
                    .chain(std::iter::once(done.node))
                    .map(|node| graph.nodes()[node].clone())
                    .collect();
                let id = routes.len() as u32;
                routes.push(IdentifiedRoute {
                    id,
                    color: config.route_color(id),
                    link_ids: path_links.clone(),
                    start: labels[0].clone(),
                    end: graph.nodes()[done.node].clone(),
                    labels,
                    ends_in_cycle: done.saw_back_edge,
                });
            }
            on_path[done.node] = false;
            if !stack.is_empty() {
                path_links.pop();
            }
        }
    }

    if truncated {
        warn!(
            routes = routes.len(),
            steps,
            max_routes = limits.max_routes,
            max_steps = limits.max_steps,
            "route enumeration truncated"
        );
        diagnostics.push(AnalysisDiagnostic::new(
            DiagnosticKind::RouteEnumerationTruncated,
            format!(
                "route enumeration stopped after {} routes and {} steps; results may be incomplete",
                routes.len(),
                steps.min(limits.max_steps)
            ),
        ));
    }
    debug!(routes = routes.len(), steps, "routes identified");

    RouteSet {
        entry_labels,
        routes,
        truncated,
        diagnostics,
    }
}

/// Labels that appear on at least one route.
pub fn labels_on_routes(routes: &[IdentifiedRoute]) -> BTreeSet<&str> {
    routes
        .iter()
        .flat_map(|route| route.labels.iter().map(String::as_str))
        .collect()
}

#[cfg(test)]
#[path = "tests/routes_tests.rs"]
mod tests;
