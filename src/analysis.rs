//! Full analysis pipeline.
//!
//! Runs scan, symbols, graph, routes and layout over a project in one pass.
//!
//! # Contracts
//! - **Purity**: the only inputs are the sources, the prior positions and the
//!   configuration. Nothing is carried over from earlier runs.
//! - **Totality**: [`analyze`] always returns a result. Problems in the
//!   script surface as diagnostics.
//! - **Determinism**: identical inputs give identical results, including
//!   route ids and colors.

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::config::AnalysisConfig;
use crate::diagnostics::{AnalysisDiagnostic, DiagnosticKind, Diagnostics};
use crate::error::{AnalysisError, AnalysisResult};
use crate::graph::{GraphStats, LabelGraph, RouteLink};
use crate::layout::{layout_labels, LabelNode, PriorPositions};
use crate::routes::{identify_routes, IdentifiedRoute};
use crate::scanner::{scan_source, ScannedFile};
use crate::sources::ProjectSources;
use crate::symbols::{build_symbols, SymbolTable};

/// Everything the UI layer consumes from one analysis run.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ScriptAnalysis {
    #[serde(flatten)]
    pub symbols: SymbolTable,
    pub label_nodes: Vec<LabelNode>,
    pub route_links: Vec<RouteLink>,
    pub identified_routes: Vec<IdentifiedRoute>,
    pub entry_labels: Vec<String>,
    /// True when route enumeration hit a limit.
    pub routes_truncated: bool,
    pub graph_stats: GraphStats,
    pub diagnostics: Diagnostics,
    /// Fingerprint of the sources this result was computed from.
    pub fingerprint: String,
}

impl ScriptAnalysis {
    /// Rebuilds the label graph from the stored nodes and links.
    pub fn graph(&self) -> LabelGraph {
        let mut ordered: Vec<_> = self.symbols.labels.values().collect();
        ordered.sort_by(|a, b| a.location.cmp(&b.location).then(a.name.cmp(&b.name)));
        LabelGraph::from_parts(
            ordered.into_iter().map(|label| label.name.clone()).collect(),
            self.route_links.clone(),
        )
    }

    /// Current position of every label node.
    pub fn positions(&self) -> PriorPositions {
        self.label_nodes
            .iter()
            .map(|node| (node.id.clone(), node.position))
            .collect()
    }

    pub fn label_node(&self, id: &str) -> Option<&LabelNode> {
        self.label_nodes.iter().find(|node| node.id == id)
    }

    /// Route ids passing through each label.
    pub fn routes_by_label(&self) -> BTreeMap<&str, Vec<u32>> {
        let mut by_label: BTreeMap<&str, Vec<u32>> = BTreeMap::new();
        for route in &self.identified_routes {
            for label in &route.labels {
                by_label.entry(label.as_str()).or_default().push(route.id);
            }
        }
        by_label
    }

    pub fn from_json(payload: &str) -> AnalysisResult<Self> {
        serde_json::from_str(payload).map_err(|err| AnalysisError::from_json(payload, &err))
    }

    pub fn to_json(&self) -> AnalysisResult<String> {
        serde_json::to_string_pretty(self).map_err(|err| AnalysisError::Serialization {
            message: err.to_string(),
            src: String::new(),
            span: (0, 0).into(),
        })
    }
}

/// Scans every file of the project, in path order.
pub fn scan_project(sources: &ProjectSources) -> Vec<ScannedFile> {
    sources
        .iter()
        .map(|(path, text)| scan_source(path, text))
        .collect()
}

/// Runs the whole pipeline.
#[instrument(skip_all, fields(files = sources.len()))]
pub fn analyze(
    sources: &ProjectSources,
    prior: &PriorPositions,
    config: &AnalysisConfig,
) -> ScriptAnalysis {
    let mut diagnostics = Diagnostics::new();

    let scanned = scan_project(sources);
    for file in &scanned {
        diagnostics.extend(file.diagnostics.clone());
    }

    let (symbols, symbol_diagnostics) = build_symbols(&scanned, config.duplicate_policy);
    diagnostics.extend(symbol_diagnostics);

    let (graph, graph_diagnostics) = LabelGraph::build(&symbols);
    diagnostics.extend(graph_diagnostics);

    let route_set = identify_routes(&graph, config);
    diagnostics.extend(route_set.diagnostics);

    if config.report_unreachable && !route_set.entry_labels.is_empty() {
        let reachable = graph.reachable_from(route_set.entry_labels.iter().map(String::as_str));
        for name in graph.nodes().iter().filter(|name| !reachable.contains(*name)) {
            let label = &symbols.labels[name];
            diagnostics.push(
                AnalysisDiagnostic::new(
                    DiagnosticKind::UnreachableLabel,
                    format!("label '{name}' is not reachable from any entry label"),
                )
                .at(&label.location.file, label.location.line),
            );
        }
    }

    let label_nodes = layout_labels(&symbols, &graph, prior, &config.layout);
    let graph_stats = graph.stats();

    info!(
        labels = symbols.labels.len(),
        links = graph_stats.link_count,
        routes = route_set.routes.len(),
        diagnostics = diagnostics.len(),
        "analysis complete"
    );
    debug!(errors = diagnostics.has_errors(), "diagnostic summary");

    ScriptAnalysis {
        symbols,
        label_nodes,
        route_links: graph.into_links(),
        identified_routes: route_set.routes,
        entry_labels: route_set.entry_labels,
        routes_truncated: route_set.truncated,
        graph_stats,
        diagnostics,
        fingerprint: sources.fingerprint(),
    }
}

#[cfg(test)]
#[path = "tests/analysis_tests.rs"]
mod tests;
