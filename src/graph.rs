//! Label control-flow graph.
//!
//! Builds a directed multigraph over labels from the symbol tables. It
//! enables:
//! - Route enumeration over narrative paths
//! - Detection of unreachable labels
//! - Layout of the label canvas
//!
//! # Contracts
//! - **Precondition**: built from a finished [`SymbolTable`].
//! - **Postcondition**: every link's source and target is a label in the
//!   table. Unresolved `jump`/`call` targets are diagnostics, not links.

use std::collections::{BTreeMap, HashSet, VecDeque};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::diagnostics::{AnalysisDiagnostic, DiagnosticKind, Diagnostics};
use crate::scanner::{walk_all, Statement, Target};
use crate::symbols::{qualify_label, Label, SymbolTable};

// =============================================================================
// Link Types
// =============================================================================

/// Unique identifier for a link within one analysis run.
pub type LinkId = u32;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum LinkKind {
    /// An authored `jump` or `call`.
    Explicit,
    /// Fall-through from the end of a label into the next one in the file.
    Implicit,
}

/// A directed edge between two labels.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RouteLink {
    pub id: LinkId,
    pub source: String,
    pub target: String,
    pub kind: LinkKind,
    /// True when the link comes from a `call` rather than a `jump`.
    pub is_call: bool,
    /// Line of the `jump`/`call`; `None` for implicit links.
    pub line: Option<usize>,
}

// =============================================================================
// Label Graph
// =============================================================================

/// Label graph with adjacency indexes. Node ids are label names.
#[derive(Clone, Debug, Default)]
pub struct LabelGraph {
    /// Label names ordered by (file, line).
    nodes: Vec<String>,
    index: BTreeMap<String, usize>,
    links: Vec<RouteLink>,
    outgoing: Vec<Vec<usize>>,
    incoming: Vec<Vec<usize>>,
}

/// Statistics about the label graph.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct GraphStats {
    pub label_count: usize,
    pub link_count: usize,
    pub explicit_links: usize,
    pub implicit_links: usize,
    pub terminal_labels: usize,
    pub self_loops: usize,
}

impl LabelGraph {
    /// Builds the graph from symbol tables, reporting unresolved targets.
    #[instrument(skip_all, fields(labels = symbols.labels.len()))]
    pub fn build(symbols: &SymbolTable) -> (Self, Diagnostics) {
        let mut diagnostics = Diagnostics::new();
        let mut ordered: Vec<&Label> = symbols.labels.values().collect();
        ordered.sort_by(|a, b| a.location.cmp(&b.location).then(a.name.cmp(&b.name)));

        let mut links: Vec<RouteLink> = Vec::new();
        for label in &ordered {
            Self::explicit_links(label, symbols, &mut links, &mut diagnostics);
            if !label.ends_in_transfer() {
                if let Some(next) = label
                    .next_in_file
                    .as_ref()
                    .filter(|next| symbols.labels.contains_key(*next))
                {
                    links.push(RouteLink {
                        id: links.len() as LinkId,
                        source: label.name.clone(),
                        target: next.clone(),
                        kind: LinkKind::Implicit,
                        is_call: false,
                        line: None,
                    });
                }
            }
        }

        let nodes = ordered.iter().map(|label| label.name.clone()).collect();
        let graph = Self::from_parts(nodes, links);
        debug!(links = graph.links.len(), "label graph built");
        (graph, diagnostics)
    }

    /// Emits one explicit link per `jump`/`call` anywhere in the label body,
    /// including nested conditionals and menu choices.
    fn explicit_links(
        label: &Label,
        symbols: &SymbolTable,
        links: &mut Vec<RouteLink>,
        diagnostics: &mut Diagnostics,
    ) {
        for node in walk_all(&label.statements) {
            let (target, is_call) = match &node.statement {
                Statement::Jump { target } => (target, false),
                Statement::Call { target, .. } => (target, true),
                _ => continue,
            };
            let verb = if is_call { "call" } else { "jump" };
            match target {
                Target::Named(name) => {
                    let resolved = qualify_label(name, Some(&label.name));
                    if symbols.labels.contains_key(&resolved) {
                        links.push(RouteLink {
                            id: links.len() as LinkId,
                            source: label.name.clone(),
                            target: resolved,
                            kind: LinkKind::Explicit,
                            is_call,
                            line: Some(node.line),
                        });
                    } else {
                        diagnostics.push(
                            AnalysisDiagnostic::new(
                                DiagnosticKind::UnresolvedTarget,
                                format!("{verb} target label '{resolved}' not found"),
                            )
                            .at(&label.location.file, node.line),
                        );
                    }
                }
                Target::Expression(expr) => {
                    diagnostics.push(
                        AnalysisDiagnostic::new(
                            DiagnosticKind::DynamicTarget,
                            format!("{verb} expression '{expr}' cannot be resolved statically"),
                        )
                        .at(&label.location.file, node.line),
                    );
                }
            }
        }
    }

    /// Rebuilds the indexes from nodes and links. Links whose endpoints are
    /// not in `nodes` are dropped.
    pub fn from_parts(nodes: Vec<String>, links: Vec<RouteLink>) -> Self {
        let index: BTreeMap<String, usize> = nodes
            .iter()
            .enumerate()
            .map(|(idx, name)| (name.clone(), idx))
            .collect();
        let links: Vec<RouteLink> = links
            .into_iter()
            .filter(|link| index.contains_key(&link.source) && index.contains_key(&link.target))
            .collect();
        let mut outgoing = vec![Vec::new(); nodes.len()];
        let mut incoming = vec![Vec::new(); nodes.len()];
        for (pos, link) in links.iter().enumerate() {
            outgoing[index[&link.source]].push(pos);
            incoming[index[&link.target]].push(pos);
        }
        Self {
            nodes,
            index,
            links,
            outgoing,
            incoming,
        }
    }

    pub fn nodes(&self) -> &[String] {
        &self.nodes
    }

    pub fn links(&self) -> &[RouteLink] {
        &self.links
    }

    pub fn into_links(self) -> Vec<RouteLink> {
        self.links
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn index_of(&self, label: &str) -> Option<usize> {
        self.index.get(label).copied()
    }

    pub fn contains(&self, label: &str) -> bool {
        self.index.contains_key(label)
    }

    /// Outgoing links of a node, by node index, in link order.
    pub(crate) fn outgoing_at(&self, node: usize) -> impl Iterator<Item = &RouteLink> {
        self.outgoing[node].iter().map(|&pos| &self.links[pos])
    }

    /// Gets all outgoing links from a label.
    pub fn outgoing(&self, label: &str) -> Vec<&RouteLink> {
        match self.index_of(label) {
            Some(node) => self.outgoing_at(node).collect(),
            None => Vec::new(),
        }
    }

    /// Gets all incoming links to a label.
    pub fn incoming(&self, label: &str) -> Vec<&RouteLink> {
        match self.index_of(label) {
            Some(node) => self.incoming[node].iter().map(|&pos| &self.links[pos]).collect(),
            None => Vec::new(),
        }
    }

    pub fn in_degree(&self, label: &str) -> usize {
        self.index_of(label).map_or(0, |node| self.incoming[node].len())
    }

    /// Labels with no outgoing links, in node order.
    pub fn terminal_labels(&self) -> Vec<&str> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(idx, _)| self.outgoing[*idx].is_empty())
            .map(|(_, name)| name.as_str())
            .collect()
    }

    /// Labels with no incoming links, in node order.
    pub fn roots(&self) -> Vec<&str> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(idx, _)| self.incoming[*idx].is_empty())
            .map(|(_, name)| name.as_str())
            .collect()
    }

    /// Labels reachable from any of `entries` (BFS). Unknown entries are
    /// ignored.
    pub fn reachable_from<'a>(
        &self,
        entries: impl IntoIterator<Item = &'a str>,
    ) -> HashSet<String> {
        let mut visited: HashSet<usize> = HashSet::new();
        let mut queue: VecDeque<usize> = VecDeque::new();

        for entry in entries {
            if let Some(node) = self.index_of(entry) {
                if visited.insert(node) {
                    queue.push_back(node);
                }
            }
        }

        while let Some(node) = queue.pop_front() {
            for link in self.outgoing_at(node) {
                let target = self.index[&link.target];
                if visited.insert(target) {
                    queue.push_back(target);
                }
            }
        }

        visited
            .into_iter()
            .map(|node| self.nodes[node].clone())
            .collect()
    }

    /// Returns statistics about the graph.
    pub fn stats(&self) -> GraphStats {
        let explicit_links = self
            .links
            .iter()
            .filter(|link| link.kind == LinkKind::Explicit)
            .count();
        GraphStats {
            label_count: self.nodes.len(),
            link_count: self.links.len(),
            explicit_links,
            implicit_links: self.links.len() - explicit_links,
            terminal_labels: self.outgoing.iter().filter(|out| out.is_empty()).count(),
            self_loops: self
                .links
                .iter()
                .filter(|link| link.source == link.target)
                .count(),
        }
    }

    /// Exports the graph to DOT format for visualization with Graphviz.
    pub fn to_dot(&self) -> String {
        let mut dot = String::from("digraph LabelGraph {\n");
        dot.push_str("    rankdir=TB;\n");
        dot.push_str("    node [shape=box];\n\n");

        for (idx, name) in self.nodes.iter().enumerate() {
            let shape = if self.outgoing[idx].is_empty() {
                "doubleoctagon"
            } else {
                "box"
            };
            dot.push_str(&format!(
                "    n{} [label=\"{}\" shape={}];\n",
                idx,
                name.replace('"', "'"),
                shape
            ));
        }

        dot.push('\n');

        for link in &self.links {
            let style = match (link.kind, link.is_call) {
                (LinkKind::Implicit, _) => "dotted",
                (LinkKind::Explicit, true) => "dashed",
                (LinkKind::Explicit, false) => "solid",
            };
            dot.push_str(&format!(
                "    n{} -> n{} [style={}];\n",
                self.index[&link.source], self.index[&link.target], style
            ));
        }

        dot.push_str("}\n");
        dot
    }
}

#[cfg(test)]
#[path = "tests/graph_tests.rs"]
mod tests;
