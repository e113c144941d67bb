//! Canvas layout for label nodes.
//!
//! Labels are grouped by block (file). Groups are placed left to right; inside
//! a group labels are layered by flow so that a label sits below the labels
//! that lead into it. Labels with a known position keep it.
//!
//! # Contracts
//! - **Determinism**: the same graph, sizes and prior positions always give
//!   the same layout.
//! - **Termination**: overlap resolution runs at most
//!   `LayoutConfig::max_overlap_passes` passes per node.
//! - **Groups**: computed nodes stay inside the horizontal band of their
//!   group, so groups never overlap unless the caller placed a node there.

use std::collections::{BTreeMap, BTreeSet};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::config::LayoutConfig;
use crate::graph::LabelGraph;
use crate::scanner::walk_all;
use crate::symbols::{Label, SymbolTable};

// =============================================================================
// Geometry
// =============================================================================

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

/// Axis-aligned box.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Bounds {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Bounds {
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// True when the boxes overlap by more than `tolerance` on both axes.
    pub fn overlaps(&self, other: &Bounds, tolerance: f32) -> bool {
        self.x < other.right() - tolerance
            && other.x < self.right() - tolerance
            && self.y < other.bottom() - tolerance
            && other.y < self.bottom() - tolerance
    }

    /// Smallest box containing both.
    pub fn union(&self, other: &Bounds) -> Bounds {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        Bounds {
            x,
            y,
            width: self.right().max(other.right()) - x,
            height: self.bottom().max(other.bottom()) - y,
        }
    }
}

/// Previously known positions, keyed by label name.
pub type PriorPositions = BTreeMap<String, Position>;

/// A label placed on the canvas.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct LabelNode {
    /// Label name.
    pub id: String,
    pub block_id: String,
    pub position: Position,
    pub size: Size,
    /// True when the position was carried in (prior run or user drag)
    /// rather than computed by this layout.
    pub user_positioned: bool,
    /// First content lines, used for sizing and display.
    pub preview: Vec<String>,
}

impl LabelNode {
    pub fn bounds(&self) -> Bounds {
        Bounds {
            x: self.position.x,
            y: self.position.y,
            width: self.size.width,
            height: self.size.height,
        }
    }
}

// =============================================================================
// Measurement
// =============================================================================

/// Preview lines and box size for a label.
pub fn measure_label(label: &Label, config: &LayoutConfig) -> (Vec<String>, Size) {
    let preview: Vec<String> = walk_all(&label.statements)
        .filter_map(|node| node.statement.preview())
        .take(config.max_preview_lines)
        .collect();
    let longest = preview
        .iter()
        .map(|line| line.chars().count())
        .chain(std::iter::once(label.name.chars().count()))
        .max()
        .unwrap_or(0);
    // Bounds may be NaN when set by hand; `clamp` panics on those.
    let width = ((longest + 2) as f32 * config.char_width)
        .max(config.min_node_width)
        .min(config.max_node_width.max(config.min_node_width));
    let height = config.header_height + preview.len() as f32 * config.line_height;
    (preview, Size { width, height })
}

// =============================================================================
// Layout
// =============================================================================

/// Lays out every label in the graph.
///
/// Nodes come back in graph node order.
#[instrument(skip_all, fields(labels = graph.len(), prior = prior.len()))]
pub fn layout_labels(
    symbols: &SymbolTable,
    graph: &LabelGraph,
    prior: &PriorPositions,
    config: &LayoutConfig,
) -> Vec<LabelNode> {
    let mut nodes: Vec<LabelNode> = graph
        .nodes()
        .iter()
        .filter_map(|name| symbols.labels.get(name))
        .map(|label| {
            let (preview, size) = measure_label(label, config);
            LabelNode {
                id: label.name.clone(),
                block_id: label.block_id.clone(),
                position: Position::default(),
                size,
                user_positioned: false,
                preview,
            }
        })
        .collect();

    // Graph node order is (file, line), so blocks come out contiguous and
    // in file order.
    let mut groups: Vec<Vec<usize>> = Vec::new();
    for (idx, node) in nodes.iter().enumerate() {
        match groups.last_mut() {
            Some(group) if nodes[group[0]].block_id == node.block_id => group.push(idx),
            _ => groups.push(vec![idx]),
        }
    }

    let mut cursor_x = config.origin.0;
    for members in &groups {
        let width = place_group(&mut nodes, members, graph, cursor_x, config);
        cursor_x += width + config.group_gap;
    }

    for node in &mut nodes {
        if let Some(position) = prior.get(&node.id) {
            node.position = *position;
            node.user_positioned = true;
        }
    }
    resolve_overlaps(&mut nodes, config);

    debug!(groups = groups.len(), "layout complete");
    nodes
}

/// Places one group starting at `left`, returning the group width.
fn place_group(
    nodes: &mut [LabelNode],
    members: &[usize],
    graph: &LabelGraph,
    left: f32,
    config: &LayoutConfig,
) -> f32 {
    let local: BTreeMap<&str, usize> = members
        .iter()
        .enumerate()
        .map(|(local, &idx)| (nodes[idx].id.as_str(), local))
        .collect();
    let mut edges: Vec<Vec<usize>> = vec![Vec::new(); members.len()];
    for link in graph.links() {
        if let (Some(&from), Some(&to)) = (
            local.get(link.source.as_str()),
            local.get(link.target.as_str()),
        ) {
            edges[from].push(to);
        }
    }

    let forward = drop_back_edges(&edges);
    let layers = longest_path_layers(&forward);

    let mut rows: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for (local_idx, layer) in layers.iter().enumerate() {
        rows.entry(*layer).or_default().push(members[local_idx]);
    }

    let inner_left = left + config.group_padding;
    let mut y = config.origin.1 + config.group_padding;
    let mut widest = 0.0f32;
    for row in rows.values() {
        let mut x = inner_left;
        let mut tallest = 0.0f32;
        for &idx in row {
            nodes[idx].position = Position::new(x, y);
            x += nodes[idx].size.width + config.column_gap;
            tallest = tallest.max(nodes[idx].size.height);
        }
        widest = widest.max(x - config.column_gap - inner_left);
        y += tallest + config.row_gap;
    }
    widest + 2.0 * config.group_padding
}

/// Removes edges that close a cycle, found by an iterative DFS in member
/// order. Self-loops are always removed.
fn drop_back_edges(edges: &[Vec<usize>]) -> Vec<Vec<usize>> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        New,
        Active,
        Done,
    }

    let mut marks = vec![Mark::New; edges.len()];
    let mut forward: Vec<Vec<usize>> = vec![Vec::new(); edges.len()];
    for root in 0..edges.len() {
        if marks[root] != Mark::New {
            continue;
        }
        marks[root] = Mark::Active;
        let mut stack: Vec<(usize, usize)> = vec![(root, 0)];
        while let Some((node, cursor)) = stack.last_mut() {
            let node = *node;
            let Some(&next) = edges[node].get(*cursor) else {
                marks[node] = Mark::Done;
                stack.pop();
                continue;
            };
            *cursor += 1;
            match marks[next] {
                Mark::Active => {}
                Mark::Done => forward[node].push(next),
                Mark::New => {
                    forward[node].push(next);
                    marks[next] = Mark::Active;
                    stack.push((next, 0));
                }
            }
        }
    }
    forward
}

/// Layer index per node: the length of the longest forward path reaching
/// it. Ties are processed in member order.
fn longest_path_layers(forward: &[Vec<usize>]) -> Vec<usize> {
    let mut in_degree = vec![0usize; forward.len()];
    for targets in forward {
        for &target in targets {
            in_degree[target] += 1;
        }
    }
    let mut ready: BTreeSet<usize> = (0..forward.len())
        .filter(|&idx| in_degree[idx] == 0)
        .collect();
    let mut layers = vec![0usize; forward.len()];
    while let Some(node) = ready.pop_first() {
        for &target in &forward[node] {
            layers[target] = layers[target].max(layers[node] + 1);
            in_degree[target] -= 1;
            if in_degree[target] == 0 {
                ready.insert(target);
            }
        }
    }
    layers
}

/// Pushes computed nodes down until they clear every node settled before
/// them. User-positioned nodes are settled from the start and never move.
fn resolve_overlaps(nodes: &mut [LabelNode], config: &LayoutConfig) {
    let mut settled: Vec<Bounds> = nodes
        .iter()
        .filter(|node| node.user_positioned)
        .map(LabelNode::bounds)
        .collect();

    for node in nodes.iter_mut().filter(|node| !node.user_positioned) {
        for _ in 0..config.max_overlap_passes {
            let bounds = node.bounds();
            let Some(blocker) = settled
                .iter()
                .filter(|other| bounds.overlaps(other, config.overlap_tolerance))
                .map(Bounds::bottom)
                .reduce(f32::max)
            else {
                break;
            };
            node.position.y = blocker + config.row_gap;
        }
        settled.push(node.bounds());
    }
}

/// Bounding box of each block's nodes.
pub fn group_bounds(nodes: &[LabelNode]) -> BTreeMap<String, Bounds> {
    let mut bounds: BTreeMap<String, Bounds> = BTreeMap::new();
    for node in nodes {
        bounds
            .entry(node.block_id.clone())
            .and_modify(|group| *group = group.union(&node.bounds()))
            .or_insert_with(|| node.bounds());
    }
    bounds
}

#[cfg(test)]
#[path = "tests/layout_tests.rs"]
mod tests;
