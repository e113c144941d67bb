use super::*;
use crate::config::DuplicatePolicy;
use crate::scanner::scan_source;
use crate::symbols::build_symbols;

fn layout(files: &[(&str, &str)], prior: &PriorPositions) -> Vec<LabelNode> {
    let scanned: Vec<_> = files
        .iter()
        .map(|(path, text)| scan_source(path, text))
        .collect();
    let (symbols, _) = build_symbols(&scanned, DuplicatePolicy::FirstWins);
    let (graph, _) = LabelGraph::build(&symbols);
    layout_labels(&symbols, &graph, prior, &LayoutConfig::default())
}

fn node<'a>(nodes: &'a [LabelNode], id: &str) -> &'a LabelNode {
    nodes.iter().find(|node| node.id == id).expect("node")
}

const FLOW: &str = r#"
label start:
    e "Where to?"
    menu:
        "Left":
            jump left
        "Right":
            jump right

label left:
    jump finale

label right:
    jump finale

label finale:
    "The end."
    return
"#;

#[test]
fn test_successors_are_layered_below_predecessors() {
    let nodes = layout(&[("story.rpy", FLOW)], &PriorPositions::new());

    let start = node(&nodes, "start");
    let left = node(&nodes, "left");
    let right = node(&nodes, "right");
    let finale = node(&nodes, "finale");
    assert!(start.position.y < left.position.y);
    assert_eq!(left.position.y, right.position.y);
    assert!(left.position.x < right.position.x);
    assert!(right.position.y < finale.position.y);
}

#[test]
fn test_no_overlap_within_layout() {
    let nodes = layout(&[("story.rpy", FLOW)], &PriorPositions::new());

    for (i, a) in nodes.iter().enumerate() {
        for b in &nodes[i + 1..] {
            assert!(!a.bounds().overlaps(&b.bounds(), 0.5), "{} / {}", a.id, b.id);
        }
    }
}

#[test]
fn test_groups_do_not_overlap() {
    let nodes = layout(
        &[
            ("a.rpy", FLOW),
            ("b.rpy", "label side:\n    \"A very long line of narration for the side story.\"\n"),
            ("c.rpy", "label extra:\n    return\n"),
        ],
        &PriorPositions::new(),
    );
    let groups = group_bounds(&nodes);

    assert_eq!(groups.len(), 3);
    let boxes: Vec<&Bounds> = groups.values().collect();
    for (i, a) in boxes.iter().enumerate() {
        for b in &boxes[i + 1..] {
            assert!(!a.overlaps(b, 0.0));
        }
    }
    assert!(groups["a.rpy"].right() < groups["b.rpy"].x);
}

#[test]
fn test_prior_positions_are_kept() {
    let mut prior = PriorPositions::new();
    prior.insert("finale".into(), Position::new(900.0, 15.0));
    let nodes = layout(&[("story.rpy", FLOW)], &prior);

    let finale = node(&nodes, "finale");
    assert_eq!(finale.position, Position::new(900.0, 15.0));
    assert!(finale.user_positioned);
    assert!(!node(&nodes, "start").user_positioned);
}

#[test]
fn test_new_nodes_move_off_user_placed_nodes() {
    let config = LayoutConfig::default();
    let first = layout(&[("story.rpy", FLOW)], &PriorPositions::new());
    let start_spot = node(&first, "start").position;

    // Drop "finale" right where "start" would be computed.
    let mut prior = PriorPositions::new();
    prior.insert("finale".into(), start_spot);
    let nodes = layout(&[("story.rpy", FLOW)], &prior);

    let finale = node(&nodes, "finale");
    let start = node(&nodes, "start");
    assert_eq!(finale.position, start_spot);
    assert!(!start
        .bounds()
        .overlaps(&finale.bounds(), config.overlap_tolerance));
    assert!(start.position.y > finale.position.y);
}

#[test]
fn test_cycle_layout_terminates() {
    let source = "label a:\n    jump b\nlabel b:\n    jump a\nlabel c:\n    jump c\n";
    let nodes = layout(&[("loop.rpy", source)], &PriorPositions::new());

    assert_eq!(nodes.len(), 3);
    assert!(node(&nodes, "a").position.y < node(&nodes, "b").position.y);
}

#[test]
fn test_measure_clamps_width_and_counts_preview_lines() {
    let config = LayoutConfig::default();
    let long = format!("label start:\n    \"{}\"\n", "x".repeat(500));
    let scanned = scan_source("m.rpy", &long);
    let (symbols, _) = build_symbols(&[scanned], DuplicatePolicy::FirstWins);
    let (preview, size) = measure_label(&symbols.labels["start"], &config);

    assert_eq!(preview.len(), 1);
    assert_eq!(size.width, config.max_node_width);
    assert_eq!(size.height, config.header_height + config.line_height);

    let scanned = scan_source("m.rpy", "label s:\n    pass\n");
    let (symbols, _) = build_symbols(&[scanned], DuplicatePolicy::FirstWins);
    let (preview, size) = measure_label(&symbols.labels["s"], &config);
    assert!(preview.is_empty());
    assert_eq!(size.width, config.min_node_width);
}

#[test]
fn test_measure_tolerates_nan_width_bounds() {
    let config = LayoutConfig {
        min_node_width: f32::NAN,
        ..LayoutConfig::default()
    };
    let scanned = scan_source("m.rpy", "label s:\n    pass\n");
    let (symbols, _) = build_symbols(&[scanned], DuplicatePolicy::FirstWins);
    let (_, size) = measure_label(&symbols.labels["s"], &config);

    assert_eq!(size.width, 3.0 * config.char_width);
}

#[test]
fn test_layout_is_deterministic() {
    let a = layout(&[("story.rpy", FLOW)], &PriorPositions::new());
    let b = layout(&[("story.rpy", FLOW)], &PriorPositions::new());
    assert_eq!(a, b);
}
