use super::*;

const SAMPLE: &str = r##"
# Opening chapter
define e = Character("Eileen", color="#c8ffc8")

label start:
    scene bg room
    e "Welcome back."   # greeting
    menu:
        "Stay":
            jump stay
        "Leave" if door_open:
            e "Bye."
    "The night went on."

label stay:
    return
"##;

#[test]
fn test_scan_skips_blanks_and_comments() {
    let scanned = scan_source("script.rpy", SAMPLE);

    assert!(scanned.diagnostics.is_empty());
    assert_eq!(scanned.lines.len(), 12);
    assert_eq!(scanned.lines[0].line, 3);
    assert!(matches!(
        scanned.lines[0].statement,
        Statement::Character { .. }
    ));
    assert_eq!(scanned.lines[2].indent, 4);
}

#[test]
fn test_tree_nests_by_indentation() {
    let scanned = scan_source("script.rpy", SAMPLE);
    let tree = scanned.tree();

    // define, label start, label stay
    assert_eq!(tree.len(), 3);
    let start = &tree[1];
    assert_eq!(
        start.statement,
        Statement::Label {
            name: "start".into(),
            params: None
        }
    );
    assert_eq!(start.children.len(), 4);

    let menu = &start.children[2];
    assert_eq!(menu.statement, Statement::Menu { name: None });
    assert_eq!(menu.children.len(), 2);
    assert_eq!(
        menu.children[0].children[0].statement,
        Statement::Jump {
            target: Target::Named("stay".into())
        }
    );
    assert_eq!(
        menu.children[1].statement,
        Statement::Choice {
            text: "Leave".into(),
            guard: Some("door_open".into())
        }
    );
}

#[test]
fn test_dedent_closes_deeper_blocks() {
    let source = "label a:\n    if x:\n        if y:\n            jump b\n    return\n";
    let tree = scan_source("a.rpy", source).tree();

    assert_eq!(tree.len(), 1);
    let body = &tree[0].children;
    assert_eq!(body.len(), 2);
    assert_eq!(body[1].statement, Statement::Return);
    assert_eq!(body[0].children[0].children.len(), 1);
}

#[test]
fn test_malformed_lines_are_kept_and_reported() {
    let source = "label start\n    e \"unterminated\n    jump\n    window hide\n";
    let scanned = scan_source("broken.rpy", source);

    assert_eq!(scanned.lines.len(), 4);
    assert!(scanned
        .lines
        .iter()
        .all(|line| matches!(line.statement, Statement::Opaque { .. })));
    assert_eq!(
        scanned
            .diagnostics
            .count(crate::diagnostics::DiagnosticKind::UnparseableLine),
        3
    );
    let lines: Vec<_> = scanned
        .diagnostics
        .iter()
        .map(|d| (d.file.as_deref(), d.line))
        .collect();
    assert_eq!(
        lines,
        vec![
            (Some("broken.rpy"), Some(1)),
            (Some("broken.rpy"), Some(2)),
            (Some("broken.rpy"), Some(3))
        ]
    );
}

#[test]
fn test_tab_indentation_reported_once() {
    let source = "label start:\n\te \"one\"\n\te \"two\"\n";
    let scanned = scan_source("tabs.rpy", source);

    assert_eq!(
        scanned
            .diagnostics
            .count(crate::diagnostics::DiagnosticKind::TabIndentation),
        1
    );
    assert_eq!(scanned.lines[1].indent, 4);
}

#[test]
fn test_deep_nesting_is_flattened() {
    let mut source = String::from("label deep:\n");
    for depth in 1..=(MAX_BLOCK_DEPTH + 50) {
        source.push_str(&" ".repeat(depth));
        source.push_str("if x:\n");
    }
    let tree = scan_source("deep.rpy", &source).tree();

    let mut depth = 0;
    let mut node = &tree[0];
    while let Some(child) = node.children.last() {
        node = child;
        depth += 1;
    }
    assert!(depth < MAX_BLOCK_DEPTH);
    assert_eq!(tree[0].walk().count(), MAX_BLOCK_DEPTH + 51);
}

#[test]
fn test_walk_is_preorder() {
    let tree = scan_source("script.rpy", SAMPLE).tree();
    let lines: Vec<usize> = tree[1].walk().map(|node| node.line).collect();
    assert_eq!(lines, vec![5, 6, 7, 8, 9, 10, 11, 12, 13]);
}

const SCREENS: &str = r##"
screen preferences():
    tag menu
    vbox:
        style_prefix "radio"
        label _("Display")
        textbutton _("Window") action Preferences("display", "window")
        text "Rollback Side"

init python:
    def label_for(slot):
        label = "slot %d" % slot
        call(label)
        return label

transform slide_in:
    xalign 0.0
    linear 0.5 xalign 0.5

label start:
    e "Hello."
"##;

#[test]
fn test_screen_and_python_bodies_are_not_rule_matched() {
    let scanned = scan_source("screens.rpy", SCREENS);

    assert!(scanned.diagnostics.is_empty());
    let dialogue: Vec<usize> = scanned
        .lines
        .iter()
        .filter(|line| matches!(line.statement, Statement::Dialogue { .. }))
        .map(|line| line.line)
        .collect();
    assert_eq!(dialogue, vec![21]);

    let python: Vec<&str> = scanned
        .lines
        .iter()
        .filter_map(|line| match &line.statement {
            Statement::Python { code } => Some(code.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(
        python,
        vec![
            "def label_for(slot):",
            "label = \"slot %d\" % slot",
            "call(label)",
            "return label"
        ]
    );

    let tree = scanned.tree();
    assert_eq!(tree.len(), 4);
    assert!(tree[0].walk().skip(1).all(|node| matches!(node.statement, Statement::Opaque { .. })));
    assert_eq!(
        tree[2].statement,
        Statement::Block {
            kind: BlockKind::Transform
        }
    );
    assert_eq!(tree[3].children.len(), 1);
}

#[test]
fn test_init_block_body_is_still_script() {
    let source = "init:\n    define e = Character(\"Eileen\")\n    image bg park = \"park.png\"\n";
    let scanned = scan_source("init.rpy", source);

    assert!(matches!(scanned.lines[1].statement, Statement::Character { .. }));
    assert!(matches!(scanned.lines[2].statement, Statement::Image { .. }));
}

#[test]
fn test_string_continues_on_deeper_lines() {
    let source = "label start:\n    e \"first line\n        second line\"\n    return\n";
    let scanned = scan_source("script.rpy", source);

    assert!(scanned.diagnostics.is_empty());
    assert_eq!(scanned.lines.len(), 3);
    assert_eq!(scanned.lines[1].line, 2);
    assert_eq!(
        scanned.lines[1].statement,
        Statement::Dialogue {
            speaker: "e".into(),
            text: "first line second line".into()
        }
    );
    assert_eq!(scanned.lines[2].statement, Statement::Return);
}

#[test]
fn test_unclosed_string_stops_at_dedent() {
    let source = "label start:\n    e \"never closed\n        still inside\n    return\n";
    let scanned = scan_source("script.rpy", source);

    assert_eq!(
        scanned
            .diagnostics
            .count(crate::diagnostics::DiagnosticKind::UnparseableLine),
        1
    );
    assert_eq!(scanned.diagnostics.iter().next().and_then(|d| d.line), Some(2));
    assert_eq!(scanned.lines.len(), 3);
    assert_eq!(scanned.lines[2].statement, Statement::Return);
}
