mod common;

use common::{link_pairs, run, sample_project, MAIN_SCRIPT, SIDE_SCRIPT};
use visual_novel_analysis::{
    analyze, AnalysisConfig, AnalysisError, DiagnosticKind, LabelGraph, LinkKind, PriorPositions,
    SymbolTable, VariableKind,
};

fn pair(source: &str, target: &str) -> (String, String) {
    (source.to_string(), target.to_string())
}

#[test]
fn test_fall_through_into_chapter() {
    let result = run(&[(
        "script.rpy",
        "label start:\n    \"It begins.\"\n\nlabel chapter1:\n    \"Chapter one.\"\n    return\n",
    )]);

    assert_eq!(link_pairs(&result), vec![pair("start", "chapter1")]);
    assert_eq!(result.route_links[0].kind, LinkKind::Implicit);
    assert_eq!(result.graph().terminal_labels(), vec!["chapter1"]);
    assert_eq!(result.identified_routes.len(), 1);
    let route = &result.identified_routes[0];
    assert_eq!(route.labels, vec!["start", "chapter1"]);
    assert_eq!(route.link_ids, vec![result.route_links[0].id]);
}

#[test]
fn test_two_label_cycle_terminates() {
    common::init_tracing();
    let result = run(&[("loop.rpy", "label a:\n    jump b\n\nlabel b:\n    jump a\n")]);

    assert_eq!(link_pairs(&result), vec![pair("a", "b"), pair("b", "a")]);
    assert!(result
        .route_links
        .iter()
        .all(|link| link.kind == LinkKind::Explicit));
    assert_eq!(result.identified_routes.len(), 1);
    let route = &result.identified_routes[0];
    assert_eq!(route.labels, vec!["a", "b"]);
    assert!(route.ends_in_cycle);
    assert!(!result.routes_truncated);
}

#[test]
fn test_duplicate_define_keeps_first() {
    let result = run(&[("vars.rpy", "define score = 0\ndefine score = 100\n")]);

    assert_eq!(result.symbols.variables.len(), 1);
    assert_eq!(result.symbols.variables["score"].value, "0");
    assert_eq!(result.diagnostics.count(DiagnosticKind::DuplicateName), 1);
}

#[test]
fn test_last_wins_policy_is_configurable() {
    let config = AnalysisConfig {
        duplicate_policy: visual_novel_analysis::DuplicatePolicy::LastWins,
        ..AnalysisConfig::default()
    };
    let sources = common::project(&[("vars.rpy", "define score = 0\ndefine score = 100\n")]);
    let result = analyze(&sources, &PriorPositions::new(), &config);

    assert_eq!(result.symbols.variables["score"].value, "100");
    assert_eq!(result.diagnostics.count(DiagnosticKind::DuplicateName), 1);
}

#[test]
fn test_add_variable_rejections() {
    let mut table = SymbolTable::default();

    assert!(matches!(
        table.add_variable("1bad", VariableKind::Define, "0"),
        Err(AnalysisError::InvalidName(_))
    ));
    table
        .add_variable("ok_name", VariableKind::Default, "0")
        .expect("first add succeeds");
    assert!(matches!(
        table.add_variable("ok_name", VariableKind::Default, "0"),
        Err(AnalysisError::DuplicateName(_))
    ));
}

#[test]
fn test_every_resolved_jump_is_a_link_and_every_missing_one_a_diagnostic() {
    let source = r#"
label start:
    if flag:
        jump found
    else:
        jump lost
    call found
    jump missing_one

label found:
    return
"#;
    let result = run(&[("script.rpy", source)]);

    let explicit: Vec<_> = result
        .route_links
        .iter()
        .filter(|link| link.kind == LinkKind::Explicit)
        .map(|link| (link.target.as_str(), link.is_call))
        .collect();
    assert_eq!(explicit, vec![("found", false), ("found", true)]);

    let missing: Vec<_> = result
        .diagnostics
        .of_kind(DiagnosticKind::UnresolvedTarget)
        .map(|diagnostic| diagnostic.line)
        .collect();
    assert_eq!(missing, vec![Some(6), Some(8)]);
}

#[test]
fn test_sample_project_tables() {
    let result = analyze(
        &sample_project(),
        &PriorPositions::new(),
        &AnalysisConfig::default(),
    );
    let symbols = &result.symbols;

    assert_eq!(symbols.labels.len(), 5);
    assert_eq!(symbols.labels["side_chat"].block_id, "side.rpy");
    assert_eq!(symbols.character_usage["e"], 3);
    assert_eq!(symbols.character_usage["l"], 2);
    assert_eq!(symbols.characters["e"].color.as_deref(), Some("#c8ffc8"));
    assert_eq!(symbols.variables["affection"].kind, VariableKind::Default);
    assert_eq!(symbols.audio["theme.ogg"], 1);
    assert_eq!(symbols.image_usage["bg school"], 1);
    assert!(symbols.story_block_ids.contains("script.rpy"));
    assert!(symbols.story_block_ids.contains("side.rpy"));
    assert_eq!(symbols.labels["start"].stats.choices, 2);
    assert!(!result.diagnostics.has_errors());
    assert_eq!(result.diagnostics.count(DiagnosticKind::UnparseableLine), 0);
}

#[test]
fn test_sample_project_links_and_routes() {
    let result = analyze(
        &sample_project(),
        &PriorPositions::new(),
        &AnalysisConfig::default(),
    );

    assert_eq!(
        link_pairs(&result),
        vec![
            pair("start", "walk"),
            pair("start", "alone"),
            pair("start", "walk"),
            pair("walk", "side_chat"),
            pair("walk", "ending"),
            pair("alone", "ending"),
        ]
    );
    assert_eq!(result.route_links[2].kind, LinkKind::Implicit);
    assert!(result.route_links[3].is_call);
    assert_eq!(result.entry_labels, vec!["start"]);

    let routes: Vec<Vec<&str>> = result
        .identified_routes
        .iter()
        .map(|route| route.labels.iter().map(String::as_str).collect())
        .collect();
    assert_eq!(
        routes,
        vec![
            vec!["start", "walk", "side_chat"],
            vec!["start", "walk", "ending"],
            vec!["start", "alone", "ending"],
            vec!["start", "walk", "side_chat"],
            vec!["start", "walk", "ending"],
        ]
    );
    assert_eq!(result.identified_routes[3].link_ids, vec![2, 3]);
    assert_eq!(result.diagnostics.count(DiagnosticKind::UnreachableLabel), 0);
}

#[test]
fn test_pipeline_is_deterministic() {
    let first = analyze(
        &sample_project(),
        &PriorPositions::new(),
        &AnalysisConfig::default(),
    );
    let second = analyze(
        &sample_project(),
        &PriorPositions::new(),
        &AnalysisConfig::default(),
    );

    assert_eq!(first.symbols.labels, second.symbols.labels);
    assert_eq!(first.symbols.character_usage, second.symbols.character_usage);
    assert_eq!(first.route_links, second.route_links);
    assert_eq!(first.identified_routes, second.identified_routes);
    assert_eq!(first, second);
}

#[test]
fn test_file_order_does_not_change_result() {
    let forward = run(&[("script.rpy", MAIN_SCRIPT), ("side.rpy", SIDE_SCRIPT)]);
    let reverse = run(&[("side.rpy", SIDE_SCRIPT), ("script.rpy", MAIN_SCRIPT)]);

    assert_eq!(forward, reverse);
}

#[test]
fn test_malformed_project_still_yields_result() {
    let result = run(&[
        ("broken.rpy", "label start\n    jump\n    e \"open\n  \t weird indent\nlabel ok:\n    return\n"),
        ("empty.rpy", ""),
    ]);

    assert!(result.symbols.labels.contains_key("ok"));
    assert!(result.diagnostics.count(DiagnosticKind::UnparseableLine) >= 3);
    let graph: LabelGraph = result.graph();
    assert_eq!(graph.len(), 1);
}

#[test]
fn test_screen_and_python_files_do_not_count_as_story() {
    let screens = r##"
screen preferences():
    tag menu
    vbox:
        style_prefix "radio"
        label _("Display")
        textbutton _("Window") action Preferences("display", "window")
        text "Rollback Side"

init python:
    def slot_name(slot):
        label = "slot %d" % slot
        call(label)
        return label
"##;
    let result = run(&[
        ("screens.rpy", screens),
        ("script.rpy", "define e = Character(\"Eileen\")\n\nlabel start:\n    e \"Hi.\"\n    return\n"),
    ]);
    let symbols = &result.symbols;

    assert_eq!(result.diagnostics.count(DiagnosticKind::UnparseableLine), 0);
    assert_eq!(symbols.speaker_usage.keys().collect::<Vec<_>>(), vec!["e"]);
    assert_eq!(symbols.dialogue_totals.dialogue_lines, 1);
    assert!(symbols.screens.contains_key("preferences"));
    assert!(!symbols.story_block_ids.contains("screens.rpy"));
}

#[test]
fn test_dialogue_spanning_lines_counts_once() {
    let source = "define e = Character(\"Eileen\")\n\nlabel start:\n    e \"first line\n        second line\"\n    return\n";
    let result = run(&[("script.rpy", source)]);

    assert_eq!(result.diagnostics.count(DiagnosticKind::UnparseableLine), 0);
    assert_eq!(result.symbols.character_usage["e"], 1);
    assert_eq!(result.symbols.labels["start"].stats.words, 4);
}
