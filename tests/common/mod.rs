#![allow(dead_code)]

use visual_novel_analysis::{
    analyze, AnalysisConfig, PriorPositions, ProjectSources, ScriptAnalysis,
};

/// A small two-file story with a branch, a rejoin and a side chapter.
pub const MAIN_SCRIPT: &str = r##"
define e = Character("Eileen", color="#c8ffc8")
define l = Character("Lucy")
default affection = 0

label start:
    scene bg school
    play music "theme.ogg"
    e "Good morning."
    menu:
        "Walk with Eileen":
            $ affection += 1
            jump walk
        "Walk alone":
            jump alone

label walk:
    e "Nice weather."
    l "Hey, wait up!"
    call side_chat
    jump ending

label alone:
    "You walk alone."

label ending:
    "The day ends."
    return
"##;

pub const SIDE_SCRIPT: &str = r#"
label side_chat:
    l "Did you hear?"
    e "No, what?"
    return
"#;

pub fn project(files: &[(&str, &str)]) -> ProjectSources {
    files.iter().copied().collect()
}

pub fn sample_project() -> ProjectSources {
    project(&[("script.rpy", MAIN_SCRIPT), ("side.rpy", SIDE_SCRIPT)])
}

/// Runs the pipeline with default configuration and no prior positions.
pub fn run(files: &[(&str, &str)]) -> ScriptAnalysis {
    analyze(&project(files), &PriorPositions::new(), &AnalysisConfig::default())
}

/// `(source, target)` pairs of every link, in link order.
pub fn link_pairs(result: &ScriptAnalysis) -> Vec<(String, String)> {
    result
        .route_links
        .iter()
        .map(|link| (link.source.clone(), link.target.clone()))
        .collect()
}

/// Installs a fmt subscriber so pipeline logs show up in test output.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}
