//! Ordered line classification rules.
//!
//! Each rule looks at one trimmed, comment-free line. Rules run top to
//! bottom and the first one that does not return [`RuleOutcome::NoMatch`]
//! decides the statement. A rule that recognizes its keyword but cannot
//! read the rest reports [`RuleOutcome::Malformed`]; the scanner keeps the
//! line as opaque and records a diagnostic.

use tracing::trace;

use super::helpers::{
    first_positional_string, is_ident_char, is_valid_label_name, keyword_string_arg,
    parse_string_literal, split_assignment, split_identifier, split_params, strip_keyword,
};
use super::statement::{
    AudioAction, BlockKind, ConditionalKind, ScreenAction, Statement, Target, VariableKind,
    VisualAction,
};

#[derive(Debug, PartialEq, Eq)]
pub enum RuleOutcome {
    Match(Statement),
    Malformed(String),
    NoMatch,
}

pub type Rule = fn(&str) -> RuleOutcome;

/// Rules in evaluation order.
pub const RULES: &[(&str, Rule)] = &[
    ("label", label_rule),
    ("jump", jump_rule),
    ("call", call_rule),
    ("return", return_rule),
    ("pass", pass_rule),
    ("conditional", conditional_rule),
    ("menu", menu_rule),
    ("declaration", declaration_rule),
    ("screen", screen_rule),
    ("image", image_rule),
    ("audio", audio_rule),
    ("screen_ref", screen_ref_rule),
    ("visual", visual_rule),
    ("block", block_rule),
    ("python", python_rule),
    ("choice", choice_rule),
    ("narration", narration_rule),
    ("dialogue", dialogue_rule),
];

/// Classifies one line. Unrecognized lines come back as opaque matches.
pub fn classify(line: &str) -> RuleOutcome {
    for (name, rule) in RULES {
        match rule(line) {
            RuleOutcome::NoMatch => continue,
            outcome => {
                trace!(rule = *name, "line classified");
                return outcome;
            }
        }
    }
    RuleOutcome::Match(Statement::Opaque {
        text: line.to_string(),
    })
}

/// Words that start statements and therefore never name a speaker.
const RESERVED: &[&str] = &[
    "label", "jump", "call", "return", "pass", "if", "elif", "else", "while", "menu", "define",
    "default", "screen", "image", "play", "queue", "stop", "scene", "show", "hide", "with",
    "init", "python", "transform", "style", "translate", "voice", "window", "nvl", "pause",
    "camera", "layeredimage", "testcase", "extend",
];

fn strip_block_colon(rest: &str) -> Option<&str> {
    rest.strip_suffix(':').map(str::trim_end)
}

fn label_rule(line: &str) -> RuleOutcome {
    let Some(rest) = strip_keyword(line, "label") else {
        return RuleOutcome::NoMatch;
    };
    let Some(header) = strip_block_colon(rest) else {
        return RuleOutcome::Malformed("label header is missing its ':'".to_string());
    };
    let header = header.strip_suffix(" hide").unwrap_or(header).trim_end();
    let (name, params) = split_params(header);
    if !is_valid_label_name(name) {
        return RuleOutcome::Malformed(format!("invalid label name '{name}'"));
    }
    RuleOutcome::Match(Statement::Label {
        name: name.to_string(),
        params: params.map(str::to_string),
    })
}

fn parse_target(rest: &str) -> Result<(Target, &str), String> {
    if let Some(expr) = strip_keyword(rest, "expression") {
        if expr.is_empty() {
            return Err("missing target expression".to_string());
        }
        return Ok((Target::Expression(expr.to_string()), ""));
    }
    let Some((name, tail)) = split_identifier(rest) else {
        return Err("missing target label".to_string());
    };
    if !is_valid_label_name(name) {
        return Err(format!("invalid target label '{name}'"));
    }
    Ok((Target::Named(name.to_string()), tail))
}

fn jump_rule(line: &str) -> RuleOutcome {
    let Some(rest) = strip_keyword(line, "jump") else {
        return RuleOutcome::NoMatch;
    };
    match parse_target(rest) {
        Ok((target, tail)) if tail.trim().is_empty() => {
            RuleOutcome::Match(Statement::Jump { target })
        }
        Ok((_, tail)) => RuleOutcome::Malformed(format!(
            "unexpected text after jump target: '{}'",
            tail.trim()
        )),
        Err(reason) => RuleOutcome::Malformed(reason),
    }
}

fn call_rule(line: &str) -> RuleOutcome {
    let Some(rest) = strip_keyword(line, "call") else {
        return RuleOutcome::NoMatch;
    };
    if strip_keyword(rest, "screen").is_some() {
        return RuleOutcome::NoMatch;
    }
    let (rest, from) = match rest.rfind(" from ") {
        Some(pos) => (rest[..pos].trim(), Some(rest[pos + 6..].trim().to_string())),
        None => (rest, None),
    };
    match parse_target(rest) {
        Ok((target, tail)) => {
            let tail = tail.trim();
            let args_ok = tail.is_empty()
                || (tail.starts_with('(') && tail.ends_with(')'))
                || strip_keyword(tail, "pass").is_some();
            if !args_ok {
                return RuleOutcome::Malformed(format!(
                    "unexpected text after call target: '{tail}'"
                ));
            }
            RuleOutcome::Match(Statement::Call { target, from })
        }
        Err(reason) => RuleOutcome::Malformed(reason),
    }
}

fn return_rule(line: &str) -> RuleOutcome {
    match strip_keyword(line, "return") {
        Some(_) => RuleOutcome::Match(Statement::Return),
        None => RuleOutcome::NoMatch,
    }
}

fn pass_rule(line: &str) -> RuleOutcome {
    if line == "pass" {
        RuleOutcome::Match(Statement::Pass)
    } else {
        RuleOutcome::NoMatch
    }
}

fn conditional_rule(line: &str) -> RuleOutcome {
    let keywords = [
        ("if", ConditionalKind::If),
        ("elif", ConditionalKind::Elif),
        ("else", ConditionalKind::Else),
        ("while", ConditionalKind::While),
    ];
    for (keyword, kind) in keywords {
        let Some(rest) = strip_keyword(line, keyword) else {
            continue;
        };
        let Some(condition) = strip_block_colon(rest) else {
            return RuleOutcome::Malformed(format!("'{keyword}' is missing its ':'"));
        };
        let condition = match kind {
            ConditionalKind::Else if !condition.is_empty() => {
                return RuleOutcome::Malformed("'else' takes no condition".to_string())
            }
            ConditionalKind::Else => None,
            _ if condition.is_empty() => {
                return RuleOutcome::Malformed(format!("'{keyword}' is missing its condition"))
            }
            _ => Some(condition.to_string()),
        };
        return RuleOutcome::Match(Statement::Conditional { kind, condition });
    }
    RuleOutcome::NoMatch
}

fn menu_rule(line: &str) -> RuleOutcome {
    let Some(rest) = strip_keyword(line, "menu") else {
        return RuleOutcome::NoMatch;
    };
    let Some(header) = strip_block_colon(rest) else {
        return RuleOutcome::Malformed("menu is missing its ':'".to_string());
    };
    let (name, _) = split_params(header);
    let name = (!name.is_empty()).then(|| name.to_string());
    RuleOutcome::Match(Statement::Menu { name })
}

fn declaration_rule(line: &str) -> RuleOutcome {
    let (kind, rest) = if let Some(rest) = strip_keyword(line, "define") {
        (VariableKind::Define, rest)
    } else if let Some(rest) = strip_keyword(line, "default") {
        (VariableKind::Default, rest)
    } else {
        return RuleOutcome::NoMatch;
    };
    // Optional init priority: `define -2 name = value`.
    let rest = match rest.split_once(char::is_whitespace) {
        Some((priority, tail)) if priority.parse::<i32>().is_ok() => tail.trim_start(),
        _ => rest,
    };
    let Some((name, value)) = split_assignment(rest) else {
        return RuleOutcome::Malformed(format!("'{}' is missing '='", kind.keyword()));
    };
    if name.ends_with(['+', '-', '*', '/', '|', '&']) {
        // Augmented assignment on an existing name; not a declaration.
        return RuleOutcome::Match(Statement::Opaque {
            text: line.to_string(),
        });
    }
    for constructor in ["Character", "DynamicCharacter"] {
        if let Some(call) = value.strip_prefix(constructor) {
            if call.trim_start().starts_with('(') {
                let (_, args) = split_params(call);
                let args = args.unwrap_or_default();
                return RuleOutcome::Match(Statement::Character {
                    kind,
                    tag: name.to_string(),
                    name: first_positional_string(args),
                    color: keyword_string_arg(args, "color"),
                });
            }
        }
    }
    RuleOutcome::Match(Statement::Variable {
        kind,
        name: name.to_string(),
        value: value.to_string(),
    })
}

fn screen_rule(line: &str) -> RuleOutcome {
    let Some(rest) = strip_keyword(line, "screen") else {
        return RuleOutcome::NoMatch;
    };
    let Some(header) = strip_block_colon(rest) else {
        return RuleOutcome::Malformed("screen is missing its ':'".to_string());
    };
    let (name, params) = split_params(header);
    if split_identifier(name).map(|(ident, tail)| (ident, tail.is_empty())) != Some((name, true)) {
        return RuleOutcome::Malformed(format!("invalid screen name '{name}'"));
    }
    RuleOutcome::Match(Statement::Screen {
        name: name.to_string(),
        params: params.map(str::to_string),
    })
}

fn image_rule(line: &str) -> RuleOutcome {
    let Some(rest) = strip_keyword(line, "image") else {
        return RuleOutcome::NoMatch;
    };
    let (name, value) = match split_assignment(rest) {
        Some((name, value)) => (name, value),
        None => match strip_block_colon(rest) {
            Some(name) => (name, ""),
            None => return RuleOutcome::Malformed("image is missing '=' or ':'".to_string()),
        },
    };
    let name = name.split_whitespace().collect::<Vec<_>>().join(" ");
    if name.is_empty() {
        return RuleOutcome::Malformed("image is missing its name".to_string());
    }
    RuleOutcome::Match(Statement::Image {
        name,
        value: value.to_string(),
    })
}

fn audio_rule(line: &str) -> RuleOutcome {
    let actions = [
        ("play", AudioAction::Play),
        ("queue", AudioAction::Queue),
        ("stop", AudioAction::Stop),
    ];
    for (keyword, action) in actions {
        let Some(rest) = strip_keyword(line, keyword) else {
            continue;
        };
        let Some((channel, tail)) = split_identifier(rest) else {
            return RuleOutcome::Malformed(format!("'{keyword}' is missing its channel"));
        };
        let asset = match action {
            AudioAction::Stop => None,
            _ => {
                let tail = tail.trim_start();
                match parse_string_literal(tail) {
                    Some((asset, _)) => Some(asset),
                    None => tail
                        .split_whitespace()
                        .next()
                        .filter(|word| !word.is_empty())
                        .map(str::to_string),
                }
            }
        };
        return RuleOutcome::Match(Statement::Audio {
            action,
            channel: channel.to_string(),
            asset,
        });
    }
    RuleOutcome::NoMatch
}

fn screen_ref_rule(line: &str) -> RuleOutcome {
    let actions = [
        ("show", ScreenAction::Show),
        ("call", ScreenAction::Call),
        ("hide", ScreenAction::Hide),
    ];
    for (keyword, action) in actions {
        let Some(rest) =
            strip_keyword(line, keyword).and_then(|rest| strip_keyword(rest, "screen"))
        else {
            continue;
        };
        let Some((name, _)) = split_identifier(rest) else {
            return RuleOutcome::Malformed(format!("'{keyword} screen' is missing its name"));
        };
        return RuleOutcome::Match(Statement::ScreenRef {
            action,
            name: name.to_string(),
        });
    }
    RuleOutcome::NoMatch
}

/// Clauses that end the image name in `scene`/`show`/`hide`.
const IMAGE_CLAUSES: &[&str] = &["at", "with", "as", "behind", "onlayer", "zorder", "expression"];

fn visual_rule(line: &str) -> RuleOutcome {
    let actions = [
        ("scene", VisualAction::Scene),
        ("show", VisualAction::Show),
        ("hide", VisualAction::Hide),
        ("with", VisualAction::With),
    ];
    for (keyword, action) in actions {
        let Some(rest) = strip_keyword(line, keyword) else {
            continue;
        };
        if rest.ends_with(':') {
            // ATL block attached to the statement.
            let rest = rest.trim_end_matches(':').trim_end();
            return RuleOutcome::Match(Statement::Visual {
                action,
                target: image_words(rest),
            });
        }
        if action == VisualAction::With {
            if rest.is_empty() {
                return RuleOutcome::Malformed("'with' is missing its transition".to_string());
            }
            return RuleOutcome::Match(Statement::Visual {
                action,
                target: rest.to_string(),
            });
        }
        if rest.is_empty() && action != VisualAction::Scene {
            return RuleOutcome::Malformed(format!("'{keyword}' is missing its image"));
        }
        return RuleOutcome::Match(Statement::Visual {
            action,
            target: image_words(rest),
        });
    }
    RuleOutcome::NoMatch
}

fn image_words(rest: &str) -> String {
    rest.split_whitespace()
        .take_while(|word| !IMAGE_CLAUSES.contains(word))
        .collect::<Vec<_>>()
        .join(" ")
}

fn block_rule(line: &str) -> RuleOutcome {
    let Some(header) = strip_block_colon(line) else {
        return RuleOutcome::NoMatch;
    };
    let mut words = header.split_whitespace();
    let kind = match words.next() {
        Some("init") => {
            let rest: Vec<&str> = words.filter(|w| w.parse::<i32>().is_err()).collect();
            match rest.first() {
                None => BlockKind::Init,
                Some(&"python") => BlockKind::InitPython,
                Some(_) => return RuleOutcome::NoMatch,
            }
        }
        Some("python") => BlockKind::Python,
        Some("transform") => BlockKind::Transform,
        Some("style") => BlockKind::Style,
        Some("layeredimage") => BlockKind::LayeredImage,
        Some("translate") => BlockKind::Translate,
        _ => return RuleOutcome::NoMatch,
    };
    RuleOutcome::Match(Statement::Block { kind })
}

fn python_rule(line: &str) -> RuleOutcome {
    let Some(code) = line.strip_prefix('$') else {
        return RuleOutcome::NoMatch;
    };
    RuleOutcome::Match(Statement::Python {
        code: code.trim().to_string(),
    })
}

fn choice_rule(line: &str) -> RuleOutcome {
    let Some(body) = strip_block_colon(line) else {
        return RuleOutcome::NoMatch;
    };
    let Some((text, rest)) = parse_string_literal(body) else {
        return RuleOutcome::NoMatch;
    };
    let rest = rest.trim();
    let guard = if rest.is_empty() {
        None
    } else if let Some(cond) = strip_keyword(rest, "if") {
        if cond.is_empty() {
            return RuleOutcome::Malformed("choice guard is missing its condition".to_string());
        }
        Some(cond.to_string())
    } else {
        // `"text" (args):` and similar; keep the choice, drop the extras.
        None
    };
    RuleOutcome::Match(Statement::Choice { text, guard })
}

fn narration_rule(line: &str) -> RuleOutcome {
    let Some((text, rest)) = parse_string_literal(line) else {
        return RuleOutcome::NoMatch;
    };
    // `"Speaker" "text"` is dialogue with a literal speaker name.
    if let Some((said, _)) = parse_string_literal(rest) {
        return RuleOutcome::Match(Statement::Dialogue {
            speaker: text,
            text: said,
        });
    }
    RuleOutcome::Match(Statement::Narration { text })
}

fn dialogue_rule(line: &str) -> RuleOutcome {
    let Some((speaker, rest)) = split_identifier(line) else {
        return RuleOutcome::NoMatch;
    };
    if RESERVED.contains(&speaker) || !rest.starts_with(char::is_whitespace) {
        return RuleOutcome::NoMatch;
    }
    // Image attributes may sit between speaker and text: `e happy "..."`.
    let mut rest = rest.trim_start();
    loop {
        if let Some((text, _)) = parse_string_literal(rest) {
            return RuleOutcome::Match(Statement::Dialogue {
                speaker: speaker.to_string(),
                text,
            });
        }
        let attr = rest.strip_prefix('-').unwrap_or(rest);
        let end = attr
            .char_indices()
            .find(|(_, ch)| !is_ident_char(*ch))
            .map(|(idx, _)| idx)
            .unwrap_or(attr.len());
        if end == 0 {
            return RuleOutcome::NoMatch;
        }
        let tail = &attr[end..];
        if !tail.starts_with(char::is_whitespace) {
            return RuleOutcome::NoMatch;
        }
        rest = tail.trim_start();
    }
}
