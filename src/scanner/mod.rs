//! Line scanner for story scripts.
//!
//! Turns the text of one script file into classified, indentation-aware
//! statements, then nests them into blocks.
//!
//! # Contracts
//! - **Precondition**: none; any text is accepted.
//! - **Postcondition**: every non-blank, non-comment logical line yields
//!   exactly one [`ScannedLine`]. Lines no rule understands are kept as
//!   [`Statement::Opaque`]; lines a rule recognized but could not read are
//!   kept as opaque too and reported in the diagnostics.
//! - **Postcondition**: bodies of `python`, `screen`, `transform`, `style`,
//!   `layeredimage`, `translate` and ATL headers are never rule-matched.

mod helpers;
mod rules;
mod statement;

pub use helpers::{count_words, is_valid_label_name, is_valid_symbol_name};
pub use rules::{classify, RuleOutcome, RULES};
pub use statement::{
    walk_all, AudioAction, BlockKind, ConditionalKind, NodeWalk, ScannedLine, ScreenAction,
    Statement, StatementNode, Target, VariableKind, VisualAction,
};

use crate::diagnostics::{AnalysisDiagnostic, DiagnosticKind, Diagnostics};

/// Blocks nested deeper than this are flattened into their parent.
pub const MAX_BLOCK_DEPTH: usize = 128;

/// Scanner output for one file.
#[derive(Clone, Debug, Default)]
pub struct ScannedFile {
    pub path: String,
    pub lines: Vec<ScannedLine>,
    pub diagnostics: Diagnostics,
}

impl ScannedFile {
    /// Nests the scanned lines into blocks by indentation.
    pub fn tree(&self) -> Vec<StatementNode> {
        build_tree(&self.lines)
    }
}

/// How the lines nested under a header are read.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum BodyMode {
    /// Python source; kept as [`Statement::Python`].
    Python,
    /// Screen language, ATL, styles and translations; kept as
    /// [`Statement::Opaque`].
    Raw,
}

/// Body mode for a header line, or `None` when its body is script.
fn body_mode(statement: &Statement, opens_block: bool) -> Option<BodyMode> {
    match statement {
        Statement::Block {
            kind: BlockKind::Python | BlockKind::InitPython,
        } => Some(BodyMode::Python),
        Statement::Block {
            kind: BlockKind::Init,
        } => None,
        Statement::Block { .. } | Statement::Screen { .. } => Some(BodyMode::Raw),
        Statement::Image { value, .. } if value.is_empty() => Some(BodyMode::Raw),
        Statement::Visual { .. } if opens_block => Some(BodyMode::Raw),
        _ => None,
    }
}

/// Scans one file. Never fails; problems become diagnostics.
///
/// A string literal left open at the end of a line continues on the
/// following lines that are indented deeper than the line it opened on.
/// The pieces are joined with single spaces into one logical line that
/// keeps the first line's number.
pub fn scan_source(path: &str, text: &str) -> ScannedFile {
    let mut lines = Vec::new();
    let mut diagnostics = Diagnostics::new();
    let mut reported_tabs = false;
    // Indent and mode of the header whose body is not script.
    let mut body: Option<(usize, BodyMode)> = None;
    let mut numbered = text.lines().enumerate().peekable();

    while let Some((index, raw)) = numbered.next() {
        let line_no = index + 1;
        let (indent, saw_tab) = helpers::measure_indent(raw);
        let stripped = helpers::strip_comment(raw);
        let code = stripped.code.trim();
        if code.is_empty() {
            continue;
        }
        if saw_tab && !reported_tabs {
            reported_tabs = true;
            diagnostics.push(
                AnalysisDiagnostic::new(
                    DiagnosticKind::TabIndentation,
                    format!("tab used for indentation; counted as {} columns", helpers::TAB_WIDTH),
                )
                .at(path, line_no),
            );
        }

        if let Some((header_indent, mode)) = body {
            if indent > header_indent {
                let statement = match mode {
                    BodyMode::Python => Statement::Python {
                        code: code.to_string(),
                    },
                    BodyMode::Raw => Statement::Opaque {
                        text: code.to_string(),
                    },
                };
                lines.push(ScannedLine {
                    line: line_no,
                    indent,
                    statement,
                });
                continue;
            }
            body = None;
        }

        let mut logical = code.to_string();
        let mut unterminated = stripped.unterminated;
        while unterminated {
            let Some(&(_, next)) = numbered.peek() else {
                break;
            };
            let next_code = next.trim();
            if !next_code.is_empty() && helpers::measure_indent(next).0 <= indent {
                break;
            }
            numbered.next();
            if next_code.is_empty() {
                continue;
            }
            logical.push(' ');
            logical.push_str(next_code);
            let joined = helpers::strip_comment(&logical);
            if !joined.unterminated {
                logical = joined.code.trim().to_string();
                unterminated = false;
            }
        }

        let opens_block = logical.ends_with(':');
        let statement = if unterminated {
            diagnostics.push(
                AnalysisDiagnostic::new(
                    DiagnosticKind::UnparseableLine,
                    "unterminated string literal",
                )
                .at(path, line_no),
            );
            Statement::Opaque { text: logical }
        } else {
            match rules::classify(&logical) {
                RuleOutcome::Match(statement) => statement,
                RuleOutcome::Malformed(reason) => {
                    diagnostics.push(
                        AnalysisDiagnostic::new(DiagnosticKind::UnparseableLine, reason)
                            .at(path, line_no),
                    );
                    Statement::Opaque { text: logical }
                }
                RuleOutcome::NoMatch => Statement::Opaque { text: logical },
            }
        };

        body = body_mode(&statement, opens_block).map(|mode| (indent, mode));
        lines.push(ScannedLine {
            line: line_no,
            indent,
            statement,
        });
    }

    ScannedFile {
        path: path.to_string(),
        lines,
        diagnostics,
    }
}

/// Nests lines into a forest: a line belongs to the nearest preceding line
/// with a smaller indent. A dedent closes every block indented deeper than
/// the new line.
pub fn build_tree(lines: &[ScannedLine]) -> Vec<StatementNode> {
    let mut roots: Vec<StatementNode> = Vec::new();
    let mut open: Vec<StatementNode> = Vec::new();

    for line in lines {
        while open.last().is_some_and(|top| top.indent >= line.indent) {
            close_top(&mut open, &mut roots);
        }
        if open.len() >= MAX_BLOCK_DEPTH {
            close_top(&mut open, &mut roots);
        }
        open.push(StatementNode::leaf(line));
    }
    while !open.is_empty() {
        close_top(&mut open, &mut roots);
    }
    roots
}

fn close_top(open: &mut Vec<StatementNode>, roots: &mut Vec<StatementNode>) {
    let Some(done) = open.pop() else {
        return;
    };
    match open.last_mut() {
        Some(parent) => parent.children.push(done),
        None => roots.push(done),
    }
}

#[cfg(test)]
#[path = "tests/scanner_tests.rs"]
mod tests;
