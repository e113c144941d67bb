//! Project-wide symbol tables.
//!
//! Consumes scanned files and builds the global tables: labels, characters,
//! variables, screens, images, plus usage counters. Re-declarations are
//! diagnostics, never failures; which declaration survives is decided by
//! [`DuplicatePolicy`].
//!
//! # Contracts
//! - **Precondition**: each file is scanned exactly once per build.
//! - **Postcondition**: every key in every table is unique, and
//!   `character_usage` has an entry (possibly zero) for every character.

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::DuplicatePolicy;
use crate::diagnostics::{AnalysisDiagnostic, DiagnosticKind, Diagnostics};
use crate::error::{AnalysisError, AnalysisResult};
use crate::scanner::{
    count_words, is_valid_symbol_name, AudioAction, ScannedFile, Statement, StatementNode,
    VariableKind, VisualAction,
};

// =============================================================================
// Symbols
// =============================================================================

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
pub struct SourceLocation {
    pub file: String,
    pub line: usize,
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// Dialogue counters for a label or a whole project.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct DialogueStats {
    pub dialogue_lines: usize,
    pub narration_lines: usize,
    pub words: usize,
    pub choices: usize,
}

/// A named entry point in the script.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Label {
    pub name: String,
    pub location: SourceLocation,
    /// Block (file) the label groups under.
    pub block_id: String,
    pub params: Option<String>,
    pub statements: Vec<StatementNode>,
    /// The label header that follows this one in the same file.
    pub next_in_file: Option<String>,
    pub stats: DialogueStats,
}

impl Label {
    /// True when the body's last top-level statement is a `jump`, `call`
    /// or `return`. An empty body falls through.
    pub fn ends_in_transfer(&self) -> bool {
        self.statements
            .last()
            .is_some_and(|node| node.statement.is_transfer())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Character {
    pub tag: String,
    pub name: Option<String>,
    pub color: Option<String>,
    pub kind: VariableKind,
    pub location: SourceLocation,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Variable {
    pub name: String,
    pub kind: VariableKind,
    /// Initial value expression, unevaluated.
    pub value: String,
    /// `None` for variables added through [`SymbolTable::add_variable`].
    pub block_id: Option<String>,
    pub location: Option<SourceLocation>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Screen {
    pub name: String,
    pub params: Option<String>,
    pub location: SourceLocation,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ImageDef {
    pub name: String,
    pub value: String,
    pub location: SourceLocation,
}

trait Located {
    fn location(&self) -> Option<&SourceLocation>;
}

macro_rules! located {
    ($($ty:ty),*) => {
        $(impl Located for $ty {
            fn location(&self) -> Option<&SourceLocation> {
                Some(&self.location)
            }
        })*
    };
}

located!(Label, Character, Screen, ImageDef);

impl Located for Variable {
    fn location(&self) -> Option<&SourceLocation> {
        self.location.as_ref()
    }
}

// =============================================================================
// Symbol Table
// =============================================================================

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SymbolTable {
    pub labels: BTreeMap<String, Label>,
    pub characters: BTreeMap<String, Character>,
    pub variables: BTreeMap<String, Variable>,
    pub screens: BTreeMap<String, Screen>,
    pub images: BTreeMap<String, ImageDef>,
    /// Audio asset → number of `play`/`queue` references.
    pub audio: BTreeMap<String, usize>,
    /// Image name → number of `scene`/`show`/`hide` references.
    pub image_usage: BTreeMap<String, usize>,
    pub screen_usage: BTreeMap<String, usize>,
    /// Dialogue lines per defined character tag.
    pub character_usage: BTreeMap<String, usize>,
    /// Dialogue lines per speaker, defined or not.
    pub speaker_usage: BTreeMap<String, usize>,
    /// Blocks that belong to the story flow (define at least one label).
    pub story_block_ids: BTreeSet<String>,
    pub dialogue_totals: DialogueStats,
}

impl SymbolTable {
    /// Adds a variable outside of script scanning.
    ///
    /// Rejects names that fail [`is_valid_symbol_name`] and names already
    /// present. On error the table is unchanged.
    pub fn add_variable(
        &mut self,
        name: &str,
        kind: VariableKind,
        initial_value: &str,
    ) -> AnalysisResult<()> {
        if !is_valid_symbol_name(name) {
            return Err(AnalysisError::InvalidName(name.to_string()));
        }
        if self.variables.contains_key(name) {
            return Err(AnalysisError::DuplicateName(name.to_string()));
        }
        self.variables.insert(
            name.to_string(),
            Variable {
                name: name.to_string(),
                kind,
                value: initial_value.to_string(),
                block_id: None,
                location: None,
            },
        );
        Ok(())
    }

    /// Variables declared in story blocks, for UIs that hide auxiliary ones.
    pub fn story_variables(&self) -> impl Iterator<Item = &Variable> {
        self.variables.values().filter(|var| {
            var.block_id
                .as_ref()
                .map_or(true, |block| self.story_block_ids.contains(block))
        })
    }
}

/// Expands a local label name (`.sub`) against its enclosing global label.
pub fn qualify_label(name: &str, enclosing: Option<&str>) -> String {
    match (name.strip_prefix('.'), enclosing) {
        (Some(local), Some(parent)) => format!("{}.{local}", global_part(parent)),
        (Some(local), None) => local.to_string(),
        (None, _) => name.to_string(),
    }
}

fn global_part(name: &str) -> &str {
    name.split_once('.').map_or(name, |(global, _)| global)
}

// =============================================================================
// Builder
// =============================================================================

pub struct SymbolTableBuilder {
    policy: DuplicatePolicy,
    table: SymbolTable,
    diagnostics: Diagnostics,
}

struct VisitCtx<'a> {
    /// File path, which is also the block id.
    file: &'a str,
    label_stats: Option<&'a mut DialogueStats>,
}

impl SymbolTableBuilder {
    pub fn new(policy: DuplicatePolicy) -> Self {
        Self {
            policy,
            table: SymbolTable::default(),
            diagnostics: Diagnostics::new(),
        }
    }

    /// Adds one scanned file. Files should be added in a stable order.
    pub fn add_file(&mut self, file: &ScannedFile) {
        let block_id = file.path.as_str();
        let mut occurrences: Vec<Label> = Vec::new();
        let mut enclosing: Option<String> = None;

        for root in file.tree() {
            let Statement::Label { name, params } = &root.statement else {
                let mut ctx = VisitCtx {
                    file: block_id,
                    label_stats: None,
                };
                self.visit(std::slice::from_ref(&root), None, &mut ctx);
                continue;
            };

            let full_name = qualify_label(name, enclosing.as_deref());
            if !name.starts_with('.') {
                enclosing = Some(full_name.clone());
            }
            let mut stats = DialogueStats::default();
            {
                let mut ctx = VisitCtx {
                    file: block_id,
                    label_stats: Some(&mut stats),
                };
                self.visit(&root.children, Some(&root.statement), &mut ctx);
            }
            occurrences.push(Label {
                name: full_name,
                location: SourceLocation {
                    file: block_id.to_string(),
                    line: root.line,
                },
                block_id: block_id.to_string(),
                params: params.clone(),
                statements: root.children,
                next_in_file: None,
                stats,
            });
        }

        if !occurrences.is_empty() {
            self.table.story_block_ids.insert(block_id.to_string());
        }
        let next_names: Vec<Option<String>> = occurrences
            .iter()
            .skip(1)
            .map(|label| Some(label.name.clone()))
            .chain(std::iter::once(None))
            .collect();
        debug!(file = block_id, labels = occurrences.len(), "symbols collected");
        for (mut label, next) in occurrences.into_iter().zip(next_names) {
            label.next_in_file = next;
            let name = label.name.clone();
            declare(
                &mut self.table.labels,
                name,
                label,
                "label",
                self.policy,
                &mut self.diagnostics,
            );
        }
    }

    /// Finalizes usage counters and returns the table with its diagnostics.
    pub fn finish(mut self) -> (SymbolTable, Diagnostics) {
        let usage: BTreeMap<String, usize> = self
            .table
            .characters
            .keys()
            .map(|tag| {
                let count = self.table.speaker_usage.get(tag).copied().unwrap_or(0);
                (tag.clone(), count)
            })
            .collect();
        self.table.character_usage = usage;
        (self.table, self.diagnostics)
    }

    fn visit(
        &mut self,
        nodes: &[StatementNode],
        parent: Option<&Statement>,
        ctx: &mut VisitCtx<'_>,
    ) {
        for node in nodes {
            self.visit_statement(node, parent, ctx);
            self.visit(&node.children, Some(&node.statement), ctx);
        }
    }

    fn visit_statement(
        &mut self,
        node: &StatementNode,
        parent: Option<&Statement>,
        ctx: &mut VisitCtx<'_>,
    ) {
        let file = ctx.file;
        let location = || SourceLocation {
            file: file.to_string(),
            line: node.line,
        };
        match &node.statement {
            Statement::Label { name, .. } => {
                self.diagnostics.push(
                    AnalysisDiagnostic::new(
                        DiagnosticKind::UnparseableLine,
                        format!("label '{name}' is nested inside a block and is ignored"),
                    )
                    .at(file, node.line),
                );
            }
            Statement::Choice { .. } => {
                if !matches!(parent, Some(Statement::Menu { .. })) {
                    self.diagnostics.push(
                        AnalysisDiagnostic::new(
                            DiagnosticKind::OrphanChoice,
                            "menu choice outside of a menu block",
                        )
                        .at(file, node.line),
                    );
                }
                self.count(ctx, |stats| stats.choices += 1);
            }
            Statement::Dialogue { speaker, text } => {
                *self.table.speaker_usage.entry(speaker.clone()).or_insert(0) += 1;
                let words = count_words(text);
                self.count(ctx, |stats| {
                    stats.dialogue_lines += 1;
                    stats.words += words;
                });
            }
            Statement::Narration { text } => {
                let words = count_words(text);
                self.count(ctx, |stats| {
                    stats.narration_lines += 1;
                    stats.words += words;
                });
            }
            Statement::Variable { kind, name, value } => {
                if !is_valid_symbol_name(name) {
                    self.diagnostics.push(
                        AnalysisDiagnostic::new(
                            DiagnosticKind::InvalidName,
                            format!("invalid variable name '{name}'"),
                        )
                        .at(file, node.line),
                    );
                    return;
                }
                let variable = Variable {
                    name: name.clone(),
                    kind: *kind,
                    value: value.clone(),
                    block_id: Some(file.to_string()),
                    location: Some(location()),
                };
                declare(
                    &mut self.table.variables,
                    name.clone(),
                    variable,
                    "variable",
                    self.policy,
                    &mut self.diagnostics,
                );
            }
            Statement::Character {
                kind,
                tag,
                name,
                color,
            } => {
                let character = Character {
                    tag: tag.clone(),
                    name: name.clone(),
                    color: color.clone(),
                    kind: *kind,
                    location: location(),
                };
                declare(
                    &mut self.table.characters,
                    tag.clone(),
                    character,
                    "character",
                    self.policy,
                    &mut self.diagnostics,
                );
            }
            Statement::Screen { name, params } => {
                let screen = Screen {
                    name: name.clone(),
                    params: params.clone(),
                    location: location(),
                };
                declare(
                    &mut self.table.screens,
                    name.clone(),
                    screen,
                    "screen",
                    self.policy,
                    &mut self.diagnostics,
                );
            }
            Statement::ScreenRef { name, .. } => {
                *self.table.screen_usage.entry(name.clone()).or_insert(0) += 1;
            }
            Statement::Image { name, value } => {
                let image = ImageDef {
                    name: name.clone(),
                    value: value.clone(),
                    location: location(),
                };
                declare(
                    &mut self.table.images,
                    name.clone(),
                    image,
                    "image",
                    self.policy,
                    &mut self.diagnostics,
                );
            }
            Statement::Audio {
                action: AudioAction::Play | AudioAction::Queue,
                asset: Some(asset),
                ..
            } => {
                *self.table.audio.entry(asset.clone()).or_insert(0) += 1;
            }
            Statement::Visual {
                action: VisualAction::Scene | VisualAction::Show | VisualAction::Hide,
                target,
            } if !target.is_empty() => {
                *self.table.image_usage.entry(target.clone()).or_insert(0) += 1;
            }
            _ => {}
        }
    }

    fn count(&mut self, ctx: &mut VisitCtx<'_>, apply: impl Fn(&mut DialogueStats)) {
        apply(&mut self.table.dialogue_totals);
        if let Some(stats) = ctx.label_stats.as_deref_mut() {
            apply(stats);
        }
    }
}

fn declare<T: Located>(
    map: &mut BTreeMap<String, T>,
    name: String,
    value: T,
    what: &str,
    policy: DuplicatePolicy,
    diagnostics: &mut Diagnostics,
) {
    match map.entry(name) {
        Entry::Vacant(slot) => {
            slot.insert(value);
        }
        Entry::Occupied(mut slot) => {
            let first = slot
                .get()
                .location()
                .map(ToString::to_string)
                .unwrap_or_else(|| "an editor command".to_string());
            let mut diagnostic = AnalysisDiagnostic::new(
                DiagnosticKind::DuplicateName,
                format!("{what} '{}' is already declared at {first}", slot.key()),
            );
            if let Some(at) = value.location() {
                diagnostic = diagnostic.at(&at.file, at.line);
            }
            diagnostics.push(diagnostic);
            if policy == DuplicatePolicy::LastWins {
                slot.insert(value);
            }
        }
    }
}

/// Builds the symbol tables for a set of scanned files.
pub fn build_symbols(files: &[ScannedFile], policy: DuplicatePolicy) -> (SymbolTable, Diagnostics) {
    let mut builder = SymbolTableBuilder::new(policy);
    for file in files {
        builder.add_file(file);
    }
    builder.finish()
}

#[cfg(test)]
#[path = "tests/symbols_tests.rs"]
mod tests;
