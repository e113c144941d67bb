use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// `define` resets every run; `default` persists across saves.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum VariableKind {
    Define,
    Default,
}

impl VariableKind {
    pub fn keyword(self) -> &'static str {
        match self {
            VariableKind::Define => "define",
            VariableKind::Default => "default",
        }
    }
}

/// Target of a `jump` or `call`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Target {
    /// A label name, possibly local (`.name`).
    Named(String),
    /// `jump expression ...`; not resolvable without evaluation.
    Expression(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ConditionalKind {
    If,
    Elif,
    Else,
    While,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum AudioAction {
    Play,
    Queue,
    Stop,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum VisualAction {
    Scene,
    Show,
    Hide,
    With,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ScreenAction {
    Show,
    Call,
    Hide,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    Init,
    Python,
    InitPython,
    Transform,
    Style,
    LayeredImage,
    Translate,
}

/// One classified script line.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Statement {
    Label {
        name: String,
        params: Option<String>,
    },
    Jump {
        target: Target,
    },
    Call {
        target: Target,
        from: Option<String>,
    },
    Return,
    Pass,
    Conditional {
        kind: ConditionalKind,
        condition: Option<String>,
    },
    Menu {
        name: Option<String>,
    },
    Choice {
        text: String,
        guard: Option<String>,
    },
    Dialogue {
        speaker: String,
        text: String,
    },
    Narration {
        text: String,
    },
    Variable {
        kind: VariableKind,
        name: String,
        value: String,
    },
    Character {
        kind: VariableKind,
        tag: String,
        name: Option<String>,
        color: Option<String>,
    },
    Screen {
        name: String,
        params: Option<String>,
    },
    ScreenRef {
        action: ScreenAction,
        name: String,
    },
    Image {
        name: String,
        value: String,
    },
    Audio {
        action: AudioAction,
        channel: String,
        asset: Option<String>,
    },
    Visual {
        action: VisualAction,
        target: String,
    },
    Block {
        kind: BlockKind,
    },
    Python {
        code: String,
    },
    Opaque {
        text: String,
    },
}

impl Statement {
    /// True for statements after which control never falls through to the
    /// next line: `jump`, `call` and `return`.
    pub fn is_transfer(&self) -> bool {
        matches!(
            self,
            Statement::Jump { .. } | Statement::Call { .. } | Statement::Return
        )
    }

    /// Short human-readable form for node previews.
    pub fn preview(&self) -> Option<String> {
        let text = match self {
            Statement::Dialogue { speaker, text } => format!("{speaker}: {text}"),
            Statement::Narration { text } => text.clone(),
            Statement::Jump { target } => format!("jump {}", target_display(target)),
            Statement::Call { target, .. } => format!("call {}", target_display(target)),
            Statement::Return => "return".to_string(),
            Statement::Menu { .. } => "menu".to_string(),
            Statement::Choice { text, .. } => format!("> {text}"),
            Statement::Conditional { kind, condition } => match (kind, condition) {
                (ConditionalKind::Else, _) => "else".to_string(),
                (kind, Some(cond)) => format!("{} {cond}", conditional_keyword(*kind)),
                (kind, None) => conditional_keyword(*kind).to_string(),
            },
            Statement::Visual {
                action: VisualAction::Scene,
                target,
            } => format!("scene {target}"),
            _ => return None,
        };
        Some(text)
    }
}

fn target_display(target: &Target) -> &str {
    match target {
        Target::Named(name) => name,
        Target::Expression(expr) => expr,
    }
}

fn conditional_keyword(kind: ConditionalKind) -> &'static str {
    match kind {
        ConditionalKind::If => "if",
        ConditionalKind::Elif => "elif",
        ConditionalKind::Else => "else",
        ConditionalKind::While => "while",
    }
}

/// A statement with its position in the file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ScannedLine {
    /// 1-based line number.
    pub line: usize,
    /// Indentation in columns (tabs count as 4).
    pub indent: usize,
    pub statement: Statement,
}

/// A statement and the block nested under it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct StatementNode {
    pub line: usize,
    pub indent: usize,
    pub statement: Statement,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<StatementNode>,
}

impl StatementNode {
    pub fn leaf(line: &ScannedLine) -> Self {
        Self {
            line: line.line,
            indent: line.indent,
            statement: line.statement.clone(),
            children: Vec::new(),
        }
    }

    /// Pre-order walk over this node and everything nested under it.
    pub fn walk(&self) -> NodeWalk<'_> {
        NodeWalk { stack: vec![self] }
    }
}

/// Iterator returned by [`StatementNode::walk`] and [`walk_all`].
pub struct NodeWalk<'a> {
    stack: Vec<&'a StatementNode>,
}

impl<'a> Iterator for NodeWalk<'a> {
    type Item = &'a StatementNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}

/// Pre-order walk over a sequence of sibling nodes.
pub fn walk_all(nodes: &[StatementNode]) -> NodeWalk<'_> {
    NodeWalk {
        stack: nodes.iter().rev().collect(),
    }
}
