//! Non-fatal findings collected while analysing a project.
//!
//! Analysis never fails as a whole: anything odd in the script becomes an
//! [`AnalysisDiagnostic`] in the result and the pipeline carries on with a
//! best-effort model.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    UnparseableLine,
    DuplicateName,
    UnresolvedTarget,
    DynamicTarget,
    InvalidName,
    RouteEnumerationTruncated,
    UnknownEntryLabel,
    UnreachableLabel,
    TabIndentation,
    OrphanChoice,
}

impl DiagnosticKind {
    pub fn label(self) -> &'static str {
        match self {
            DiagnosticKind::UnparseableLine => "ANA_UNPARSEABLE",
            DiagnosticKind::DuplicateName => "ANA_DUPLICATE",
            DiagnosticKind::UnresolvedTarget => "ANA_TARGET_MISSING",
            DiagnosticKind::DynamicTarget => "ANA_TARGET_DYNAMIC",
            DiagnosticKind::InvalidName => "ANA_NAME_INVALID",
            DiagnosticKind::RouteEnumerationTruncated => "ANA_ROUTES_TRUNCATED",
            DiagnosticKind::UnknownEntryLabel => "ANA_ENTRY_MISSING",
            DiagnosticKind::UnreachableLabel => "ANA_UNREACHABLE",
            DiagnosticKind::TabIndentation => "ANA_TAB_INDENT",
            DiagnosticKind::OrphanChoice => "ANA_CHOICE_ORPHAN",
        }
    }

    pub fn default_severity(self) -> Severity {
        match self {
            DiagnosticKind::UnresolvedTarget => Severity::Error,
            DiagnosticKind::UnparseableLine
            | DiagnosticKind::DuplicateName
            | DiagnosticKind::DynamicTarget
            | DiagnosticKind::InvalidName
            | DiagnosticKind::RouteEnumerationTruncated
            | DiagnosticKind::UnknownEntryLabel
            | DiagnosticKind::TabIndentation
            | DiagnosticKind::OrphanChoice => Severity::Warning,
            DiagnosticKind::UnreachableLabel => Severity::Info,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct AnalysisDiagnostic {
    pub kind: DiagnosticKind,
    pub severity: Severity,
    pub file: Option<String>,
    /// 1-based source line.
    pub line: Option<usize>,
    pub message: String,
}

impl AnalysisDiagnostic {
    pub fn new(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity: kind.default_severity(),
            file: None,
            line: None,
            message: message.into(),
        }
    }

    pub fn at(mut self, file: &str, line: usize) -> Self {
        self.file = Some(file.to_string());
        self.line = Some(line);
        self
    }

    /// One-line rendering used by logs and text reports.
    pub fn summary(&self) -> String {
        let location = match (&self.file, self.line) {
            (Some(file), Some(line)) => format!("{file}:{line}: "),
            (Some(file), None) => format!("{file}: "),
            _ => String::new(),
        };
        format!("[{}] {}{}", self.kind.label(), location, self.message)
    }
}

/// Ordered collection of diagnostics for one analysis run.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct Diagnostics(Vec<AnalysisDiagnostic>);

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: AnalysisDiagnostic) {
        self.0.push(diagnostic);
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.0.extend(other.0);
    }

    pub fn iter(&self) -> impl Iterator<Item = &AnalysisDiagnostic> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn of_kind(&self, kind: DiagnosticKind) -> impl Iterator<Item = &AnalysisDiagnostic> {
        self.0.iter().filter(move |d| d.kind == kind)
    }

    pub fn count(&self, kind: DiagnosticKind) -> usize {
        self.of_kind(kind).count()
    }

    pub fn has_errors(&self) -> bool {
        self.0.iter().any(|d| d.severity == Severity::Error)
    }
}
