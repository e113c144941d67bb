//! Static analysis of visual novel story scripts.
//!
//! The pipeline turns a project's script files into labels, characters,
//! variables and screens, a control-flow graph over labels, the distinct
//! routes through that graph, and a canvas layout for the label nodes.
//!
//! ```no_run
//! use visual_novel_analysis::{analyze, AnalysisConfig, PriorPositions, ProjectSources};
//!
//! let sources: ProjectSources = [("script.rpy", "label start:\n    return\n")]
//!     .into_iter()
//!     .collect();
//! let result = analyze(&sources, &PriorPositions::new(), &AnalysisConfig::default());
//! for diagnostic in result.diagnostics.iter() {
//!     println!("{}", diagnostic.summary());
//! }
//! ```

mod analysis;
mod config;
mod diagnostics;
mod error;
mod graph;
mod layout;
mod routes;
pub mod scanner;
mod schema;
mod session;
mod sources;
mod symbols;

pub use analysis::{analyze, scan_project, ScriptAnalysis};
pub use config::{
    AnalysisConfig, DuplicatePolicy, LayoutConfig, RouteLimits, DEFAULT_ROUTE_PALETTE,
};
pub use diagnostics::{AnalysisDiagnostic, DiagnosticKind, Diagnostics, Severity};
pub use error::{AnalysisError, AnalysisResult};
pub use graph::{GraphStats, LabelGraph, LinkId, LinkKind, RouteLink};
pub use layout::{
    group_bounds, layout_labels, measure_label, Bounds, LabelNode, Position, PriorPositions, Size,
};
pub use routes::{
    identify_routes, labels_on_routes, select_entries, IdentifiedRoute, RouteSet,
    DEFAULT_START_LABEL,
};
pub use scanner::{scan_source, ScannedFile, Statement, StatementNode, Target, VariableKind};
pub use schema::{analysis_schema, analysis_schema_json};
pub use session::{AnalysisSession, ParseTicket, ReanalyzeOutcome};
pub use sources::{ProjectSources, SCRIPT_EXTENSION};
pub use symbols::{
    build_symbols, qualify_label, Character, DialogueStats, ImageDef, Label, Screen,
    SourceLocation, SymbolTable, SymbolTableBuilder, Variable,
};
