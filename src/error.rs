use miette::{Diagnostic, SourceSpan};
use thiserror::Error;

pub type AnalysisResult<T> = Result<T, AnalysisError>;

#[derive(Debug, Error, Diagnostic)]
pub enum AnalysisError {
    #[error("invalid symbol name: '{0}'")]
    #[diagnostic(
        code("analysis.invalid_name"),
        help("names start with a letter or '_' and contain only letters, digits, '_' or '.'")
    )]
    InvalidName(String),
    #[error("symbol '{0}' is already declared")]
    #[diagnostic(code("analysis.duplicate_name"))]
    DuplicateName(String),
    #[error("label '{0}' does not exist in the last analysis")]
    #[diagnostic(code("analysis.unknown_label"))]
    UnknownLabel(String),
    #[error("failed to parse configuration: {0}")]
    #[diagnostic(code("analysis.config"))]
    Config(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    #[diagnostic(code("analysis.invalid_config"))]
    InvalidConfig(String),
    #[error("failed to write configuration: {0}")]
    #[diagnostic(code("analysis.config_write"))]
    ConfigWrite(#[from] toml::ser::Error),
    #[error("io error: {0}")]
    #[diagnostic(code("analysis.io"))]
    Io(#[from] std::io::Error),
    #[error("serialization error: {message}")]
    #[diagnostic(code("analysis.serialization"))]
    Serialization {
        message: String,
        #[source_code]
        src: String,
        #[label("here")]
        span: SourceSpan,
    },
    #[error("parse result {ticket} superseded by {latest}")]
    #[diagnostic(code("analysis.stale_result"))]
    StaleResult { ticket: u64, latest: u64 },
}

impl AnalysisError {
    /// Builds a `Serialization` error pointing at the offending JSON position.
    pub(crate) fn from_json(input: &str, err: &serde_json::Error) -> Self {
        let offset = line_col_to_offset(input, err.line(), err.column());
        let len = if input.is_empty() { 0 } else { 1 };
        AnalysisError::Serialization {
            message: err.to_string(),
            src: input.to_string(),
            span: (offset.min(input.len().saturating_sub(len)), len).into(),
        }
    }
}

fn line_col_to_offset(input: &str, line: usize, column: usize) -> usize {
    if line == 0 {
        return 0;
    }
    let mut offset = 0usize;
    for (index, text) in input.split_inclusive('\n').enumerate() {
        if index + 1 == line {
            return offset + column.saturating_sub(1).min(text.len());
        }
        offset += text.len();
    }
    offset
}
