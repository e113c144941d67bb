//! JSON schema of the analysis result.

use schemars::schema::RootSchema;
use schemars::schema_for;

use crate::analysis::ScriptAnalysis;
use crate::error::{AnalysisError, AnalysisResult};

/// Schema of [`ScriptAnalysis`] as consumed by the UI layer.
pub fn analysis_schema() -> RootSchema {
    schema_for!(ScriptAnalysis)
}

/// The schema as pretty-printed JSON.
pub fn analysis_schema_json() -> AnalysisResult<String> {
    serde_json::to_string_pretty(&analysis_schema()).map_err(|err| {
        AnalysisError::Serialization {
            message: err.to_string(),
            src: String::new(),
            span: (0, 0).into(),
        }
    })
}
