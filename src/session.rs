//! Editing session over the last analysis.
//!
//! The session keeps the latest [`ScriptAnalysis`] and applies UI commands to
//! it. Only script text changes re-run the pipeline; position updates and
//! variable additions patch the stored result.
//!
//! # Contracts
//! - **Ordering**: parses are ticketed. A result is accepted only for the
//!   newest ticket; older ones are rejected as stale and dropped.
//! - **Atomicity**: a rejected command leaves the session unchanged.
//! - **Positions**: label positions survive re-analysis, matched by name.

use tracing::{debug, info};

use crate::analysis::{analyze, ScriptAnalysis};
use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, AnalysisResult};
use crate::layout::{Position, PriorPositions};
use crate::scanner::VariableKind;
use crate::sources::ProjectSources;

/// Handle for one requested parse.
#[derive(Clone, Debug, PartialEq)]
pub struct ParseTicket {
    pub generation: u64,
    /// Positions to carry into the parse.
    pub prior: PriorPositions,
    pub fingerprint: String,
}

/// Outcome of [`AnalysisSession::reanalyze`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReanalyzeOutcome {
    Updated,
    Unchanged,
}

#[derive(Debug, Default)]
pub struct AnalysisSession {
    config: AnalysisConfig,
    current: ScriptAnalysis,
    /// Last issued ticket generation.
    generation: u64,
}

impl AnalysisSession {
    pub fn new(config: AnalysisConfig) -> Self {
        Self {
            config,
            current: ScriptAnalysis::default(),
            generation: 0,
        }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Replaces the configuration. The next [`reanalyze`](Self::reanalyze)
    /// runs even if the sources are unchanged.
    pub fn set_config(&mut self, config: AnalysisConfig) {
        self.config = config;
        self.current.fingerprint.clear();
    }

    pub fn current(&self) -> &ScriptAnalysis {
        &self.current
    }

    /// Issues a ticket for a new parse, superseding any in flight.
    pub fn begin_parse(&mut self, sources: &ProjectSources) -> ParseTicket {
        self.generation += 1;
        debug!(generation = self.generation, "parse requested");
        ParseTicket {
            generation: self.generation,
            prior: self.current.positions(),
            fingerprint: sources.fingerprint(),
        }
    }

    /// Runs the pipeline for a ticket. Needs no access to the session, so a
    /// caller may run it elsewhere and hand the result back.
    pub fn run_parse(
        ticket: &ParseTicket,
        sources: &ProjectSources,
        config: &AnalysisConfig,
    ) -> ScriptAnalysis {
        analyze(sources, &ticket.prior, config)
    }

    /// Accepts the result of the newest parse.
    pub fn complete_parse(
        &mut self,
        ticket: &ParseTicket,
        result: ScriptAnalysis,
    ) -> AnalysisResult<()> {
        if ticket.generation != self.generation {
            info!(
                ticket = ticket.generation,
                latest = self.generation,
                "discarding stale analysis result"
            );
            return Err(AnalysisError::StaleResult {
                ticket: ticket.generation,
                latest: self.generation,
            });
        }
        self.current = result;
        Ok(())
    }

    /// Parses and installs the result, unless the sources are unchanged
    /// since the last accepted parse.
    pub fn reanalyze(&mut self, sources: &ProjectSources) -> AnalysisResult<ReanalyzeOutcome> {
        let ticket = self.begin_parse(sources);
        if ticket.fingerprint == self.current.fingerprint {
            debug!("sources unchanged, skipping analysis");
            return Ok(ReanalyzeOutcome::Unchanged);
        }
        let result = Self::run_parse(&ticket, sources, &self.config);
        self.complete_parse(&ticket, result)?;
        Ok(ReanalyzeOutcome::Updated)
    }

    /// Adds a variable to the current symbol tables.
    pub fn add_variable(
        &mut self,
        name: &str,
        kind: VariableKind,
        initial_value: &str,
    ) -> AnalysisResult<()> {
        self.current
            .symbols
            .add_variable(name, kind, initial_value)
    }

    /// Moves one label node. The node becomes user-positioned.
    pub fn update_label_position(&mut self, label: &str, position: Position) -> AnalysisResult<()> {
        let node = self
            .current
            .label_nodes
            .iter_mut()
            .find(|node| node.id == label)
            .ok_or_else(|| AnalysisError::UnknownLabel(label.to_string()))?;
        node.position = position;
        node.user_positioned = true;
        Ok(())
    }

    /// Moves several label nodes. Every label is checked before any moves.
    pub fn update_label_positions<I, S>(&mut self, updates: I) -> AnalysisResult<()>
    where
        I: IntoIterator<Item = (S, Position)>,
        S: AsRef<str>,
    {
        let updates: Vec<(S, Position)> = updates.into_iter().collect();
        if let Some((missing, _)) = updates
            .iter()
            .find(|(label, _)| self.current.label_node(label.as_ref()).is_none())
        {
            return Err(AnalysisError::UnknownLabel(missing.as_ref().to_string()));
        }
        for (label, position) in updates {
            self.update_label_position(label.as_ref(), position)?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
