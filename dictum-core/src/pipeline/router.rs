//! Deterministic stage selection.
//!
//! The router is a pure function of the current [`PipelineState`]: it looks
//! only at which outputs exist, never at which stage ran last, so a restarted
//! run resumes exactly where output is missing and a completed run routes
//! straight to [`Stage::Done`].

use super::state::{PipelineState, TaskKind};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One step of the documentation pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    SchemaExtraction,
    QualityAnalysis,
    Documentation,
    Export,
    /// Terminal: every stage output is populated.
    Done,
    /// Outside the staged progression, handled per request.
    Chat,
}

impl Stage {
    /// The stage that follows this one in the fixed forward order.
    pub fn successor(self) -> Stage {
        match self {
            Stage::SchemaExtraction => Stage::QualityAnalysis,
            Stage::QualityAnalysis => Stage::Documentation,
            Stage::Documentation => Stage::Export,
            Stage::Export | Stage::Done | Stage::Chat => Stage::Done,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::SchemaExtraction => "schema_extraction",
            Stage::QualityAnalysis => "quality_analysis",
            Stage::Documentation => "documentation",
            Stage::Export => "export",
            Stage::Done => "done",
            Stage::Chat => "chat",
        };
        f.write_str(name)
    }
}

/// Selects the first stage whose output is still empty.
///
/// Level-triggered: evaluated fresh on every step, with no memory of prior
/// routing decisions. `errors` never influences the selection.
pub fn next_stage(state: &PipelineState) -> Stage {
    if state.schema.is_empty() {
        Stage::SchemaExtraction
    } else if state.quality_report.is_empty() {
        Stage::QualityAnalysis
    } else if state.documentation.is_empty() {
        Stage::Documentation
    } else if state.artifacts.is_empty() {
        Stage::Export
    } else {
        Stage::Done
    }
}

/// Routes a task: chat bypasses the staged progression entirely.
pub fn route(state: &PipelineState) -> Stage {
    match state.current_task {
        TaskKind::Chat => Stage::Chat,
        TaskKind::Pipeline => next_stage(state),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::TableDocumentation;
    use crate::quality::TableQuality;
    use crate::schema::TableSchema;

    fn state_with(
        schema: bool,
        quality: bool,
        docs: bool,
        artifacts: bool,
    ) -> PipelineState {
        let mut state = PipelineState::default();
        if schema {
            state.schema.insert(
                "orders".into(),
                TableSchema {
                    table_name: "orders".into(),
                    schema_name: "main".into(),
                    columns: Vec::new(),
                    primary_keys: Vec::new(),
                    foreign_keys: Vec::new(),
                    unique_constraints: Vec::new(),
                    indexes: Vec::new(),
                    row_count: None,
                },
            );
        }
        if quality {
            state.quality_report.insert(
                "orders".into(),
                TableQuality {
                    table_name: "orders".into(),
                    row_count: 0,
                    column_quality: Vec::new(),
                    pk_uniqueness_rate: None,
                    freshness_column: None,
                    freshness_latest: None,
                    freshness_oldest: None,
                    overall_completeness: 1.0,
                    errors: Vec::new(),
                },
            );
        }
        if docs {
            state
                .documentation
                .insert("orders".into(), TableDocumentation::default());
        }
        if artifacts {
            state.artifacts.push("outputs/dictionary.json".into());
        }
        state
    }

    #[test]
    fn stages_advance_as_outputs_fill_in() {
        assert_eq!(
            next_stage(&state_with(false, false, false, false)),
            Stage::SchemaExtraction
        );
        assert_eq!(
            next_stage(&state_with(true, false, false, false)),
            Stage::QualityAnalysis
        );
        assert_eq!(
            next_stage(&state_with(true, true, false, false)),
            Stage::Documentation
        );
        assert_eq!(
            next_stage(&state_with(true, true, true, false)),
            Stage::Export
        );
        assert_eq!(next_stage(&state_with(true, true, true, true)), Stage::Done);
    }

    #[test]
    fn completed_state_is_done_regardless_of_errors() {
        let mut state = state_with(true, true, true, true);
        state.errors.push("quality_analysis: orders timed out".into());
        state.errors.push("export: disk full".into());
        assert_eq!(next_stage(&state), Stage::Done);
        assert_eq!(next_stage(&state), Stage::Done);
    }

    #[test]
    fn chat_task_bypasses_the_stages() {
        let mut state = state_with(true, false, false, false);
        state.current_task = TaskKind::Chat;
        assert_eq!(route(&state), Stage::Chat);

        state.current_task = TaskKind::Pipeline;
        assert_eq!(route(&state), Stage::QualityAnalysis);
    }

    #[test]
    fn successor_order_is_fixed() {
        assert_eq!(
            Stage::SchemaExtraction.successor(),
            Stage::QualityAnalysis
        );
        assert_eq!(Stage::QualityAnalysis.successor(), Stage::Documentation);
        assert_eq!(Stage::Documentation.successor(), Stage::Export);
        assert_eq!(Stage::Export.successor(), Stage::Done);
        assert_eq!(Stage::Done.successor(), Stage::Done);
    }
}
