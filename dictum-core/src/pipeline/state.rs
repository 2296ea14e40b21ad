//! Shared state carried across pipeline stages.

use crate::quality::QualityReport;
use crate::schema::SchemaMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// What a run was asked to do.
///
/// `Pipeline` drives the staged documentation run; `Chat` bypasses the
/// stages and goes straight to the chat collaborator with whatever state
/// already exists as read-only context.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    #[default]
    Pipeline,
    Chat,
}

/// Business documentation for one table, produced by the external
/// documentation collaborator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableDocumentation {
    /// Plain-language summary of what the table holds.
    pub business_summary: String,
    /// Column name to description.
    pub column_descriptions: BTreeMap<String, String>,
    pub usage_recommendations: Vec<String>,
    /// Tables a reader should look at next.
    pub related_tables: Vec<String>,
    /// Ready-to-run example queries.
    pub suggested_queries: Vec<String>,
}

/// The record every stage reads and appends to.
///
/// Fields fill in monotonically over one run: a stage writes its output and
/// never rewrites another stage's. Non-emptiness of a field is the only
/// completion signal the router looks at, so an empty schema is
/// indistinguishable from "not yet extracted".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineState {
    /// Extracted schema, keyed like [`SchemaMap`].
    pub schema: SchemaMap,
    /// Quality report keyed the same way as `schema`.
    pub quality_report: QualityReport,
    /// Documentation keyed the same way as `schema`.
    pub documentation: BTreeMap<String, TableDocumentation>,
    /// Locations of exported artifacts.
    pub artifacts: Vec<String>,
    /// Accumulated non-fatal failures, stage-prefixed.
    pub errors: Vec<String>,
    pub current_task: TaskKind,
}

impl PipelineState {
    /// A fresh state for the given task.
    pub fn for_task(task: TaskKind) -> Self {
        Self {
            current_task: task,
            ..Self::default()
        }
    }

    /// True once every stage output is populated.
    pub fn is_complete(&self) -> bool {
        !self.schema.is_empty()
            && !self.quality_report.is_empty()
            && !self.documentation.is_empty()
            && !self.artifacts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_task_is_pipeline() {
        assert_eq!(PipelineState::default().current_task, TaskKind::Pipeline);
        assert_eq!(
            PipelineState::for_task(TaskKind::Chat).current_task,
            TaskKind::Chat
        );
    }

    #[test]
    fn task_kind_serializes_snake_case() {
        let json = serde_json::to_string(&TaskKind::Pipeline).unwrap();
        assert_eq!(json, "\"pipeline\"");
        let back: TaskKind = serde_json::from_str("\"chat\"").unwrap();
        assert_eq!(back, TaskKind::Chat);
    }
}
