//! Seams for the external enrichment steps.
//!
//! Documentation generation, artifact writing, and chat answering all live
//! outside this crate (they wrap an LLM API or the filesystem). The pipeline
//! talks to them through these traits and treats every call as fallible
//! enrichment: a failing collaborator is recorded and skipped, never a reason
//! to abort the run.

use super::state::{PipelineState, TableDocumentation};
use crate::error::CoreResult;
use crate::quality::TableQuality;
use crate::schema::TableSchema;
use async_trait::async_trait;

/// Produces business documentation for one table.
#[async_trait]
pub trait DocumentationGenerator: Send + Sync {
    /// Documents a single table from its schema and, when the quality pass
    /// reached it, its quality report.
    async fn document(
        &self,
        schema: &TableSchema,
        quality: Option<&TableQuality>,
    ) -> CoreResult<TableDocumentation>;
}

/// Persists the pipeline output as artifacts.
#[async_trait]
pub trait ArtifactExporter: Send + Sync {
    /// Writes artifacts for the given state and returns their locations.
    async fn export(&self, state: &PipelineState) -> CoreResult<Vec<String>>;
}

/// Answers a natural-language question about the database.
#[async_trait]
pub trait ChatResponder: Send + Sync {
    /// Replies to `prompt` using the state as read-only context.
    async fn respond(&self, prompt: &str, state: &PipelineState) -> CoreResult<String>;
}
