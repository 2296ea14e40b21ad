//! Staged documentation pipeline.
//!
//! One run walks a fixed forward progression, with each stage writing its
//! output into a shared [`PipelineState`]:
//!
//! ```text
//! SchemaExtraction ──▶ QualityAnalysis ──▶ Documentation ──▶ Export ──▶ Done
//!       (core)              (core)          (collaborator)  (collaborator)
//! ```
//!
//! The router re-derives the next stage from the state alone on every step,
//! so handing a partially filled state to [`Pipeline::run`] resumes where
//! output is missing and re-running a completed state is a no-op.
//! Collaborator failures land in `state.errors` and the run still reaches
//! [`Stage::Done`]; only an engine that cannot answer a probe before the
//! first stage aborts the run.
//!
//! # Examples
//!
//! ```rust,ignore
//! use dictum_core::engine::connect;
//! use dictum_core::pipeline::{Pipeline, PipelineState};
//!
//! # async fn example() -> dictum_core::CoreResult<()> {
//! let engine = connect(None, &Default::default()).await?;
//! let pipeline = Pipeline::new(engine);
//! let state = pipeline.run(PipelineState::default()).await?;
//! println!("{} tables, {} errors", state.schema.len(), state.errors.len());
//! # Ok(())
//! # }
//! ```

mod collaborators;
mod router;
mod state;

pub use collaborators::{ArtifactExporter, ChatResponder, DocumentationGenerator};
pub use router::{next_stage, route, Stage};
pub use state::{PipelineState, TableDocumentation, TaskKind};

use crate::engine::Engine;
use crate::error::{CoreError, CoreResult};
use crate::quality::QualityAnalyzer;
use crate::schema::{SchemaCache, SchemaExtractor};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Drives the staged run over one engine.
///
/// The schema and quality stages are built in; documentation, export, and
/// chat are optional collaborators attached with the `with_*` methods. A
/// stage with no collaborator is skipped without recording an error.
pub struct Pipeline {
    engine: Arc<dyn Engine>,
    extractor: SchemaExtractor,
    analyzer: QualityAnalyzer,
    documentation: Option<Arc<dyn DocumentationGenerator>>,
    exporter: Option<Arc<dyn ArtifactExporter>>,
    chat: Option<Arc<dyn ChatResponder>>,
}

impl Pipeline {
    /// Creates a pipeline over the given engine with no collaborators.
    pub fn new(engine: Arc<dyn Engine>) -> Self {
        Self {
            extractor: SchemaExtractor::new(engine.clone()),
            analyzer: QualityAnalyzer::new(engine.clone()),
            engine,
            documentation: None,
            exporter: None,
            chat: None,
        }
    }

    /// Attaches a schema snapshot cache to the extraction stage.
    pub fn with_cache(mut self, cache: SchemaCache) -> Self {
        self.extractor = self.extractor.with_cache(cache);
        self
    }

    /// Attaches the documentation collaborator.
    pub fn with_documentation(mut self, generator: Arc<dyn DocumentationGenerator>) -> Self {
        self.documentation = Some(generator);
        self
    }

    /// Attaches the artifact exporter.
    pub fn with_exporter(mut self, exporter: Arc<dyn ArtifactExporter>) -> Self {
        self.exporter = Some(exporter);
        self
    }

    /// Attaches the chat responder.
    pub fn with_chat(mut self, responder: Arc<dyn ChatResponder>) -> Self {
        self.chat = Some(responder);
        self
    }

    /// Runs stages forward until the router reports [`Stage::Done`].
    ///
    /// A stage that runs without populating its output is skipped past on
    /// the next step rather than re-entered, so a collaborator that keeps
    /// failing cannot stall the run. The returned state always carries the
    /// best-effort outputs next to the accumulated `errors`.
    #[instrument(skip(self, state))]
    pub async fn run(&self, mut state: PipelineState) -> CoreResult<PipelineState> {
        if state.current_task == TaskKind::Chat {
            return Err(CoreError::custom(
                "chat tasks bypass the staged run; use Pipeline::chat",
            ));
        }

        self.engine.probe().await.map_err(|e| {
            CoreError::engine_unavailable(format!(
                "engine probe failed before pipeline start: {e}"
            ))
        })?;

        let mut executed: HashSet<Stage> = HashSet::new();
        loop {
            let mut stage = route(&state);
            while stage != Stage::Done && executed.contains(&stage) {
                stage = stage.successor();
            }
            if stage == Stage::Done {
                break;
            }
            executed.insert(stage);
            info!(%stage, "running pipeline stage");

            match stage {
                Stage::SchemaExtraction => self.run_schema(&mut state).await,
                Stage::QualityAnalysis => self.run_quality(&mut state).await,
                Stage::Documentation => self.run_documentation(&mut state).await,
                Stage::Export => self.run_export(&mut state).await,
                Stage::Done | Stage::Chat => break,
            }
        }

        info!(
            tables = state.schema.len(),
            analyzed = state.quality_report.len(),
            documented = state.documentation.len(),
            artifacts = state.artifacts.len(),
            errors = state.errors.len(),
            "pipeline finished"
        );
        Ok(state)
    }

    /// Answers one chat turn against the current state.
    pub async fn chat(&self, prompt: &str, state: &PipelineState) -> CoreResult<String> {
        let responder = self
            .chat
            .as_ref()
            .ok_or_else(|| CoreError::custom("no chat responder configured"))?;
        responder.respond(prompt, state).await
    }

    async fn run_schema(&self, state: &mut PipelineState) {
        match self.extractor.extract().await {
            Ok(report) => {
                for issue in &report.errors {
                    state
                        .errors
                        .push(format!("schema_extraction: {}: {}", issue.table, issue.message));
                }
                state.schema = report.tables;
            }
            Err(error) => {
                warn!(%error, "schema extraction failed");
                state.errors.push(format!("schema_extraction: {error}"));
            }
        }
    }

    async fn run_quality(&self, state: &mut PipelineState) {
        for (key, table) in &state.schema {
            match self.analyzer.analyze_table(table).await {
                Ok(quality) => {
                    state.quality_report.insert(key.clone(), quality);
                }
                Err(error) => {
                    warn!(table = %key, %error, "quality analysis failed");
                    state
                        .errors
                        .push(format!("quality_analysis: {key}: {error}"));
                }
            }
        }
    }

    async fn run_documentation(&self, state: &mut PipelineState) {
        let Some(generator) = &self.documentation else {
            debug!("no documentation generator configured, stage skipped");
            return;
        };
        for (key, table) in &state.schema {
            match generator.document(table, state.quality_report.get(key)).await {
                Ok(docs) => {
                    state.documentation.insert(key.clone(), docs);
                }
                Err(error) => {
                    warn!(table = %key, %error, "documentation generation failed");
                    state.errors.push(format!("documentation: {key}: {error}"));
                }
            }
        }
    }

    async fn run_export(&self, state: &mut PipelineState) {
        let Some(exporter) = &self.exporter else {
            debug!("no artifact exporter configured, stage skipped");
            return;
        };
        match exporter.export(state).await {
            Ok(locations) => state.artifacts.extend(locations),
            Err(error) => {
                warn!(%error, "artifact export failed");
                state.errors.push(format!("export: {error}"));
            }
        }
    }
}
