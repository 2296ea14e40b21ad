//! Prelude for commonly used types and traits in dictum-core.

pub use crate::config::Settings;
pub use crate::engine::{connect, Engine, EngineKind, EngineRegistry, ResultSet, SqlValue};
pub use crate::error::{CoreError, CoreResult};
pub use crate::inspect::Inspector;
pub use crate::logging::LogConfig;
pub use crate::pipeline::{Pipeline, PipelineState, Stage, TaskKind};
pub use crate::quality::{QualityAnalyzer, QualityIssue, QualityReport, TableQuality};
pub use crate::schema::{SchemaCache, SchemaExtractor, SchemaMap, TableSchema};
