//! # Dictum - Automated Data Dictionary Core
//!
//! Dictum's core crate discovers what lives inside a SQL database and how
//! healthy it is: it extracts schema metadata, computes statistical quality
//! metrics, and drives a resumable pipeline whose outputs downstream
//! collaborators turn into business documentation and report artifacts.
//!
//! ## Overview
//!
//! Two engine backends sit behind one interface: an embedded analytical
//! engine (DuckDB, file-backed, zero setup) and a client/server relational
//! engine (PostgreSQL). Everything above the [`engine::Engine`] trait is
//! backend-agnostic: the capability inspector, the schema extractor, the
//! quality analyzer, and the staged pipeline all speak plain SQL and typed
//! result sets.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use dictum_core::config::Settings;
//! use dictum_core::engine::connect;
//! use dictum_core::pipeline::{Pipeline, PipelineState};
//!
//! #[tokio::main]
//! async fn main() -> dictum_core::CoreResult<()> {
//!     // DATABASE_URL if set, otherwise a local embedded database file.
//!     let settings = Settings::from_env();
//!     let engine = connect(None, &settings).await?;
//!
//!     let pipeline = Pipeline::new(engine);
//!     let state = pipeline.run(PipelineState::default()).await?;
//!
//!     for (name, table) in &state.schema {
//!         println!(
//!             "{name}: {} columns, {:?} rows",
//!             table.columns.len(),
//!             table.row_count
//!         );
//!     }
//!     for error in &state.errors {
//!         eprintln!("warning: {error}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Key Capabilities
//!
//! - **Schema extraction**: tables, columns, primary/foreign keys, unique
//!   constraints, and indexes, normalized across backends with per-backend
//!   system-schema filtering. Backends that cannot answer a catalog question
//!   return an empty result instead of failing the scan.
//! - **Quality analysis**: null rates and completeness, cardinality, min/max,
//!   mean/stddev, primary-key uniqueness, freshness, z-score and IQR outlier
//!   detection, distribution shape (skewness/kurtosis), Benford leading-digit
//!   screening, and pairwise Pearson correlation, all computed in SQL on the
//!   engine rather than by shipping rows to the client.
//! - **Fingerprint caching**: a canonical hash of the schema map short-circuits
//!   re-extraction when nothing structural changed between runs.
//! - **Resumable pipeline**: a level-triggered router derives the next stage
//!   from which outputs exist, so interrupted runs resume and completed runs
//!   are no-ops.
//!
//! ## Architecture
//!
//! - **`engine`**: the [`engine::Engine`] trait, the DuckDB and PostgreSQL
//!   implementations, typed result sets, and connection resolution
//! - **`inspect`**: the capability inspector over a connected engine
//! - **`schema`**: extraction into [`schema::TableSchema`] maps, plus the
//!   snapshot cache and fingerprinting
//! - **`quality`**: the [`quality::QualityAnalyzer`] and its per-metric
//!   report types
//! - **`pipeline`**: shared state, the stage router, the runner, and the
//!   collaborator traits for documentation, export, and chat
//! - **`config`**, **`logging`**, **`security`**, **`error`**: settings,
//!   tracing presets, identifier hygiene, and the crate-wide error type

pub mod config;
pub mod engine;
pub mod error;
pub mod inspect;
pub mod logging;
pub mod pipeline;
pub mod prelude;
pub mod quality;
pub mod schema;
pub mod security;

pub use error::{CoreError, CoreResult};
