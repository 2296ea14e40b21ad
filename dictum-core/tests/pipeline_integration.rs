//! End-to-end pipeline runs over an embedded engine with stub collaborators.

use async_trait::async_trait;
use dictum_core::engine::{EmbeddedEngine, Engine};
use dictum_core::pipeline::{
    next_stage, ArtifactExporter, ChatResponder, DocumentationGenerator, Pipeline,
    PipelineState, Stage, TableDocumentation,
};
use dictum_core::quality::TableQuality;
use dictum_core::schema::TableSchema;
use dictum_core::{CoreError, CoreResult};
use std::sync::Arc;

async fn seeded_engine() -> Arc<dyn Engine> {
    let engine: Arc<dyn Engine> = Arc::new(EmbeddedEngine::open_in_memory().unwrap());
    for sql in [
        "CREATE TABLE customers (id INTEGER PRIMARY KEY, name VARCHAR NOT NULL)",
        "INSERT INTO customers VALUES (1, 'Ada'), (2, 'Grace'), (3, 'Edsger')",
        "CREATE TABLE orders (id INTEGER PRIMARY KEY, \
             customer_id INTEGER REFERENCES customers(id), total DOUBLE)",
        "INSERT INTO orders VALUES (1, 1, 19.5), (2, 1, 3.25), (3, 2, 101.0)",
    ] {
        engine.execute(sql).await.unwrap();
    }
    engine
}

/// Writes the quality row count into the summary so tests can see the
/// generator received both inputs.
struct RowCountDocs;

#[async_trait]
impl DocumentationGenerator for RowCountDocs {
    async fn document(
        &self,
        schema: &TableSchema,
        quality: Option<&TableQuality>,
    ) -> CoreResult<TableDocumentation> {
        let rows = quality.map_or(0, |q| q.row_count);
        Ok(TableDocumentation {
            business_summary: format!("{} holds {rows} rows", schema.table_name),
            column_descriptions: schema
                .columns
                .iter()
                .map(|c| (c.name.clone(), format!("{} column", c.data_type)))
                .collect(),
            usage_recommendations: vec!["join on the primary key".to_string()],
            related_tables: vec![],
            suggested_queries: vec![format!(
                "SELECT * FROM {} LIMIT 10",
                schema.table_name
            )],
        })
    }
}

struct OrdersAverseDocs;

#[async_trait]
impl DocumentationGenerator for OrdersAverseDocs {
    async fn document(
        &self,
        schema: &TableSchema,
        _quality: Option<&TableQuality>,
    ) -> CoreResult<TableDocumentation> {
        if schema.table_name == "orders" {
            return Err(CoreError::custom("model declined"));
        }
        Ok(TableDocumentation {
            business_summary: format!("{} looks fine", schema.table_name),
            ..TableDocumentation::default()
        })
    }
}

struct ListingExporter;

#[async_trait]
impl ArtifactExporter for ListingExporter {
    async fn export(&self, state: &PipelineState) -> CoreResult<Vec<String>> {
        Ok(vec![format!(
            "outputs/dictionary-{}-tables.json",
            state.schema.len()
        )])
    }
}

struct FailingExporter;

#[async_trait]
impl ArtifactExporter for FailingExporter {
    async fn export(&self, _state: &PipelineState) -> CoreResult<Vec<String>> {
        Err(CoreError::custom("disk full"))
    }
}

struct EchoChat;

#[async_trait]
impl ChatResponder for EchoChat {
    async fn respond(&self, prompt: &str, state: &PipelineState) -> CoreResult<String> {
        Ok(format!(
            "{} known tables; you asked: {prompt}",
            state.schema.len()
        ))
    }
}

#[tokio::test]
async fn full_run_reaches_done_with_every_output() {
    let pipeline = Pipeline::new(seeded_engine().await)
        .with_documentation(Arc::new(RowCountDocs))
        .with_exporter(Arc::new(ListingExporter));

    let state = pipeline.run(PipelineState::default()).await.unwrap();

    assert!(state.errors.is_empty(), "{:?}", state.errors);
    assert!(state.is_complete());
    assert_eq!(next_stage(&state), Stage::Done);

    let schema_keys: Vec<_> = state.schema.keys().cloned().collect();
    assert_eq!(schema_keys, vec!["customers", "orders"]);
    assert_eq!(
        state.quality_report.keys().cloned().collect::<Vec<_>>(),
        schema_keys
    );
    assert_eq!(
        state.documentation.keys().cloned().collect::<Vec<_>>(),
        schema_keys
    );
    assert_eq!(state.artifacts, vec!["outputs/dictionary-2-tables.json"]);
    assert!(state.documentation["customers"]
        .business_summary
        .contains("3 rows"));
    assert!(state.documentation["customers"]
        .column_descriptions
        .contains_key("name"));
}

#[tokio::test]
async fn optional_stages_skip_without_recording_errors() {
    let pipeline = Pipeline::new(seeded_engine().await);

    let state = pipeline.run(PipelineState::default()).await.unwrap();

    assert_eq!(state.schema.len(), 2);
    assert_eq!(state.quality_report.len(), 2);
    assert!(state.documentation.is_empty());
    assert!(state.artifacts.is_empty());
    assert!(state.errors.is_empty(), "{:?}", state.errors);
    assert!(!state.is_complete());
    assert_eq!(next_stage(&state), Stage::Documentation);
}

#[tokio::test]
async fn failing_exporter_is_recorded_and_the_run_still_finishes() {
    let pipeline = Pipeline::new(seeded_engine().await)
        .with_documentation(Arc::new(RowCountDocs))
        .with_exporter(Arc::new(FailingExporter));

    let state = pipeline.run(PipelineState::default()).await.unwrap();

    assert!(state.artifacts.is_empty());
    assert_eq!(state.errors.len(), 1);
    assert!(state.errors[0].starts_with("export:"));
    assert!(state.errors[0].contains("disk full"));
    assert!(!state.is_complete());
    assert_eq!(next_stage(&state), Stage::Export);
}

#[tokio::test]
async fn per_table_documentation_failure_spares_the_rest() {
    let pipeline = Pipeline::new(seeded_engine().await)
        .with_documentation(Arc::new(OrdersAverseDocs))
        .with_exporter(Arc::new(ListingExporter));

    let state = pipeline.run(PipelineState::default()).await.unwrap();

    assert_eq!(state.errors.len(), 1);
    assert!(state.errors[0].starts_with("documentation: orders:"));
    assert!(state.errors[0].contains("model declined"));
    assert!(state.documentation.contains_key("customers"));
    assert!(!state.documentation.contains_key("orders"));
    // Export still ran after the partial documentation stage.
    assert_eq!(state.artifacts.len(), 1);
}

#[tokio::test]
async fn rerunning_a_completed_state_changes_nothing() {
    let pipeline = Pipeline::new(seeded_engine().await)
        .with_documentation(Arc::new(RowCountDocs))
        .with_exporter(Arc::new(ListingExporter));

    let first = pipeline.run(PipelineState::default()).await.unwrap();
    assert!(first.is_complete());

    let second = pipeline.run(first.clone()).await.unwrap();
    assert_eq!(second.artifacts, first.artifacts);
    assert_eq!(second.schema, first.schema);
    assert!(second.errors.is_empty());
}

#[tokio::test]
async fn chat_round_uses_the_prepared_state() {
    let pipeline = Pipeline::new(seeded_engine().await).with_chat(Arc::new(EchoChat));

    let state = pipeline.run(PipelineState::default()).await.unwrap();
    let answer = pipeline.chat("what do we have?", &state).await.unwrap();

    assert_eq!(answer, "2 known tables; you asked: what do we have?");
}
