use config::StoreConfig;
use rag_core::{GraphStore, NodeEmbeddings, QaRecord, VectorField};
use storage::QdrantGraphStore;
use testing::{qdrant, unique_id};

type TestResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

async fn fresh_store(dimension: usize) -> Option<QdrantGraphStore> {
    let fixture = qdrant().await?;
    let config = StoreConfig {
        url: fixture.grpc_url().to_string(),
        collection: unique_id("kb"),
        ..StoreConfig::default()
    };
    QdrantGraphStore::connect(&config, dimension).await.ok()
}

fn record(id: &str, combined: [f32; 3], related: &[&str]) -> QaRecord {
    QaRecord::new(id, format!("Question {id}?"), format!("Answer for {id}."))
        .with_embeddings(NodeEmbeddings {
            question: combined.to_vec(),
            answer: combined.to_vec(),
            combined: combined.to_vec()
        })
        .with_metadata("source", serde_json::json!("test"))
        .with_related_nodes(related.iter().map(|s| s.to_string()).collect())
}

#[tokio::test]
#[ignore = "requires Docker for the Qdrant container"]
async fn test_schema_setup_is_idempotent() -> TestResult {
    let Some(store) = fresh_store(3).await else {
        eprintln!("Skipping Qdrant test: Docker not available");
        return Ok(());
    };

    assert!(store.ensure_collection().await?);
    assert!(!store.ensure_collection().await?);

    let first = store.ensure_indexes(&VectorField::ALL).await?;
    assert_eq!(first.created, vec!["qa_id".to_string()]);
    assert_eq!(first.existing.len(), 3);

    let second = store.ensure_indexes(&VectorField::ALL).await?;
    assert!(second.created.is_empty());
    assert_eq!(second.existing.len(), 4);

    assert_eq!(store.collection_dimension().await?, Some(3));
    store.drop_collection().await?;
    Ok(())
}

#[tokio::test]
#[ignore = "requires Docker for the Qdrant container"]
async fn test_round_trip_and_search() -> TestResult {
    let Some(store) = fresh_store(3).await else {
        eprintln!("Skipping Qdrant test: Docker not available");
        return Ok(());
    };
    store.ensure_collection().await?;
    store.ensure_indexes(&VectorField::ALL).await?;

    let a = record("qa_0", [1.0, 0.0, 0.0], &["qa_1"]);
    let b = record("qa_1", [0.9, 0.436, 0.0], &["qa_0"]);
    let c = record("qa_2", [0.0, 0.0, 1.0], &[]);
    assert_eq!(store.upsert_nodes(&[a.clone(), b, c]).await?, 3);
    store.flush().await?;

    assert_eq!(store.count().await?, 3);

    let fetched = store.get_by_id("qa_0").await?.expect("qa_0 stored");
    assert_eq!(fetched.question, a.question);
    assert_eq!(fetched.answer, a.answer);
    assert_eq!(fetched.related_nodes, a.related_nodes);

    let hits = store
        .search(VectorField::Combined, &[1.0, 0.05, 0.0], 2)
        .await?;
    let ids: Vec<_> = hits.iter().map(|h| h.record.id.as_str()).collect();
    assert_eq!(ids, vec!["qa_0", "qa_1"]);

    let many = store
        .get_many(&["qa_2".to_string(), "nope".to_string(), "qa_0".to_string()])
        .await?;
    let ids: Vec<_> = many.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["qa_2", "qa_0"]);

    store.drop_collection().await?;
    Ok(())
}

#[tokio::test]
#[ignore = "requires Docker for the Qdrant container"]
async fn test_dimension_mismatch_detected_on_existing_collection() -> TestResult {
    let Some(store) = fresh_store(3).await else {
        eprintln!("Skipping Qdrant test: Docker not available");
        return Ok(());
    };
    store.ensure_collection().await?;

    let Some(fixture) = qdrant().await else {
        return Ok(());
    };
    let config = StoreConfig {
        url: fixture.grpc_url().to_string(),
        collection: store.collection().to_string(),
        ..StoreConfig::default()
    };
    let wider = QdrantGraphStore::connect(&config, 4).await?;
    let err = wider
        .ensure_indexes(&VectorField::ALL)
        .await
        .expect_err("dimension mismatch must be reported");
    assert!(err.is_fatal());

    store.drop_collection().await?;
    Ok(())
}
