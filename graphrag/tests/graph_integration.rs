use graphrag::{
    BuildOptions, CorpusEntry, GraphBuilder, GraphRetriever, MockEmbeddingService,
    RetrieverSettings, combined_text, parse_jsonl
};
use rag_core::{GraphStore, TraversedEdge};
use std::sync::Arc;
use storage::InMemoryGraphStore;
use testing::{SAMPLE_QA, sample_corpus_jsonl, three_record_vectors};

type TestResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

fn abc_corpus() -> (Vec<CorpusEntry>, MockEmbeddingService) {
    let [a, b, c] = three_record_vectors();
    let corpus = vec![
        CorpusEntry::new("Question A", "Answer A").with_id("A"),
        CorpusEntry::new("Question B", "Answer B").with_id("B"),
        CorpusEntry::new("Question C", "Answer C").with_id("C")
    ];
    let embedder = MockEmbeddingService::new(3)
        .with_vector(combined_text("Question A", "Answer A"), a.to_vec())
        .with_vector(combined_text("Question B", "Answer B"), b.to_vec())
        .with_vector(combined_text("Question C", "Answer C"), c.to_vec());
    (corpus, embedder)
}

#[tokio::test]
async fn test_three_record_build_and_retrieve() -> TestResult {
    let (corpus, embedder) = abc_corpus();
    let store = Arc::new(InMemoryGraphStore::new(3));
    let builder = GraphBuilder::new(store.clone(), Arc::new(embedder))?;

    let options = BuildOptions {
        similarity_threshold: 0.7,
        ..BuildOptions::default()
    };
    let report = builder.build(&corpus, &options).await?;
    assert_eq!(report.written, 3);
    assert_eq!(report.edges, 2);
    assert_eq!(report.nodes_with_edges, 2);

    let a = store.get_by_id("A").await?.ok_or("A missing")?;
    let b = store.get_by_id("B").await?.ok_or("B missing")?;
    let c = store.get_by_id("C").await?.ok_or("C missing")?;
    assert_eq!(a.related_nodes, vec!["B".to_string()]);
    assert_eq!(b.related_nodes, vec!["A".to_string()]);
    assert!(c.related_nodes.is_empty());

    let retriever = GraphRetriever::new(store, 3, RetrieverSettings::default())?;
    let query = [1.0, 0.01, 0.0];

    let expanded = retriever.retrieve_graph_context(&query, 1, 1).await;
    assert_eq!(expanded.node_ids(), vec!["A", "B"]);
    assert_eq!(
        expanded.edges,
        vec![TraversedEdge {
            source_id: "A".to_string(),
            target_id: "B".to_string()
        }]
    );
    assert_eq!(expanded.depth_reached, 1);
    assert!(expanded.context.contains("[1] Question: Question A"));
    assert!(expanded.context.contains("Related: A -> B"));

    let seeds_only = retriever.retrieve_graph_context(&query, 1, 0).await;
    assert_eq!(seeds_only.node_ids(), vec!["A"]);
    assert!(seeds_only.edges.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_round_trip_preserves_text_and_adjacency() -> TestResult {
    let corpus = parse_jsonl(sample_corpus_jsonl().as_bytes(), "sample")?;
    assert_eq!(corpus.entries.len(), SAMPLE_QA.len());

    let store = Arc::new(InMemoryGraphStore::new(16));
    let builder = GraphBuilder::new(store.clone(), Arc::new(MockEmbeddingService::new(16)))?;
    let options = BuildOptions {
        similarity_threshold: 0.5,
        fan_out_cap: 2,
        batch_size: 4,
        ..BuildOptions::default()
    };
    let report = builder.build(&corpus.entries, &options).await?;
    assert_eq!(report.written, SAMPLE_QA.len());
    assert!(report.max_fan_out <= 2);

    for (index, (_, question, answer)) in SAMPLE_QA.iter().enumerate() {
        let id = format!("qa_{index}");
        let record = store.get_by_id(&id).await?.ok_or("record missing")?;
        assert_eq!(record.question, *question);
        assert_eq!(record.answer, *answer);
        assert!(record.related_nodes.len() <= 2);
        assert!(!record.related_nodes.contains(&id));
        for neighbor in &record.related_nodes {
            let other = store.get_by_id(neighbor).await?.ok_or("neighbour missing")?;
            assert!(other.related_nodes.contains(&id), "{id} -> {neighbor} is not symmetric");
        }
    }
    Ok(())
}
