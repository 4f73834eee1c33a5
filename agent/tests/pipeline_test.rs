use agent::{
    EMPTY_QUERY_MESSAGE, GENERATION_FAILED_MESSAGE, IterativeExecutor, LLM_UNAVAILABLE_MESSAGE,
    RagService, TaskPlanner
};
use config::Config;
use errors::ConfigurationError;
use graphrag::{
    BuildOptions, CorpusEntry, FallbackLlm, GraphBuilder, GraphRetriever, MockEmbeddingService,
    MockLlmService, RetrieverSettings, combined_text
};
use rag_core::TaskType;
use std::sync::Arc;
use std::time::Duration;
use storage::InMemoryGraphStore;
use testing::three_record_vectors;

type TestResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

const QUERY: &str = "Tell me about fever in topic A";

fn embedder() -> MockEmbeddingService {
    let [a, b, c] = three_record_vectors();
    MockEmbeddingService::new(3)
        .with_vector(combined_text("Question A", "Answer A"), a.to_vec())
        .with_vector(combined_text("Question B", "Answer B"), b.to_vec())
        .with_vector(combined_text("Question C", "Answer C"), c.to_vec())
        .with_vector(QUERY, vec![1.0, 0.01, 0.0])
        .fail_when_contains("broken")
}

async fn built_store() -> Result<Arc<InMemoryGraphStore>, Box<dyn std::error::Error + Send + Sync>> {
    let store = Arc::new(InMemoryGraphStore::new(3));
    let corpus = vec![
        CorpusEntry::new("Question A", "Answer A").with_id("A"),
        CorpusEntry::new("Question B", "Answer B").with_id("B"),
        CorpusEntry::new("Question C", "Answer C").with_id("C")
    ];
    GraphBuilder::new(store.clone(), Arc::new(embedder()))?
        .build(&corpus, &BuildOptions::default())
        .await?;
    Ok(store)
}

async fn service() -> Result<RagService, Box<dyn std::error::Error + Send + Sync>> {
    let store = built_store().await?;
    let settings = RetrieverSettings {
        top_k: 1,
        ..RetrieverSettings::default()
    };
    let retriever = Arc::new(GraphRetriever::new(store, 3, settings)?);
    let executor = IterativeExecutor::new(retriever.clone(), 5);
    Ok(RagService::new(
        Arc::new(embedder()),
        retriever,
        executor,
        TaskPlanner::new(true)
    ))
}

#[tokio::test]
async fn test_agentic_answer_uses_graph_context() -> TestResult {
    let llm = Arc::new(MockLlmService::new().with_default("Diagnosis: viral fever."));
    let service = service().await?.with_llm(llm.clone());

    let response = service.answer(QUERY).await;

    assert_eq!(response.answer, "Diagnosis: viral fever.");
    assert_eq!(response.task_type, TaskType::GraphRag);
    assert_eq!(response.iterations, 5);
    assert_eq!(response.nodes_found, 2);
    assert_eq!(response.edges_found, 1);
    assert_eq!(response.depth_reached, 1);
    assert!(!response.degraded);

    let ids: Vec<&str> = response.sources.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec!["A", "B"]);
    assert!(response.sources[0].similarity > 0.99);
    assert!(response.context_preview.contains("Related: A -> B"));

    let prompts = llm.prompts().await;
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("Question: Question A"));
    assert!(prompts[0].contains(&format!("Doctor's Question:\n{QUERY}")));
    Ok(())
}

#[tokio::test]
async fn test_missing_llm_is_degraded_not_fatal() -> TestResult {
    let response = service().await?.answer(QUERY).await;

    assert_eq!(response.answer, LLM_UNAVAILABLE_MESSAGE);
    assert!(response.degraded);
    assert_eq!(response.nodes_found, 2);
    Ok(())
}

#[tokio::test]
async fn test_all_providers_failing() -> TestResult {
    let chain = FallbackLlm::new()
        .with_provider(
            Arc::new(MockLlmService::named("primary").failing()),
            Duration::from_secs(1)
        )
        .with_provider(
            Arc::new(MockLlmService::named("secondary").failing()),
            Duration::from_secs(1)
        );
    let response = service().await?.with_llm(Arc::new(chain)).answer(QUERY).await;

    assert_eq!(response.answer, GENERATION_FAILED_MESSAGE);
    assert!(response.degraded);
    assert!(!response.answer.contains("injected"));
    Ok(())
}

#[tokio::test]
async fn test_empty_query_short_circuits() -> TestResult {
    let llm = Arc::new(MockLlmService::new());
    let response = service().await?.with_llm(llm.clone()).answer("   ").await;

    assert_eq!(response.answer, EMPTY_QUERY_MESSAGE);
    assert_eq!(response.nodes_found, 0);
    assert_eq!(llm.calls(), 0);
    Ok(())
}

#[tokio::test]
async fn test_embedding_failure_still_answers() -> TestResult {
    let llm = Arc::new(MockLlmService::new().with_default("Please share more details."));
    let service = service().await?.with_llm(llm.clone());

    let response = service.answer("broken fever question").await;

    assert!(response.degraded);
    assert_eq!(response.nodes_found, 0);
    assert_eq!(response.answer, "Please share more details.");
    assert!(llm.prompts().await[0].contains("Context:\n\n\nDoctor's Question:"));
    Ok(())
}

#[tokio::test]
async fn test_single_shot_retrieval_when_agent_disabled() -> TestResult {
    let llm = Arc::new(MockLlmService::new().with_default("ok"));
    let service = service()
        .await?
        .with_llm(llm)
        .with_agent_enabled(false);

    let response = service.answer(QUERY).await;
    assert_eq!(response.iterations, 1);
    assert_eq!(response.nodes_found, 2);
    assert_eq!(response.edges_found, 1);
    Ok(())
}

#[tokio::test]
async fn test_vector_context_alias_is_seed_only() -> TestResult {
    let service = service().await?;

    let seeds = service.retrieve_vector_context(QUERY, 1).await;
    assert_eq!(seeds.node_ids(), vec!["A"]);
    assert!(seeds.edges.is_empty());

    let graph = service.retrieve_graph_context(QUERY, 1, 2).await;
    assert_eq!(graph.node_ids(), vec!["A", "B"]);
    Ok(())
}

#[tokio::test]
async fn test_from_config_checks_dimensions() -> TestResult {
    let store = built_store().await?;
    let config = Config::default();

    let service = RagService::from_config(&config, Arc::new(embedder()), store.clone())?;
    let (_, plan) = service.plan("Compare insulin versus metformin");
    assert_eq!(plan.task_type, TaskType::ComparativeAnalysis);

    let wide = Arc::new(MockEmbeddingService::new(768));
    let err = RagService::from_config(&config, wide, store).err();
    assert!(matches!(
        err,
        Some(ConfigurationError::DimensionMismatch {
            embedding: 768,
            store: 3
        })
    ));
    Ok(())
}
