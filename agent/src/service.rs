//! End-to-end answer pipeline: preprocess, embed, retrieve, generate.

use config::Config;
use errors::ConfigurationError;
use graphrag::{FallbackLlm, GraphRetriever, RetrieverSettings};
use rag_core::{EmbeddingService, GraphStore, LlmService, RetrievalResult, TaskPlan, TaskType};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::executor::IterativeExecutor;
use crate::input::{ProcessedInput, preprocess};
use crate::oracle::LlmReasoningOracle;
use crate::planner::TaskPlanner;

pub const EMPTY_QUERY_MESSAGE: &str =
    "Please enter a medical question describing the patient's symptoms and findings.";

pub const LLM_UNAVAILABLE_MESSAGE: &str = "Answer generation is not configured. \
     The retrieved medical context is shown below for review.";

pub const GENERATION_FAILED_MESSAGE: &str = "I'm sorry, I could not generate an answer right now. \
     The retrieved medical context is shown below; please try again shortly.";

pub const OFF_TOPIC_REPLY: &str = "This system is designed exclusively for medical diagnostic \
     assistance; I cannot answer unrelated questions.";

pub const MORE_DETAIL_REPLY: &str =
    "More clinical information is required; please elaborate on symptoms and findings.";

pub const NO_CONTEXT_REPLY: &str = "I'm sorry, I couldn't find enough relevant medical \
     information to answer your question. Could you please provide more details about the \
     patient's history and symptoms?";

const PREVIEW_CHARS: usize = 1000;

/// Prompt sent to the answer model.
pub fn build_prompt(context: &str, question: &str) -> String {
    format!(
        "You are an experienced medical assistant helping a doctor evaluate a patient's \
         symptoms. Use the context and the doctor's question to write a clear, professional \
         answer. Paraphrase and interpret the context rather than copying it.\n\n\
         Structure the answer as three paragraphs:\n\
         1. Diagnosis: the most likely diagnosis in precise terminology.\n\
         2. Clinical Reasoning: the findings in the context that support it.\n\
         3. Interpretation: how the diagnosis relates to the patient's symptoms.\n\n\
         Content rules:\n\
         - If the question is unrelated to healthcare, diagnosis or symptoms, reply exactly:\n  \
         \"{OFF_TOPIC_REPLY}\"\n\
         - If the question lacks clinical detail, reply exactly:\n  \"{MORE_DETAIL_REPLY}\"\n\n\
         Retrieval check:\n\
         - If the context below is empty or not relevant, reply exactly:\n  \"{NO_CONTEXT_REPLY}\"\n\n\
         Context:\n{context}\n\n\
         Doctor's Question:\n{question}\n\n\
         Respond only with the three paragraphs. Do not add extra sections or disclaimers."
    )
}

/// First 1000 characters of `context`, with `...` appended when cut.
pub fn context_preview(context: &str) -> String {
    match context.char_indices().nth(PREVIEW_CHARS) {
        Some((cut, _)) => format!("{}...", &context[..cut]),
        None => context.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RagSource {
    pub id: String,
    pub similarity: f32,
    pub depth: usize
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RagResponse {
    pub answer: String,
    pub sources: Vec<RagSource>,
    pub context_preview: String,
    pub task_type: TaskType,
    pub iterations: usize,
    pub nodes_found: usize,
    pub edges_found: usize,
    pub depth_reached: usize,
    /// Embedding or generation failed and the answer is a fallback.
    pub degraded: bool
}

impl RagResponse {
    fn message(answer: &str, task_type: TaskType) -> Self {
        Self {
            answer: answer.to_string(),
            sources: Vec::new(),
            context_preview: String::new(),
            task_type,
            iterations: 0,
            nodes_found: 0,
            edges_found: 0,
            depth_reached: 0,
            degraded: false
        }
    }
}

pub struct RagService {
    embedder: Arc<dyn EmbeddingService>,
    retriever: Arc<GraphRetriever>,
    executor: IterativeExecutor,
    planner: TaskPlanner,
    llm: Option<Arc<dyn LlmService>>,
    agent_enabled: bool
}

impl RagService {
    pub fn new(
        embedder: Arc<dyn EmbeddingService>,
        retriever: Arc<GraphRetriever>,
        executor: IterativeExecutor,
        planner: TaskPlanner
    ) -> Self {
        Self {
            embedder,
            retriever,
            executor,
            planner,
            llm: None,
            agent_enabled: true
        }
    }

    pub fn with_llm(mut self, llm: Arc<dyn LlmService>) -> Self {
        self.llm = Some(llm);
        self
    }

    pub fn with_agent_enabled(mut self, enabled: bool) -> Self {
        self.agent_enabled = enabled;
        self
    }

    /// Wires the pipeline from configuration. The LLM chain, when any
    /// provider is configured, also backs the reasoning oracle.
    ///
    /// # Errors
    ///
    /// [`ConfigurationError`] when the embedder and store disagree on the
    /// dimension or an LLM client cannot be built.
    pub fn from_config(
        config: &Config,
        embedder: Arc<dyn EmbeddingService>,
        store: Arc<dyn GraphStore>
    ) -> Result<Self, ConfigurationError> {
        let retriever = Arc::new(GraphRetriever::new(
            store,
            embedder.dimension(),
            RetrieverSettings::from(&config.retrieval)
        )?);

        let llm: Option<Arc<dyn LlmService>> = if config.llm.providers.is_empty() {
            None
        } else {
            let chain = FallbackLlm::from_config(&config.llm).map_err(|e| {
                ConfigurationError::InvalidValue {
                    field: "llm.providers".to_string(),
                    reason: e.to_string()
                }
            })?;
            Some(Arc::new(chain))
        };

        let mut executor = IterativeExecutor::from_config(retriever.clone(), &config.agent);
        if let Some(llm) = &llm
            && config.agent.reasoning_enabled
        {
            executor = executor.with_oracle(Arc::new(LlmReasoningOracle::new(llm.clone())));
        }

        let mut service = Self::new(
            embedder,
            retriever,
            executor,
            TaskPlanner::from_config(&config.agent)
        )
        .with_agent_enabled(config.agent.enabled);
        if let Some(llm) = llm {
            service = service.with_llm(llm);
        }
        Ok(service)
    }

    /// Classification and step plan for `query`. No I/O.
    pub fn plan(&self, query: &str) -> (ProcessedInput, TaskPlan) {
        let input = preprocess(query);
        let plan = self.planner.plan(&input);
        (input, plan)
    }

    /// Answers `query`. Never fails: every failure mode maps to a readable
    /// answer, with `degraded` set when a capability was missing.
    #[instrument(skip(self, query))]
    pub async fn answer(&self, query: &str) -> RagResponse {
        let (input, plan) = self.plan(query);
        if input.is_empty() {
            return RagResponse::message(EMPTY_QUERY_MESSAGE, plan.task_type);
        }

        let embedding = self.embed(&input.processed_text).await;
        let mut degraded = embedding.is_none();

        let (context, retrieval, iterations) = if self.agent_enabled {
            let outcome = self
                .executor
                .execute(&input.processed_text, embedding.as_deref(), &plan)
                .await;
            (outcome.final_context, outcome.retrieval, outcome.iterations)
        } else {
            let retrieval = match &embedding {
                Some(vector) => self.retriever.retrieve(vector).await,
                None => RetrievalResult::empty()
            };
            (retrieval.context.clone(), retrieval, 1)
        };

        let answer = match &self.llm {
            None => {
                degraded = true;
                LLM_UNAVAILABLE_MESSAGE.to_string()
            }
            Some(llm) => match llm.generate(&build_prompt(&context, query.trim())).await {
                Ok(text) => text,
                Err(e) => {
                    warn!("Answer generation failed: {}", e);
                    degraded = true;
                    GENERATION_FAILED_MESSAGE.to_string()
                }
            }
        };

        info!(
            "Answered {} query with {} nodes over {} iterations",
            plan.task_type,
            retrieval.nodes.len(),
            iterations
        );

        RagResponse {
            answer,
            sources: retrieval
                .nodes
                .iter()
                .map(|n| RagSource {
                    id: n.record.id.clone(),
                    similarity: n.similarity,
                    depth: n.depth
                })
                .collect(),
            context_preview: context_preview(&context),
            task_type: plan.task_type,
            iterations,
            nodes_found: retrieval.nodes.len(),
            edges_found: retrieval.edges.len(),
            depth_reached: retrieval.depth_reached,
            degraded
        }
    }

    /// Retrieval with the configured `top_k` and `max_depth`.
    pub async fn retrieve(&self, query: &str) -> RetrievalResult {
        let settings = self.retriever.settings();
        self.retrieve_graph_context(query, settings.top_k, settings.max_depth)
            .await
    }

    /// Seed-only retrieval for `query`.
    pub async fn retrieve_vector_context(&self, query: &str, top_k: usize) -> RetrievalResult {
        self.retrieve_graph_context(query, top_k, 0).await
    }

    pub async fn retrieve_graph_context(
        &self,
        query: &str,
        top_k: usize,
        max_depth: usize
    ) -> RetrievalResult {
        let input = preprocess(query);
        if input.is_empty() {
            return RetrievalResult::empty();
        }
        match self.embed(&input.processed_text).await {
            Some(vector) => {
                self.retriever
                    .retrieve_graph_context(&vector, top_k, max_depth)
                    .await
            }
            None => RetrievalResult::empty()
        }
    }

    async fn embed(&self, text: &str) -> Option<Vec<f32>> {
        match self.embedder.embed(text).await {
            Ok(vector) => Some(vector),
            Err(e) => {
                warn!("Query embedding failed, continuing without retrieval: {}", e);
                None
            }
        }
    }
}
