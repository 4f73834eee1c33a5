//! Bounded iterate-until-sufficient loop over a [`TaskPlan`].

use config::AgentConfig;
use graphrag::{GraphRagTelemetry, GraphRetriever, render_context};
use rag_core::{PlanStep, RetrievalResult, StepAction, TaskPlan, TraversedEdge};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use strum::{Display, EnumString};
use tracing::{debug, info, instrument, warn};

use crate::oracle::{HeuristicOracle, ReasoningDecision, ReasoningOracle};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StepStatus {
    /// Retrieval added at least one unseen node.
    Retrieved,
    /// Retrieval ran but every node was already in the context.
    NothingNew,
    /// Retrieval step without a query embedding.
    Degraded,
    /// Step with no store access.
    Bookkeeping
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TerminationReason {
    OracleStop,
    MaxIterations,
    EmptyPlan
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterationRecord {
    /// 1-based.
    pub iteration: usize,
    pub step: PlanStep,
    pub status: StepStatus,
    pub chars_added: usize,
    pub new_nodes: usize
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReasoningTraceEntry {
    pub iteration: usize,
    pub decision: ReasoningDecision
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionOutcome {
    pub final_context: String,
    pub iterations: usize,
    pub history: Vec<IterationRecord>,
    pub reasoning_trace: Vec<ReasoningTraceEntry>,
    pub termination_reason: TerminationReason,
    /// Union of every retrieval step, in discovery order.
    pub retrieval: RetrievalResult
}

struct StepOutput {
    status: StepStatus,
    text: String,
    new_nodes: usize
}

pub struct IterativeExecutor {
    retriever: Arc<GraphRetriever>,
    oracle: Option<Arc<dyn ReasoningOracle>>,
    heuristic: HeuristicOracle,
    max_iterations: usize,
    oracle_timeout: Duration,
    telemetry: GraphRagTelemetry
}

impl IterativeExecutor {
    pub fn new(retriever: Arc<GraphRetriever>, max_iterations: usize) -> Self {
        Self {
            retriever,
            oracle: None,
            heuristic: HeuristicOracle::default(),
            max_iterations: max_iterations.max(1),
            oracle_timeout: Duration::from_secs(30),
            telemetry: GraphRagTelemetry::new()
        }
    }

    pub fn from_config(retriever: Arc<GraphRetriever>, config: &AgentConfig) -> Self {
        Self::new(retriever, config.max_iterations)
            .with_heuristic(HeuristicOracle::from_config(config))
            .with_oracle_timeout(Duration::from_millis(config.oracle_timeout_ms))
    }

    /// Primary oracle. Without one every decision comes from the heuristic.
    pub fn with_oracle(mut self, oracle: Arc<dyn ReasoningOracle>) -> Self {
        self.oracle = Some(oracle);
        self
    }

    pub fn with_heuristic(mut self, heuristic: HeuristicOracle) -> Self {
        self.heuristic = heuristic;
        self
    }

    pub fn with_oracle_timeout(mut self, timeout: Duration) -> Self {
        self.oracle_timeout = timeout;
        self
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    /// Runs `plan` for `query`.
    ///
    /// Iteration `i` executes step `min(i, last)`. After each step, while
    /// iterations remain and the plan asks for reasoning, the oracle decides
    /// whether to stop. `query_embedding` of `None` degrades retrieval steps
    /// to no-ops.
    #[instrument(skip(self, query_embedding, plan), fields(task_type = %plan.task_type))]
    pub async fn execute(
        &self,
        query: &str,
        query_embedding: Option<&[f32]>,
        plan: &TaskPlan
    ) -> ExecutionOutcome {
        let mut context = String::new();
        let mut merged = RetrievalResult::empty();
        let mut seen_nodes: HashSet<String> = HashSet::new();
        let mut seen_edges: HashSet<(String, String)> = HashSet::new();
        let mut history = Vec::new();
        let mut reasoning_trace = Vec::new();
        let mut termination_reason = TerminationReason::MaxIterations;

        for iteration in 0..self.max_iterations {
            let Some(step) = plan.step_for_iteration(iteration) else {
                termination_reason = TerminationReason::EmptyPlan;
                break;
            };
            debug!(
                "Iteration {}/{}: {}",
                iteration + 1,
                self.max_iterations,
                step.action
            );

            let output = self
                .run_step(
                    step.action,
                    query_embedding,
                    &mut merged,
                    &mut seen_nodes,
                    &mut seen_edges
                )
                .await;

            let chars_added = output.text.chars().count();
            if !output.text.is_empty() {
                if !context.is_empty() {
                    context.push_str("\n\n");
                }
                context.push_str(&output.text);
            }
            history.push(IterationRecord {
                iteration: iteration + 1,
                step: step.clone(),
                status: output.status,
                chars_added,
                new_nodes: output.new_nodes
            });

            if plan.reasoning_required && iteration + 1 < self.max_iterations {
                let decision = self
                    .decide(query, context.chars().count(), &step.action.to_string())
                    .await;
                let stop = decision.should_stop;
                reasoning_trace.push(ReasoningTraceEntry {
                    iteration: iteration + 1,
                    decision
                });
                if stop {
                    termination_reason = TerminationReason::OracleStop;
                    break;
                }
            }
        }

        let iterations = history.len();
        merged.depth_reached = merged
            .nodes
            .iter()
            .map(|n| n.depth)
            .max()
            .unwrap_or(0);
        merged.context.clone_from(&context);

        info!(
            "Execution finished after {} iterations ({})",
            iterations, termination_reason
        );
        self.telemetry
            .record_agent_run(iterations, &termination_reason.to_string());

        ExecutionOutcome {
            final_context: context,
            iterations,
            history,
            reasoning_trace,
            termination_reason,
            retrieval: merged
        }
    }

    async fn run_step(
        &self,
        action: StepAction,
        query_embedding: Option<&[f32]>,
        merged: &mut RetrievalResult,
        seen_nodes: &mut HashSet<String>,
        seen_edges: &mut HashSet<(String, String)>
    ) -> StepOutput {
        if !action.retrieves() {
            return StepOutput {
                status: StepStatus::Bookkeeping,
                text: String::new(),
                new_nodes: 0
            };
        }
        let Some(embedding) = query_embedding else {
            warn!("No query embedding, {} contributes nothing", action);
            return StepOutput {
                status: StepStatus::Degraded,
                text: String::new(),
                new_nodes: 0
            };
        };

        let settings = self.retriever.settings();
        let result = match action {
            StepAction::GraphTraversal => {
                self.retriever
                    .retrieve_graph_context(embedding, settings.top_k, settings.max_depth)
                    .await
            }
            StepAction::RefinedRetrieval => {
                self.retriever
                    .retrieve_graph_context(
                        embedding,
                        settings.top_k.saturating_mul(2),
                        settings.max_depth
                    )
                    .await
            }
            _ => {
                self.retriever
                    .retrieve_vector_context(embedding, settings.top_k)
                    .await
            }
        };

        let fresh_nodes: Vec<_> = result
            .nodes
            .into_iter()
            .filter(|n| seen_nodes.insert(n.record.id.clone()))
            .collect();
        let fresh_edges: Vec<TraversedEdge> = result
            .edges
            .into_iter()
            .filter(|e| seen_edges.insert((e.source_id.clone(), e.target_id.clone())))
            .collect();

        let text = render_context(
            &fresh_nodes,
            &fresh_edges,
            settings.max_context_nodes,
            settings.max_context_edges
        );
        let new_nodes = fresh_nodes.len();
        merged.nodes.extend(fresh_nodes);
        merged.edges.extend(fresh_edges);

        StepOutput {
            status: if new_nodes > 0 {
                StepStatus::Retrieved
            } else {
                StepStatus::NothingNew
            },
            text,
            new_nodes
        }
    }

    async fn decide(&self, query: &str, context_chars: usize, last_step: &str) -> ReasoningDecision {
        let Some(oracle) = &self.oracle else {
            return self.heuristic.evaluate(context_chars);
        };

        match tokio::time::timeout(
            self.oracle_timeout,
            oracle.decide(query, context_chars, last_step)
        )
        .await
        {
            Ok(Ok(decision)) => decision,
            Ok(Err(e)) => {
                warn!("Reasoning oracle failed, using heuristic: {}", e);
                self.telemetry.record_oracle_fallback("error");
                self.heuristic.evaluate(context_chars)
            }
            Err(_) => {
                warn!(
                    "Reasoning oracle timed out after {:?}, using heuristic",
                    self.oracle_timeout
                );
                self.telemetry.record_oracle_fallback("timeout");
                self.heuristic.evaluate(context_chars)
            }
        }
    }
}
