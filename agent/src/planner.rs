//! Keyword classification and static step plans.

use config::AgentConfig;
use rag_core::{PlanStep, StepAction, TaskPlan, TaskType};
use tracing::info;

use crate::input::{ProcessedInput, tokenize};

pub const COMPARISON_WORDS: &[&str] = &["compare", "difference", "versus", "vs", "better"];
pub const REASONING_WORDS: &[&str] = &["why", "how", "explain", "because", "reason"];

/// Inflections accepted after a keyword stem ("explained", "differences").
const SUFFIXES: &[&str] = &["s", "d", "es", "ed", "ing"];

fn mentions(tokens: &[String], words: &[&str]) -> bool {
    tokens.iter().any(|token| {
        words.iter().any(|word| {
            token == word
                || token
                    .strip_prefix(word)
                    .is_some_and(|rest| SUFFIXES.contains(&rest))
        })
    })
}

/// Classifies a query. Precedence, highest first: comparative analysis,
/// multi-step reasoning, graph-augmented retrieval, simple retrieval.
pub fn classify(query: &str, has_domain_context: bool) -> TaskType {
    let tokens = tokenize(query);
    if mentions(&tokens, COMPARISON_WORDS) {
        TaskType::ComparativeAnalysis
    } else if mentions(&tokens, REASONING_WORDS) {
        TaskType::MultiStepReasoning
    } else if has_domain_context {
        TaskType::GraphRag
    } else {
        TaskType::SimpleRetrieval
    }
}

fn step_table(task_type: TaskType) -> &'static [(StepAction, &'static str)] {
    match task_type {
        TaskType::SimpleRetrieval => &[
            (StepAction::VectorRetrieval, "Retrieve relevant documents"),
            (StepAction::ContextIntegration, "Integrate retrieved context"),
            (StepAction::GenerateResponse, "Generate final response")
        ],
        TaskType::GraphRag => &[
            (StepAction::EntityExtraction, "Extract medical entities"),
            (StepAction::VectorRetrieval, "Retrieve relevant documents"),
            (StepAction::GraphTraversal, "Traverse knowledge graph"),
            (StepAction::ContextIntegration, "Integrate vector and graph contexts"),
            (StepAction::GenerateResponse, "Generate final response")
        ],
        TaskType::MultiStepReasoning => &[
            (StepAction::InitialRetrieval, "Initial document retrieval"),
            (StepAction::Reasoning, "Agentic reasoning step"),
            (StepAction::RefinedRetrieval, "Refined retrieval based on reasoning"),
            (StepAction::ContextIntegration, "Integrate all contexts"),
            (StepAction::GenerateResponse, "Generate final response")
        ],
        TaskType::ComparativeAnalysis => &[
            (StepAction::ExtractComparisonEntities, "Extract entities to compare"),
            (StepAction::ParallelRetrieval, "Retrieve information for each entity"),
            (StepAction::GraphTraversal, "Find relationships between entities"),
            (StepAction::ComparativeIntegration, "Integrate comparative context"),
            (StepAction::GenerateResponse, "Generate comparative response")
        ]
    }
}

/// Ordered steps for `task_type`, numbered from 1.
pub fn steps_for(task_type: TaskType) -> Vec<PlanStep> {
    step_table(task_type)
        .iter()
        .enumerate()
        .map(|(position, (action, description))| PlanStep {
            index: position + 1,
            action: *action,
            description: (*description).to_string()
        })
        .collect()
}

pub fn expected_iterations(task_type: TaskType) -> usize {
    match task_type {
        TaskType::SimpleRetrieval => 1,
        TaskType::GraphRag | TaskType::ComparativeAnalysis => 2,
        TaskType::MultiStepReasoning => 3
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TaskPlanner {
    reasoning_enabled: bool
}

impl TaskPlanner {
    pub fn new(reasoning_enabled: bool) -> Self {
        Self { reasoning_enabled }
    }

    pub fn from_config(config: &AgentConfig) -> Self {
        Self::new(config.reasoning_enabled)
    }

    pub fn plan(&self, input: &ProcessedInput) -> TaskPlan {
        let task_type = classify(&input.processed_text, input.domain.has_domain_context);
        let plan = self.plan_for(task_type);
        info!("Task planned: {}", task_type);
        plan
    }

    pub fn plan_for(&self, task_type: TaskType) -> TaskPlan {
        TaskPlan {
            task_type,
            steps: steps_for(task_type),
            reasoning_required: self.reasoning_enabled && task_type != TaskType::SimpleRetrieval,
            expected_iterations: expected_iterations(task_type)
        }
    }
}
