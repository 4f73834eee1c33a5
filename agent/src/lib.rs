//! # Agent
//!
//! Query-side orchestration on top of the graph retriever: preprocessing,
//! keyword task planning, the bounded iterative executor with its reasoning
//! oracles, and the answer pipeline.

pub mod executor;
pub mod input;
pub mod oracle;
pub mod planner;
pub mod service;

pub use executor::{
    ExecutionOutcome, IterationRecord, IterativeExecutor, ReasoningTraceEntry, StepStatus,
    TerminationReason
};
pub use input::{DomainContext, InputType, ProcessedInput, clean_text, preprocess, tokenize};
pub use oracle::{
    DecisionSource, HeuristicOracle, LlmReasoningOracle, ReasoningDecision, ReasoningOracle
};
pub use planner::{TaskPlanner, classify, expected_iterations, steps_for};
pub use service::{
    EMPTY_QUERY_MESSAGE, GENERATION_FAILED_MESSAGE, LLM_UNAVAILABLE_MESSAGE, RagResponse,
    RagService, RagSource, build_prompt, context_preview
};
