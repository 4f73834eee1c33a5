use agent::{ProcessedInput, TaskPlanner, preprocess};
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use config::Config;
use rag_core::TaskPlan;
use serde_json::json;

use crate::output;

#[derive(Args)]
pub struct PlanArgs {
    /// Question to classify
    pub text: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool
}

pub fn run(args: PlanArgs, config: &Config) -> Result<()> {
    let input = preprocess(&args.text);
    let plan = TaskPlanner::from_config(&config.agent).plan(&input);

    if args.json {
        return output::json(&to_json(&input, &plan));
    }

    output::header("Task Plan");
    println!();
    output::field("Task type", plan.task_type.to_string().cyan());
    output::field("Input type", input.input_type);
    output::field("Reasoning", plan.reasoning_required);
    output::field("Expected iterations", plan.expected_iterations);
    if !input.domain.medical_keywords.is_empty() {
        output::field("Medical keywords", input.domain.medical_keywords.join(", "));
    }
    if input.domain.is_urgent {
        output::field("Urgency", "flagged".red().bold());
    }
    println!();
    output::subheader("Steps");
    for step in &plan.steps {
        println!(
            "  {}. {} {}",
            step.index,
            step.action.to_string().cyan(),
            step.description.dimmed()
        );
    }
    Ok(())
}

fn to_json(input: &ProcessedInput, plan: &TaskPlan) -> serde_json::Value {
    json!({
        "task_type": plan.task_type,
        "reasoning_required": plan.reasoning_required,
        "expected_iterations": plan.expected_iterations,
        "steps": plan.steps,
        "input": {
            "processed_text": input.processed_text,
            "input_type": input.input_type,
            "medical_keywords": input.domain.medical_keywords,
            "is_urgent": input.domain.is_urgent,
            "entities": input.entities
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_for_comparative_query() {
        let input = preprocess("Why is insulin better than metformin?");
        let plan = TaskPlanner::new(true).plan(&input);

        let value = to_json(&input, &plan);
        assert_eq!(value["task_type"], "comparative_analysis");
        assert_eq!(value["steps"][0]["action"], "extract_comparison_entities");
        assert_eq!(value["steps"].as_array().unwrap().len(), 5);
        assert_eq!(value["input"]["input_type"], "question");
    }
}
