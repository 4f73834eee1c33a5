use agent::{RagResponse, RagService};
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use config::Config;

use crate::output;
use crate::runtime;

#[derive(Args)]
pub struct QueryArgs {
    /// The doctor's question
    pub text: String,

    /// Output the full response as JSON
    #[arg(long)]
    pub json: bool
}

pub async fn run(args: QueryArgs, config: &Config) -> Result<()> {
    runtime::validated(config)?;
    if config.llm.providers.is_empty() {
        output::warn("no LLM provider configured; only the retrieved context is returned");
    }

    let handle = runtime::open_store(config).await?;
    let embedder = runtime::build_embedder(config)?;
    let service = RagService::from_config(config, embedder, handle.as_graph_store())
        .map_err(|e| crate::ux_error::config_error(&e.to_string()))?;

    let response = service.answer(&args.text).await;

    if args.json {
        return output::json(&response);
    }
    print_response(&response);
    Ok(())
}

fn print_response(response: &RagResponse) {
    output::header("Answer");
    println!();
    println!("{}", response.answer);
    println!();

    output::subheader("Retrieval");
    output::field("Task type", response.task_type.to_string().cyan());
    output::field("Iterations", response.iterations);
    output::field("Nodes", response.nodes_found);
    output::field("Edges", response.edges_found);
    output::field("Depth reached", response.depth_reached);
    if response.degraded {
        output::field("Status", "degraded".yellow());
    }

    if !response.sources.is_empty() {
        println!();
        output::subheader("Sources");
        for source in &response.sources {
            if source.depth == 0 {
                println!("  {} {}", source.id.cyan(), format!("({:.3})", source.similarity).dimmed());
            } else {
                println!("  {} {}", source.id.cyan(), format!("(hop {})", source.depth).dimmed());
            }
        }
    }
}
