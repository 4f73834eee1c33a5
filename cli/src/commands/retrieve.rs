use agent::RagService;
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use config::Config;
use rag_core::{NodeOrigin, RetrievalResult};
use serde_json::json;

use crate::output;
use crate::runtime;

#[derive(Args)]
pub struct RetrieveArgs {
    /// Question to retrieve context for
    pub text: String,

    /// Seed nodes from the vector search
    #[arg(long)]
    pub top_k: Option<usize>,

    /// Graph expansion depth; 0 returns seeds only
    #[arg(long)]
    pub max_depth: Option<usize>,

    /// Output nodes, edges and context as JSON
    #[arg(long)]
    pub json: bool
}

pub async fn run(args: RetrieveArgs, config: &Config) -> Result<()> {
    runtime::validated(config)?;
    let handle = runtime::open_store(config).await?;
    let embedder = runtime::build_embedder(config)?;
    let service = RagService::from_config(config, embedder, handle.as_graph_store())
        .map_err(|e| crate::ux_error::config_error(&e.to_string()))?;

    let top_k = args.top_k.unwrap_or(config.retrieval.top_k);
    let max_depth = args.max_depth.unwrap_or(config.retrieval.max_depth);
    let result = service.retrieve_graph_context(&args.text, top_k, max_depth).await;

    if args.json {
        return output::json(&to_json(&result));
    }

    output::header("Retrieved Context");
    println!();
    output::field("Seeds", result.seed_count());
    output::field("Expanded", result.nodes.len() - result.seed_count());
    output::field("Edges", result.edges.len());
    output::field("Depth reached", result.depth_reached);
    println!();
    if result.is_empty() {
        output::hint("nothing matched; check that the collection was built with the same model");
    } else {
        println!("{}", result.context.dimmed());
    }
    Ok(())
}

fn to_json(result: &RetrievalResult) -> serde_json::Value {
    json!({
        "nodes": result.nodes.iter().map(|n| json!({
            "id": n.record.id,
            "question": n.record.question,
            "similarity": n.similarity,
            "depth": n.depth,
            "seed": n.origin == NodeOrigin::Seed
        })).collect::<Vec<_>>(),
        "edges": result.edges,
        "depth_reached": result.depth_reached,
        "context": result.context
    })
}
