//! Check command - deployment readiness
//!
//! Verifies, in order:
//! - the store answers its health check
//! - the collection exists with the configured embedding dimension
//! - the collection holds points
//! - a sample query retrieves a connected context

use agent::RagService;
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use config::Config;
use serde::Serialize;

use crate::output;
use crate::runtime;
use crate::ux_error::UxError;

const SAMPLE_QUERY: &str = "What are the common causes of fever?";

#[derive(Args)]
pub struct CheckArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool
}

#[derive(Debug, Clone, Serialize)]
struct CheckResult {
    name: &'static str,
    passed: bool,
    detail: String
}

impl CheckResult {
    fn new(name: &'static str, passed: bool, detail: impl Into<String>) -> Self {
        Self {
            name,
            passed,
            detail: detail.into()
        }
    }
}

pub async fn run(args: CheckArgs, config: &Config) -> Result<()> {
    let results = run_checks(config).await?;
    let failed = results.iter().filter(|r| !r.passed).count();

    if args.json {
        output::json(&serde_json::json!({
            "store": config.store.url,
            "collection": config.store.collection,
            "checks": results,
            "healthy": failed == 0
        }))?;
    } else {
        output::header("Deployment Check");
        println!();
        output::field("Store", config.store.url.cyan());
        output::field("Collection", config.store.collection.cyan());
        output::field("Embedding", format!("{} ({}d)", config.embedding.model, config.embedding.dimension));
        println!();
        for result in &results {
            output::check_line(result.passed, result.name, &result.detail);
        }
        println!();
    }

    if failed > 0 {
        return Err(UxError::new(format!("{failed} check(s) failed"))
            .fix("Build the collection if it is missing or empty")
            .suggest("medrag build --corpus data.jsonl")
            .into());
    }
    if !args.json {
        println!("{}", "All checks passed".green().bold());
    }
    Ok(())
}

async fn run_checks(config: &Config) -> Result<Vec<CheckResult>> {
    let mut results = Vec::new();

    let handle = runtime::open_store(config).await?;
    let store = handle.as_graph_store();

    let health = store.health_check().await;
    let healthy = health.as_ref().is_ok_and(|h| h.healthy);
    results.push(CheckResult::new(
        "store health",
        healthy,
        match &health {
            Ok(status) => status
                .latency_ms
                .map_or_else(|| status.backend.clone(), |ms| format!("{} in {ms} ms", status.backend)),
            Err(e) => e.to_string()
        }
    ));
    if !healthy {
        return Ok(results);
    }

    let dimension = handle.collection_dimension().await;
    results.push(match dimension {
        Ok(Some(d)) if d == config.embedding.dimension => {
            CheckResult::new("collection dimension", true, format!("{d}"))
        }
        Ok(Some(d)) => CheckResult::new(
            "collection dimension",
            false,
            format!("collection has {d}, embedding model produces {}", config.embedding.dimension)
        ),
        Ok(None) => CheckResult::new("collection dimension", false, "collection does not exist"),
        Err(e) => CheckResult::new("collection dimension", false, e.to_string())
    });

    let count = store.count().await;
    results.push(match &count {
        Ok(n) => CheckResult::new("point count", *n > 0, format!("{n} nodes")),
        Err(e) => CheckResult::new("point count", false, e.to_string())
    });
    if !matches!(count, Ok(n) if n > 0) {
        return Ok(results);
    }

    let embedder = runtime::build_embedder(config)?;
    let service = RagService::from_config(config, embedder, store)
        .map_err(|e| crate::ux_error::config_error(&e.to_string()))?;
    let sample = service.retrieve(SAMPLE_QUERY).await;
    results.push(CheckResult::new(
        "sample retrieval",
        !sample.is_empty(),
        format!(
            "{} nodes, {} edges, depth {}",
            sample.nodes.len(),
            sample.edges.len(),
            sample.depth_reached
        )
    ));

    Ok(results)
}
