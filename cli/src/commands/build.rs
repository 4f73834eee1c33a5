use anyhow::Result;
use clap::Args;
use colored::Colorize;
use config::Config;
use graphrag::{BuildOptions, GraphBuilder, load_jsonl, statistics};
use rag_core::BuildReport;
use std::path::PathBuf;
use tracing::info;

use crate::output;
use crate::runtime::{self, StoreHandle};
use crate::ux_error;

#[derive(Args)]
pub struct BuildArgs {
    /// JSON Lines corpus, one {"question", "answer"} object per line
    #[arg(long)]
    pub corpus: PathBuf,

    /// Minimum cosine similarity for an edge
    #[arg(long)]
    pub threshold: Option<f32>,

    /// Texts per embedding request
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Maximum neighbours kept per node
    #[arg(long)]
    pub fan_out: Option<usize>,

    /// Delete and recreate the collection first
    #[arg(long)]
    pub drop_existing: bool,

    /// Output the report as JSON
    #[arg(long)]
    pub json: bool
}

impl BuildArgs {
    fn options(&self, config: &Config) -> BuildOptions {
        let mut options = BuildOptions::from_config(config);
        if let Some(threshold) = self.threshold {
            options.similarity_threshold = threshold;
        }
        if let Some(batch_size) = self.batch_size {
            options.batch_size = batch_size;
        }
        if let Some(fan_out) = self.fan_out {
            options.fan_out_cap = fan_out;
        }
        options.drop_existing = self.drop_existing;
        options
    }
}

pub async fn run(args: BuildArgs, config: &Config) -> Result<()> {
    runtime::validated(config)?;

    let corpus = load_jsonl(&args.corpus).map_err(|e| {
        ux_error::corpus_not_found(&args.corpus.display().to_string(), &e.to_string())
    })?;
    if corpus.malformed_lines > 0 {
        output::warn(&format!(
            "{} malformed lines skipped in {}",
            corpus.malformed_lines,
            args.corpus.display()
        ));
    }
    let stats = statistics(&corpus.entries);
    info!(
        "Loaded {} records ({} valid) from {}",
        stats.total,
        stats.valid,
        args.corpus.display()
    );

    let handle = runtime::open_store(config).await?;
    if handle.is_ephemeral() {
        output::warn("memory:// store selected; the graph is discarded when the command exits");
    }
    let embedder = runtime::build_embedder(config)?;
    let builder = GraphBuilder::new(handle.as_graph_store(), embedder)
        .map_err(|e| build_error(config, &handle, e))?;

    let report = builder
        .build(&corpus.entries, &args.options(config))
        .await
        .map_err(|e| build_error(config, &handle, e))?;

    if args.json {
        return output::json(&serde_json::json!({
            "corpus": args.corpus.display().to_string(),
            "collection": config.store.collection,
            "malformed_lines": corpus.malformed_lines,
            "report": report
        }));
    }

    print_report(&report, &config.store.collection);
    Ok(())
}

fn build_error(config: &Config, handle: &StoreHandle, err: errors::BuildError) -> anyhow::Error {
    match err {
        errors::BuildError::Configuration(errors::ConfigurationError::DimensionMismatch {
            embedding,
            store
        }) => ux_error::dimension_mismatch(embedding, store).into(),
        errors::BuildError::Store(store_err) if !handle.is_ephemeral() => {
            runtime::store_error(&config.store.url, store_err).into()
        }
        other => other.into()
    }
}

fn print_report(report: &BuildReport, collection: &str) {
    output::header("Graph Build");
    println!();
    output::field("Collection", collection.cyan());
    output::field("Records read", report.total_input);
    output::field("Nodes written", report.written.to_string().green());
    output::field("Edges", report.edges);
    output::field("Nodes with edges", report.nodes_with_edges);
    output::field("Max fan-out", report.max_fan_out);
    output::field("Truncated texts", report.truncated);
    output::field("Duration", format!("{} ms", report.duration_ms));

    if report.total_skipped() > 0 || report.embedding_batches_failed > 0 {
        println!();
        output::subheader("Skipped");
        output::field("Invalid", report.skipped_invalid);
        output::field("Duplicate ids", report.skipped_duplicate);
        output::field("Embedding failures", report.skipped_embedding);
        output::field("Failed writes", report.failed_writes);
        output::field("Failed batches", report.embedding_batches_failed);
    }
}
