pub mod build;
pub mod check;
pub mod plan;
pub mod query;
pub mod retrieve;
pub mod settings;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "medrag",
    author,
    version,
    about = "medrag - medical Q&A knowledge graph builder and retriever",
    long_about = "Builds a similarity graph over medical question/answer pairs and answers \
                  questions with seed search plus graph expansion.\n\nSettings come from \
                  defaults, medrag.toml, MEDRAG_* environment variables and flags, in that \
                  order."
)]
pub struct Cli {
    /// Configuration file (.toml, .yaml or .yml)
    #[arg(long, global = true, env = "MEDRAG_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log output format
    #[arg(long, global = true, value_enum)]
    pub log_format: Option<LogFormatArg>,

    /// Debug-level logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Json
}

impl From<LogFormatArg> for config::LogFormat {
    fn from(value: LogFormatArg) -> Self {
        match value {
            LogFormatArg::Pretty => Self::Pretty,
            LogFormatArg::Json => Self::Json
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Embed a JSON Lines corpus and write the similarity graph")]
    Build(build::BuildArgs),

    #[command(about = "Answer a question with the full retrieval and generation pipeline")]
    Query(query::QueryArgs),

    #[command(about = "Show the retrieved context for a question without generating")]
    Retrieve(retrieve::RetrieveArgs),

    #[command(about = "Show the task classification and step plan for a question")]
    Plan(plan::PlanArgs),

    #[command(about = "Check store health, collection schema and a sample retrieval")]
    Check(check::CheckArgs),

    #[command(subcommand, about = "Show or validate the resolved configuration")]
    Config(settings::ConfigCommand)
}
