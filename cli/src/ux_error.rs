use colored::Colorize;

#[derive(Debug)]
pub struct UxError {
    pub what: String,
    pub why: Option<String>,
    pub how_to_fix: Vec<String>,
    pub suggested_command: Option<String>
}

impl UxError {
    pub fn new(what: impl Into<String>) -> Self {
        Self {
            what: what.into(),
            why: None,
            how_to_fix: Vec::new(),
            suggested_command: None
        }
    }

    pub fn why(mut self, reason: impl Into<String>) -> Self {
        self.why = Some(reason.into());
        self
    }

    pub fn fix(mut self, suggestion: impl Into<String>) -> Self {
        self.how_to_fix.push(suggestion.into());
        self
    }

    pub fn suggest(mut self, cmd: impl Into<String>) -> Self {
        self.suggested_command = Some(cmd.into());
        self
    }

    pub fn display(&self) {
        eprintln!();
        eprintln!("{} {}", "error:".red().bold(), self.what.white().bold());

        if let Some(why) = &self.why {
            eprintln!("       {}", why.dimmed());
        }

        if !self.how_to_fix.is_empty() {
            eprintln!();
            eprintln!("{}", "How to fix:".yellow().bold());
            for (i, fix) in self.how_to_fix.iter().enumerate() {
                eprintln!("  {}. {}", i + 1, fix);
            }
        }

        if let Some(cmd) = &self.suggested_command {
            eprintln!();
            eprintln!("{}", "Try this:".green().bold());
            eprintln!("  $ {}", cmd.cyan());
        }
        eprintln!();
    }
}

impl std::fmt::Display for UxError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.what)
    }
}

impl std::error::Error for UxError {}

pub fn config_error(message: &str) -> UxError {
    UxError::new(format!("Configuration error: {message}"))
        .why("The configuration file, MEDRAG_* variables or flags contain an invalid value")
        .fix("Check the file passed with --config")
        .fix("Run the validator to see every resolved value")
        .suggest("medrag config validate")
}

pub fn config_file_error(path: &str, reason: &str) -> UxError {
    UxError::new(format!("Cannot load config file '{path}'"))
        .why(reason.to_string())
        .fix("Use a .toml, .yaml or .yml file")
        .fix("Omit --config to run on defaults and MEDRAG_* variables")
        .suggest("medrag config show")
}

pub fn dimension_mismatch(embedding: usize, store: usize) -> UxError {
    UxError::new(format!(
        "Embedding dimension {embedding} does not match the store dimension {store}"
    ))
    .why("Query and node embeddings must come from the same model")
    .fix("Set MEDRAG_EMBEDDING_DIMENSION to the model's output size")
    .fix("Or rebuild the collection with the current model")
    .suggest("medrag build --corpus data.jsonl --drop-existing")
}

pub fn store_unavailable(url: &str, reason: &str) -> UxError {
    UxError::new(format!("Cannot reach the vector store at {url}"))
        .why(reason.to_string())
        .fix("Start Qdrant, e.g. docker run -p 6334:6334 qdrant/qdrant")
        .fix("Point MEDRAG_STORE_URL at the gRPC port")
        .suggest("medrag check")
}

pub fn corpus_not_found(path: &str, reason: &str) -> UxError {
    UxError::new(format!("Cannot read corpus '{path}'"))
        .why(reason.to_string())
        .fix("Pass a JSON Lines file with one {\"question\", \"answer\"} object per line")
        .suggest("medrag build --corpus ./medical_qa.jsonl")
}

pub fn embedding_unavailable(reason: &str) -> UxError {
    UxError::new("Embedding service is not usable")
        .why(reason.to_string())
        .fix("Check MEDRAG_EMBEDDING_BASE_URL and MEDRAG_EMBEDDING_API_KEY")
        .fix("Use MEDRAG_EMBEDDING_PROVIDER=mock for offline experiments")
}
