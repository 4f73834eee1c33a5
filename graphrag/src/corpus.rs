//! JSON Lines corpus ingestion.
//!
//! One object per line with `question`, `answer` and optional `id`,
//! `metadata` and `reasoning_chain`. The capitalized field names used by
//! the medical-o1 reasoning dataset (`Question`, `Response`, `Complex_CoT`)
//! are accepted as aliases.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::io::BufRead;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum CorpusError {
    #[error("Cannot read corpus {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorpusEntry {
    #[serde(default)]
    pub id: Option<String>,

    #[serde(default, alias = "Question")]
    pub question: String,

    #[serde(default, alias = "response", alias = "Response")]
    pub answer: String,

    #[serde(default)]
    pub metadata: HashMap<String, Value>,

    #[serde(default, alias = "Complex_CoT", skip_serializing_if = "Option::is_none")]
    pub reasoning_chain: Option<String>
}

impl CorpusEntry {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            id: None,
            question: question.into(),
            answer: answer.into(),
            metadata: HashMap::new(),
            reasoning_chain: None
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Both text fields are non-blank.
    pub fn is_valid(&self) -> bool {
        !self.question.trim().is_empty() && !self.answer.trim().is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Corpus {
    pub entries: Vec<CorpusEntry>,
    pub malformed_lines: usize
}

/// Length statistics over the valid entries of a corpus.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CorpusStats {
    pub total: usize,
    pub valid: usize,
    pub avg_question_len: f64,
    pub avg_answer_len: f64,
    pub min_question_len: usize,
    pub max_question_len: usize,
    pub min_answer_len: usize,
    pub max_answer_len: usize
}

pub fn load_jsonl(path: &Path) -> Result<Corpus, CorpusError> {
    let file = std::fs::File::open(path).map_err(|source| CorpusError::Io {
        path: path.to_path_buf(),
        source
    })?;
    let source_name = path
        .file_stem()
        .map_or_else(|| "corpus".to_string(), |s| s.to_string_lossy().into_owned());

    let corpus = parse_jsonl(std::io::BufReader::new(file), &source_name).map_err(|source| {
        CorpusError::Io {
            path: path.to_path_buf(),
            source
        }
    })?;

    info!(
        "Loaded {} entries from {} ({} malformed lines)",
        corpus.entries.len(),
        path.display(),
        corpus.malformed_lines
    );
    Ok(corpus)
}

/// Parses JSON Lines. Blank lines are ignored; lines that are not a corpus
/// object are counted in `malformed_lines`. Entries without an id get
/// `qa_{index}`, where `index` is the entry's position in the dataset.
pub fn parse_jsonl(reader: impl BufRead, source: &str) -> std::io::Result<Corpus> {
    let mut corpus = Corpus::default();

    for (line_number, raw) in reader.split(b'\n').enumerate() {
        let raw = raw?;
        let line = match std::str::from_utf8(&raw) {
            Ok(line) => line,
            Err(e) => {
                warn!("Skipping non UTF-8 corpus line {}: {}", line_number + 1, e);
                corpus.malformed_lines += 1;
                continue;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let mut entry: CorpusEntry = match serde_json::from_str(line) {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping malformed corpus line {}: {}", line_number + 1, e);
                corpus.malformed_lines += 1;
                continue;
            }
        };

        let index = corpus.entries.len();
        if entry.id.is_none() {
            entry.id = Some(format!("qa_{index}"));
        }
        entry
            .metadata
            .entry("dataset_index".to_string())
            .or_insert_with(|| Value::from(index));
        entry
            .metadata
            .entry("source".to_string())
            .or_insert_with(|| Value::from(source));
        if let Some(chain) = entry.reasoning_chain.take() {
            entry
                .metadata
                .insert("reasoning_chain".to_string(), Value::from(chain));
        }

        corpus.entries.push(entry);
    }

    Ok(corpus)
}

pub fn statistics(entries: &[CorpusEntry]) -> CorpusStats {
    let valid: Vec<&CorpusEntry> = entries.iter().filter(|e| e.is_valid()).collect();
    if valid.is_empty() {
        return CorpusStats {
            total: entries.len(),
            ..CorpusStats::default()
        };
    }

    let question_lens: Vec<usize> = valid.iter().map(|e| e.question.chars().count()).collect();
    let answer_lens: Vec<usize> = valid.iter().map(|e| e.answer.chars().count()).collect();
    let count = valid.len() as f64;

    CorpusStats {
        total: entries.len(),
        valid: valid.len(),
        avg_question_len: question_lens.iter().sum::<usize>() as f64 / count,
        avg_answer_len: answer_lens.iter().sum::<usize>() as f64 / count,
        min_question_len: question_lens.iter().copied().min().unwrap_or(0),
        max_question_len: question_lens.iter().copied().max().unwrap_or(0),
        min_answer_len: answer_lens.iter().copied().min().unwrap_or(0),
        max_answer_len: answer_lens.iter().copied().max().unwrap_or(0)
    }
}
