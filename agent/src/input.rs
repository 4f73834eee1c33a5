//! Query preprocessing: normalization and lightweight domain signals.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

const MEDICAL_KEYWORDS: &[&str] = &[
    "symptom",
    "pain",
    "fever",
    "headache",
    "diagnosis",
    "treatment",
    "patient",
    "medical",
    "disease",
    "condition",
    "illness",
    "sick",
    "ache",
    "nausea",
    "dizziness",
    "fatigue",
    "cough",
    "breath"
];

const URGENCY_KEYWORDS: &[&str] = &["urgent", "emergency", "severe", "critical", "immediate"];

const QUESTION_WORDS: &[&str] = &["what", "how", "why", "when", "where", "who"];
const MEDICAL_QUERY_WORDS: &[&str] = &[
    "diagnose",
    "diagnosis",
    "treatment",
    "treat",
    "cure",
    "medicine"
];
const SYMPTOM_WORDS: &[&str] = &["symptom", "symptoms", "feeling", "feel"];

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum InputType {
    Question,
    MedicalQuery,
    SymptomDescription,
    General
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DomainContext {
    pub medical_keywords: Vec<String>,
    pub is_urgent: bool,
    pub is_question: bool,
    pub has_domain_context: bool
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedInput {
    pub original_text: String,
    pub processed_text: String,
    pub domain: DomainContext,
    pub input_type: InputType,
    pub entities: Vec<String>,
    pub word_count: usize
}

impl ProcessedInput {
    pub fn is_empty(&self) -> bool {
        self.processed_text.is_empty()
    }
}

/// Lowercased alphanumeric tokens.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Collapses whitespace and drops everything but word characters,
/// whitespace and `. , ! ? - :`.
pub fn clean_text(text: &str) -> String {
    let collapsed = match regex::Regex::new(r"\s+") {
        Ok(re) => re.replace_all(text, " ").to_string(),
        Err(_) => text.to_string()
    };
    let stripped = match regex::Regex::new(r"[^\w\s.,!?\-:]") {
        Ok(re) => re.replace_all(&collapsed, "").to_string(),
        Err(_) => collapsed
    };
    stripped.trim().to_string()
}

pub fn preprocess(user_input: &str) -> ProcessedInput {
    let processed_text = clean_text(user_input);
    let lower = processed_text.to_lowercase();
    let tokens = tokenize(&processed_text);

    let medical_keywords: Vec<String> = MEDICAL_KEYWORDS
        .iter()
        .filter(|kw| lower.contains(*kw))
        .map(|kw| (*kw).to_string())
        .collect();

    let domain = DomainContext {
        has_domain_context: !medical_keywords.is_empty(),
        medical_keywords,
        is_urgent: URGENCY_KEYWORDS.iter().any(|kw| lower.contains(kw)),
        is_question: processed_text.ends_with('?')
    };

    let has_any = |words: &[&str]| tokens.iter().any(|t| words.contains(&t.as_str()));
    let input_type = if has_any(QUESTION_WORDS) {
        InputType::Question
    } else if has_any(MEDICAL_QUERY_WORDS) {
        InputType::MedicalQuery
    } else if has_any(SYMPTOM_WORDS) {
        InputType::SymptomDescription
    } else {
        InputType::General
    };

    let entities = processed_text
        .split_whitespace()
        .filter(|w| w.chars().next().is_some_and(char::is_uppercase) && w.chars().count() > 3)
        .map(str::to_string)
        .collect();

    ProcessedInput {
        original_text: user_input.to_string(),
        word_count: processed_text.split_whitespace().count(),
        processed_text,
        domain,
        input_type,
        entities
    }
}
