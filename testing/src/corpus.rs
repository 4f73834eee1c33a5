use rag_core::NodeEmbeddings;

/// `(id, question, answer)` triples covering a few overlapping topics.
pub const SAMPLE_QA: &[(&str, &str, &str)] = &[
    (
        "qa_0",
        "What are common causes of fever in adults?",
        "Fever in adults is most often caused by viral or bacterial infection."
    ),
    (
        "qa_1",
        "When should a fever with cough be checked by a doctor?",
        "A fever with cough lasting more than three days, or with shortness of breath, needs a doctor."
    ),
    (
        "qa_2",
        "How is type 1 diabetes treated?",
        "Type 1 diabetes is treated with lifelong insulin therapy and blood glucose monitoring."
    ),
    (
        "qa_3",
        "Why do people with diabetes check their blood sugar?",
        "Checking blood glucose guides insulin dosing and prevents dangerous highs and lows."
    ),
    (
        "qa_4",
        "What does chest pain near the heart indicate?",
        "Chest pain can signal a heart problem and severe pain needs emergency care."
    ),
    (
        "qa_5",
        "How can seasonal allergy symptoms be reduced?",
        "Antihistamines and avoiding pollen reduce seasonal allergy symptoms."
    )
];

/// [`SAMPLE_QA`] as JSON Lines, without ids.
pub fn sample_corpus_jsonl() -> String {
    SAMPLE_QA
        .iter()
        .map(|(_, question, answer)| {
            format!("{{\"question\": \"{question}\", \"answer\": \"{answer}\"}}")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// The same vector in all three fields.
pub fn uniform_embeddings(vector: &[f32]) -> NodeEmbeddings {
    NodeEmbeddings {
        question: vector.to_vec(),
        answer: vector.to_vec(),
        combined: vector.to_vec()
    }
}

/// Unit vectors A, B, C where cos(A, B) = 0.9 and C has cosine 0.1 to both.
pub fn three_record_vectors() -> [[f32; 3]; 3] {
    let b_y = (1.0_f32 - 0.81).sqrt();
    let c_y = (0.1 - 0.09) / b_y;
    let c_z = (1.0 - 0.01 - c_y * c_y).sqrt();
    [[1.0, 0.0, 0.0], [0.9, b_y, 0.0], [0.1, c_y, c_z]]
}
