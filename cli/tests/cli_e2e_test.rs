use assert_cmd::{Command, cargo_bin_cmd};
use predicates::prelude::{PredicateBooleanExt, predicate};
use std::io::Write;
use tempfile::TempDir;

/// `medrag` running in an empty directory against the in-memory store and
/// the mock embedder.
fn medrag(dir: &TempDir) -> Command {
    let mut cmd = cargo_bin_cmd!("medrag");
    cmd.current_dir(dir.path())
        .env_remove("MEDRAG_CONFIG")
        .env_remove("MEDRAG_LLM_BASE_URL")
        .env_remove("MEDRAG_LLM_FALLBACK_BASE_URL")
        .env("MEDRAG_STORE_URL", "memory://")
        .env("MEDRAG_EMBEDDING_PROVIDER", "mock")
        .env("MEDRAG_EMBEDDING_MODEL", "mock-keywords")
        .env("MEDRAG_EMBEDDING_DIMENSION", "16")
        .env("NO_COLOR", "1");
    cmd
}

fn write_file(dir: &TempDir, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    path
}

mod help_and_version {
    use super::*;

    #[test]
    fn test_help_lists_commands() {
        let dir = TempDir::new().unwrap();
        medrag(&dir)
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("build"))
            .stdout(predicate::str::contains("retrieve"))
            .stdout(predicate::str::contains("plan"))
            .stdout(predicate::str::contains("check"));
    }

    #[test]
    fn test_version_flag() {
        let dir = TempDir::new().unwrap();
        medrag(&dir)
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("medrag"));
    }

    #[test]
    fn test_no_args_shows_usage() {
        let dir = TempDir::new().unwrap();
        medrag(&dir)
            .assert()
            .failure()
            .stderr(predicate::str::contains("Usage:"));
    }
}

mod plan_subcommand {
    use super::*;

    #[test]
    fn test_comparative_wins_over_reasoning() {
        let dir = TempDir::new().unwrap();
        medrag(&dir)
            .args(["plan", "Why is insulin better than metformin?", "--json"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"task_type\": \"comparative_analysis\""))
            .stdout(predicate::str::contains("extract_comparison_entities"));
    }

    #[test]
    fn test_text_output_lists_steps() {
        let dir = TempDir::new().unwrap();
        medrag(&dir)
            .args(["plan", "fever with severe headache"])
            .assert()
            .success()
            .stdout(predicate::str::contains("graph_rag"))
            .stdout(predicate::str::contains("Traverse knowledge graph"));
    }
}

mod config_subcommand {
    use super::*;

    #[test]
    fn test_show_reads_file_and_redacts() {
        let dir = TempDir::new().unwrap();
        let path = write_file(
            &dir,
            "custom.toml",
            "[store]\ncollection = \"cardiology_qa\"\napi_key = \"very-secret\"\n"
        );

        medrag(&dir)
            .args(["config", "show", "--file"])
            .arg(&path)
            .assert()
            .success()
            .stdout(predicate::str::contains("cardiology_qa"))
            .stdout(predicate::str::contains("very-secret").not());
    }

    #[test]
    fn test_validate_rejects_out_of_range_threshold() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "bad.toml", "[graph]\nsimilarity_threshold = 1.5\n");

        medrag(&dir)
            .args(["--config"])
            .arg(&path)
            .args(["config", "validate"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Configuration error"));
    }

    #[test]
    fn test_validate_defaults_with_mock_embedder() {
        let dir = TempDir::new().unwrap();
        medrag(&dir)
            .args(["config", "validate"])
            .assert()
            .success()
            .stdout(predicate::str::contains("valid"));
    }
}

mod build_subcommand {
    use super::*;

    #[test]
    fn test_build_sample_corpus_in_memory() {
        let dir = TempDir::new().unwrap();
        let corpus = write_file(&dir, "qa.jsonl", &testing::sample_corpus_jsonl());

        medrag(&dir)
            .args(["build", "--corpus"])
            .arg(&corpus)
            .args(["--threshold", "0.5", "--json"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"written\": 6"))
            .stdout(predicate::str::contains("\"malformed_lines\": 0"));
    }

    #[test]
    fn test_malformed_lines_are_skipped() {
        let dir = TempDir::new().unwrap();
        let mut contents = testing::sample_corpus_jsonl();
        contents.push_str("\nnot json at all\n");
        let corpus = write_file(&dir, "qa.jsonl", &contents);

        medrag(&dir)
            .args(["build", "--json", "--corpus"])
            .arg(&corpus)
            .assert()
            .success()
            .stdout(predicate::str::contains("\"malformed_lines\": 1"));
    }

    #[test]
    fn test_missing_corpus_fails() {
        let dir = TempDir::new().unwrap();
        medrag(&dir)
            .args(["build", "--corpus", "does-not-exist.jsonl"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Cannot read corpus"));
    }
}

mod query_subcommands {
    use super::*;

    #[test]
    fn test_retrieve_on_empty_store_is_empty_not_error() {
        let dir = TempDir::new().unwrap();
        medrag(&dir)
            .args(["retrieve", "What causes fever?", "--json"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"depth_reached\": 0"))
            .stdout(predicate::str::contains("\"context\": \"\""));
    }

    #[test]
    fn test_query_without_llm_degrades() {
        let dir = TempDir::new().unwrap();
        medrag(&dir)
            .args(["query", "What causes fever?", "--json"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"degraded\": true"));
    }

    #[test]
    fn test_check_reports_empty_collection() {
        let dir = TempDir::new().unwrap();
        medrag(&dir)
            .args(["check"])
            .assert()
            .failure()
            .stdout(predicate::str::contains("point count"));
    }
}
