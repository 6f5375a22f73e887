use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use tempfile::tempdir;

const PARAGRAPHS: &str = "Paragraph one.\n\nParagraph two.\n\nParagraph three.";

#[allow(deprecated)]
fn cli() -> Command {
    let mut cmd = Command::cargo_bin("context-chunk").expect("binary");
    cmd.env_remove("CONTEXT_CHUNKER_CONFIG").env_remove("RUST_LOG");
    cmd
}

fn stdout_json(output: &std::process::Output) -> Value {
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("valid json")
}

#[test]
fn chunk_reads_plain_text_from_stdin() {
    let output = cli()
        .arg("chunk")
        .write_stdin("Just a short note.")
        .output()
        .expect("command run");

    let chunks = stdout_json(&output);
    let chunks = chunks.as_array().expect("array");
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0]["text"], "Just a short note.");
    assert_eq!(chunks[0]["metadata"]["chunkIndex"], 0);
    assert_eq!(chunks[0]["metadata"]["totalChunks"], 1);
    assert_eq!(chunks[0]["metadata"]["contentType"], "documentation");
}

#[test]
fn chunk_file_with_size_flags() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("notes.md");
    fs::write(&path, PARAGRAPHS).unwrap();

    let output = cli()
        .args(["chunk", "--chunk-size", "20", "--chunk-overlap", "5", "--preserve-lines"])
        .arg(&path)
        .output()
        .expect("command run");

    let chunks = stdout_json(&output);
    let texts: Vec<&str> = chunks
        .as_array()
        .expect("array")
        .iter()
        .map(|c| c["text"].as_str().unwrap_or_default())
        .collect();
    assert_eq!(texts, vec!["Paragraph one.", "Paragraph two.", "Paragraph three."]);
}

#[test]
fn chunk_document_merges_metadata() {
    let document = r#"{"text": "Step 1: Install the tool.", "metadata": {"source": "a.md", "lang": "en"}}"#;

    let output = cli()
        .args(["chunk", "--document", "--metadata", r#"{"source": "b.md"}"#, "-"])
        .write_stdin(document)
        .output()
        .expect("command run");

    let chunks = stdout_json(&output);
    let metadata = &chunks[0]["metadata"];
    assert_eq!(metadata["source"], "b.md");
    assert_eq!(metadata["lang"], "en");
    assert_eq!(metadata["hasSteps"], true);
    assert_eq!(metadata["contentType"], "instructions");
}

#[test]
fn config_file_is_layered_under_flags() {
    let temp = tempdir().unwrap();
    let config = temp.path().join("chunker.toml");
    fs::write(
        &config,
        "[chunking]\nchunk_size = 5000\nwhitespace = \"preserve_lines\"\n",
    )
    .unwrap();

    let output = cli()
        .arg("chunk")
        .arg("--config")
        .arg(&config)
        .args(["--chunk-size", "20", "--chunk-overlap", "5"])
        .write_stdin(PARAGRAPHS)
        .output()
        .expect("command run");
    assert_eq!(stdout_json(&output).as_array().expect("array").len(), 3);

    let output = cli()
        .arg("chunk")
        .env("CONTEXT_CHUNKER_CONFIG", &config)
        .write_stdin(PARAGRAPHS)
        .output()
        .expect("command run");
    let chunks = stdout_json(&output);
    assert_eq!(chunks.as_array().expect("array").len(), 1);
    assert_eq!(chunks[0]["text"], PARAGRAPHS);
}

#[test]
fn non_document_json_yields_no_chunks() {
    for payload in ["[1, 2]", "5", "null"] {
        cli()
            .args(["chunk", "--document"])
            .write_stdin(payload)
            .assert()
            .success()
            .stdout("[]\n");
    }
}

#[test]
fn stats_go_to_stderr() {
    cli()
        .args(["chunk", "--stats"])
        .write_stdin("A single sentence.")
        .assert()
        .success()
        .stderr(predicate::str::contains("Chunks: 1"))
        .stdout(predicate::str::starts_with("["));
}

#[test]
fn invalid_input_fails() {
    cli()
        .args(["chunk", "--chunk-size", "0"])
        .write_stdin("text")
        .assert()
        .failure()
        .stderr(predicate::str::contains("chunkSize must be > 0"));

    cli()
        .args(["chunk", "--document"])
        .write_stdin("{not json")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to parse input as a JSON document"));

    cli()
        .args(["chunk", "--metadata", "[]"])
        .write_stdin("text")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--metadata must be a JSON object"));

    cli()
        .args(["chunk", "/definitely/not/here.md"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read input"));
}

#[test]
fn sanitize_prints_clean_text() {
    cli()
        .arg("sanitize")
        .write_stdin("  Ship it \u{f0}\u{178}\u{161}\u{20ac}\n\n now\u{1F680} ")
        .assert()
        .success()
        .stdout("Ship it [ROCKET] now\n");

    cli()
        .args(["sanitize", "--preserve-lines"])
        .write_stdin("line one   \n\n\n\nline two")
        .assert()
        .success()
        .stdout("line one\n\nline two\n");
}

#[test]
fn context_reports_landmarks() {
    let text = "# Install\n\nStep 1: Download it\n\n```bash\nmake\n```\n";
    let output = cli()
        .arg("context")
        .write_stdin(text)
        .output()
        .expect("command run");

    let info = stdout_json(&output);
    assert_eq!(info["titles"][0]["text"], "Install");
    assert_eq!(info["steps"][0]["text"], "Step 1: Download it");
    assert_eq!(info["codeBlocks"][0]["language"], "bash");
}
