use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn worklog_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_worklog"))
}

fn write_docx(path: &Path, paragraphs: &[&str]) {
    let file = fs::File::create(path).unwrap();
    let mut zip = zip::ZipWriter::new(file);
    zip.start_file("word/document.xml", zip::write::SimpleFileOptions::default())
        .unwrap();
    let body: String = paragraphs
        .iter()
        .map(|p| format!("<w:p><w:r><w:t>{}</w:t></w:r></w:p>", p))
        .collect();
    let xml = format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
         <w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\">\
         <w:body>{}</w:body></w:document>",
        body
    );
    zip.write_all(xml.as_bytes()).unwrap();
    zip.finish().unwrap();
}

/// A sandbox with a `logs/` folder and a config pointing at an unreachable
/// Ollama server.
fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let logs = root.join("logs");
    fs::create_dir_all(&logs).unwrap();
    write_docx(&logs.join("a_251125.docx"), &["Alice migrated the billing service."]);
    fs::write(logs.join("b_251126.docx"), b"not a zip").unwrap();
    write_docx(&logs.join("c_251125.doc"), &["Carol reviewed the on-call runbook."]);
    fs::write(logs.join("notes_251125.txt"), b"ignored").unwrap();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();
    let config_content = format!(
        r#"[ollama]
base_url = "http://127.0.0.1:9"
health_timeout_secs = 2

[selection]
directory = "{}/logs"

[output]
directory = "{}/reports"

[logging]
file = "{}/workflow.log"
"#,
        root.display(),
        root.display(),
        root.display()
    );
    let config_path = config_dir.join("worklog.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_worklog(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = worklog_binary();
    let cwd = config_path.parent().unwrap().parent().unwrap();
    let output = Command::new(&binary)
        .current_dir(cwd)
        .env_remove("RUST_LOG")
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run worklog binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

#[test]
fn test_select_by_date_stamp() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_worklog(&config_path, &["select", "--date", "251125"]);
    assert!(success, "select failed: stdout={}, stderr={}", stdout, stderr);
    let names: Vec<&str> = stdout
        .lines()
        .map(|l| Path::new(l).file_name().unwrap().to_str().unwrap())
        .collect();
    assert_eq!(names, vec!["a_251125.docx", "c_251125.doc"]);
}

#[test]
fn test_select_all_ignores_date() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, _, success) = run_worklog(&config_path, &["select", "--all"]);
    assert!(success);
    assert_eq!(stdout.lines().count(), 3);
    assert!(!stdout.contains("notes_251125.txt"));
}

#[test]
fn test_select_without_folder_fails() {
    let tmp = TempDir::new().unwrap();
    let config_path = tmp.path().join("worklog.toml");
    fs::write(
        &config_path,
        format!("[logging]\nfile = \"{}/workflow.log\"\n", tmp.path().display()),
    )
    .unwrap();

    let (_, stderr, success) = run_worklog(&config_path, &["select"]);
    assert!(!success);
    assert!(stderr.contains("No input folder"));
}

#[test]
fn test_extract_docx_prints_text() {
    let (tmp, config_path) = setup_test_env();
    let file = tmp.path().join("logs").join("a_251125.docx");

    let (stdout, stderr, success) =
        run_worklog(&config_path, &["extract", file.to_str().unwrap()]);
    assert!(success, "extract failed: {}", stderr);
    assert!(stdout.contains("Alice migrated the billing service."));
}

#[test]
fn test_extract_corrupt_file_fails_cleanly() {
    let (tmp, config_path) = setup_test_env();
    let pdf = tmp.path().join("broken.pdf");
    fs::write(&pdf, b"%PDF-1.4 truncated").unwrap();

    let (_, stderr, success) = run_worklog(&config_path, &["extract", pdf.to_str().unwrap()]);
    assert!(!success);
    assert!(stderr.contains("Failed to extract"));

    let docx = tmp.path().join("logs").join("b_251126.docx");
    let (_, stderr, success) = run_worklog(&config_path, &["extract", docx.to_str().unwrap()]);
    assert!(!success);
    assert!(stderr.contains("Failed to extract"));
}

#[test]
fn test_run_with_unreachable_server_fails_before_reading() {
    let (_tmp, config_path) = setup_test_env();

    let (_, stderr, success) = run_worklog(
        &config_path,
        &["run", "--date", "251125", "--progress", "json"],
    );
    assert!(!success);
    assert!(stderr.contains("not reachable"), "stderr={}", stderr);
    assert!(stderr.contains("\"kind\":\"ai_unavailable\""));
    assert!(!stderr.contains("\"event\":\"file_extracted\""));
    assert!(!stderr.contains("\"event\":\"file_failed\""));
    assert_eq!(stderr.matches("\"event\":\"failed\"").count(), 1);
}

#[test]
fn test_run_failure_is_reported_once() {
    let (_tmp, config_path) = setup_test_env();

    for mode in ["human", "off"] {
        let (_, stderr, success) = run_worklog(
            &config_path,
            &["run", "--date", "251125", "--progress", mode],
        );
        assert!(!success);
        assert_eq!(
            stderr.matches("not reachable").count(),
            1,
            "mode={} stderr={}",
            mode,
            stderr
        );
        assert!(!stderr.contains("Error:"), "stderr={}", stderr);
    }
}

#[test]
fn test_run_with_no_matching_files_is_not_an_error() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) =
        run_worklog(&config_path, &["run", "--date", "200101", "--progress", "off"]);
    assert!(success, "run failed: {}", stderr);
    assert!(stdout.contains("No work-log files selected."));
}

#[test]
fn test_run_rejects_bad_date_stamp() {
    let (_tmp, config_path) = setup_test_env();

    let (_, stderr, success) = run_worklog(&config_path, &["run", "--date", "2025-11-25"]);
    assert!(!success);
    assert!(stderr.contains("YYMMDD"));
}

#[test]
fn test_serve_check_reports_unreachable_server() {
    let (_tmp, config_path) = setup_test_env();

    let (_, stderr, success) = run_worklog(&config_path, &["serve-check"]);
    assert!(!success);
    assert!(stderr.contains("ollama serve"));
}

#[test]
fn test_prompts_show_overrides() {
    let (_tmp, config_path) = setup_test_env();
    let mut content = fs::read_to_string(&config_path).unwrap();
    content.push_str("\n[prompts]\nsummary = \"Digest for leads:\\n{documents}\"\n");
    fs::write(&config_path, content).unwrap();

    let (stdout, stderr, success) = run_worklog(&config_path, &["prompts"]);
    assert!(success, "prompts failed: {}", stderr);
    assert!(stdout.contains("Digest for leads:"));
    assert!(stdout.contains("== thanks =="));
}

#[test]
fn test_invalid_config_is_rejected() {
    let (_tmp, config_path) = setup_test_env();
    let mut content = fs::read_to_string(&config_path).unwrap();
    content = content.replace("health_timeout_secs = 2", "health_timeout_secs = 2\ntemperature = 5.0");
    fs::write(&config_path, content).unwrap();

    let (_, stderr, success) = run_worklog(&config_path, &["select"]);
    assert!(!success);
    assert!(stderr.contains("temperature"));
}

#[test]
fn test_log_file_is_written() {
    let (tmp, config_path) = setup_test_env();

    let (_, _, success) = run_worklog(&config_path, &["select", "--all"]);
    assert!(success);
    let log = fs::read_to_string(tmp.path().join("workflow.log")).unwrap();
    assert!(log.contains("logging initialized"));
}
