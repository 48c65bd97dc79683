use std::process::Command;

fn temp_path(label: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!(
        "podcrawl-cli-{label}-{}",
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos()
    ))
}

#[test]
fn cli_preview_writes_scaling_table() {
    let exe = env!("CARGO_BIN_EXE_podcrawl-tester");
    let output_path = temp_path("preview");
    let status = Command::new(exe)
        .args(["--preview", "25", "--output"])
        .arg(&output_path)
        .status()
        .expect("run cli");
    assert!(status.success());
    let content = std::fs::read_to_string(&output_path).expect("read output");
    assert!(content.starts_with("Depth"));
    assert_eq!(content.lines().count(), 26);
    let _ = std::fs::remove_file(output_path);
}

#[test]
fn cli_json_report_contains_every_run() {
    let exe = env!("CARGO_BIN_EXE_podcrawl-tester");
    let output_path = temp_path("json");
    let status = Command::new(exe)
        .args([
            "--seeds",
            "1,0x2a",
            "--strategies",
            "greedy,cautious",
            "--iterations",
            "2",
            "--max-depth",
            "8",
            "--report",
            "json",
            "--output",
        ])
        .arg(&output_path)
        .status()
        .expect("run cli");
    assert!(status.success());
    let content = std::fs::read_to_string(&output_path).expect("read output");
    let report: serde_json::Value = serde_json::from_str(&content).expect("valid json");
    let runs = report["runs"].as_array().expect("runs array");
    assert_eq!(runs.len(), 2 * 2 * 2);
    assert!(runs.iter().all(|run| run["depth_reached"].as_u64().unwrap() <= 8));
    assert_eq!(report["summaries"].as_array().unwrap().len(), 2);
    let _ = std::fs::remove_file(output_path);
}

#[test]
fn cli_rejects_unknown_strategy() {
    let exe = env!("CARGO_BIN_EXE_podcrawl-tester");
    let output = Command::new(exe)
        .args(["--strategies", "reckless", "--iterations", "1"])
        .output()
        .expect("run cli");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("unknown strategy"));
}

#[test]
fn cli_rejects_invalid_config_file() {
    let exe = env!("CARGO_BIN_EXE_podcrawl-tester");
    let config_path = temp_path("config");
    std::fs::write(&config_path, r#"{ "shop": { "price_factor_min": 2.0 } }"#).expect("write");
    let output = Command::new(exe)
        .args(["--iterations", "1", "--config"])
        .arg(&config_path)
        .output()
        .expect("run cli");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("price factor"));
    let _ = std::fs::remove_file(config_path);
}
