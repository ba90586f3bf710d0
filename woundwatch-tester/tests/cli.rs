use std::process::Command;

fn temp_path(label: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!(
        "woundwatch-cli-{label}-{}",
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos()
    ))
}

#[test]
fn cli_list_scenarios_writes_output() {
    let exe = env!("CARGO_BIN_EXE_woundwatch-tester");
    let output_path = temp_path("list");
    let status = Command::new(exe)
        .args(["--list-scenarios", "--output"])
        .arg(&output_path)
        .status()
        .expect("run cli");
    assert!(status.success());
    let content = std::fs::read_to_string(output_path).expect("read output");
    assert!(content.contains("Available scenarios"));
    assert!(content.contains("danger-boundary"));
}

#[test]
fn cli_runs_scenarios_with_json_report() {
    let exe = env!("CARGO_BIN_EXE_woundwatch-tester");
    let output_path = temp_path("run");
    let output = Command::new(exe)
        .args([
            "--report",
            "json",
            "--scenarios",
            "danger-boundary,soak",
            "--iterations",
            "1",
            "--seeds",
            "1,2",
            "--output",
        ])
        .arg(&output_path)
        .output()
        .expect("run cli");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Woundwatch Tester"));
    let report: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(output_path).expect("read report"))
            .expect("valid json");
    let runs = report.as_array().expect("array report");
    assert_eq!(runs.len(), 4);
    assert!(runs.iter().all(|run| run["passed"] == true));
}

#[test]
fn cli_rejects_unknown_scenario() {
    let exe = env!("CARGO_BIN_EXE_woundwatch-tester");
    let output = Command::new(exe)
        .args(["--scenarios", "no-such-thing"])
        .output()
        .expect("run cli");
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("unknown scenario"));
}

#[test]
fn cli_rejects_zero_iterations() {
    let exe = env!("CARGO_BIN_EXE_woundwatch-tester");
    let output = Command::new(exe)
        .args(["--scenarios", "soak", "--iterations", "0"])
        .output()
        .expect("run cli");
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("--iterations must be at least 1"));
}
