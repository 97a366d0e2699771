//! Integration tests for the driftwatch binary
//!
//! Each test writes its own config and bundle directories into a temp dir
//! and runs the real binary against them.

use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn driftwatch(workdir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_driftwatch"))
        .current_dir(workdir)
        .env_remove("DRIFTWATCH_DATA_DIR")
        .env_remove("RUST_LOG")
        .args(args)
        .output()
        .expect("Failed to run driftwatch")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

/// Temp workspace with a config tracking `web-app` and data under `./data`
fn workspace() -> TempDir {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    std::fs::write(
        dir.path().join("driftwatch.toml"),
        r#"
data_dir = "data"

[[repos]]
slug = "web-app"
branch = "main"
"#,
    )
    .unwrap();
    dir
}

fn write_bundle(dir: &Path, name: &str, todos: u64) -> std::path::PathBuf {
    let bundle = dir.join(name);
    std::fs::create_dir_all(&bundle).unwrap();
    std::fs::write(
        bundle.join("git-stats.json"),
        r#"{"branch": "main", "commit_count": 12, "contributor_count": 2}"#,
    )
    .unwrap();
    std::fs::write(
        bundle.join("staleness.json"),
        r#"{"threshold_days": 180, "summary": {"stale_files": 3}}"#,
    )
    .unwrap();
    std::fs::write(
        bundle.join("debt-markers.json"),
        format!(r#"{{"summary": {{"total_todos": {}}}}}"#, todos),
    )
    .unwrap();
    bundle
}

fn write_findings(dir: &Path, name: &str, chains: u32) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(
        &path,
        format!(
            r#"[{{"code": "WD-M5-001", "category": "imports", "summary": "{} circular chains", "path": "src/app"}}]"#,
            chains
        ),
    )
    .unwrap();
    path
}

#[test]
fn test_init_writes_example_config() {
    let dir = tempfile::tempdir().unwrap();
    let output = driftwatch(dir.path(), &["init"]);
    assert!(output.status.success());
    let content = std::fs::read_to_string(dir.path().join("driftwatch.toml")).unwrap();
    assert!(content.contains("[[repos]]"));
}

#[test]
fn test_status_without_snapshots_explains_next_step() {
    let dir = workspace();
    let output = driftwatch(dir.path(), &["status", "web-app"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Run collection first"), "stderr: {}", stderr);
}

#[test]
fn test_unknown_slug_is_rejected() {
    let dir = workspace();
    let output = driftwatch(dir.path(), &["work", "nope"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Unknown repository"));
}

#[test]
fn test_ingest_status_and_escalation_flow() {
    let dir = workspace();
    let root = dir.path();

    for (day, chains) in [(1, 1), (2, 2), (3, 3), (4, 4)] {
        let bundle = write_bundle(root, &format!("bundle-{}", day), 10 + u64::from(chains));
        let findings = write_findings(root, &format!("findings-{}.json", day), chains);
        let ts = format!("2026-04-0{}T10-00-00.000Z", day);
        let output = driftwatch(
            root,
            &[
                "ingest",
                "web-app",
                "--bundle",
                bundle.to_str().unwrap(),
                "--findings",
                findings.to_str().unwrap(),
                "--timestamp",
                &ts,
                "--json",
            ],
        );
        assert!(output.status.success(), "ingest day {} failed: {:?}", day, output);
    }

    assert!(root.join("data/web-app/snapshots/2026-04-04T10-00-00.000Z/git-stats.json").exists());

    let status = driftwatch(root, &["status", "web-app", "--json"]);
    assert!(status.status.success());
    let value: serde_json::Value = serde_json::from_str(&stdout(&status)).unwrap();
    assert_eq!(value["previous"], "2026-04-03T10-00-00.000Z");
    assert_eq!(value["delta"]["todos"], 1);
    assert!(value["delta"]["complexity_hotspots"].is_null());

    let work = driftwatch(root, &["work", "web-app", "--json"]);
    let docs: serde_json::Value = serde_json::from_str(&stdout(&work)).unwrap();
    assert_eq!(docs[0]["severity"], "S1");
    assert_eq!(docs[0]["consecutive_reports"], 3);
    let id = docs[0]["id"].as_str().unwrap().to_string();

    let pending = driftwatch(root, &["escalations", "web-app", "--json"]);
    let pending: serde_json::Value = serde_json::from_str(&stdout(&pending)).unwrap();
    assert_eq!(pending.as_array().unwrap().len(), 1);
    assert!(root.join(format!("data/web-app/alerts/{}.json", id)).exists());

    let assign = driftwatch(root, &["assign", "web-app", &id, "dana"]);
    assert!(assign.status.success());
    let pending = driftwatch(root, &["escalations", "web-app", "--json"]);
    let pending: serde_json::Value = serde_json::from_str(&stdout(&pending)).unwrap();
    assert!(pending.as_array().unwrap().is_empty());

    let resolve = driftwatch(root, &["resolve", "web-app", &id, "--reason", "split module"]);
    assert!(resolve.status.success());
    let open = driftwatch(root, &["work", "web-app", "--open", "--json"]);
    let open: serde_json::Value = serde_json::from_str(&stdout(&open)).unwrap();
    assert!(open.as_array().unwrap().is_empty());
}

#[test]
fn test_duplicate_timestamp_is_rejected() {
    let dir = workspace();
    let root = dir.path();
    let bundle = write_bundle(root, "bundle", 1);
    let args = [
        "ingest",
        "web-app",
        "--bundle",
        bundle.to_str().unwrap(),
        "--timestamp",
        "2026-04-01T10-00-00.000Z",
    ];
    assert!(driftwatch(root, &args).status.success());
    let second = driftwatch(root, &args);
    assert!(!second.status.success());
    assert!(String::from_utf8_lossy(&second.stderr).contains("already exists"));
}

#[test]
fn test_prune_keeps_newest_snapshots() {
    let dir = workspace();
    let root = dir.path();
    let bundle = write_bundle(root, "bundle", 1);
    for day in 1..=3 {
        let ts = format!("2026-04-0{}T10-00-00.000Z", day);
        let output = driftwatch(
            root,
            &["ingest", "web-app", "--bundle", bundle.to_str().unwrap(), "--timestamp", &ts],
        );
        assert!(output.status.success(), "ingest day {} failed: {:?}", day, output);
    }

    let output = driftwatch(root, &["snapshots", "web-app", "--prune", "2"]);
    assert!(output.status.success(), "prune failed: {:?}", output);
    assert!(stdout(&output).contains("Removed 1"), "stdout: {}", stdout(&output));

    let snapshots = root.join("data/web-app/snapshots");
    assert!(!snapshots.join("2026-04-01T10-00-00.000Z").exists());
    assert!(snapshots.join("2026-04-02T10-00-00.000Z").exists());
    assert!(snapshots.join("2026-04-03T10-00-00.000Z").exists());
    assert!(root.join("data/web-app/.lock").exists());
}
