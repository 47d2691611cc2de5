use std::fs;

use assert_cmd::Command;
use predicates::str::contains;
use tempfile::TempDir;

fn sim() -> Command {
    Command::cargo_bin("elastic-pool-sim").unwrap()
}

#[test]
fn cli_version() {
    sim()
        .arg("-V")
        .assert()
        .success()
        .stdout(contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn cli_runs_scaled_load_and_prints_stats() {
    sim()
        .args(["--tasks", "40", "--time-scale", "0", "--json"])
        .args(["--max-workers", "6", "--queue-capacity", "8"])
        .assert()
        .success()
        .stdout(contains("\"completed_tasks\": 40"))
        .stdout(contains("\"panicked_tasks\": 0"));
}

#[test]
fn cli_reads_config_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("pool.json");
    fs::write(&path, r#"{ "max_workers": 4, "step_size": 1, "queue_capacity": 4 }"#).unwrap();

    sim()
        .arg("--config")
        .arg(&path)
        .args(["--tasks", "10", "--time-scale", "0", "--json"])
        .assert()
        .success()
        .stdout(contains("\"completed_tasks\": 10"));
}

#[test]
fn cli_invalid_config() {
    sim()
        .args(["--step-size", "0", "--tasks", "1"])
        .assert()
        .failure()
        .stderr(contains("Invalid pool configuration"));

    sim()
        .args(["--expand-threshold", "0.2", "--reduce-threshold", "0.4"])
        .assert()
        .failure()
        .stderr(contains("reduce_threshold"));
}

#[test]
fn cli_missing_config_file() {
    let dir = TempDir::new().unwrap();
    sim()
        .arg("--config")
        .arg(dir.path().join("nope.json"))
        .assert()
        .failure()
        .stderr(contains("IO error"));
}

#[test]
fn cli_rejects_unusable_time_scale() {
    for scale in ["inf", "NaN", "-1"] {
        sim()
            .args(["--tasks", "3"])
            .arg(format!("--time-scale={scale}"))
            .assert()
            .failure()
            .stderr(contains("time scale"));
    }
}

#[test]
fn cli_overrides_apply_before_validation() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("pool.json");
    // step_size 4 exceeds max_workers 1 until the override lifts the cap
    fs::write(&path, r#"{ "max_workers": 1, "step_size": 4, "queue_capacity": 8 }"#).unwrap();

    sim()
        .arg("--config")
        .arg(&path)
        .args(["--max-workers", "8", "--tasks", "10", "--time-scale", "0", "--json"])
        .assert()
        .success()
        .stdout(contains("\"completed_tasks\": 10"));
}
