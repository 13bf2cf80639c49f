use std::fs;
use std::path::PathBuf;
use std::process::Command;

use serde_json::Value;

fn bin_path() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_spiny"))
}

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("spiny-cli-{}-{}", std::process::id(), name))
}

fn write_coefficients(name: &str, frames: usize, dim: usize, f: impl Fn(usize, usize) -> f32) -> PathBuf {
    let path = temp_path(name);
    let mut bytes = Vec::with_capacity(frames * dim * 4);
    for row in 0..frames {
        for col in 0..dim {
            bytes.extend_from_slice(&f(row, col).to_le_bytes());
        }
    }
    fs::write(&path, bytes).expect("write coefficients");
    path
}

fn run_compare(args: &[&str]) -> (bool, Value, String) {
    let output = Command::new(bin_path())
        .arg("compare")
        .args(args)
        .output()
        .expect("failed to run spiny compare");
    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let json = serde_json::from_str(&stdout).unwrap_or(Value::Null);
    (output.status.success(), json, stderr)
}

#[test]
fn compare_identical_files_scores_one() {
    let a = write_coefficients("same-a.f32", 20, 8, |r, c| (r * 8 + c) as f32);
    let (ok, report, stderr) = run_compare(&[
        a.to_str().unwrap(),
        a.to_str().unwrap(),
        "--dim",
        "8",
    ]);
    assert!(ok, "compare failed: {stderr}");
    assert!((report["score"].as_f64().unwrap() - 1.0).abs() < 1e-9);
    assert_eq!(report["frames"], 20);
    assert_eq!(report["summary"]["proportion_at_or_above"], 100.0);
    assert!(report.get("profile").is_none());
    let _ = fs::remove_file(a);
}

#[test]
fn compare_truncates_to_common_frames_and_reports_profile() {
    let a = write_coefficients("trunc-a.f32", 30, 4, |r, c| ((r + c) % 7) as f32);
    let b = write_coefficients("trunc-b.f32", 25, 4, |r, c| ((r * c) % 5) as f32);
    let (ok, report, stderr) = run_compare(&[
        a.to_str().unwrap(),
        b.to_str().unwrap(),
        "--dim",
        "4",
        "--profile",
    ]);
    assert!(ok, "compare failed: {stderr}");
    assert_eq!(report["frames"], 25);
    let profile = report["profile"].as_array().unwrap();
    assert_eq!(profile.len(), 23);
    assert!((profile[0]["time"].as_f64().unwrap() - 0.005).abs() < 1e-12);
    assert!(report["score"].as_f64().unwrap() < 1.0);
    let _ = fs::remove_file(a);
    let _ = fs::remove_file(b);
}

#[test]
fn compare_writes_map_for_selected_bins() {
    let a = write_coefficients("bins-a.f32", 10, 6, |r, c| (r + c) as f32);
    let b = write_coefficients("bins-b.f32", 10, 6, |r, c| (r * 2 + c) as f32);
    let map = temp_path("bins-map.f32");
    let (ok, report, stderr) = run_compare(&[
        a.to_str().unwrap(),
        b.to_str().unwrap(),
        "--dim",
        "6",
        "--start-bin",
        "1",
        "--end-bin",
        "5",
        "--map-output",
        map.to_str().unwrap(),
    ]);
    assert!(ok, "compare failed: {stderr}");
    assert_eq!(report["bins"]["start"], 1);
    assert_eq!(report["bins"]["end"], 5);

    // (10 - 2) x (4 - 2) cells of f32
    let written = fs::read(&map).unwrap();
    assert_eq!(written.len(), 8 * 2 * 4);
    for path in [a, b, map] {
        let _ = fs::remove_file(path);
    }
}

#[test]
fn compare_rejects_too_small_input() {
    let a = write_coefficients("small-a.f32", 2, 4, |_, _| 1.0);
    let (ok, _, stderr) = run_compare(&[a.to_str().unwrap(), a.to_str().unwrap(), "--dim", "4"]);
    assert!(!ok);
    assert!(stderr.contains("DimensionTooSmall"), "stderr: {stderr}");
    let _ = fs::remove_file(a);
}

#[test]
fn compare_rejects_partial_frames() {
    let a = write_coefficients("partial-a.f32", 3, 5, |_, _| 0.0);
    let (ok, _, stderr) = run_compare(&[a.to_str().unwrap(), a.to_str().unwrap(), "--dim", "4"]);
    assert!(!ok);
    assert!(stderr.contains("TruncatedFile"), "stderr: {stderr}");
    let _ = fs::remove_file(a);
}

#[test]
fn config_file_supplies_dimension() {
    let a = write_coefficients("cfg-a.f32", 6, 3, |r, c| (r + c) as f32);
    let config = temp_path("config.json");
    fs::write(&config, r#"{"comparison": {"dim": 3, "frameshift": 0.01, "summary_threshold": 0.5, "smooth": false}}"#)
        .unwrap();

    let (ok, report, stderr) = run_compare(&[
        "--config",
        config.to_str().unwrap(),
        a.to_str().unwrap(),
        a.to_str().unwrap(),
    ]);
    assert!(ok, "compare failed: {stderr}");
    assert_eq!(report["frames"], 6);
    assert_eq!(report["summary"]["threshold"], 0.5);
    let _ = fs::remove_file(a);
    let _ = fs::remove_file(config);
}
