//! Protocol export lock tests.
//!
//! Proves:
//! 1. The canonical export sorts object keys and renders costs as strings
//! 2. The protocol digest is a function of the interview alone: repeated
//!    runs and other processes agree
//!
//! The cross-process part spawns the `interview_fixture` binary under
//! several environment variants and asserts identical output.

use std::path::Path;
use std::process::Command;

use lock_tests::{pump, pump_engine, run_interview};
use triage_kernel::proof::canon::canonical_json_bytes;
use triage_kernel::proof::hash::ContentHash;
use triage_planner::config::{PlannerConfig, SearchStrategy};

fn interview(config: &PlannerConfig, solution: &str) -> (Vec<u8>, ContentHash) {
    let p = pump();
    let mut engine = pump_engine(&p, config);
    run_interview(&mut engine, p.findings(solution));
    let protocol = engine.session().protocol();
    (
        protocol.to_canonical_json_bytes().unwrap(),
        protocol.digest().unwrap(),
    )
}

// ---------------------------------------------------------------------------
// 1. Canonical export
// ---------------------------------------------------------------------------

#[test]
fn calculated_paths_export_costs_as_strings() {
    let (bytes, _) = interview(&PlannerConfig::default(), "wear");
    let parsed: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    let paths: Vec<&serde_json::Value> = parsed
        .as_array()
        .unwrap()
        .iter()
        .filter(|e| e["type"] == "calculated_path")
        .collect();

    assert_eq!(paths.len(), 2);
    assert_eq!(paths[0]["path"], serde_json::json!(["listen"]));
    assert_eq!(paths[0]["costs"], "1");
    assert_eq!(
        paths[1]["path"],
        serde_json::json!(["open_cover", "inspect_impeller"])
    );
    assert_eq!(paths[1]["target"], serde_json::json!(["inspect_impeller"]));
    assert_eq!(paths[1]["costs"], "5");
}

#[test]
fn export_is_canonical() {
    let (bytes, _) = interview(&PlannerConfig::default(), "bearing");
    let text = String::from_utf8(bytes.clone()).unwrap();
    let parsed: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

    // re-canonicalizing the parsed export is a no-op
    assert_eq!(canonical_json_bytes(&parsed).unwrap(), bytes);

    let first = text.find("\"calculation_steps\"").unwrap();
    let keys = ["\"costs\"", "\"path\"", "\"target\"", "\"time\"", "\"type\""];
    let mut last = first;
    for key in keys {
        let at = first + text[first..].find(key).unwrap();
        assert!(at > last, "{key} out of order");
        last = at;
    }
}

// ---------------------------------------------------------------------------
// 2. Determinism
// ---------------------------------------------------------------------------

#[test]
fn digest_is_stable_across_runs() {
    let (bytes_a, digest_a) = interview(&PlannerConfig::default(), "wear");
    let (bytes_b, digest_b) = interview(&PlannerConfig::default(), "wear");
    assert_eq!(bytes_a, bytes_b);
    assert_eq!(digest_a, digest_b);
    assert_eq!(digest_a.algorithm(), "sha256");
    assert_eq!(digest_a.hex_digest().len(), 64);

    let mut merged = PlannerConfig::default();
    merged.search.strategy = SearchStrategy::Merged;
    let (_, merged_a) = interview(&merged, "wear");
    let (_, merged_b) = interview(&merged, "wear");
    assert_eq!(merged_a, merged_b);

    let (_, digest_motor) = interview(&PlannerConfig::default(), "motor");
    assert_ne!(digest_a, digest_motor);
}

fn workspace_root() -> String {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .expect("tests/ exists")
        .parent()
        .expect("workspace root exists")
        .to_string_lossy()
        .to_string()
}

/// Run the fixture binary with the given cwd and environment overrides.
/// Returns stdout as a string.
fn run_variant(work_dir: &str, env_overrides: &[(&str, &str)]) -> String {
    let bin = env!("CARGO_BIN_EXE_interview_fixture");
    let mut command = Command::new(bin);
    command
        .current_dir(work_dir)
        .env_remove("LC_ALL")
        .env_remove("LC_COLLATE")
        .env_remove("LANG")
        .env_remove("LANGUAGE")
        .env_remove("RUST_LOG");
    for &(key, val) in env_overrides {
        command.env(key, val);
    }

    let output = command.output().unwrap_or_else(|e| {
        panic!("failed to spawn {bin} (work_dir={work_dir}, overrides={env_overrides:?}): {e}")
    });
    assert!(
        output.status.success(),
        "interview_fixture exited with {}: stderr={}",
        output.status,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout).expect("stdout is valid UTF-8")
}

#[test]
fn crossproc_determinism_env_variants() {
    let root = workspace_root();
    let baseline = run_variant(&root, &[]);
    assert_eq!(baseline.matches("protocol_digest=sha256:").count(), 6);

    let (_, digest) = interview(&PlannerConfig::default(), "wear");
    assert!(
        baseline.contains(&format!("protocol_digest={}", digest.as_str())),
        "fixture disagrees with the in-process run"
    );

    let alt_cwd = std::env::temp_dir().to_string_lossy().to_string();
    assert_eq!(baseline, run_variant(&alt_cwd, &[]), "output differs with cwd {alt_cwd}");
    assert_eq!(
        baseline,
        run_variant(&root, &[("LC_ALL", "C"), ("LANG", "C")]),
        "output differs when LC_ALL=C LANG=C"
    );
    assert_eq!(
        baseline,
        run_variant(
            &root,
            &[
                ("RUST_LOG", "trace"),
                ("TRIAGE_NOISE", "1"),
                ("RUST_MIN_STACK", "8388608"),
            ],
        ),
        "output differs with noise env vars"
    );
}
