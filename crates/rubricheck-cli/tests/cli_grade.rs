#![allow(deprecated)]
use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};

const RUBRIC: &str = r#"
title: Argumentative essay
criteria:
  - id: thesis
    name: Thesis
    valid_levels: [Excellent, Good, Fair, Poor]
    descriptors: {Excellent: a, Good: b, Fair: c, Poor: d}
    weight: 0.5
  - id: evidence
    name: Evidence
    valid_levels: [Excellent, Good, Fair, Poor]
    descriptors: {Excellent: a, Good: b, Fair: c, Poor: d}
    weight: 0.5
grading:
  numeric: true
"#;

const ESSAY: &str = r#"{
  "paragraphs": [
    "Remote work changes cities in ways planners did not expect.",
    "Office districts empty out while suburbs gain foot traffic."
  ],
  "metadata": {"language": "en"}
}"#;

fn judgment(id: &str, level: Option<&str>, refuse: bool) -> String {
    json!({
        "criterion_id": id,
        "valid_levels": ["Excellent", "Good", "Fair", "Poor"],
        "level": level,
        "justification": "The essay addresses this criterion with supporting detail.",
        "evidence_spans": [{"paragraph_index": 0, "quote": "Remote work changes cities"}],
        "actionable_suggestion": "Add one concrete example.",
        "refuse": refuse,
        "reason": if refuse { Some("essay is off topic") } else { None }
    })
    .to_string()
}

struct Fixture {
    _dir: tempfile::TempDir,
    rubric: PathBuf,
    essay: PathBuf,
    script: PathBuf,
}

fn fixture(script_lines: &[String]) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let rubric = dir.path().join("rubric.yaml");
    let essay = dir.path().join("essay.json");
    let script = dir.path().join("script.jsonl");
    std::fs::write(&rubric, RUBRIC).unwrap();
    std::fs::write(&essay, ESSAY).unwrap();
    std::fs::write(&script, script_lines.join("\n")).unwrap();
    Fixture {
        _dir: dir,
        rubric,
        essay,
        script,
    }
}

fn grade_cmd(fx: &Fixture, extra: &[&str]) -> Command {
    let mut cmd = Command::cargo_bin("rubricheck").unwrap();
    cmd.env_remove("RUBRICHECK_CONFIG")
        .env_remove("RUBRICHECK_MODE")
        .env_remove("RUBRICHECK_BATCHED")
        .env_remove("RUBRICHECK_PARALLEL")
        .arg("grade")
        .arg("--rubric")
        .arg(&fx.rubric)
        .arg("--essay")
        .arg(&fx.essay)
        .args(["--judge", "fake", "--parallel", "1", "--mode", "fast"])
        .arg("--judge-script")
        .arg(&fx.script)
        .args(extra);
    cmd
}

fn stdout_json(output: &[u8]) -> Value {
    serde_json::from_slice(output).unwrap()
}

fn path_str(p: &Path) -> &str {
    p.to_str().unwrap()
}

#[test]
fn version_prints_package_version() {
    let mut cmd = Command::cargo_bin("rubricheck").unwrap();
    cmd.arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn validate_accepts_good_inputs() {
    let fx = fixture(&[]);
    let mut cmd = Command::cargo_bin("rubricheck").unwrap();
    cmd.env_remove("RUBRICHECK_CONFIG")
        .args(["validate", "--rubric", path_str(&fx.rubric)])
        .args(["--essay", path_str(&fx.essay)])
        .assert()
        .success()
        .stdout(predicate::str::contains("rubric ok: 2 criteria"))
        .stdout(predicate::str::contains("essay ok: 2 paragraphs"));
}

#[test]
fn grade_json_report_on_stdout() {
    let fx = fixture(&[
        judgment("thesis", Some("Excellent"), false),
        judgment("evidence", Some("Fair"), false),
    ]);
    let out = grade_cmd(&fx, &["--format", "json"])
        .assert()
        .code(0)
        .get_output()
        .stdout
        .clone();

    let report = stdout_json(&out);
    assert_eq!(report["schema_version"], 1);
    assert_eq!(report["summary"]["numeric_score"], 85.0);
    assert_eq!(report["summary"]["letter"], "A");
    let ids: Vec<_> = report["summary"]["per_criterion"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["criterion_id"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(ids, ["thesis", "evidence"]);
    assert_eq!(report["summary"]["notes"]["provenance"]["mode"], "fast");
    assert!(report["insights"]["length_assessment"].is_object());
}

#[test]
fn json_report_written_to_output_file() {
    let fx = fixture(&[
        judgment("thesis", Some("Good"), false),
        judgment("evidence", Some("Good"), false),
    ]);
    let out_path = fx.rubric.with_file_name("report.json");
    grade_cmd(&fx, &["--output", path_str(&out_path)])
        .assert()
        .success()
        .stderr(predicate::str::contains("Score: 85.00 (A)"));

    let report: Value = serde_json::from_str(&std::fs::read_to_string(&out_path).unwrap()).unwrap();
    assert_eq!(report["summary"]["numeric_score"], 85.0);
}

#[test]
fn strict_mode_exits_one_on_refusal() {
    let fx = fixture(&[
        judgment("thesis", None, true),
        judgment("evidence", Some("Good"), false),
    ]);
    grade_cmd(&fx, &["--format", "json", "--strict"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("\"any_refusals\": true"));

    let fx = fixture(&[
        judgment("thesis", None, true),
        judgment("evidence", Some("Good"), false),
    ]);
    grade_cmd(&fx, &["--format", "json"]).assert().code(0);
}

#[test]
fn invalid_rubric_exits_two() {
    let fx = fixture(&[]);
    std::fs::write(&fx.rubric, "criteria: []\n").unwrap();
    grade_cmd(&fx, &[])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("invalid rubric"));
}

#[test]
fn exhausted_script_exits_three() {
    let fx = fixture(&[judgment("thesis", Some("Good"), false)]);
    grade_cmd(&fx, &["--format", "json"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("criterion 'evidence' failed"));
}

#[test]
fn hallucinated_level_reports_raw_judgment() {
    let fx = fixture(&[
        judgment("thesis", Some("Outstanding"), false),
        judgment("evidence", Some("Good"), false),
    ]);
    grade_cmd(&fx, &[])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("raw judgment"));
}

#[test]
fn missing_api_key_exits_two() {
    let fx = fixture(&[]);
    let mut cmd = Command::cargo_bin("rubricheck").unwrap();
    cmd.env_remove("OPENAI_API_KEY")
        .env_remove("RUBRICHECK_CONFIG")
        .env_remove("RUBRICHECK_JUDGE")
        .args(["grade", "--rubric", path_str(&fx.rubric)])
        .args(["--essay", path_str(&fx.essay)])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("OPENAI_API_KEY"));
}
