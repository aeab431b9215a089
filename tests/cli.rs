#![allow(deprecated)]

mod common;

use assert_cmd::cargo::cargo_bin;
use assert_cmd::Command;
use common::{read_rows, Workspace};
use predicates::prelude::*;
use std::fs;

fn ifc_wbs_cmd() -> Command {
    let mut cmd = Command::new(cargo_bin("ifc-wbs"));
    cmd.env_remove("RUST_LOG");
    cmd
}

#[test]
fn check_accepts_valid_rules_and_normalizes() {
    let workspace = Workspace::new();
    let normalized = workspace.dir.path().join("normalized.json");

    ifc_wbs_cmd()
        .arg("check")
        .arg(&workspace.rules)
        .arg("--normalize")
        .arg(&normalized)
        .assert()
        .success()
        .stdout(predicate::str::contains("2 rules OK"));

    let written = fs::read_to_string(&normalized).unwrap();
    assert!(written.contains("\"version\": 1"));
    assert!(written.contains("\"grouping\""));
}

#[test]
fn check_rejects_unsupported_version() {
    let workspace = Workspace::new();
    let rules = workspace.dir.path().join("v2.json");
    fs::write(&rules, common::RULES.replace("\"version\": 1", "\"version\": 2")).unwrap();

    ifc_wbs_cmd()
        .arg("check")
        .arg(&rules)
        .assert()
        .failure()
        .stderr(predicate::str::contains("unsupported rule-set version"));
}

#[test]
fn leaves_lists_user_descriptions() {
    let workspace = Workspace::new();

    ifc_wbs_cmd()
        .arg("leaves")
        .arg(&workspace.wbs)
        .assert()
        .success()
        .stdout(predicate::str::contains("1.1\tParedes\tParedes de betão"))
        .stdout(predicate::str::contains("1.2").not());
}

#[test]
fn classes_lists_model_classes_and_materials() {
    let workspace = Workspace::new();

    ifc_wbs_cmd()
        .arg("classes")
        .arg(&workspace.model)
        .assert()
        .success()
        .stdout(predicate::str::contains("IfcWall (3)"))
        .stdout(predicate::str::contains("Concrete (e.g. C30/37)"));

    ifc_wbs_cmd()
        .args(["classes", "--class", "IfcSlab"])
        .arg(&workspace.model)
        .assert()
        .success()
        .stdout(predicate::str::contains("FLOOR"));
}

#[test]
fn probe_runs_an_ad_hoc_rule() {
    let workspace = Workspace::new();

    ifc_wbs_cmd()
        .arg("probe")
        .arg(&workspace.model)
        .args([
            "--class",
            "IfcWall",
            "--quantity",
            "Qto_WallBaseQuantities.NetVolume",
            "--where",
            "Pset_WallCommon.LoadBearing=true",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("3 candidates, 2 selected"))
        .stdout(predicate::str::contains("Total: 4.0"));
}

#[test]
fn extract_writes_sheet_and_dashboard() {
    let workspace = Workspace::new();
    let out_dir = workspace.out_dir();

    ifc_wbs_cmd()
        .arg("extract")
        .arg("--rules")
        .arg(&workspace.rules)
        .arg("--model")
        .arg(&workspace.model)
        .arg("--wbs")
        .arg(&workspace.wbs)
        .arg("--out-dir")
        .arg(&out_dir)
        .args(["--json", "--sequential"])
        .assert()
        .success()
        .stdout(predicate::str::contains("wbs_filled.csv"))
        .stdout(predicate::str::contains("extraction_report.json"));

    let dashboard = read_rows(&out_dir.join("wbs_dashboard.csv"), b',');
    assert_eq!(dashboard[4][0], "tower");
    assert_eq!(dashboard[4][1], "1.1.01.01");

    let report = fs::read_to_string(out_dir.join("extraction_report.json")).unwrap();
    let report: serde_json::Value = serde_json::from_str(&report).unwrap();
    assert_eq!(report["rules"][0]["status"], "completed");
    assert_eq!(report["rules"][0]["total"], 6.0);
}

#[test]
fn extract_fails_on_missing_model() {
    let workspace = Workspace::new();

    ifc_wbs_cmd()
        .arg("extract")
        .arg("--rules")
        .arg(&workspace.rules)
        .arg("--model")
        .arg(workspace.dir.path().join("nope.ifc"))
        .arg("--wbs")
        .arg(&workspace.wbs)
        .arg("--out-dir")
        .arg(workspace.out_dir())
        .assert()
        .failure()
        .stderr(predicate::str::contains("nope.ifc"));
}
