//! Integration tests for the dryplan binary.
//!
//! These tests verify end-to-end behavior:
//! - One-shot plan generation from flags
//! - Input validation
//! - The chat REPL over piped stdin

use assert_cmd::Command;
use predicates::prelude::*;

fn cli() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("dryplan"))
}

#[test]
fn test_cli_help() {
    cli()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Conversational nutrition planner"));
}

#[test]
fn test_plan_prints_targets_and_seven_days() {
    let assert = cli()
        .args([
            "plan", "--gender", "male", "--age", "30", "--height", "175", "--weight", "70",
            "--activity", "4", "--goal", "loss",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Daily target:"))
        .stdout(predicate::str::contains("BMI:"));

    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    assert_eq!(stdout.matches("== ").count(), 7, "one header per weekday");
}

#[test]
fn test_plan_dry_week_five_is_tighter_than_week_one() {
    let target_kcal = |week: &str| -> i32 {
        let assert = cli()
            .args([
                "plan", "--gender", "male", "--age", "30", "--height", "175", "--weight", "70",
                "--activity", "4", "--goal", "dry", "--week", week,
            ])
            .assert()
            .success();
        let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
        let line = stdout
            .lines()
            .find(|l| l.starts_with("Daily target:"))
            .expect("target line present");
        line.split_whitespace()
            .nth(2)
            .unwrap()
            .parse()
            .expect("kcal value")
    };

    assert!(target_kcal("5") < target_kcal("1"));
}

#[test]
fn test_plan_low_budget_hits_calorie_floor() {
    cli()
        .args([
            "plan", "--gender", "female", "--age", "60", "--height", "150", "--weight", "45",
            "--activity", "1", "--goal", "loss",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("safety floor"));
}

#[test]
fn test_plan_rejects_unknown_goal() {
    cli()
        .args([
            "plan", "--gender", "male", "--age", "30", "--height", "175", "--weight", "70",
            "--goal", "bulk",
        ])
        .assert()
        .failure();
}

#[test]
fn test_plan_rejects_bad_activity() {
    cli()
        .args([
            "plan", "--gender", "male", "--age", "30", "--height", "175", "--weight", "70",
            "--activity", "9", "--goal", "loss",
        ])
        .assert()
        .failure();
}

#[test]
fn test_chat_repl_walks_the_questionnaire() {
    // Answer every question, skip target and save, then leave.
    // Numbers pick quick-reply options where options are shown.
    let input = "1\n30\n175\n70\n4\n1\n1\n2\nexit\n";

    cli()
        .arg("chat")
        .write_stdin(input)
        .timeout(std::time::Duration::from_secs(120))
        .assert()
        .success()
        .stdout(predicate::str::contains("How old are you?"))
        .stdout(predicate::str::contains("Your status"))
        .stdout(predicate::str::contains("== monday =="));
}

#[test]
fn test_chat_transcript_written_on_exit() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("transcript.json");

    cli()
        .arg("chat")
        .arg("--transcript")
        .arg(&path)
        .write_stdin("exit\n")
        .timeout(std::time::Duration::from_secs(60))
        .assert()
        .success();

    let saved = std::fs::read_to_string(&path).expect("transcript file written");
    assert!(saved.contains("put together your nutrition plan"));
}
