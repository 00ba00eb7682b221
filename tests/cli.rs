use std::fs;
use std::path::Path;

use holdem_ko_parser::cli::run;
use holdem_ko_parser::exit_code;
use serde_json::Value;

const SAMPLE: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/samples/ko_tournament.txt");
const MALFORMED: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/samples/malformed_seat.txt");

struct Output {
    code: i32,
    stdout: String,
    stderr: String,
}

fn run_cli(args: &[&str]) -> Output {
    let mut argv = vec!["holdem-ko-parser"];
    argv.extend_from_slice(args);
    let mut out = Vec::new();
    let mut err = Vec::new();
    let code = run(argv, &mut out, &mut err);
    Output {
        code,
        stdout: String::from_utf8(out).unwrap(),
        stderr: String::from_utf8(err).unwrap(),
    }
}

fn records(stdout: &str) -> Vec<Value> {
    stdout
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

fn path_str(path: &Path) -> &str {
    path.to_str().unwrap()
}

#[test]
fn sample_file_parses_cleanly() {
    let output = run_cli(&[SAMPLE]);
    assert_eq!(output.code, exit_code::SUCCESS);
    let records = records(&output.stdout);
    assert_eq!(records.len(), 4);
    assert_eq!(records[0]["index"], 0);
    assert_eq!(records[0]["knockout"], true);
    assert_eq!(records[0]["header"]["hand_id"], 33728803961u64);
    assert_eq!(records[0]["knockouts"][0]["eliminated"], "Bob");
    assert_eq!(records[0]["knockouts"][0]["bounty"], 0.30);
    assert_eq!(records[3]["warnings"][0]["kind"], "unrecognized_action");
    assert!(output
        .stderr
        .contains("4 hands parsed, 0 failed, 1 warnings"));
}

#[test]
fn records_keep_file_order() {
    let output = run_cli(&["--quiet", SAMPLE]);
    let ids: Vec<u64> = records(&output.stdout)
        .iter()
        .map(|record| record["header"]["hand_id"].as_u64().unwrap())
        .collect();
    assert_eq!(
        ids,
        vec![33728803961, 33728804122, 33728805001, 33728806010]
    );
    assert!(!output.stderr.contains("hands parsed"));
}

#[test]
fn deny_warnings_fails_the_run() {
    let output = run_cli(&["--deny-warnings", SAMPLE]);
    assert_eq!(output.code, exit_code::PARSE_FAILURE);
    assert_eq!(records(&output.stdout).len(), 3);
    assert!(output.stderr.contains("hand #3: rejected with 1 warnings"));
}

#[test]
fn max_hands_stops_early() {
    let output = run_cli(&["--max-hands", "1", SAMPLE]);
    assert_eq!(output.code, exit_code::SUCCESS);
    assert_eq!(records(&output.stdout).len(), 1);
}

#[test]
fn pretty_output_is_valid_json() {
    let output = run_cli(&["--pretty", "--max-hands", "1", SAMPLE]);
    let record: Value = serde_json::from_str(&output.stdout).unwrap();
    assert_eq!(record["file"], SAMPLE);
    assert!(output.stdout.lines().count() > 1);
}

#[test]
fn track_stacks_reports_no_drift_on_sample() {
    let output = run_cli(&["--track-stacks", SAMPLE]);
    assert_eq!(output.code, exit_code::SUCCESS);
    assert!(!output.stderr.contains("expected"));
}

#[test]
fn track_stacks_reports_drift() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("drift.txt");
    let text = fs::read_to_string(SAMPLE)
        .unwrap()
        .replace("Seat 4: Frank (3,200)\nSeat 6", "Seat 4: Frank (3,100)\nSeat 6");
    fs::write(&path, text).unwrap();
    let output = run_cli(&["--track-stacks", path_str(&path)]);
    assert_eq!(output.code, exit_code::SUCCESS);
    assert!(output
        .stderr
        .contains("hand #3: warning: Frank starts with 3100 chips, expected 3200"));
}

#[test]
fn malformed_seat_fails_only_its_hand() {
    let output = run_cli(&[MALFORMED]);
    assert_eq!(output.code, exit_code::PARSE_FAILURE);
    let records = records(&output.stdout);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["index"], 1);
    assert_eq!(records[0]["header"]["hand_id"], 33728807001u64);
    let failures: Vec<&str> = output
        .stderr
        .lines()
        .filter(|line| line.contains("stage failed"))
        .collect();
    assert_eq!(failures.len(), 1);
    assert!(failures[0].contains("hand #0 (line 1): seats stage failed"));
    assert!(failures[0].contains("malformed seat line 3"));
}

#[test]
fn chat_about_a_bust_does_not_fail_the_hand() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("chat.txt");
    let text = fs::read_to_string(SAMPLE).unwrap().replacen(
        "*** HOLE CARDS ***\n",
        "*** HOLE CARDS ***\nrail_bird: nice, Alice wins a $0.30 bounty for eliminating Bob soon\n\
         Carol: Bob finished the tournament in 9th place for sure\n",
        1,
    );
    fs::write(&path, text).unwrap();
    let output = run_cli(&["--deny-warnings", "--max-hands", "1", path_str(&path)]);
    assert_eq!(output.code, exit_code::SUCCESS);
    let records = records(&output.stdout);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["knockouts"].as_array().unwrap().len(), 1);
}

#[test]
fn invalid_utf8_costs_nothing_but_the_bytes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("latin1.txt");
    let mut bytes = fs::read(SAMPLE).unwrap();
    bytes.extend_from_slice(b"Frank: merci caf\xe9\n");
    fs::write(&path, bytes).unwrap();
    let output = run_cli(&["--quiet", path_str(&path)]);
    assert_ne!(output.code, exit_code::ERROR);
    assert_eq!(records(&output.stdout).len(), 4);
}

#[test]
fn empty_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("empty.txt");
    fs::write(&path, "\n  \n").unwrap();
    let output = run_cli(&[path_str(&path)]);
    assert_eq!(output.code, exit_code::ERROR);
    assert!(output.stdout.is_empty());
    assert!(output.stderr.contains("contains no hand histories"));
}

#[test]
fn missing_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing.txt");
    let output = run_cli(&[path_str(&path), SAMPLE]);
    assert_eq!(output.code, exit_code::ERROR);
    assert_eq!(records(&output.stdout).len(), 4);
    assert!(output.stderr.contains("cannot read"));
}

#[test]
fn usage_errors_exit_with_two() {
    let output = run_cli(&[]);
    assert_eq!(output.code, exit_code::ERROR);
    assert!(output.stdout.is_empty());
    let output = run_cli(&["--help"]);
    assert_eq!(output.code, exit_code::SUCCESS);
    assert!(output.stdout.contains("--deny-warnings"));
}
