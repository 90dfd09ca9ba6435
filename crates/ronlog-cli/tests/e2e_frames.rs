//! End-to-end tests for the frame commands: merge, scan and text.
//!
//! Each test runs `ronlog` as a subprocess inside its own temp directory,
//! with the user config directory pointed into that directory too.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Test Harness
// ---------------------------------------------------------------------------

/// Build a Command targeting the ronlog binary, rooted in `dir`.
fn ronlog_cmd(dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("ronlog"));
    cmd.current_dir(dir);
    cmd.env("XDG_CONFIG_HOME", dir.join(".config"));
    cmd.env("HOME", dir);
    cmd.env_remove("FORMAT");
    // Suppress tracing output that goes to stderr
    cmd.env("RONLOG_LOG", "error");
    cmd
}

/// Write `text` to `name` under `dir` and return the path.
fn frame_file(dir: &Path, name: &str, text: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, text).expect("write frame file");
    path
}

fn json_output(cmd: &mut Command) -> Value {
    let output = cmd.output().expect("ronlog should not crash");
    assert!(
        output.status.success(),
        "command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("--format json should produce valid JSON")
}

const ABC: &str = "@1+A :rga! 'a', 'b', 'c',";
const DEF: &str = "@1000000004+B :1000000003+A 'D', 'E', 'F', ";
const MERGED: &str = "@1+A :rga! 'a', 'b', 'c', @1000000004+B 'D', 'E', 'F',";
const SCANNED: &str =
    "@1i08e4+path :rga! 'a', 'b', @1i08k+path rm, @1i08e40003+path :1i08e40002+path 'd',";

// ---------------------------------------------------------------------------
// merge
// ---------------------------------------------------------------------------

#[test]
fn merge_prints_the_merged_frame() {
    let dir = TempDir::new().expect("tempdir");
    let abc = frame_file(dir.path(), "abc.ron", ABC);
    let def = frame_file(dir.path(), "def.ron", DEF);

    ronlog_cmd(dir.path())
        .arg("merge")
        .arg(&abc)
        .arg(&def)
        .assert()
        .success()
        .stdout(format!("{MERGED}\n"));
}

#[test]
fn merge_is_independent_of_file_order() {
    let dir = TempDir::new().expect("tempdir");
    let abc = frame_file(dir.path(), "abc.ron", ABC);
    let def = frame_file(dir.path(), "def.ron", DEF);

    ronlog_cmd(dir.path())
        .arg("merge")
        .arg(&def)
        .arg(&abc)
        .assert()
        .success()
        .stdout(format!("{MERGED}\n"));
}

#[test]
fn merge_json_reports_counts() {
    let dir = TempDir::new().expect("tempdir");
    let abc = frame_file(dir.path(), "abc.ron", ABC);
    let def = frame_file(dir.path(), "def.ron", DEF);

    let json = json_output(
        ronlog_cmd(dir.path())
            .args(["--format", "json", "merge"])
            .arg(&abc)
            .arg(&def),
    );
    assert_eq!(json["inputs"], 2);
    assert_eq!(json["ops"], 7);
    assert_eq!(json["frame"], MERGED);
}

#[test]
fn merge_writes_output_file() {
    let dir = TempDir::new().expect("tempdir");
    let abc = frame_file(dir.path(), "abc.ron", ABC);
    let def = frame_file(dir.path(), "def.ron", DEF);
    let out = dir.path().join("merged.ron");

    ronlog_cmd(dir.path())
        .arg("merge")
        .arg(&abc)
        .arg(&def)
        .arg("-o")
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("wrote 7 ops"));

    let written = fs::read_to_string(&out).expect("merged file");
    assert_eq!(written.trim_end(), MERGED);
}

#[test]
fn merge_honors_uncompacted_frame_config() {
    let dir = TempDir::new().expect("tempdir");
    fs::create_dir_all(dir.path().join(".ronlog")).expect("config dir");
    fs::write(
        dir.path().join(".ronlog/config.toml"),
        "[frame]\ncompact = false\n",
    )
    .expect("config");
    let abc = frame_file(dir.path(), "abc.ron", ABC);

    ronlog_cmd(dir.path())
        .arg("merge")
        .arg(&abc)
        .assert()
        .success()
        .stdout(predicate::str::contains("@1000000002+A :1000000001+A 'b',"));
}

#[test]
fn merge_without_the_root_is_a_causal_break() {
    let dir = TempDir::new().expect("tempdir");
    let orphan = frame_file(dir.path(), "orphan.ron", "@1a+B :1+A 'b';");

    ronlog_cmd(dir.path())
        .args(["merge"])
        .arg(&orphan)
        .assert()
        .failure()
        .stderr(predicate::str::contains("E2001"));
}

#[test]
fn merge_of_lww_object_is_not_implemented() {
    let dir = TempDir::new().expect("tempdir");
    let lww = frame_file(dir.path(), "lww.ron", "@1+A :lww! 'key' 'value',");

    ronlog_cmd(dir.path())
        .args(["merge"])
        .arg(&lww)
        .assert()
        .failure()
        .stderr(predicate::str::contains("E1003"));
}

#[test]
fn merge_rejects_malformed_input() {
    let dir = TempDir::new().expect("tempdir");
    let bad = frame_file(dir.path(), "bad.ron", "@1+A :rga! 'unterminated");

    ronlog_cmd(dir.path())
        .args(["merge"])
        .arg(&bad)
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to decode"));
}

#[test]
fn json_errors_are_structured() {
    let dir = TempDir::new().expect("tempdir");
    let orphan = frame_file(dir.path(), "orphan.ron", "@1a+B :1+A 'b';");

    let output = ronlog_cmd(dir.path())
        .args(["--json", "merge"])
        .arg(&orphan)
        .output()
        .expect("run");
    assert!(!output.status.success());
    let json: Value = serde_json::from_slice(&output.stderr).expect("json error");
    assert_eq!(json["error"]["error_code"], "E2001");
}

// ---------------------------------------------------------------------------
// scan
// ---------------------------------------------------------------------------

#[test]
fn scan_json_reports_tomb_bits() {
    let dir = TempDir::new().expect("tempdir");
    let file = frame_file(dir.path(), "scan.ron", SCANNED);

    let json = json_output(ronlog_cmd(dir.path()).args(["scan", "--format", "json"]).arg(&file));
    let bits: Vec<bool> = json["ops"]
        .as_array()
        .expect("ops array")
        .iter()
        .map(|row| row["tomb"].as_bool().expect("tomb flag"))
        .collect();
    assert_eq!(bits, vec![true, false, true, true, false]);
    assert_eq!(json["live"], 2);
    assert_eq!(json["tomb"], 3);
}

#[test]
fn scan_text_lists_one_op_per_line() {
    let dir = TempDir::new().expect("tempdir");
    let file = frame_file(dir.path(), "scan.ron", SCANNED);

    let output = ronlog_cmd(dir.path())
        .arg("scan")
        .arg(&file)
        .output()
        .expect("run");
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).expect("utf8");
    let states: Vec<&str> = stdout
        .lines()
        .map(|l| l.split(' ').next().expect("state"))
        .collect();
    assert_eq!(states, vec!["tomb", "live", "tomb", "tomb", "live"]);
    assert!(stdout.contains("tomb @1i08k+path :1i08e40002+path rm,"), "{stdout}");
}

// ---------------------------------------------------------------------------
// text
// ---------------------------------------------------------------------------

#[test]
fn text_prints_live_characters() {
    let dir = TempDir::new().expect("tempdir");
    let abc = frame_file(dir.path(), "abc.ron", ABC);
    let def = frame_file(dir.path(), "def.ron", DEF);

    ronlog_cmd(dir.path())
        .arg("text")
        .arg(&abc)
        .arg(&def)
        .assert()
        .success()
        .stdout("abcDEF\n");
}

#[test]
fn text_skips_removed_characters() {
    let dir = TempDir::new().expect("tempdir");
    let file = frame_file(dir.path(), "scan.ron", SCANNED);

    ronlog_cmd(dir.path())
        .arg("text")
        .arg(&file)
        .assert()
        .success()
        .stdout("ad\n");
}
