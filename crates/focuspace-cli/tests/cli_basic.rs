//! Basic CLI E2E tests.
//!
//! Tests invoke the built binary with HOME pointed at a temporary
//! directory, so config and preferences never touch the real profile.

use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

/// Run a CLI command and return (stdout, stderr, exit code).
fn run_cli(home: &Path, args: &[&str]) -> (String, String, i32) {
    run_cli_with_input(home, args, "")
}

fn run_cli_with_input(home: &Path, args: &[&str], input: &str) -> (String, String, i32) {
    let mut child = Command::new(env!("CARGO_BIN_EXE_focuspace"))
        .args(args)
        .env("HOME", home)
        .env_remove("FOCUSPACE_ENV")
        .env("RUST_LOG", "off")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to execute CLI command");

    child
        .stdin
        .take()
        .expect("stdin")
        .write_all(input.as_bytes())
        .expect("write stdin");
    let output = child.wait_with_output().expect("wait for CLI");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (stdout, stderr, code)
}

fn json(stdout: &str) -> serde_json::Value {
    serde_json::from_str(stdout).expect("valid JSON output")
}

#[test]
fn test_presets_lists_catalog() {
    let home = tempfile::tempdir().unwrap();
    let (stdout, _, code) = run_cli(home.path(), &["presets"]);
    assert_eq!(code, 0);

    let presets = json(&stdout);
    let ids: Vec<_> = presets
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["id"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(ids, ["default_25_5", "default_52_17", "default_112_26"]);
    assert_eq!(presets[0]["focus_secs"], 1500);
    assert_eq!(presets[0]["rest_secs"], 300);
}

#[test]
fn test_tracks_and_effects() {
    let home = tempfile::tempdir().unwrap();
    let (stdout, _, code) = run_cli(home.path(), &["tracks"]);
    assert_eq!(code, 0);
    assert_eq!(json(&stdout).as_array().unwrap().len(), 9);

    let (stdout, _, code) = run_cli(home.path(), &["effects"]);
    assert_eq!(code, 0);
    let effects = json(&stdout);
    assert_eq!(effects[0]["id"], "weather_sun_01");
    assert_eq!(effects.as_array().unwrap().len(), 3);
}

#[test]
fn test_config_get_set() {
    let home = tempfile::tempdir().unwrap();
    let (stdout, _, code) = run_cli(home.path(), &["config", "get", "timer.default_preset"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "default_25_5");

    let (_, _, code) = run_cli(home.path(), &["config", "set", "audio.muted", "true"]);
    assert_eq!(code, 0);
    let (stdout, _, _) = run_cli(home.path(), &["config", "get", "audio.muted"]);
    assert_eq!(stdout.trim(), "true");

    let (_, stderr, code) = run_cli(home.path(), &["config", "get", "audio.nope"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("error:"), "{stderr}");
}

#[test]
fn test_prefs_round_trip() {
    let home = tempfile::tempdir().unwrap();
    let (_, _, code) = run_cli(
        home.path(),
        &["prefs", "set-duration", "--user", "u1", "default_52_17"],
    );
    assert_eq!(code, 0);
    let (_, _, code) = run_cli(home.path(), &["prefs", "set-track", "--user", "u1", "7"]);
    assert_eq!(code, 0);

    let (stdout, _, code) = run_cli(home.path(), &["prefs", "get", "--user", "u1"]);
    assert_eq!(code, 0);
    let prefs = json(&stdout);
    assert_eq!(prefs["duration_id"], "default_52_17");
    assert_eq!(prefs["music_track_id"], "7");
    assert!(prefs["visual_effect_id"].is_null());
}

#[test]
fn test_prefs_rejects_unknown_ids() {
    let home = tempfile::tempdir().unwrap();
    let (_, stderr, code) = run_cli(
        home.path(),
        &["prefs", "set-duration", "--user", "u1", "default_1_1"],
    );
    assert_eq!(code, 1);
    assert!(stderr.contains("default_1_1"), "{stderr}");
}

#[test]
fn test_run_session_commands() {
    let home = tempfile::tempdir().unwrap();
    let (stdout, _, code) = run_cli_with_input(
        home.path(),
        &["run", "--duration", "default_52_17"],
        "status\ntoggle\nstatus\nquit\n",
    );
    assert_eq!(code, 0);

    let lines: Vec<serde_json::Value> = stdout
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| serde_json::from_str(l).expect("JSON line"))
        .collect();
    assert_eq!(lines[0]["type"], "DurationChanged");
    assert_eq!(lines[1]["remaining_secs"], 3120);
    assert_eq!(lines[1]["title"], "Focuspace");
    assert_eq!(lines[2]["type"], "TimerStarted");
    assert_eq!(lines[3]["running"], true);
}

#[test]
fn test_run_uses_saved_preferences() {
    let home = tempfile::tempdir().unwrap();
    run_cli(
        home.path(),
        &["prefs", "set-effect", "--user", "u1", "weather_snow_01"],
    );

    let (stdout, _, code) =
        run_cli_with_input(home.path(), &["run", "--user", "u1"], "status\n");
    assert_eq!(code, 0);
    let view = json(stdout.trim());
    assert_eq!(view["effect_id"], "weather_snow_01");
    assert_eq!(view["preset_id"], "default_25_5");
}
