#![allow(deprecated)]
use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn forge(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("forge").unwrap();
    cmd.current_dir(dir.path()).env("FORGE_ROOT", dir.path());
    cmd
}

fn init_project(dir: &TempDir) {
    forge(dir).args(["init", "demo"]).assert().success();
}

// ---------------------------------------------------------------------------
// forge init
// ---------------------------------------------------------------------------

#[test]
fn init_creates_directory_tree() {
    let dir = TempDir::new().unwrap();
    forge(&dir).args(["init", "demo"]).assert().success();

    assert!(dir.path().join(".forge").is_dir());
    assert!(dir.path().join(".forge/config.yaml").exists());
    assert!(dir.path().join(".forge/state.yaml").exists());
    assert!(dir.path().join(".forge/history").is_dir());
    for phase in [
        "discovery",
        "planning",
        "design",
        "implementation",
        "testing",
        "deployment",
    ] {
        assert!(dir.path().join(".forge/artifacts").join(phase).is_dir());
    }
}

#[test]
fn init_refuses_to_reinitialize() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);

    forge(&dir)
        .args(["init", "demo"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already initialized"));
}

#[test]
fn init_defaults_name_to_directory() {
    let dir = TempDir::new().unwrap();
    forge(&dir).arg("init").assert().success();

    let config = std::fs::read_to_string(dir.path().join(".forge/config.yaml")).unwrap();
    let dir_name = dir.path().file_name().unwrap().to_string_lossy();
    assert!(config.contains(dir_name.as_ref()));
}

#[test]
fn commands_require_initialization() {
    let dir = TempDir::new().unwrap();

    forge(&dir)
        .arg("status")
        .assert()
        .failure()
        .stderr(predicate::str::contains("not a forge project"));
}

// ---------------------------------------------------------------------------
// forge phase
// ---------------------------------------------------------------------------

#[test]
fn phase_list_shows_all_phases() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);

    forge(&dir)
        .args(["phase", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("discovery"))
        .stdout(predicate::str::contains("deployment"))
        .stdout(predicate::str::contains("pending"));
}

#[test]
fn phase_info_prints_descriptor() {
    let dir = TempDir::new().unwrap();

    forge(&dir)
        .args(["phase", "info", "discovery"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Research and requirements gathering"))
        .stdout(predicate::str::contains("requirements.md"));
}

#[test]
fn phase_info_rejects_unknown_name() {
    let dir = TempDir::new().unwrap();

    forge(&dir)
        .args(["phase", "info", "qa"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid phase"));
}

#[test]
fn phase_start_first_phase_succeeds() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);

    forge(&dir)
        .args(["phase", "start", "discovery"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Started phase: discovery"));

    forge(&dir)
        .args(["phase", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("in_progress"));
}

#[test]
fn phase_start_out_of_order_fails_without_force() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);

    forge(&dir)
        .args(["phase", "start", "design"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("planning"));

    forge(&dir)
        .args(["phase", "start", "design", "--force"])
        .assert()
        .success();
}

#[test]
fn phase_start_while_another_is_active_fails() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);

    forge(&dir)
        .args(["phase", "start", "discovery"])
        .assert()
        .success();
    forge(&dir)
        .args(["phase", "start", "discovery"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already in phase"));
}

#[test]
fn phase_complete_without_active_phase_fails() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);

    forge(&dir)
        .args(["phase", "complete"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no active phase"));
}

#[test]
fn phase_complete_fails_checkpoint_without_artifacts() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);

    forge(&dir)
        .args(["phase", "start", "discovery"])
        .assert()
        .success();
    forge(&dir)
        .args(["phase", "complete"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("checkpoint validation failed"));
}

#[test]
fn phase_complete_passes_with_artifacts() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);

    forge(&dir)
        .args(["phase", "start", "discovery"])
        .assert()
        .success();

    let artifacts = dir.path().join(".forge/artifacts/discovery");
    for file in ["requirements.md", "user_stories.md", "research_notes.md"] {
        std::fs::write(artifacts.join(file), "content").unwrap();
    }

    forge(&dir)
        .args(["phase", "complete"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Completed phase: discovery"))
        .stdout(predicate::str::contains("forge phase start planning"));

    // A history record was written
    let entries: Vec<_> = std::fs::read_dir(dir.path().join(".forge/history"))
        .unwrap()
        .flatten()
        .collect();
    assert_eq!(entries.len(), 1);
    assert!(entries[0]
        .file_name()
        .to_string_lossy()
        .starts_with("discovery_"));
}

#[test]
fn phase_complete_skip_check_bypasses_checkpoint() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);

    forge(&dir)
        .args(["phase", "start", "discovery"])
        .assert()
        .success();
    forge(&dir)
        .args(["phase", "complete", "--skip-check"])
        .assert()
        .success();
}

// ---------------------------------------------------------------------------
// forge status / history
// ---------------------------------------------------------------------------

#[test]
fn status_shows_progress() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);

    forge(&dir)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Project: demo"))
        .stdout(predicate::str::contains("0/6 phases completed"));
}

#[test]
fn status_json_is_machine_readable() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);

    let output = forge(&dir).args(["status", "--json"]).output().unwrap();
    assert!(output.status.success());
    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(parsed["project"], "demo");
    assert_eq!(parsed["total"], 6);
}

#[test]
fn history_lists_activities() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);

    forge(&dir)
        .args(["phase", "start", "discovery"])
        .assert()
        .success();

    forge(&dir)
        .arg("history")
        .assert()
        .success()
        .stdout(predicate::str::contains("Project initialized"))
        .stdout(predicate::str::contains("Started phase: discovery"));
}

// ---------------------------------------------------------------------------
// forge session
// ---------------------------------------------------------------------------

#[test]
fn session_save_and_show() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);

    forge(&dir)
        .args(["session", "save", "--context", "working on auth"])
        .assert()
        .success();
    assert!(dir.path().join(".forge/session.md").exists());

    forge(&dir)
        .args(["session", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("# Forge Session: demo"))
        .stdout(predicate::str::contains("working on auth"));

    forge(&dir)
        .args(["session", "resume"])
        .assert()
        .success()
        .stdout(predicate::str::contains("## Resume Prompt"));
}

#[test]
fn session_show_without_save_is_friendly() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);

    forge(&dir)
        .args(["session", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No saved session"));
}

// ---------------------------------------------------------------------------
// forge provider
// ---------------------------------------------------------------------------

#[test]
fn provider_list_shows_stock_backends() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);

    forge(&dir)
        .args(["provider", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("gemini*"))
        .stdout(predicate::str::contains("executable"))
        .stdout(predicate::str::contains("disabled"));
}

#[test]
fn provider_models_for_disabled_provider_fails() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);

    // claude is present in config but disabled, so the registry omits it
    forge(&dir)
        .args(["provider", "models", "claude"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not configured or not enabled"));
}

// ---------------------------------------------------------------------------
// forge auto
// ---------------------------------------------------------------------------

#[test]
fn auto_dry_run_prints_the_plan() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);

    forge(&dir)
        .args(["auto", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Would run 6 phase(s)"))
        .stdout(predicate::str::contains("discovery"))
        .stdout(predicate::str::contains("deployment"));
}

#[test]
fn auto_dry_run_respects_bounds() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);

    forge(&dir)
        .args(["auto", "--from", "planning", "--until", "design", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Would run 2 phase(s)"));
}

#[test]
fn auto_inverted_range_fails() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);

    forge(&dir)
        .args(["auto", "--from", "design", "--until", "planning", "--dry-run"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("comes after"));
}
