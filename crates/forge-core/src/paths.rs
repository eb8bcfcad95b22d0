use crate::phase::Phase;
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const FORGE_DIR: &str = ".forge";
pub const ARTIFACTS_DIR: &str = ".forge/artifacts";
pub const HISTORY_DIR: &str = ".forge/history";

pub const CONFIG_FILE: &str = ".forge/config.yaml";
pub const STATE_FILE: &str = ".forge/state.yaml";
pub const LOCK_FILE: &str = ".forge/lock";
pub const SESSION_FILE: &str = ".forge/session.md";
pub const SCAFFOLD_FILE: &str = ".forge/scaffold.md";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn forge_dir(root: &Path) -> PathBuf {
    root.join(FORGE_DIR)
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

pub fn state_path(root: &Path) -> PathBuf {
    root.join(STATE_FILE)
}

pub fn lock_path(root: &Path) -> PathBuf {
    root.join(LOCK_FILE)
}

pub fn session_path(root: &Path) -> PathBuf {
    root.join(SESSION_FILE)
}

pub fn scaffold_path(root: &Path) -> PathBuf {
    root.join(SCAFFOLD_FILE)
}

pub fn artifacts_dir(root: &Path, phase: Phase) -> PathBuf {
    root.join(ARTIFACTS_DIR).join(phase.as_str())
}

pub fn artifact_path(root: &Path, phase: Phase, filename: &str) -> PathBuf {
    artifacts_dir(root, phase).join(filename)
}

pub fn history_dir(root: &Path) -> PathBuf {
    root.join(HISTORY_DIR)
}

pub fn history_path(root: &Path, phase: Phase, stamp: &str) -> PathBuf {
    history_dir(root).join(format!("{}_{}.yaml", phase.as_str(), stamp))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
