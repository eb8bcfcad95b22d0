use crate::error::Result;
use crate::paths;
use crate::phase::Phase;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Completion record for one phase, written to
/// `.forge/history/<phase>_<timestamp>.yaml` when the phase completes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseHistory {
    pub phase: Phase,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub duration_secs: i64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub notes: String,
}

impl PhaseHistory {
    pub fn record(phase: Phase, started_at: DateTime<Utc>) -> Self {
        let completed_at = Utc::now();
        Self {
            phase,
            started_at,
            completed_at,
            duration_secs: (completed_at - started_at).num_seconds(),
            notes: String::new(),
        }
    }

    pub fn save(&self, root: &Path) -> Result<PathBuf> {
        let stamp = self.completed_at.format("%Y%m%d_%H%M%S").to_string();
        let path = paths::history_path(root, self.phase, &stamp);
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&path, data.as_bytes())?;
        Ok(path)
    }
}

/// Load all history records under `.forge/history/`, oldest first.
pub fn load_all(root: &Path) -> Result<Vec<PhaseHistory>> {
    let dir = paths::history_dir(root);
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut entries: Vec<PathBuf> = std::fs::read_dir(&dir)?
        .flatten()
        .map(|e| e.path())
        .filter(|p| p.extension().is_some_and(|e| e == "yaml"))
        .collect();
    entries.sort();

    let mut records = Vec::with_capacity(entries.len());
    for path in entries {
        let data = std::fs::read_to_string(&path)?;
        records.push(serde_yaml::from_str(&data)?);
    }
    Ok(records)
}
