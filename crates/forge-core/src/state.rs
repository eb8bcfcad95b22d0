use crate::error::{ForgeError, Result};
use crate::paths;
use crate::phase::Phase;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

// ---------------------------------------------------------------------------
// Status enums
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseStatus {
    Pending,
    InProgress,
    Completed,
    ValidationFailed,
}

impl fmt::Display for PhaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PhaseStatus::Pending => "pending",
            PhaseStatus::InProgress => "in_progress",
            PhaseStatus::Completed => "completed",
            PhaseStatus::ValidationFailed => "validation_failed",
        };
        f.write_str(s)
    }
}

/// Status of the phase the auto runner is currently working on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutoPhaseStatus {
    Running,
    Completed,
    Failed,
    ValidationFailed,
    ValidationError,
}

// ---------------------------------------------------------------------------
// Supporting types
// ---------------------------------------------------------------------------

/// Append-only activity log entry. Never mutated or removed after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    pub timestamp: DateTime<Utc>,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<Phase>,
}

/// State of an automated phase run. Present only during/after `forge auto`;
/// `last_completed_phase` drives resume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutoState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_completed_phase: Option<Phase>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_phase_status: Option<AutoPhaseStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_phase: Option<Phase>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub until_phase: Option<Phase>,
    #[serde(default)]
    pub skip_validation: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub feedback: String,
    pub started_at: DateTime<Utc>,
}

impl AutoState {
    pub fn new() -> Self {
        Self {
            last_completed_phase: None,
            current_phase_status: None,
            from_phase: None,
            until_phase: None,
            skip_validation: false,
            feedback: String::new(),
            started_at: Utc::now(),
        }
    }
}

impl Default for AutoState {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// ProjectState
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_phase: Option<Phase>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase_started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub phase_statuses: BTreeMap<Phase, PhaseStatus>,
    #[serde(default)]
    pub activities: Vec<Activity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto: Option<AutoState>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProjectState {
    pub fn new() -> Self {
        let now = Utc::now();
        let phase_statuses = Phase::all()
            .iter()
            .map(|p| (*p, PhaseStatus::Pending))
            .collect();
        Self {
            current_phase: None,
            phase_started_at: None,
            phase_statuses,
            activities: vec![Activity {
                timestamp: now,
                message: "Project initialized".to_string(),
                phase: None,
            }],
            auto: None,
            created_at: now,
            updated_at: now,
        }
    }

    // ---------------------------------------------------------------------------
    // Persistence
    // ---------------------------------------------------------------------------

    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::state_path(root);
        if !path.exists() {
            return Err(ForgeError::NotInitialized);
        }
        let data = std::fs::read_to_string(&path)?;
        let state: ProjectState = serde_yaml::from_str(&data)?;
        Ok(state)
    }

    pub fn save(&mut self, root: &Path) -> Result<()> {
        self.updated_at = Utc::now();
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&paths::state_path(root), data.as_bytes())
    }

    // ---------------------------------------------------------------------------
    // Accessors and mutations
    // ---------------------------------------------------------------------------

    /// Status of a phase. Missing entries read as pending; callers must not
    /// assume the map is populated.
    pub fn phase_status(&self, phase: Phase) -> PhaseStatus {
        self.phase_statuses
            .get(&phase)
            .copied()
            .unwrap_or(PhaseStatus::Pending)
    }

    pub fn set_phase_status(&mut self, phase: Phase, status: PhaseStatus) {
        self.phase_statuses.insert(phase, status);
        self.updated_at = Utc::now();
    }

    /// Log an activity, stamped with the state's current phase at call time.
    pub fn add_activity(&mut self, message: impl Into<String>) {
        self.activities.push(Activity {
            timestamp: Utc::now(),
            message: message.into(),
            phase: self.current_phase,
        });
        self.updated_at = Utc::now();
    }

    pub fn completed_count(&self) -> usize {
        Phase::all()
            .iter()
            .filter(|p| self.phase_status(**p) == PhaseStatus::Completed)
            .count()
    }
}

impl Default for ProjectState {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
