use thiserror::Error;

#[derive(Debug, Error)]
pub enum ForgeError {
    #[error("not a forge project: run 'forge init' first")]
    NotInitialized,

    #[error("project already initialized ({0})")]
    AlreadyInitialized(String),

    #[error("invalid phase: {0}")]
    InvalidPhase(String),

    #[error("already in phase '{0}': complete it first or use --force")]
    AlreadyInPhase(String),

    #[error("no active phase to complete")]
    NoActivePhase,

    #[error("cannot start '{phase}': previous phase '{missing}' is not completed (use --force to override)")]
    PhaseOrderViolation { phase: String, missing: String },

    #[error("checkpoint validation failed for phase '{0}'")]
    CheckpointFailed(String),

    #[error("phase {phase} failed: {message}")]
    Execution { phase: String, message: String },

    #[error("validation failed for {phase}: {feedback}")]
    ValidationFailed { phase: String, feedback: String },

    #[error("validate {phase}: {message}")]
    ValidationError { phase: String, message: String },

    #[error("start phase '{from}' comes after end phase '{until}'")]
    InvalidRange { from: String, until: String },

    #[error("all phases already completed")]
    NothingToRun,

    #[error("another forge command is running against this project")]
    Locked,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ForgeError>;
