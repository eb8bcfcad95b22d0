use crate::error::{ForgeError, Result};
use crate::phase::Phase;
use crate::state::{AutoPhaseStatus, AutoState, PhaseStatus, ProjectState};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Pattern name handed to the validator closure, mirroring the prompt
/// template it is expected to wrap.
pub const VALIDATION_PATTERN: &str = "validation/validate_phase_output";

// ---------------------------------------------------------------------------
// Injected collaborators
// ---------------------------------------------------------------------------

/// Executes the actual work of a phase. Injected so the runner can be driven
/// by a provider-backed executor in the CLI and by mocks in tests.
pub trait PhaseExecutor {
    fn execute(&mut self, phase: Phase) -> Result<()>;
}

/// AI-backed output validator: `(pattern, input) -> raw model output`.
pub type ValidatorFn = Box<dyn Fn(&str, &str) -> Result<String>>;

/// Result the validator's output is expected to contain as a JSON object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiValidation {
    pub valid: bool,
    #[serde(default)]
    pub feedback: String,
}

// ---------------------------------------------------------------------------
// AutoRunner
// ---------------------------------------------------------------------------

/// Sequential driver for automated phase execution.
///
/// Each phase step persists state before any work starts, so a killed
/// process always leaves the state file showing exactly which phase was
/// interrupted. Nothing is retried automatically: a failed phase aborts the
/// run, and a later `run` with no explicit `from` resumes after the last
/// completed phase.
pub struct AutoRunner<'a> {
    state: &'a mut ProjectState,
    root: PathBuf,
    executor: Box<dyn PhaseExecutor + 'a>,
    validator: Option<ValidatorFn>,
}

impl<'a> AutoRunner<'a> {
    pub fn new(
        state: &'a mut ProjectState,
        root: &Path,
        executor: Box<dyn PhaseExecutor + 'a>,
    ) -> Self {
        Self {
            state,
            root: root.to_path_buf(),
            executor,
            validator: None,
        }
    }

    pub fn with_validator(mut self, validator: ValidatorFn) -> Self {
        self.validator = Some(validator);
        self
    }

    /// Execute phases from `from` to `until` inclusive.
    ///
    /// With no `from`, resumes after `auto.last_completed_phase` when one is
    /// recorded, else starts at the first phase. With no `until`, runs to
    /// the last phase. An inverted range is rejected before any state is
    /// persisted.
    pub fn run(
        &mut self,
        from: Option<Phase>,
        until: Option<Phase>,
        skip_validation: bool,
    ) -> Result<()> {
        let phases = self.phase_range(from, until)?;

        let auto = self.state.auto.get_or_insert_with(AutoState::new);
        auto.from_phase = from;
        auto.until_phase = until;
        auto.skip_validation = skip_validation;
        auto.started_at = chrono::Utc::now();

        for phase in phases {
            self.run_phase(phase, skip_validation)?;
        }
        Ok(())
    }

    /// Resolve the inclusive phase range for a run. Pure: no state mutation.
    pub fn phase_range(&self, from: Option<Phase>, until: Option<Phase>) -> Result<Vec<Phase>> {
        let all = Phase::all();

        let start = match from {
            Some(p) => p.index(),
            None => match self.state.auto.as_ref().and_then(|a| a.last_completed_phase) {
                Some(last) => match last.next() {
                    Some(next) => next.index(),
                    None => return Err(ForgeError::NothingToRun),
                },
                None => 0,
            },
        };

        let end = until.map(|p| p.index()).unwrap_or(all.len() - 1);

        if start > end {
            return Err(ForgeError::InvalidRange {
                from: all[start].to_string(),
                until: all[end].to_string(),
            });
        }

        Ok(all[start..=end].to_vec())
    }

    /// Resume information: (can_resume, last completed, next to run).
    pub fn resume_info(&self) -> (bool, Option<Phase>, Option<Phase>) {
        match self.state.auto.as_ref().and_then(|a| a.last_completed_phase) {
            None => (false, None, Some(Phase::all()[0])),
            Some(last) => {
                let next = last.next();
                (next.is_some(), Some(last), next)
            }
        }
    }

    fn run_phase(&mut self, phase: Phase, skip_validation: bool) -> Result<()> {
        // Persist before doing any work: a crash mid-phase must leave state
        // naming the interrupted phase.
        self.state.current_phase = Some(phase);
        self.state.phase_started_at = Some(chrono::Utc::now());
        self.set_auto_status(AutoPhaseStatus::Running, None);
        self.state.set_phase_status(phase, PhaseStatus::InProgress);
        self.state.save(&self.root)?;

        if let Err(e) = self.executor.execute(phase) {
            let message = e.to_string();
            self.set_auto_status(AutoPhaseStatus::Failed, Some(message.clone()));
            self.save_best_effort();
            return Err(ForgeError::Execution {
                phase: phase.to_string(),
                message,
            });
        }

        if let Some(auto) = self.state.auto.as_mut() {
            auto.last_completed_phase = Some(phase);
        }
        self.set_auto_status(AutoPhaseStatus::Completed, None);
        self.state.set_phase_status(phase, PhaseStatus::Completed);
        self.state.add_activity(format!("Auto: completed phase {phase}"));
        self.state.save(&self.root)?;

        if !skip_validation {
            if let Some(validator) = self.validator.take() {
                let outcome = self.validate_phase(phase, &validator);
                self.validator = Some(validator);
                match outcome {
                    Err(e) => {
                        let message = e.to_string();
                        self.set_auto_status(
                            AutoPhaseStatus::ValidationError,
                            Some(message.clone()),
                        );
                        self.save_best_effort();
                        return Err(ForgeError::ValidationError {
                            phase: phase.to_string(),
                            message,
                        });
                    }
                    Ok(result) if !result.valid => {
                        self.set_auto_status(
                            AutoPhaseStatus::ValidationFailed,
                            Some(result.feedback.clone()),
                        );
                        self.state
                            .set_phase_status(phase, PhaseStatus::ValidationFailed);
                        self.state.save(&self.root)?;
                        return Err(ForgeError::ValidationFailed {
                            phase: phase.to_string(),
                            feedback: result.feedback,
                        });
                    }
                    Ok(_) => {}
                }
            }
        }

        Ok(())
    }

    fn validate_phase(&self, phase: Phase, validator: &ValidatorFn) -> Result<AiValidation> {
        let input = build_validation_input(phase);
        let output = validator(VALIDATION_PATTERN, &input)?;
        parse_validation_output(&output)
    }

    fn set_auto_status(&mut self, status: AutoPhaseStatus, feedback: Option<String>) {
        let auto = self.state.auto.get_or_insert_with(AutoState::new);
        auto.current_phase_status = Some(status);
        if let Some(feedback) = feedback {
            auto.feedback = feedback;
        }
    }

    /// State must reflect the failure even when the save itself fails; a
    /// secondary persistence error is logged, never allowed to mask the
    /// primary one.
    fn save_best_effort(&mut self) {
        if let Err(e) = self.state.save(&self.root) {
            tracing::warn!("failed to persist state on error path: {e}");
        }
    }
}

// ---------------------------------------------------------------------------
// Validation prompt and output parsing
// ---------------------------------------------------------------------------

/// Fixed prompt template describing what the validator should check.
pub fn build_validation_input(phase: Phase) -> String {
    let spec = phase.spec();
    format!(
        "Phase: {}\nDescription: {}\nExpected Artifacts: {}\nCheckpoint Criteria: {}\n\n\
         Please validate that this phase has been completed successfully.",
        spec.name,
        spec.description,
        spec.artifacts.join(", "),
        spec.criteria.join(", "),
    )
}

/// Parse the validator's free-form output.
///
/// Model output formatting is unreliable, so the contract is deliberately
/// lenient: no JSON at all becomes `{valid: false, feedback: <raw text>}`
/// rather than a hard error. Malformed JSON inside an extracted candidate
/// is still an error, since that points at a real wiring problem.
pub fn parse_validation_output(output: &str) -> Result<AiValidation> {
    match extract_json(output) {
        None => Ok(AiValidation {
            valid: false,
            feedback: format!("Could not parse validation response: {output}"),
        }),
        Some(json) => Ok(serde_json::from_str(&json)?),
    }
}

static CODE_BLOCK_RE: OnceLock<Regex> = OnceLock::new();

/// Extract a JSON candidate from model output: a fenced code block first,
/// else the first balanced top-level `{...}` in the raw text.
fn extract_json(s: &str) -> Option<String> {
    let re = CODE_BLOCK_RE
        .get_or_init(|| Regex::new(r"(?s)```(?:json)?\s*(.*?)```").unwrap());
    if let Some(caps) = re.captures(s) {
        return Some(caps[1].trim().to_string());
    }

    let start = s.find('{')?;
    let mut depth = 0usize;
    for (i, c) in s[start..].char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(s[start..start + i + 1].to_string());
                }
            }
            _ => {}
        }
    }
    None
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
