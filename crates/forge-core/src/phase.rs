use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Phase
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Discovery,
    Planning,
    Design,
    Implementation,
    Testing,
    Deployment,
}

impl Phase {
    pub fn all() -> &'static [Phase] {
        &[
            Phase::Discovery,
            Phase::Planning,
            Phase::Design,
            Phase::Implementation,
            Phase::Testing,
            Phase::Deployment,
        ]
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn next(self) -> Option<Phase> {
        Phase::all().get(self.index() + 1).copied()
    }

    pub fn previous(self) -> Option<Phase> {
        self.index().checked_sub(1).map(|i| Phase::all()[i])
    }

    pub fn as_str(self) -> &'static str {
        self.spec().name
    }

    /// The static descriptor for this phase.
    pub fn spec(self) -> &'static PhaseSpec {
        &CATALOG[self.index()]
    }

    pub fn names() -> Vec<&'static str> {
        Phase::all().iter().map(|p| p.as_str()).collect()
    }

    pub fn is_valid_name(name: &str) -> bool {
        name.parse::<Phase>().is_ok()
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Phase {
    type Err = crate::error::ForgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "discovery" => Ok(Phase::Discovery),
            "planning" => Ok(Phase::Planning),
            "design" => Ok(Phase::Design),
            "implementation" => Ok(Phase::Implementation),
            "testing" => Ok(Phase::Testing),
            "deployment" => Ok(Phase::Deployment),
            _ => Err(crate::error::ForgeError::InvalidPhase(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// PhaseSpec
// ---------------------------------------------------------------------------

/// Static descriptor for a phase: what it is for, which tool drives it by
/// default, and what the checkpoint expects to find on disk.
#[derive(Debug)]
pub struct PhaseSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub primary_tool: &'static str,
    pub tool_reason: &'static str,
    pub criteria: &'static [&'static str],
    pub artifacts: &'static [&'static str],
}

static CATALOG: [PhaseSpec; 6] = [
    PhaseSpec {
        name: "discovery",
        description: "Research and requirements gathering",
        primary_tool: "gemini",
        tool_reason: "Free tier, 1M context window, Google Search integration for research",
        criteria: &[
            "Requirements document exists",
            "User stories or use cases defined",
            "Technical constraints identified",
            "Research notes compiled",
        ],
        artifacts: &["requirements.md", "user_stories.md", "research_notes.md"],
    },
    PhaseSpec {
        name: "planning",
        description: "Architecture and component design",
        primary_tool: "opencode",
        tool_reason: "Read-only exploration mode, provider-agnostic planning",
        criteria: &[
            "Architecture document exists",
            "Component breakdown defined",
            "Technology decisions documented",
            "Dependencies identified",
        ],
        artifacts: &["architecture.md", "components.md", "tech_decisions.md"],
    },
    PhaseSpec {
        name: "design",
        description: "API and data model definition",
        primary_tool: "opencode",
        tool_reason: "Continue planning context, ideal for API/schema design",
        criteria: &[
            "API specification defined",
            "Data models documented",
            "Interface contracts specified",
            "Error handling strategy defined",
        ],
        artifacts: &["api_spec.md", "data_models.md", "interfaces.md"],
    },
    PhaseSpec {
        name: "implementation",
        description: "Code development and feature building",
        primary_tool: "codex",
        tool_reason: "Advanced reasoning, code review capabilities, multimodal support",
        criteria: &[
            "Code builds successfully",
            "Core features implemented",
            "Basic tests exist",
            "No critical errors in linting",
        ],
        artifacts: &["implementation_notes.md", "code_review.md"],
    },
    PhaseSpec {
        name: "testing",
        description: "Test creation and quality assurance",
        primary_tool: "gemini",
        tool_reason: "Large context for analyzing coverage, good at test generation",
        criteria: &[
            "Tests pass",
            "Coverage threshold met (if configured)",
            "Edge cases covered",
            "Integration tests exist",
        ],
        artifacts: &["test_plan.md", "coverage_report.md"],
    },
    PhaseSpec {
        name: "deployment",
        description: "Documentation and release preparation",
        primary_tool: "fabric",
        tool_reason: "Pattern-based generation for docs, changelogs, release notes",
        criteria: &[
            "README is complete",
            "Changelog updated",
            "Deployment docs exist",
            "Release notes prepared",
        ],
        artifacts: &["changelog.md", "release_notes.md", "deployment_guide.md"],
    },
];

/// Default tool for a phase name. Unknown names fall back to "gemini"
/// rather than erroring.
pub fn default_tool_for(name: &str) -> &'static str {
    name.parse::<Phase>()
        .map(|p| p.spec().primary_tool)
        .unwrap_or("gemini")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
