use crate::phase::Phase;
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Result of a single checkpoint criterion. Computed fresh on each call,
/// never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckResult {
    pub name: String,
    pub passed: bool,
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidationResult {
    pub phase: String,
    pub passed: bool,
    pub checks: Vec<CheckResult>,
}

// ---------------------------------------------------------------------------
// Validation entry point
// ---------------------------------------------------------------------------

/// Run checkpoint validation for a phase name. Read-only and idempotent:
/// every predicate is a filesystem existence check, so calling twice with no
/// filesystem changes in between yields identical results.
pub fn validate_checkpoint(root: &Path, phase_name: &str) -> ValidationResult {
    let Ok(phase) = phase_name.parse::<Phase>() else {
        return ValidationResult {
            phase: phase_name.to_string(),
            passed: false,
            checks: vec![CheckResult {
                name: "Phase validation".to_string(),
                passed: false,
                message: Some("Unknown phase".to_string()),
            }],
        };
    };

    let checks = match phase {
        Phase::Discovery => validate_discovery(root),
        Phase::Planning => validate_planning(root),
        Phase::Design => validate_design(root),
        Phase::Implementation => validate_implementation(root),
        Phase::Testing => validate_testing(root),
        Phase::Deployment => validate_deployment(root),
    };

    let passed = checks.iter().all(|c| c.passed);
    ValidationResult {
        phase: phase_name.to_string(),
        passed,
        checks,
    }
}

/// Generic artifact check: does each listed artifact filename exist under the
/// phase's artifact directory? The bespoke predicate sets above cover every
/// phase in the catalog; this is the fallback contract for anything else.
pub fn validate_artifacts(root: &Path, phase: Phase) -> Vec<CheckResult> {
    let dir = crate::paths::artifacts_dir(root, phase);
    phase
        .spec()
        .artifacts
        .iter()
        .map(|artifact| check_file_exists(artifact, &[dir.join(artifact)]))
        .collect()
}

// ---------------------------------------------------------------------------
// Per-phase predicate sets
// ---------------------------------------------------------------------------

fn validate_discovery(root: &Path) -> Vec<CheckResult> {
    let dir = crate::paths::artifacts_dir(root, Phase::Discovery);
    vec![
        check_file_exists(
            "Requirements document",
            &[
                dir.join("requirements.md"),
                root.join("docs/requirements.md"),
                root.join("REQUIREMENTS.md"),
            ],
        ),
        check_file_exists(
            "User stories or use cases",
            &[dir.join("user_stories.md"), root.join("docs/user_stories.md")],
        ),
        check_file_exists(
            "Research notes",
            &[dir.join("research_notes.md"), dir.join("notes.md")],
        ),
    ]
}

fn validate_planning(root: &Path) -> Vec<CheckResult> {
    let dir = crate::paths::artifacts_dir(root, Phase::Planning);
    vec![
        check_file_exists(
            "Architecture document",
            &[
                dir.join("architecture.md"),
                root.join("docs/architecture.md"),
                root.join("ARCHITECTURE.md"),
            ],
        ),
        check_file_exists(
            "Component breakdown",
            &[dir.join("components.md"), root.join("docs/components.md")],
        ),
        check_file_exists(
            "Technology decisions",
            &[
                dir.join("tech_decisions.md"),
                root.join("docs/tech_stack.md"),
                root.join("docs/adr"),
            ],
        ),
    ]
}

fn validate_design(root: &Path) -> Vec<CheckResult> {
    let dir = crate::paths::artifacts_dir(root, Phase::Design);
    vec![
        check_file_exists(
            "API specification",
            &[
                dir.join("api_spec.md"),
                root.join("docs/api.md"),
                root.join("openapi.yaml"),
                root.join("swagger.yaml"),
            ],
        ),
        check_file_exists(
            "Data models",
            &[
                dir.join("data_models.md"),
                root.join("docs/models.md"),
                root.join("docs/schema.md"),
            ],
        ),
    ]
}

fn validate_implementation(root: &Path) -> Vec<CheckResult> {
    let code_exists = ["src", "cmd", "internal", "pkg", "lib", "app"]
        .iter()
        .any(|d| root.join(d).is_dir());

    let buildable = [
        "Makefile",
        "go.mod",
        "package.json",
        "Cargo.toml",
        "setup.py",
        "pyproject.toml",
        "build.gradle",
        "pom.xml",
    ]
    .iter()
    .any(|f| root.join(f).is_file());

    vec![
        CheckResult {
            name: "Source code exists".to_string(),
            passed: code_exists,
            message: (!code_exists).then(|| "No source code directory found".to_string()),
        },
        CheckResult {
            name: "Build configuration exists".to_string(),
            passed: buildable,
            message: (!buildable)
                .then(|| "No build file found (Makefile, go.mod, package.json, etc.)".to_string()),
        },
    ]
}

fn validate_testing(root: &Path) -> Vec<CheckResult> {
    let mut test_exists = ["tests", "test", "__tests__", "spec"]
        .iter()
        .any(|d| root.join(d).is_dir());

    if !test_exists {
        test_exists = has_test_file(root, 0) || has_test_file(&root.join("src"), 3);
    }

    vec![CheckResult {
        name: "Test files exist".to_string(),
        passed: test_exists,
        message: (!test_exists).then(|| "No test directory or test files found".to_string()),
    }]
}

fn validate_deployment(root: &Path) -> Vec<CheckResult> {
    vec![
        check_file_exists(
            "README exists",
            &[
                root.join("README.md"),
                root.join("README"),
                root.join("readme.md"),
            ],
        ),
        check_file_exists(
            "Changelog exists",
            &[
                root.join("CHANGELOG.md"),
                root.join("CHANGELOG"),
                root.join("HISTORY.md"),
            ],
        ),
    ]
}

// ---------------------------------------------------------------------------
// Predicates
// ---------------------------------------------------------------------------

/// First existing candidate wins. A directory only counts if it is non-empty.
fn check_file_exists(name: &str, candidates: &[PathBuf]) -> CheckResult {
    for path in candidates {
        let Ok(meta) = std::fs::metadata(path) else {
            continue;
        };
        if meta.is_dir() {
            let non_empty = std::fs::read_dir(path)
                .map(|mut entries| entries.next().is_some())
                .unwrap_or(false);
            if non_empty {
                return CheckResult {
                    name: name.to_string(),
                    passed: true,
                    message: None,
                };
            }
        } else {
            return CheckResult {
                name: name.to_string(),
                passed: true,
                message: None,
            };
        }
    }

    let tried = candidates
        .first()
        .map(|p| p.display().to_string())
        .unwrap_or_default();
    CheckResult {
        name: name.to_string(),
        passed: false,
        message: Some(format!("File not found (tried: {tried})")),
    }
}

const TEST_SUFFIXES: &[&str] = &[
    "_test.go",
    "_test.py",
    ".test.js",
    ".test.ts",
    ".spec.js",
    ".spec.ts",
    "_test.rs",
];

fn has_test_file(dir: &Path, depth: usize) -> bool {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return false;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            if depth > 0 && has_test_file(&path, depth - 1) {
                return true;
            }
        } else if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            if TEST_SUFFIXES.iter().any(|s| name.ends_with(s)) {
                return true;
            }
        }
    }
    false
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
