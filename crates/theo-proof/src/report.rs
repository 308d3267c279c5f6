use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use theo_core::{stable_hash_string, to_canonical_json_bytes, ErrorInfo, SchemaVersion, TheoError};

/// Schema of serialized proof reports.
pub const REPORT_SCHEMA: SchemaVersion = SchemaVersion::new(1, 0, 0);

/// Result of verifying one theorem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ProofOutcome {
    /// The negated theorem is unsatisfiable under the assumptions.
    Proven,
    /// The solver found an assignment violating the theorem.
    Disproven {
        /// Variable values of the violating assignment.
        counterexample: BTreeMap<String, f64>,
    },
    /// The solver gave up.
    Inconclusive {
        /// Reason reported by the solver.
        reason: String,
    },
    /// The theorem could not be translated for the solver.
    Failed {
        /// Translation error.
        error: ErrorInfo,
    },
}

impl ProofOutcome {
    /// Whether the theorem was proven.
    pub fn is_proven(&self) -> bool {
        matches!(self, ProofOutcome::Proven)
    }

    /// Whether a counterexample was found.
    pub fn is_disproven(&self) -> bool {
        matches!(self, ProofOutcome::Disproven { .. })
    }

    /// Whether the solver gave up.
    pub fn is_inconclusive(&self) -> bool {
        matches!(self, ProofOutcome::Inconclusive { .. })
    }

    /// Short lowercase status used in summaries.
    pub fn status(&self) -> &'static str {
        match self {
            ProofOutcome::Proven => "proven",
            ProofOutcome::Disproven { .. } => "disproven",
            ProofOutcome::Inconclusive { .. } => "inconclusive",
            ProofOutcome::Failed { .. } => "failed",
        }
    }
}

/// Classification of a single symbol constraint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ConstraintStatus {
    /// The constraint is not part of any conflict.
    Satisfiable,
    /// The constraint belongs to a minimal set of constraints that cannot hold together.
    Contradictory,
    /// The solver could not decide.
    Inconclusive {
        /// Reason reported by the solver.
        reason: String,
    },
    /// The constraint could not be translated.
    Failed {
        /// Translation error.
        error: ErrorInfo,
    },
}

impl ConstraintStatus {
    /// Short lowercase status used in summaries.
    pub fn status(&self) -> &'static str {
        match self {
            ConstraintStatus::Satisfiable => "satisfiable",
            ConstraintStatus::Contradictory => "contradictory",
            ConstraintStatus::Inconclusive { .. } => "inconclusive",
            ConstraintStatus::Failed { .. } => "failed",
        }
    }
}

/// A verified theorem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TheoremResult {
    /// Label given when the theorem was added.
    pub label: String,
    /// Plain text rendering of the theorem.
    pub statement: String,
    /// Verification outcome.
    pub outcome: ProofOutcome,
}

impl TheoremResult {
    /// Bundles a theorem with its outcome.
    pub fn new(label: impl Into<String>, statement: impl Into<String>, outcome: ProofOutcome) -> Self {
        Self {
            label: label.into(),
            statement: statement.into(),
            outcome,
        }
    }
}

/// A classified symbol constraint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstraintResult {
    /// Symbol owning the constraint.
    pub symbol: String,
    /// Constraint label.
    pub label: String,
    /// Plain text rendering of the constraint.
    pub statement: String,
    /// Classification.
    pub status: ConstraintStatus,
}

/// Content addressed record of a verification pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProofReport {
    /// Schema of this payload.
    pub schema: SchemaVersion,
    /// Hash of the schema, solver name, theorems and constraints.
    pub report_hash: String,
    /// Solver that produced the outcomes.
    pub solver: String,
    /// Theorem outcomes in insertion order.
    pub theorems: Vec<TheoremResult>,
    /// Constraint classifications in declaration order.
    pub constraints: Vec<ConstraintResult>,
}

impl ProofReport {
    /// Builds a report and computes its stable hash.
    pub fn new(
        solver: impl Into<String>,
        theorems: Vec<TheoremResult>,
        constraints: Vec<ConstraintResult>,
    ) -> Result<Self, TheoError> {
        let solver = solver.into();
        let report_hash = stable_hash_string(&(&REPORT_SCHEMA, &solver, &theorems, &constraints))?;
        Ok(Self {
            schema: REPORT_SCHEMA,
            report_hash,
            solver,
            theorems,
            constraints,
        })
    }

    /// Canonical JSON encoding of the report.
    pub fn to_bytes(&self) -> Result<Vec<u8>, TheoError> {
        to_canonical_json_bytes(self)
    }

    /// Whether every theorem was proven and no constraint is contradictory.
    pub fn all_verified(&self) -> bool {
        self.theorems.iter().all(|theorem| theorem.outcome.is_proven())
            && self
                .constraints
                .iter()
                .all(|constraint| constraint.status == ConstraintStatus::Satisfiable)
    }

    /// Deterministic human readable summary.
    pub fn summary(&self) -> String {
        let mut out = format!("Proof summary ({})\n", self.solver);
        if !self.theorems.is_empty() {
            let count = |status: &str| {
                self.theorems
                    .iter()
                    .filter(|theorem| theorem.outcome.status() == status)
                    .count()
            };
            out.push_str(&format!(
                "Theorems: {} proven, {} disproven, {} inconclusive, {} failed\n",
                count("proven"),
                count("disproven"),
                count("inconclusive"),
                count("failed")
            ));
            for theorem in &self.theorems {
                out.push_str(&format!(
                    "- [{}] {}: {}",
                    theorem.outcome.status(),
                    theorem.label,
                    theorem.statement
                ));
                match &theorem.outcome {
                    ProofOutcome::Proven => {}
                    ProofOutcome::Disproven { counterexample } => {
                        let values: Vec<String> = counterexample
                            .iter()
                            .map(|(name, value)| format!("{name} = {value}"))
                            .collect();
                        out.push_str(&format!(" (counterexample: {})", values.join(", ")));
                    }
                    ProofOutcome::Inconclusive { reason } => {
                        out.push_str(&format!(" ({reason})"));
                    }
                    ProofOutcome::Failed { error } => {
                        out.push_str(&format!(" ({})", error.message));
                    }
                }
                out.push('\n');
            }
        }
        if !self.constraints.is_empty() {
            out.push_str("Constraints:\n");
            for constraint in &self.constraints {
                out.push_str(&format!(
                    "- [{}] {}: {}: {}\n",
                    constraint.status.status(),
                    constraint.symbol,
                    constraint.label,
                    constraint.statement
                ));
            }
        }
        out
    }
}
