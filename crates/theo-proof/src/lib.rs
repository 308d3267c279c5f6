#![deny(missing_docs)]
#![doc = "Theorem and constraint verification for theoris symbols through satisfiability solvers."]

pub mod engine;
pub mod formula;
pub mod linear;
/// Serializable proof outcomes and reports.
pub mod report;
pub mod smt;
mod solver;
pub mod translate;

pub use engine::ProofEngine;
pub use formula::{decimal_rational, Formula, Model, Term};
pub use linear::LinearArithmeticSolver;
pub use report::{
    ConstraintResult, ConstraintStatus, ProofOutcome, ProofReport, TheoremResult, REPORT_SCHEMA,
};
pub use smt::SmtProcessSolver;
pub use solver::{SatisfiabilitySolver, SolverResponse};
pub use translate::Translator;
