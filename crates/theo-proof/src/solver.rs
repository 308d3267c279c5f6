use theo_core::TheoError;

use crate::formula::{Formula, Model};

/// Answer of a satisfiability check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SolverResponse {
    /// The query is satisfiable; the model assigns every variable it could read back.
    Sat(Model),
    /// The query is unsatisfiable.
    Unsat,
    /// The solver gave up.
    Unknown(String),
}

/// A decision procedure for quantifier free real arithmetic.
pub trait SatisfiabilitySolver {
    /// Checks whether the conjunction of `assumptions` and `goal` is satisfiable.
    fn check(&self, assumptions: &[Formula], goal: &Formula) -> Result<SolverResponse, TheoError>;

    /// Short name used in reports and logs.
    fn name(&self) -> &str;
}

impl<S: SatisfiabilitySolver + ?Sized> SatisfiabilitySolver for Box<S> {
    fn check(&self, assumptions: &[Formula], goal: &Formula) -> Result<SolverResponse, TheoError> {
        (**self).check(assumptions, goal)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
