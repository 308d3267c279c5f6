use std::cell::Cell;

use theo_core::{ErrorInfo, TheoError};
use theo_doc::{Documentation, Section, SectionView};
use theo_expr::{Expr, SiUnitAlgebra, Unit, UnitAlgebra};
use theo_graph::{SymbolSpec, SymbolTable};
use theo_proof::{Formula, ProofEngine, ProofOutcome, ProofReport, SatisfiabilitySolver, SolverResponse};

fn assert_send_sync<T: Send + Sync>() {}

#[test]
fn shared_types_are_send_and_sync() {
    assert_send_sync::<SymbolTable>();
    assert_send_sync::<Expr>();
    assert_send_sync::<Section>();
    assert_send_sync::<Documentation>();
    assert_send_sync::<SectionView>();
    assert_send_sync::<ProofReport>();
    assert_send_sync::<TheoError>();
}

struct CountingSolver {
    calls: Cell<usize>,
    response: SolverResponse,
}

impl SatisfiabilitySolver for CountingSolver {
    fn check(&self, _assumptions: &[Formula], _goal: &Formula) -> Result<SolverResponse, TheoError> {
        self.calls.set(self.calls.get() + 1);
        Ok(self.response.clone())
    }

    fn name(&self) -> &str {
        "counting"
    }
}

struct OfflineSolver;

impl SatisfiabilitySolver for OfflineSolver {
    fn check(&self, _assumptions: &[Formula], _goal: &Formula) -> Result<SolverResponse, TheoError> {
        Err(TheoError::SolverUnavailable(ErrorInfo::new(
            "offline",
            "solver is not reachable",
        )))
    }

    fn name(&self) -> &str {
        "offline"
    }
}

#[test]
fn custom_solvers_plug_into_the_engine() -> Result<(), TheoError> {
    let mut table = SymbolTable::new();
    let x = table.declare(SymbolSpec::new("x"))?;
    let theorem = Expr::gt(Expr::symbol(x), Expr::num(0.0));

    let solver = CountingSolver {
        calls: Cell::new(0),
        response: SolverResponse::Unsat,
    };
    let mut engine = ProofEngine::with_solver(&table, Box::new(solver));
    assert_eq!(engine.solver_name(), "counting");
    assert_eq!(engine.verify_theorem(&[], None, &theorem)?, ProofOutcome::Proven);

    let unknown = CountingSolver {
        calls: Cell::new(0),
        response: SolverResponse::Unknown("timeout".to_string()),
    };
    let mut engine = ProofEngine::with_solver(&table, Box::new(unknown));
    assert_eq!(
        engine.verify_theorem(&[], None, &theorem)?,
        ProofOutcome::Inconclusive {
            reason: "timeout".to_string()
        }
    );

    let mut engine = ProofEngine::with_solver(&table, Box::new(OfflineSolver));
    let err = engine.verify_theorem(&[], None, &theorem).unwrap_err();
    assert!(matches!(err, TheoError::SolverUnavailable(ref info) if info.code == "offline"));
    Ok(())
}

struct DelegatingAlgebra;

impl UnitAlgebra for DelegatingAlgebra {
    fn unit_of(
        &self,
        expr: &Expr,
        env: &dyn theo_expr::UnitEnv,
    ) -> Result<Option<Unit>, TheoError> {
        SiUnitAlgebra.unit_of(expr, env)
    }

    fn convert(&self, value: f64, from: &Unit, to: &Unit) -> Result<f64, TheoError> {
        SiUnitAlgebra.convert(value, from, to)
    }
}

#[test]
fn unit_algebra_is_object_safe() -> Result<(), TheoError> {
    let algebra: Box<dyn UnitAlgebra> = Box::new(DelegatingAlgebra);
    let seconds = algebra.convert(2.0, &Unit::minute(), &Unit::second())?;
    assert_eq!(seconds, 120.0);
    assert!(algebra.convert(1.0, &Unit::meter(), &Unit::second()).is_err());
    Ok(())
}
