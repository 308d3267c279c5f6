//! Theorem and constraint verification over a symbol table.

use theo_core::{ProofPolicy, SolverBackend, TheoError};
use theo_expr::{render, Expr, Style, SymbolId};
use theo_graph::SymbolTable;
use tracing::{debug, warn};

use crate::formula::Formula;
use crate::linear::LinearArithmeticSolver;
use crate::report::{ConstraintResult, ConstraintStatus, ProofOutcome};
use crate::smt::SmtProcessSolver;
use crate::solver::{SatisfiabilitySolver, SolverResponse};
use crate::translate::{range_facts, Translator};

/// Verifies theorems and constraints against one symbol table.
///
/// The translation cache lives as long as the engine, so every check of a
/// verification pass reuses the terms translated by earlier checks.
pub struct ProofEngine<'t> {
    table: &'t SymbolTable,
    translator: Translator<'t>,
    solver: Box<dyn SatisfiabilitySolver>,
}

impl<'t> ProofEngine<'t> {
    /// Creates an engine using the backend selected by `policy`.
    pub fn new(table: &'t SymbolTable, policy: &ProofPolicy) -> Self {
        let solver: Box<dyn SatisfiabilitySolver> = match policy.backend {
            SolverBackend::Builtin => Box::new(LinearArithmeticSolver::from_policy(policy)),
            SolverBackend::Smt => Box::new(SmtProcessSolver::from_policy(policy)),
        };
        Self::with_solver(table, solver)
    }

    /// Creates an engine around an explicit solver.
    pub fn with_solver(table: &'t SymbolTable, solver: Box<dyn SatisfiabilitySolver>) -> Self {
        Self {
            table,
            translator: Translator::new(table),
            solver,
        }
    }

    /// Name of the solver backing the engine.
    pub fn solver_name(&self) -> &str {
        self.solver.name()
    }

    /// Plain text rendering of a theorem.
    pub fn statement(&self, hypothesis: Option<&Expr>, conclusion: &Expr) -> String {
        let conclusion = render(conclusion, self.table, Style::Plain);
        match hypothesis {
            Some(hypothesis) => format!(
                "{} => {}",
                render(hypothesis, self.table, Style::Plain),
                conclusion
            ),
            None => conclusion,
        }
    }

    /// Checks `assumptions and hypothesis => conclusion`.
    ///
    /// Definitions of every symbol involved are added as equalities.
    /// Translation failures are returned as [`ProofOutcome::Failed`]; only
    /// solver failures are errors.
    pub fn verify_theorem(
        &mut self,
        assumptions: &[Expr],
        hypothesis: Option<&Expr>,
        conclusion: &Expr,
    ) -> Result<ProofOutcome, TheoError> {
        let (facts, goal) = match self.prepare(assumptions, hypothesis, conclusion) {
            Ok(query) => query,
            Err(err) => {
                warn!(error = %err, "theorem could not be translated");
                return Ok(ProofOutcome::Failed {
                    error: err.info().clone(),
                });
            }
        };
        let outcome = match self.solver.check(&facts, &goal)? {
            SolverResponse::Unsat => ProofOutcome::Proven,
            SolverResponse::Sat(model) => ProofOutcome::Disproven {
                counterexample: model.to_f64_map(),
            },
            SolverResponse::Unknown(reason) => {
                warn!(reason = %reason, "theorem is inconclusive");
                ProofOutcome::Inconclusive { reason }
            }
        };
        debug!(
            status = outcome.status(),
            facts = facts.len(),
            cached = self.translator.cached(),
            "verified theorem"
        );
        Ok(outcome)
    }

    fn prepare(
        &mut self,
        assumptions: &[Expr],
        hypothesis: Option<&Expr>,
        conclusion: &Expr,
    ) -> Result<(Vec<Formula>, Formula), TheoError> {
        let mut facts = Vec::with_capacity(assumptions.len() + 1);
        let mut roots: Vec<SymbolId> = Vec::new();
        for expr in assumptions.iter().chain(hypothesis) {
            facts.push(self.translator.formula(expr)?);
            roots.extend(expr.free_symbols());
        }
        let goal = self.translator.formula(conclusion)?.negate();
        roots.extend(conclusion.free_symbols());
        dedup_ids(&mut roots);
        facts.extend(self.translator.definitions(&roots)?);
        let mut everything = facts.clone();
        everything.push(goal.clone());
        facts.extend(range_facts(&everything));
        Ok((facts, goal))
    }

    /// Classifies the constraints attached to `symbol`.
    ///
    /// When the constraints cannot hold together, a deletion based search
    /// finds a minimal conflicting subset; its members are contradictory and
    /// every other constraint is satisfiable.
    pub fn verify_constraints(&mut self, symbol: SymbolId) -> Result<Vec<ConstraintResult>, TheoError> {
        let table = self.table;
        let node = table.get(symbol)?;
        let constraints = node.constraints();
        if constraints.is_empty() {
            return Ok(Vec::new());
        }

        let mut statuses: Vec<Option<ConstraintStatus>> = vec![None; constraints.len()];
        let mut translated: Vec<(usize, Formula)> = Vec::new();
        let mut roots = vec![symbol];
        for (index, constraint) in constraints.iter().enumerate() {
            match self.translator.formula(&constraint.expr) {
                Ok(formula) => {
                    translated.push((index, formula));
                    roots.extend(constraint.expr.free_symbols());
                }
                Err(err) => {
                    statuses[index] = Some(ConstraintStatus::Failed {
                        error: err.info().clone(),
                    });
                }
            }
        }
        dedup_ids(&mut roots);

        match self.translator.definitions(&roots) {
            Ok(mut facts) => {
                let mut everything = facts.clone();
                everything.extend(translated.iter().map(|(_, formula)| formula.clone()));
                facts.extend(range_facts(&everything));
                self.classify(&facts, &translated, &mut statuses)?;
            }
            Err(err) => {
                for (index, _) in &translated {
                    statuses[*index] = Some(ConstraintStatus::Failed {
                        error: err.info().clone(),
                    });
                }
            }
        }

        let results: Vec<ConstraintResult> = constraints
            .iter()
            .zip(statuses)
            .map(|(constraint, status)| ConstraintResult {
                symbol: node.name().to_string(),
                label: constraint.label.clone(),
                statement: render(&constraint.expr, table, Style::Plain),
                status: status.unwrap_or(ConstraintStatus::Satisfiable),
            })
            .collect();
        debug!(
            symbol = %node.name(),
            constraints = results.len(),
            "verified constraints"
        );
        Ok(results)
    }

    /// Classifies the constraints of every symbol in declaration order.
    pub fn verify_all_constraints(&mut self) -> Result<Vec<ConstraintResult>, TheoError> {
        let table = self.table;
        let mut results = Vec::new();
        for id in table.ids() {
            if !table.get(id)?.constraints().is_empty() {
                results.extend(self.verify_constraints(id)?);
            }
        }
        Ok(results)
    }

    fn classify(
        &self,
        facts: &[Formula],
        translated: &[(usize, Formula)],
        statuses: &mut [Option<ConstraintStatus>],
    ) -> Result<(), TheoError> {
        let joint = Formula::conjunction(translated.iter().map(|(_, f)| f.clone()).collect());
        match self.solver.check(facts, &joint)? {
            SolverResponse::Sat(_) => {
                for (index, _) in translated {
                    statuses[*index] = Some(ConstraintStatus::Satisfiable);
                }
            }
            SolverResponse::Unknown(reason) => {
                warn!(reason = %reason, "constraints are inconclusive");
                for (index, _) in translated {
                    statuses[*index] = Some(ConstraintStatus::Inconclusive {
                        reason: reason.clone(),
                    });
                }
            }
            SolverResponse::Unsat => {
                let core = self.minimal_conflict(facts, translated)?;
                for (position, (index, _)) in translated.iter().enumerate() {
                    statuses[*index] = Some(if core.is_empty() {
                        ConstraintStatus::Inconclusive {
                            reason: "symbol definitions are contradictory".to_string(),
                        }
                    } else if core.contains(&position) {
                        ConstraintStatus::Contradictory
                    } else {
                        ConstraintStatus::Satisfiable
                    });
                }
            }
        }
        Ok(())
    }

    /// Positions of a minimal unsatisfiable subset of `translated`.
    fn minimal_conflict(
        &self,
        facts: &[Formula],
        translated: &[(usize, Formula)],
    ) -> Result<Vec<usize>, TheoError> {
        let mut core: Vec<usize> = (0..translated.len()).collect();
        let mut cursor = 0;
        while cursor < core.len() {
            let remaining: Vec<Formula> = core
                .iter()
                .enumerate()
                .filter(|(slot, _)| *slot != cursor)
                .map(|(_, position)| translated[*position].1.clone())
                .collect();
            match self.solver.check(facts, &Formula::conjunction(remaining))? {
                SolverResponse::Unsat => {
                    core.remove(cursor);
                }
                SolverResponse::Sat(_) | SolverResponse::Unknown(_) => cursor += 1,
            }
        }
        Ok(core)
    }
}

fn dedup_ids(ids: &mut Vec<SymbolId>) {
    let mut seen = std::collections::HashSet::new();
    ids.retain(|id| seen.insert(*id));
}
