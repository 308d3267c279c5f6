//! SMT-LIB2 backend driving an external solver process.

use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::iter;
use std::time::Duration;

use easy_smt::{Context, ContextBuilder, Response, SExpr, SExprData};
use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{One, Signed, Zero};
use theo_core::{ErrorInfo, ProofPolicy, TheoError};
use theo_expr::Relation;
use tracing::debug;

use crate::formula::{parse_decimal, Formula, Model, Term};
use crate::solver::{SatisfiabilitySolver, SolverResponse};

/// Solver speaking SMT-LIB2 over stdin/stdout, `z3 -in -smt2` by default.
///
/// A fresh process is started for every check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtProcessSolver {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl SmtProcessSolver {
    /// Creates a solver spawning `program` with `args`.
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            timeout: Duration::from_millis(ProofPolicy::default().timeout_ms),
        }
    }

    /// Creates a solver from the program, arguments and timeout of `policy`.
    pub fn from_policy(policy: &ProofPolicy) -> Self {
        Self::new(policy.smt_program.clone(), policy.smt_args.clone())
            .with_timeout(Duration::from_millis(policy.timeout_ms))
    }

    /// Replaces the per query timeout handed to the solver.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn unavailable(&self, code: &str, err: io::Error) -> TheoError {
        TheoError::SolverUnavailable(
            ErrorInfo::new(code, err.to_string())
                .with_context("program", &self.program)
                .with_hint("install the solver or set proof.backend = \"builtin\""),
        )
    }
}

impl SatisfiabilitySolver for SmtProcessSolver {
    fn check(&self, assumptions: &[Formula], goal: &Formula) -> Result<SolverResponse, TheoError> {
        let mut ctx = ContextBuilder::new()
            .solver(&self.program, &self.args)
            .build()
            .map_err(|err| self.unavailable("spawn-failed", err))?;
        let io_error = |err: io::Error| self.unavailable("solver-io", err);

        let timeout = i64::try_from(self.timeout.as_millis()).unwrap_or(i64::MAX);
        ctx.set_option(":timeout", ctx.numeral(timeout)).map_err(io_error)?;

        let mut vars = BTreeSet::new();
        let mut funcs = BTreeMap::new();
        for formula in assumptions.iter().chain(iter::once(goal)) {
            formula.collect_symbols(&mut vars, &mut funcs);
        }
        let real = ctx.atom("Real");
        let mut declared = Vec::with_capacity(vars.len());
        for name in &vars {
            let handle = ctx.declare(variable_symbol(name), real).map_err(io_error)?;
            declared.push((name.clone(), handle));
        }
        for (name, arity) in &funcs {
            ctx.declare_fun(function_symbol(name), vec![real; *arity], real)
                .map_err(io_error)?;
        }
        for formula in assumptions.iter().chain(iter::once(goal)) {
            let encoded = encode_formula(&ctx, formula);
            ctx.assert(encoded).map_err(io_error)?;
        }
        debug!(
            program = %self.program,
            vars = vars.len(),
            functions = funcs.len(),
            "checking satisfiability"
        );

        match ctx.check().map_err(io_error)? {
            Response::Unsat => Ok(SolverResponse::Unsat),
            Response::Unknown => Ok(SolverResponse::Unknown(format!(
                "{} answered unknown",
                self.program
            ))),
            Response::Sat if !funcs.is_empty() => {
                let names: Vec<&str> = funcs.keys().map(String::as_str).collect();
                Ok(SolverResponse::Unknown(format!(
                    "model involves uninterpreted functions: {}",
                    names.join(", ")
                )))
            }
            Response::Sat => {
                let mut model = Model::new();
                if !declared.is_empty() {
                    let handles = declared.iter().map(|(_, handle)| *handle).collect();
                    let values = ctx.get_value(handles).map_err(io_error)?;
                    for ((name, _), (_, value)) in declared.iter().zip(values) {
                        if let Some(value) = parse_value(&ctx, value) {
                            model.insert(name.clone(), value);
                        }
                    }
                }
                Ok(SolverResponse::Sat(model))
            }
        }
    }

    fn name(&self) -> &str {
        "smt"
    }
}

fn is_simple_symbol(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
        }
        _ => false,
    }
}

fn variable_symbol(name: &str) -> String {
    if is_simple_symbol(name) {
        name.to_string()
    } else {
        format!("|{}|", name.replace(['|', '\\'], "_"))
    }
}

fn function_symbol(name: &str) -> String {
    variable_symbol(&format!("uf_{name}"))
}

fn decimal(value: &BigInt) -> String {
    format!("{value}.0")
}

fn encode_rational(ctx: &Context, value: &BigRational) -> SExpr {
    let magnitude = value.abs();
    let body = if magnitude.denom().is_one() {
        ctx.atom(decimal(magnitude.numer()))
    } else {
        ctx.list(vec![
            ctx.atom("/"),
            ctx.atom(decimal(magnitude.numer())),
            ctx.atom(decimal(magnitude.denom())),
        ])
    };
    if value.is_negative() {
        ctx.negate(body)
    } else {
        body
    }
}

fn nary(ctx: &Context, op: &str, items: Vec<SExpr>, empty: SExpr) -> SExpr {
    match items.len() {
        0 => empty,
        1 => items[0],
        _ => ctx.list(iter::once(ctx.atom(op)).chain(items).collect()),
    }
}

fn encode_term(ctx: &Context, term: &Term) -> SExpr {
    match term {
        Term::Const(value) => encode_rational(ctx, value),
        Term::Var(name) => ctx.atom(variable_symbol(name)),
        Term::Add(items) => {
            let items = items.iter().map(|item| encode_term(ctx, item)).collect();
            nary(ctx, "+", items, ctx.atom("0.0"))
        }
        Term::Mul(items) => {
            let items = items.iter().map(|item| encode_term(ctx, item)).collect();
            nary(ctx, "*", items, ctx.atom("1.0"))
        }
        Term::Div(lhs, rhs) => ctx.list(vec![
            ctx.atom("/"),
            encode_term(ctx, lhs),
            encode_term(ctx, rhs),
        ]),
        Term::Pow(base, exponent) => {
            let base = encode_term(ctx, base);
            let factors = iter::repeat(base).take(*exponent as usize).collect();
            nary(ctx, "*", factors, ctx.atom("1.0"))
        }
        Term::Apply(name, args) if args.is_empty() => ctx.atom(function_symbol(name)),
        Term::Apply(name, args) => ctx.list(
            iter::once(ctx.atom(function_symbol(name)))
                .chain(args.iter().map(|arg| encode_term(ctx, arg)))
                .collect(),
        ),
        Term::Ite(cond, then, otherwise) => ctx.ite(
            encode_formula(ctx, cond),
            encode_term(ctx, then),
            encode_term(ctx, otherwise),
        ),
    }
}

fn encode_formula(ctx: &Context, formula: &Formula) -> SExpr {
    match formula {
        Formula::Const(true) => ctx.true_(),
        Formula::Const(false) => ctx.false_(),
        Formula::Atom(relation, lhs, rhs) => {
            let lhs = encode_term(ctx, lhs);
            let rhs = encode_term(ctx, rhs);
            match relation {
                Relation::Lt => ctx.lt(lhs, rhs),
                Relation::Le => ctx.lte(lhs, rhs),
                Relation::Gt => ctx.gt(lhs, rhs),
                Relation::Ge => ctx.gte(lhs, rhs),
                Relation::Eq => ctx.eq(lhs, rhs),
                Relation::Ne => ctx.not(ctx.eq(lhs, rhs)),
            }
        }
        Formula::And(parts) => {
            let parts = parts.iter().map(|part| encode_formula(ctx, part)).collect();
            nary(ctx, "and", parts, ctx.true_())
        }
        Formula::Or(parts) => {
            let parts = parts.iter().map(|part| encode_formula(ctx, part)).collect();
            nary(ctx, "or", parts, ctx.false_())
        }
        Formula::Not(inner) => ctx.not(encode_formula(ctx, inner)),
        Formula::Implies(hypothesis, conclusion) => ctx.imp(
            encode_formula(ctx, hypothesis),
            encode_formula(ctx, conclusion),
        ),
    }
}

/// Reads a real value printed as `2.0`, `(- 2.0)` or `(/ 1.0 2.0)`.
fn parse_value(ctx: &Context, value: SExpr) -> Option<BigRational> {
    match ctx.get(value) {
        SExprData::Atom(text) => parse_decimal(text),
        SExprData::List(items) => {
            let (head, args) = items.split_first()?;
            let SExprData::Atom(op) = ctx.get(*head) else {
                return None;
            };
            let args: Vec<BigRational> = args
                .iter()
                .map(|arg| parse_value(ctx, *arg))
                .collect::<Option<_>>()?;
            match (op, args.as_slice()) {
                ("-", [single]) => Some(-single.clone()),
                ("-", [lhs, rhs]) => Some(lhs - rhs),
                ("/", [lhs, rhs]) if !rhs.is_zero() => Some(lhs / rhs),
                ("+", _) => Some(args.iter().fold(BigRational::zero(), |acc, arg| acc + arg)),
                _ => None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unusual_names_are_quoted() {
        assert_eq!(variable_symbol("E_total"), "E_total");
        assert_eq!(variable_symbol("T 0"), "|T 0|");
        assert_eq!(function_symbol("sqrt"), "uf_sqrt");
    }

    #[test]
    fn missing_program_is_reported_as_unavailable() {
        let solver = SmtProcessSolver::new("theoris-no-such-solver", Vec::new());
        let err = solver
            .check(&[], &Formula::Const(true))
            .unwrap_err();
        assert!(matches!(err, TheoError::SolverUnavailable(ref info) if info.code == "spawn-failed"));
    }

    #[test]
    fn printed_reals_are_parsed() {
        let ctx = ContextBuilder::new().without_solver().build().unwrap();
        let half = ctx.list(vec![ctx.atom("/"), ctx.atom("1.0"), ctx.atom("2.0")]);
        let negative = ctx.negate(half);
        let value = parse_value(&ctx, negative).unwrap();
        assert_eq!(value, BigRational::new((-1).into(), 2.into()));
    }

    /// Answers `success` to every command, `sat` to `check-sat` and a fixed
    /// model to `get-value`.
    #[cfg(unix)]
    fn scripted_sat_solver() -> SmtProcessSolver {
        let script = r#"while read -r line; do
  case "$line" in
    *check-sat*) echo sat ;;
    *get-value*) echo '((x 2.0))' ;;
    *) echo success ;;
  esac
done"#;
        SmtProcessSolver::new("sh", vec!["-c".to_string(), script.to_string()])
    }

    #[cfg(unix)]
    #[test]
    fn sat_over_uninterpreted_functions_is_unknown() {
        let goal = Formula::atom(
            Relation::Gt,
            Term::Apply("sin".to_string(), vec![Term::Var("x".to_string())]),
            Term::Const(BigRational::one()),
        );
        let response = scripted_sat_solver().check(&[], &goal).unwrap();
        assert!(
            matches!(response, SolverResponse::Unknown(ref reason) if reason.contains("sin"))
        );
    }

    #[cfg(unix)]
    #[test]
    fn sat_over_plain_reals_reads_the_model() {
        let goal = Formula::atom(
            Relation::Gt,
            Term::Var("x".to_string()),
            Term::Const(BigRational::one()),
        );
        let response = scripted_sat_solver().check(&[], &goal).unwrap();
        let SolverResponse::Sat(model) = response else {
            panic!("expected a model, got {response:?}");
        };
        assert_eq!(model.get("x"), Some(&BigRational::from_integer(2.into())));
    }
}
