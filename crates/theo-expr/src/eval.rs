use std::collections::BTreeMap;

use theo_core::{ErrorInfo, TheoError};

use crate::expr::{Expr, SymbolId};

/// Numeric bindings used during evaluation.
pub type Environment = BTreeMap<SymbolId, f64>;

fn unbound(id: SymbolId) -> TheoError {
    TheoError::Expression(
        ErrorInfo::new("unbound-symbol", "symbol has no value in the environment")
            .with_context("symbol", id.as_raw()),
    )
}

fn kind_mismatch(expected: &str) -> TheoError {
    TheoError::Expression(ErrorInfo::new(
        "kind-mismatch",
        format!("expected a {expected} expression"),
    ))
}

impl Expr {
    /// Evaluates a real valued expression.
    ///
    /// A piecewise expression with no satisfied branch evaluates to NaN.
    pub fn evaluate(&self, env: &Environment) -> Result<f64, TheoError> {
        match self {
            Expr::Num(lit) => Ok(lit.value()),
            Expr::Sym(id) => env.get(id).copied().ok_or_else(|| unbound(*id)),
            Expr::Add(terms) => {
                let mut total = 0.0;
                for term in terms {
                    total += term.evaluate(env)?;
                }
                Ok(total)
            }
            Expr::Mul(factors) => {
                let mut total = 1.0;
                for factor in factors {
                    total *= factor.evaluate(env)?;
                }
                Ok(total)
            }
            Expr::Pow(base, exponent) => Ok(base.evaluate(env)?.powf(exponent.evaluate(env)?)),
            Expr::Call(func, arg) => Ok(func.apply(arg.evaluate(env)?)),
            Expr::Piecewise(branches) => {
                for (value, condition) in branches {
                    if condition.evaluate_bool(env)? {
                        return value.evaluate(env);
                    }
                }
                Ok(f64::NAN)
            }
            _ => Err(kind_mismatch("numeric")),
        }
    }

    /// Evaluates a boolean expression.
    pub fn evaluate_bool(&self, env: &Environment) -> Result<bool, TheoError> {
        match self {
            Expr::Bool(value) => Ok(*value),
            Expr::Cmp(relation, lhs, rhs) => {
                Ok(relation.holds(lhs.evaluate(env)?, rhs.evaluate(env)?))
            }
            Expr::And(items) => {
                for item in items {
                    if !item.evaluate_bool(env)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Expr::Or(items) => {
                for item in items {
                    if item.evaluate_bool(env)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Expr::Not(inner) => Ok(!inner.evaluate_bool(env)?),
            Expr::Implies(lhs, rhs) => Ok(!lhs.evaluate_bool(env)? || rhs.evaluate_bool(env)?),
            _ => Err(kind_mismatch("boolean")),
        }
    }
}
