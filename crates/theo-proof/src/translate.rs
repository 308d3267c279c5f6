//! Translation of symbol expressions into solver terms.
//!
//! Constants fold into rational literals, defined symbols become variables
//! tied to their expression by an equality, and functions without an
//! arithmetic counterpart are left uninterpreted.

use std::collections::HashMap;

use num_rational::BigRational;
use theo_core::{ErrorInfo, TheoError};
use theo_expr::{render, Expr, Func, Relation, Style, SymbolId};
use theo_graph::{DependencyResolver, SymbolTable};
use tracing::debug;

use crate::formula::{decimal_rational, Formula, Term};

/// Largest integer exponent expanded into a natural power.
const MAX_EXPANDED_EXPONENT: f64 = 64.0;

/// Name of the uninterpreted value a piecewise term takes when no branch holds.
const PIECEWISE_DEFAULT: &str = "piecewise_default";

/// Caching translator bound to one symbol table.
#[derive(Debug)]
pub struct Translator<'t> {
    table: &'t SymbolTable,
    terms: HashMap<Expr, Term>,
    formulas: HashMap<Expr, Formula>,
    names: HashMap<SymbolId, String>,
}

impl<'t> Translator<'t> {
    /// Creates a translator with an empty cache.
    pub fn new(table: &'t SymbolTable) -> Self {
        Self {
            table,
            terms: HashMap::new(),
            formulas: HashMap::new(),
            names: HashMap::new(),
        }
    }

    /// Number of cached translations.
    pub fn cached(&self) -> usize {
        self.terms.len() + self.formulas.len()
    }

    /// Solver variable name of a symbol. Repeated names get the identifier appended.
    pub fn variable_name(&mut self, id: SymbolId) -> Result<String, TheoError> {
        if let Some(name) = self.names.get(&id) {
            return Ok(name.clone());
        }
        let name = self.table.get(id)?.name().to_string();
        let clashes = self
            .table
            .ids()
            .filter(|other| self.table.name_of(*other) == name)
            .count();
        let name = if clashes > 1 {
            format!("{name}_{}", id.as_raw())
        } else {
            name
        };
        self.names.insert(id, name.clone());
        Ok(name)
    }

    /// Translates a real valued expression.
    pub fn term(&mut self, expr: &Expr) -> Result<Term, TheoError> {
        if let Some(hit) = self.terms.get(expr) {
            return Ok(hit.clone());
        }
        let term = self.build_term(expr)?;
        self.terms.insert(expr.clone(), term.clone());
        Ok(term)
    }

    /// Translates a boolean expression.
    pub fn formula(&mut self, expr: &Expr) -> Result<Formula, TheoError> {
        if let Some(hit) = self.formulas.get(expr) {
            return Ok(hit.clone());
        }
        let formula = self.build_formula(expr)?;
        self.formulas.insert(expr.clone(), formula.clone());
        Ok(formula)
    }

    /// Defining equalities of every symbol the roots depend on, in dependency order.
    pub fn definitions(&mut self, roots: &[SymbolId]) -> Result<Vec<Formula>, TheoError> {
        let table = self.table;
        let resolution = DependencyResolver::new(table).resolve_all(roots, &[])?;
        let mut definitions = Vec::with_capacity(resolution.order.len());
        for id in &resolution.order {
            let Some(expression) = table.get(*id)?.expression() else {
                continue;
            };
            let lhs = Term::Var(self.variable_name(*id)?);
            let rhs = self.term(expression)?;
            definitions.push(Formula::atom(Relation::Eq, lhs, rhs));
        }
        debug!(
            roots = roots.len(),
            definitions = definitions.len(),
            "collected definitions"
        );
        Ok(definitions)
    }

    fn build_term(&mut self, expr: &Expr) -> Result<Term, TheoError> {
        Ok(match expr {
            Expr::Num(literal) => Term::Const(self.constant(literal.value())?),
            Expr::Sym(id) => {
                let node = self.table.get(*id)?;
                match node.value() {
                    Some(value) => Term::Const(
                        self.constant(value)
                            .map_err(|err| err.with_context("symbol", node.name()))?,
                    ),
                    None => Term::Var(self.variable_name(*id)?),
                }
            }
            Expr::Add(items) => Term::Add(self.terms_of(items)?),
            Expr::Mul(items) => Term::Mul(self.terms_of(items)?),
            Expr::Pow(base, exponent) => self.power(base, exponent)?,
            Expr::Call(func, arg) => self.call(*func, arg)?,
            Expr::Piecewise(branches) => self.piecewise(branches)?,
            Expr::Bool(_)
            | Expr::Cmp(..)
            | Expr::And(_)
            | Expr::Or(_)
            | Expr::Not(_)
            | Expr::Implies(..) => return Err(self.kind_mismatch("real", expr)),
        })
    }

    fn build_formula(&mut self, expr: &Expr) -> Result<Formula, TheoError> {
        Ok(match expr {
            Expr::Bool(value) => Formula::Const(*value),
            Expr::Cmp(relation, lhs, rhs) => {
                Formula::Atom(*relation, self.term(lhs)?, self.term(rhs)?)
            }
            Expr::And(parts) => Formula::And(self.formulas_of(parts)?),
            Expr::Or(parts) => Formula::Or(self.formulas_of(parts)?),
            Expr::Not(inner) => self.formula(inner)?.negate(),
            Expr::Implies(hypothesis, conclusion) => Formula::Implies(
                Box::new(self.formula(hypothesis)?),
                Box::new(self.formula(conclusion)?),
            ),
            _ => return Err(self.kind_mismatch("boolean", expr)),
        })
    }

    fn terms_of(&mut self, items: &[Expr]) -> Result<Vec<Term>, TheoError> {
        items.iter().map(|item| self.term(item)).collect()
    }

    fn formulas_of(&mut self, parts: &[Expr]) -> Result<Vec<Formula>, TheoError> {
        parts.iter().map(|part| self.formula(part)).collect()
    }

    fn power(&mut self, base: &Expr, exponent: &Expr) -> Result<Term, TheoError> {
        let lhs = self.term(base)?;
        match exponent.as_number() {
            Some(value) if value.fract() == 0.0 && value.abs() <= MAX_EXPANDED_EXPONENT => {
                let natural = Term::Pow(Box::new(lhs), value.abs() as u32);
                if value < 0.0 {
                    Ok(Term::Div(Box::new(Term::int(1)), Box::new(natural)))
                } else {
                    Ok(natural)
                }
            }
            Some(value) if value == 0.5 => Ok(Term::Apply("sqrt".to_string(), vec![lhs])),
            _ => {
                let rhs = self.term(exponent)?;
                Ok(Term::Apply("pow".to_string(), vec![lhs, rhs]))
            }
        }
    }

    fn call(&mut self, func: Func, arg: &Expr) -> Result<Term, TheoError> {
        let inner = self.term(arg)?;
        Ok(match func {
            Func::Abs => Term::Ite(
                Box::new(Formula::atom(Relation::Ge, inner.clone(), Term::zero())),
                Box::new(inner.clone()),
                Box::new(Term::Mul(vec![Term::int(-1), inner])),
            ),
            other => Term::Apply(other.name().to_string(), vec![inner]),
        })
    }

    fn piecewise(&mut self, branches: &[(Expr, Expr)]) -> Result<Term, TheoError> {
        let mut translated = Vec::with_capacity(branches.len());
        let mut fallback = Term::Apply(PIECEWISE_DEFAULT.to_string(), Vec::new());
        for (value, condition) in branches {
            let value = self.term(value)?;
            if matches!(condition, Expr::Bool(true)) {
                fallback = value;
                break;
            }
            translated.push((self.formula(condition)?, value));
        }
        Ok(translated
            .into_iter()
            .rev()
            .fold(fallback, |otherwise, (condition, value)| {
                Term::Ite(Box::new(condition), Box::new(value), Box::new(otherwise))
            }))
    }

    fn constant(&self, value: f64) -> Result<BigRational, TheoError> {
        decimal_rational(value).ok_or_else(|| {
            TheoError::Expression(
                ErrorInfo::new("non-finite-literal", "only finite numbers can be translated")
                    .with_context("value", value),
            )
        })
    }

    fn kind_mismatch(&self, expected: &str, expr: &Expr) -> TheoError {
        TheoError::Expression(
            ErrorInfo::new("kind-mismatch", format!("expected a {expected} expression"))
                .with_context("expr", render(expr, self.table, Style::Plain)),
        )
    }
}

/// Facts that hold for the partial functions appearing in `formulas`.
///
/// Square roots are non-negative and exponentials positive; both are
/// otherwise uninterpreted.
pub fn range_facts(formulas: &[Formula]) -> Vec<Formula> {
    let mut facts = Vec::new();
    for formula in formulas {
        collect_formula_facts(formula, &mut facts);
    }
    facts
}

fn collect_formula_facts(formula: &Formula, facts: &mut Vec<Formula>) {
    match formula {
        Formula::Const(_) => {}
        Formula::Atom(_, lhs, rhs) => {
            collect_term_facts(lhs, facts);
            collect_term_facts(rhs, facts);
        }
        Formula::And(parts) | Formula::Or(parts) => {
            for part in parts {
                collect_formula_facts(part, facts);
            }
        }
        Formula::Not(inner) => collect_formula_facts(inner, facts),
        Formula::Implies(hypothesis, conclusion) => {
            collect_formula_facts(hypothesis, facts);
            collect_formula_facts(conclusion, facts);
        }
    }
}

fn collect_term_facts(term: &Term, facts: &mut Vec<Formula>) {
    match term {
        Term::Const(_) | Term::Var(_) => {}
        Term::Add(items) | Term::Mul(items) => {
            for item in items {
                collect_term_facts(item, facts);
            }
        }
        Term::Div(lhs, rhs) => {
            collect_term_facts(lhs, facts);
            collect_term_facts(rhs, facts);
        }
        Term::Pow(base, _) => collect_term_facts(base, facts),
        Term::Apply(name, args) => {
            let relation = match name.as_str() {
                "sqrt" => Some(Relation::Ge),
                "exp" => Some(Relation::Gt),
                _ => None,
            };
            if let Some(relation) = relation {
                let fact = Formula::atom(relation, term.clone(), Term::zero());
                if !facts.contains(&fact) {
                    facts.push(fact);
                }
            }
            for arg in args {
                collect_term_facts(arg, facts);
            }
        }
        Term::Ite(cond, then, otherwise) => {
            collect_formula_facts(cond, facts);
            collect_term_facts(then, facts);
            collect_term_facts(otherwise, facts);
        }
    }
}
