//! Solver facing terms and formulas over exact rationals.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{self, Display};

use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{One, Signed, ToPrimitive, Zero};
use theo_expr::Relation;

/// Real valued term.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Term {
    /// Exact rational constant.
    Const(BigRational),
    /// Real variable named after a symbol.
    Var(String),
    /// N-ary sum.
    Add(Vec<Term>),
    /// N-ary product.
    Mul(Vec<Term>),
    /// Quotient.
    Div(Box<Term>, Box<Term>),
    /// Natural power.
    Pow(Box<Term>, u32),
    /// Function the solver treats as uninterpreted.
    Apply(String, Vec<Term>),
    /// Conditional term.
    Ite(Box<Formula>, Box<Term>, Box<Term>),
}

/// Quantifier free formula over [`Term`]s.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Formula {
    /// Boolean constant.
    Const(bool),
    /// Relation between two terms.
    Atom(Relation, Term, Term),
    /// Conjunction.
    And(Vec<Formula>),
    /// Disjunction.
    Or(Vec<Formula>),
    /// Negation.
    Not(Box<Formula>),
    /// Implication.
    Implies(Box<Formula>, Box<Formula>),
}

impl Term {
    /// Integer constant.
    pub fn int(value: i64) -> Term {
        Term::Const(BigRational::from_integer(BigInt::from(value)))
    }

    /// Constant zero.
    pub fn zero() -> Term {
        Term::Const(BigRational::zero())
    }

    /// Variable reference.
    pub fn var(name: impl Into<String>) -> Term {
        Term::Var(name.into())
    }

    fn collect_symbols(&self, vars: &mut BTreeSet<String>, funcs: &mut BTreeMap<String, usize>) {
        match self {
            Term::Const(_) => {}
            Term::Var(name) => {
                vars.insert(name.clone());
            }
            Term::Add(items) | Term::Mul(items) => {
                for item in items {
                    item.collect_symbols(vars, funcs);
                }
            }
            Term::Div(lhs, rhs) => {
                lhs.collect_symbols(vars, funcs);
                rhs.collect_symbols(vars, funcs);
            }
            Term::Pow(base, _) => base.collect_symbols(vars, funcs),
            Term::Apply(name, args) => {
                funcs.insert(name.clone(), args.len());
                for arg in args {
                    arg.collect_symbols(vars, funcs);
                }
            }
            Term::Ite(cond, then, otherwise) => {
                cond.collect_symbols(vars, funcs);
                then.collect_symbols(vars, funcs);
                otherwise.collect_symbols(vars, funcs);
            }
        }
    }
}

impl Formula {
    /// Relation between two terms.
    pub fn atom(relation: Relation, lhs: Term, rhs: Term) -> Formula {
        Formula::Atom(relation, lhs, rhs)
    }

    /// Conjunction of all parts; the empty conjunction is `true`.
    pub fn conjunction(mut parts: Vec<Formula>) -> Formula {
        match parts.len() {
            0 => Formula::Const(true),
            1 => parts.remove(0),
            _ => Formula::And(parts),
        }
    }

    /// Negation.
    pub fn negate(self) -> Formula {
        Formula::Not(Box::new(self))
    }

    /// Collects variable names and uninterpreted functions with their arity.
    pub fn collect_symbols(&self, vars: &mut BTreeSet<String>, funcs: &mut BTreeMap<String, usize>) {
        match self {
            Formula::Const(_) => {}
            Formula::Atom(_, lhs, rhs) => {
                lhs.collect_symbols(vars, funcs);
                rhs.collect_symbols(vars, funcs);
            }
            Formula::And(parts) | Formula::Or(parts) => {
                for part in parts {
                    part.collect_symbols(vars, funcs);
                }
            }
            Formula::Not(inner) => inner.collect_symbols(vars, funcs),
            Formula::Implies(hypothesis, conclusion) => {
                hypothesis.collect_symbols(vars, funcs);
                conclusion.collect_symbols(vars, funcs);
            }
        }
    }
}

/// Satisfying assignment returned by a solver, keyed by variable name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Model {
    assignments: BTreeMap<String, BigRational>,
}

impl Model {
    /// Creates an empty model.
    pub fn new() -> Self {
        Self::default()
    }

    /// Assigns a value to a variable.
    pub fn insert(&mut self, name: impl Into<String>, value: BigRational) {
        self.assignments.insert(name.into(), value);
    }

    /// Value assigned to a variable.
    pub fn get(&self, name: &str) -> Option<&BigRational> {
        self.assignments.get(name)
    }

    /// Number of assigned variables.
    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    /// Whether the model assigns nothing.
    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    /// Assignments in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &BigRational)> {
        self.assignments.iter()
    }

    /// Assignments converted to floating point.
    pub fn to_f64_map(&self) -> BTreeMap<String, f64> {
        self.assignments
            .iter()
            .map(|(name, value)| (name.clone(), rational_to_f64(value)))
            .collect()
    }
}

/// Exact rational equal to the shortest decimal spelling of `value`.
///
/// Returns `None` for infinities and NaN.
pub fn decimal_rational(value: f64) -> Option<BigRational> {
    if !value.is_finite() {
        return None;
    }
    parse_decimal(&format!("{value}"))
}

/// Parses `[-]digits[.digits]` into an exact rational.
pub(crate) fn parse_decimal(text: &str) -> Option<BigRational> {
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let (whole, fraction) = digits.split_once('.').unwrap_or((digits, ""));
    if whole.is_empty() && fraction.is_empty() {
        return None;
    }
    if !whole.chars().chain(fraction.chars()).all(|c| c.is_ascii_digit()) {
        return None;
    }
    let numer: BigInt = format!("{whole}{fraction}").parse().ok()?;
    let denom = num_traits::pow(BigInt::from(10u32), fraction.len());
    let value = BigRational::new(numer, denom);
    Some(if negative { -value } else { value })
}

/// Nearest float of a rational.
pub fn rational_to_f64(value: &BigRational) -> f64 {
    match (value.numer().to_f64(), value.denom().to_f64()) {
        (Some(numer), Some(denom)) => numer / denom,
        _ => f64::NAN,
    }
}

fn write_rational(f: &mut fmt::Formatter<'_>, value: &BigRational) -> fmt::Result {
    let magnitude = value.abs();
    let body = if magnitude.denom().is_one() {
        magnitude.numer().to_string()
    } else {
        format!("(/ {} {})", magnitude.numer(), magnitude.denom())
    };
    if value.is_negative() {
        write!(f, "(- {body})")
    } else {
        write!(f, "{body}")
    }
}

fn write_list<T: Display>(f: &mut fmt::Formatter<'_>, head: &str, items: &[T]) -> fmt::Result {
    write!(f, "({head}")?;
    for item in items {
        write!(f, " {item}")?;
    }
    write!(f, ")")
}

/// SMT-LIB spelling of a relation.
pub(crate) fn relation_name(relation: Relation) -> &'static str {
    match relation {
        Relation::Lt => "<",
        Relation::Le => "<=",
        Relation::Gt => ">",
        Relation::Ge => ">=",
        Relation::Eq => "=",
        Relation::Ne => "distinct",
    }
}

impl Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Const(value) => write_rational(f, value),
            Term::Var(name) => write!(f, "{name}"),
            Term::Add(items) => write_list(f, "+", items),
            Term::Mul(items) => write_list(f, "*", items),
            Term::Div(lhs, rhs) => write!(f, "(/ {lhs} {rhs})"),
            Term::Pow(base, exponent) => write!(f, "(^ {base} {exponent})"),
            Term::Apply(name, args) if args.is_empty() => write!(f, "{name}"),
            Term::Apply(name, args) => write_list(f, name, args),
            Term::Ite(cond, then, otherwise) => write!(f, "(ite {cond} {then} {otherwise})"),
        }
    }
}

impl Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Formula::Const(value) => write!(f, "{value}"),
            Formula::Atom(relation, lhs, rhs) => {
                write!(f, "({} {lhs} {rhs})", relation_name(*relation))
            }
            Formula::And(parts) => write_list(f, "and", parts),
            Formula::Or(parts) => write_list(f, "or", parts),
            Formula::Not(inner) => write!(f, "(not {inner})"),
            Formula::Implies(hypothesis, conclusion) => write!(f, "(=> {hypothesis} {conclusion})"),
        }
    }
}
