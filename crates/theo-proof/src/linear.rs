//! In-process decision procedure for linear real arithmetic.
//!
//! Queries are lifted out of conditional terms, put into negation normal
//! form and expanded into a bounded disjunction of conjunctions. Each
//! conjunction is linearised over exact rationals; products of variables
//! and uninterpreted applications become fresh columns. Equalities are
//! eliminated by substitution and the remaining inequalities by
//! Fourier–Motzkin elimination, keeping track of strictness so a model can
//! be rebuilt by back substitution.
//!
//! A satisfying assignment of the abstraction is checked against the true
//! value of every product column. Disagreements add sign lemmas and the
//! query is retried a bounded number of times; anything left over is
//! reported as unknown.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use indexmap::IndexSet;
use num_rational::BigRational;
use num_traits::{One, Signed, Zero};
use theo_core::{ProofPolicy, TheoError};
use theo_expr::Relation;
use tracing::debug;

use crate::formula::{Formula, Model, Term};
use crate::solver::{SatisfiabilitySolver, SolverResponse};

/// Rounds of sign lemma refinement before giving up on non-linear queries.
const MAX_REFINEMENTS: usize = 8;

/// Natural powers above this degree stay uninterpreted.
const MAX_DEGREE: u32 = 16;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
enum Factor {
    Var(String),
    Opaque(String),
}

type Monomial = BTreeMap<Factor, u32>;
type Poly = BTreeMap<Monomial, BigRational>;
type Literal = (Relation, Term, Term);

/// Fourier–Motzkin solver over exact rationals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinearArithmeticSolver {
    timeout: Duration,
    max_disjuncts: usize,
    max_constraints: usize,
}

impl Default for LinearArithmeticSolver {
    fn default() -> Self {
        Self::from_policy(&ProofPolicy::default())
    }
}

impl LinearArithmeticSolver {
    /// Creates a solver with the default proof policy limits.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a solver with the limits of `policy`.
    pub fn from_policy(policy: &ProofPolicy) -> Self {
        Self {
            timeout: Duration::from_millis(policy.timeout_ms),
            max_disjuncts: policy.max_disjuncts,
            max_constraints: policy.max_constraints,
        }
    }

    /// Replaces the wall-clock budget of a single check.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Replaces the disjunct and constraint limits.
    pub fn with_limits(mut self, max_disjuncts: usize, max_constraints: usize) -> Self {
        self.max_disjuncts = max_disjuncts;
        self.max_constraints = max_constraints;
        self
    }
}

impl SatisfiabilitySolver for LinearArithmeticSolver {
    fn check(&self, assumptions: &[Formula], goal: &Formula) -> Result<SolverResponse, TheoError> {
        let deadline = Instant::now() + self.timeout;
        let mut parts = assumptions.to_vec();
        parts.push(goal.clone());
        let query = nnf(&lift_ite(&Formula::conjunction(parts)), true);
        let mut lemmas: Vec<Formula> = Vec::new();
        let mut round = 0;
        loop {
            let formula = if lemmas.is_empty() {
                query.clone()
            } else {
                let mut parts = vec![query.clone()];
                parts.extend(lemmas.iter().cloned());
                Formula::And(parts)
            };
            let Some(branches) = dnf(&formula, self.max_disjuncts) else {
                return Ok(SolverResponse::Unknown(format!(
                    "query expands to more than {} disjuncts",
                    self.max_disjuncts
                )));
            };
            debug!(round, branches = branches.len(), "checking disjuncts");
            let mut unknown: Option<String> = None;
            let mut fresh: Vec<Formula> = Vec::new();
            for branch in &branches {
                match self.solve_branch(branch, deadline) {
                    Branch::Sat(model) => return Ok(SolverResponse::Sat(model)),
                    Branch::Unsat => {}
                    Branch::Unknown(reason) => {
                        unknown.get_or_insert(reason);
                    }
                    Branch::Refine(candidates) => {
                        for lemma in candidates {
                            if !lemmas.contains(&lemma) && !fresh.contains(&lemma) {
                                fresh.push(lemma);
                            }
                        }
                        unknown.get_or_insert_with(|| "non-linear arithmetic".to_string());
                    }
                }
            }
            if fresh.is_empty() || round == MAX_REFINEMENTS {
                return Ok(match unknown {
                    Some(reason) => SolverResponse::Unknown(reason),
                    None => SolverResponse::Unsat,
                });
            }
            debug!(round, lemmas = fresh.len(), "refining product abstraction");
            lemmas.extend(fresh);
            round += 1;
        }
    }

    fn name(&self) -> &str {
        "builtin-linear"
    }
}

enum Branch {
    Sat(Model),
    Unsat,
    Unknown(String),
    Refine(Vec<Formula>),
}

impl LinearArithmeticSolver {
    fn solve_branch(&self, literals: &[Literal], deadline: Instant) -> Branch {
        let mut columns = Columns::default();
        let mut rows = Vec::with_capacity(literals.len());
        for (relation, lhs, rhs) in literals {
            rows.push(columns.row(*relation, lhs, rhs));
        }
        for (index, monomial) in columns.keys.iter().enumerate() {
            if is_even_product(monomial) {
                let mut expr = LinExpr::default();
                expr.coeffs.insert(index, -BigRational::one());
                rows.push(Row {
                    expr,
                    kind: Kind::Weak,
                });
            }
        }
        let values = match self.solve_rows(rows, columns.keys.len(), deadline) {
            Solved::Sat(values) => values,
            Solved::Unsat => return Branch::Unsat,
            Solved::Unknown(reason) => return Branch::Unknown(reason),
        };
        columns.interpret(&values)
    }

    fn solve_rows(&self, rows: Vec<Row>, width: usize, deadline: Instant) -> Solved {
        let mut rows = rows;
        let mut definitions: Vec<(usize, LinExpr)> = Vec::new();
        while let Some(position) = rows
            .iter()
            .position(|row| row.kind == Kind::Equal && !row.expr.coeffs.is_empty())
        {
            let row = rows.remove(position);
            let Some((column, coeff)) = row.expr.coeffs.iter().next().map(|(c, v)| (*c, v.clone()))
            else {
                continue;
            };
            let mut definition = row.expr;
            definition.coeffs.remove(&column);
            definition.scale(&(-BigRational::one() / coeff));
            for other in rows.iter_mut() {
                other.expr.substitute(column, &definition);
            }
            definitions.push((column, definition));
        }

        let mut system = Vec::with_capacity(rows.len());
        for row in rows {
            match row.trivial() {
                Some(true) => {}
                Some(false) => return Solved::Unsat,
                None => system.push(row.normalized()),
            }
        }
        let mut system = dedup(system);

        let mut stages: Vec<(usize, Vec<Row>)> = Vec::new();
        while let Some(column) = pick_column(&system) {
            if Instant::now() > deadline {
                return Solved::Unknown("timeout".to_string());
            }
            let mut upper = Vec::new();
            let mut lower = Vec::new();
            let mut rest = Vec::new();
            for row in system {
                match row.expr.coeffs.get(&column).map(|coeff| coeff.is_positive()) {
                    Some(true) => upper.push(row),
                    Some(false) => lower.push(row),
                    None => rest.push(row),
                }
            }
            for up in &upper {
                for low in &lower {
                    let (Some(a), Some(b)) = (up.expr.coeffs.get(&column), low.expr.coeffs.get(&column))
                    else {
                        continue;
                    };
                    let mut combined = up.expr.clone();
                    combined.scale(&-b.clone());
                    let mut other = low.expr.clone();
                    other.scale(a);
                    combined.add_assign(&other);
                    let kind = if up.kind == Kind::Strict || low.kind == Kind::Strict {
                        Kind::Strict
                    } else {
                        Kind::Weak
                    };
                    let row = Row {
                        expr: combined,
                        kind,
                    };
                    match row.trivial() {
                        Some(true) => {}
                        Some(false) => return Solved::Unsat,
                        None => rest.push(row.normalized()),
                    }
                }
            }
            if rest.len() > self.max_constraints {
                return Solved::Unknown(format!(
                    "elimination exceeded {} constraints",
                    self.max_constraints
                ));
            }
            upper.extend(lower);
            stages.push((column, upper));
            system = dedup(rest);
        }

        let mut values = vec![BigRational::zero(); width];
        for (column, rows) in stages.iter().rev() {
            values[*column] = choose_value(*column, rows, &values);
        }
        for (column, definition) in definitions.iter().rev() {
            values[*column] = definition.value(&values);
        }
        Solved::Sat(values)
    }
}

enum Solved {
    Sat(Vec<BigRational>),
    Unsat,
    Unknown(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Kind {
    /// `expr < 0`
    Strict,
    /// `expr <= 0`
    Weak,
    /// `expr == 0`
    Equal,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
struct LinExpr {
    coeffs: BTreeMap<usize, BigRational>,
    constant: BigRational,
}

impl LinExpr {
    fn scale(&mut self, factor: &BigRational) {
        for coeff in self.coeffs.values_mut() {
            *coeff = &*coeff * factor;
        }
        self.constant = &self.constant * factor;
        self.coeffs.retain(|_, coeff| !coeff.is_zero());
    }

    fn add_assign(&mut self, other: &LinExpr) {
        for (column, coeff) in &other.coeffs {
            let entry = self.coeffs.entry(*column).or_insert_with(BigRational::zero);
            *entry = &*entry + coeff;
        }
        self.constant = &self.constant + &other.constant;
        self.coeffs.retain(|_, coeff| !coeff.is_zero());
    }

    fn substitute(&mut self, column: usize, definition: &LinExpr) {
        if let Some(coeff) = self.coeffs.remove(&column) {
            let mut scaled = definition.clone();
            scaled.scale(&coeff);
            self.add_assign(&scaled);
        }
    }

    fn value(&self, values: &[BigRational]) -> BigRational {
        self.coeffs
            .iter()
            .fold(self.constant.clone(), |acc, (column, coeff)| {
                acc + coeff * &values[*column]
            })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct Row {
    expr: LinExpr,
    kind: Kind,
}

impl Row {
    /// Truth value of a row without columns.
    fn trivial(&self) -> Option<bool> {
        if !self.expr.coeffs.is_empty() {
            return None;
        }
        let constant = &self.expr.constant;
        Some(match self.kind {
            Kind::Strict => constant.is_negative(),
            Kind::Weak => !constant.is_positive(),
            Kind::Equal => constant.is_zero(),
        })
    }

    /// Scales the row so its first coefficient has magnitude one.
    fn normalized(mut self) -> Row {
        if let Some(first) = self.expr.coeffs.values().next().cloned() {
            let factor = if self.kind == Kind::Equal {
                BigRational::one() / first
            } else {
                BigRational::one() / first.abs()
            };
            self.expr.scale(&factor);
        }
        self
    }
}

fn dedup(rows: Vec<Row>) -> Vec<Row> {
    rows.into_iter().collect::<IndexSet<_>>().into_iter().collect()
}

/// Column whose elimination creates the fewest combinations; ties go to the lowest index.
fn pick_column(rows: &[Row]) -> Option<usize> {
    let mut counts: BTreeMap<usize, (usize, usize)> = BTreeMap::new();
    for row in rows {
        for (column, coeff) in &row.expr.coeffs {
            let entry = counts.entry(*column).or_insert((0, 0));
            if coeff.is_positive() {
                entry.0 += 1;
            } else {
                entry.1 += 1;
            }
        }
    }
    counts
        .into_iter()
        .min_by_key(|(column, (pos, neg))| (pos * neg, *column))
        .map(|(column, _)| column)
}

fn choose_value(column: usize, rows: &[Row], values: &[BigRational]) -> BigRational {
    let mut lower: Option<(BigRational, bool)> = None;
    let mut upper: Option<(BigRational, bool)> = None;
    for row in rows {
        let Some(coeff) = row.expr.coeffs.get(&column) else {
            continue;
        };
        let mut rest = row.expr.clone();
        rest.coeffs.remove(&column);
        let bound = -rest.value(values) / coeff;
        let strict = row.kind == Kind::Strict;
        if coeff.is_positive() {
            let tighter = match &upper {
                None => true,
                Some((current, current_strict)) => match bound.cmp(current) {
                    Ordering::Less => true,
                    Ordering::Equal => strict && !current_strict,
                    Ordering::Greater => false,
                },
            };
            if tighter {
                upper = Some((bound, strict));
            }
        } else {
            let tighter = match &lower {
                None => true,
                Some((current, current_strict)) => match bound.cmp(current) {
                    Ordering::Greater => true,
                    Ordering::Equal => strict && !current_strict,
                    Ordering::Less => false,
                },
            };
            if tighter {
                lower = Some((bound, strict));
            }
        }
    }
    let two = BigRational::from_integer(2.into());
    match (lower, upper) {
        (Some((lo, _)), Some((hi, _))) if lo == hi => lo,
        (Some((lo, _)), Some((hi, _))) => (lo + hi) / two,
        (Some((lo, true)), None) => lo + BigRational::one(),
        (Some((lo, false)), None) => lo,
        (None, Some((hi, true))) => hi - BigRational::one(),
        (None, Some((hi, false))) => hi,
        (None, None) => BigRational::zero(),
    }
}

/// Column registry of one conjunction.
#[derive(Debug, Default)]
struct Columns {
    keys: IndexSet<Monomial>,
}

impl Columns {
    fn register(&mut self, monomial: Monomial) -> usize {
        if monomial.len() > 1 || monomial.values().any(|exponent| *exponent > 1) {
            for factor in monomial.keys() {
                if let Factor::Var(_) = factor {
                    self.keys.insert(BTreeMap::from([(factor.clone(), 1u32)]));
                }
            }
        }
        self.keys.insert_full(monomial).0
    }

    fn row(&mut self, relation: Relation, lhs: &Term, rhs: &Term) -> Row {
        let mut poly = linearize(lhs);
        for (monomial, coeff) in linearize(rhs) {
            add_term(&mut poly, monomial, -coeff);
        }
        let (sign, kind) = match relation {
            Relation::Lt => (BigRational::one(), Kind::Strict),
            Relation::Le => (BigRational::one(), Kind::Weak),
            Relation::Gt => (-BigRational::one(), Kind::Strict),
            Relation::Ge => (-BigRational::one(), Kind::Weak),
            Relation::Eq | Relation::Ne => (BigRational::one(), Kind::Equal),
        };
        let mut expr = LinExpr::default();
        for (monomial, coeff) in poly {
            let coeff = coeff * &sign;
            if monomial.is_empty() {
                expr.constant = &expr.constant + &coeff;
            } else {
                let column = self.register(monomial);
                let entry = expr.coeffs.entry(column).or_insert_with(BigRational::zero);
                *entry = &*entry + &coeff;
            }
        }
        expr.coeffs.retain(|_, coeff| !coeff.is_zero());
        Row { expr, kind }
    }

    fn base_column(&self, name: &str) -> Option<usize> {
        self.keys
            .get_index_of(&BTreeMap::from([(Factor::Var(name.to_string()), 1u32)]))
    }

    /// Checks an assignment of the abstraction against the product columns.
    fn interpret(&self, values: &[BigRational]) -> Branch {
        let mut lemmas = Vec::new();
        for (index, monomial) in self.keys.iter().enumerate() {
            if let Some(Factor::Opaque(name)) = monomial
                .keys()
                .find(|factor| matches!(factor, Factor::Opaque(_)))
            {
                return Branch::Unknown(format!("cannot interpret {name}"));
            }
            if !is_product(monomial) {
                continue;
            }
            let mut actual = BigRational::one();
            for (factor, exponent) in monomial {
                let Factor::Var(name) = factor else { continue };
                let value = self
                    .base_column(name)
                    .map(|column| values[column].clone())
                    .unwrap_or_else(BigRational::zero);
                for _ in 0..*exponent {
                    actual = &actual * &value;
                }
            }
            if actual != values[index] {
                lemmas.push(self.sign_lemma(monomial, values));
            }
        }
        if !lemmas.is_empty() {
            return Branch::Refine(lemmas);
        }
        let mut model = Model::new();
        for (index, monomial) in self.keys.iter().enumerate() {
            if let Some((Factor::Var(name), 1)) = single_factor(monomial) {
                model.insert(name.clone(), values[index].clone());
            }
        }
        Branch::Sat(model)
    }

    /// `sign(x1) = s1 and ... => sign(x1^k1 * ...) = s` for the signs of the current values.
    fn sign_lemma(&self, monomial: &Monomial, values: &[BigRational]) -> Formula {
        let mut disjuncts = Vec::new();
        let mut factors = Vec::new();
        let mut sign = Ordering::Greater;
        for (factor, exponent) in monomial {
            let Factor::Var(name) = factor else { continue };
            let value = self
                .base_column(name)
                .map(|column| values[column].clone())
                .unwrap_or_else(BigRational::zero);
            let (relation, factor_sign) = match value.cmp(&BigRational::zero()) {
                Ordering::Greater => (Relation::Gt, Ordering::Greater),
                Ordering::Less => (Relation::Lt, Ordering::Less),
                Ordering::Equal => (Relation::Eq, Ordering::Equal),
            };
            disjuncts.push(Formula::atom(
                relation.negated(),
                Term::var(name.clone()),
                Term::zero(),
            ));
            sign = match (sign, factor_sign) {
                (Ordering::Equal, _) | (_, Ordering::Equal) => Ordering::Equal,
                (current, Ordering::Less) if exponent % 2 == 1 => current.reverse(),
                (current, _) => current,
            };
            factors.push(Term::Pow(Box::new(Term::var(name.clone())), *exponent));
        }
        let relation = match sign {
            Ordering::Greater => Relation::Gt,
            Ordering::Less => Relation::Lt,
            Ordering::Equal => Relation::Eq,
        };
        disjuncts.push(Formula::atom(relation, Term::Mul(factors), Term::zero()));
        Formula::Or(disjuncts)
    }
}

fn single_factor(monomial: &Monomial) -> Option<(&Factor, u32)> {
    if monomial.len() == 1 {
        monomial.iter().next().map(|(factor, exponent)| (factor, *exponent))
    } else {
        None
    }
}

fn is_product(monomial: &Monomial) -> bool {
    !matches!(single_factor(monomial), Some((_, 1)))
}

fn is_even_product(monomial: &Monomial) -> bool {
    is_product(monomial)
        && monomial
            .iter()
            .all(|(factor, exponent)| matches!(factor, Factor::Var(_)) && exponent % 2 == 0)
}

fn add_term(poly: &mut Poly, monomial: Monomial, coeff: BigRational) {
    let entry = poly.entry(monomial.clone()).or_insert_with(BigRational::zero);
    *entry = &*entry + coeff;
    if entry.is_zero() {
        poly.remove(&monomial);
    }
}

fn constant_poly(value: BigRational) -> Poly {
    let mut poly = Poly::new();
    add_term(&mut poly, Monomial::new(), value);
    poly
}

fn factor_poly(factor: Factor) -> Poly {
    let mut poly = Poly::new();
    poly.insert(BTreeMap::from([(factor, 1u32)]), BigRational::one());
    poly
}

fn multiply(lhs: &Poly, rhs: &Poly) -> Poly {
    let mut out = Poly::new();
    for (left, a) in lhs {
        for (right, b) in rhs {
            let mut monomial = left.clone();
            for (factor, exponent) in right {
                *monomial.entry(factor.clone()).or_insert(0) += exponent;
            }
            add_term(&mut out, monomial, a * b);
        }
    }
    out
}

fn as_constant(poly: &Poly) -> Option<BigRational> {
    match poly.len() {
        0 => Some(BigRational::zero()),
        1 => poly.get(&Monomial::new()).cloned(),
        _ => None,
    }
}

fn linearize(term: &Term) -> Poly {
    match term {
        Term::Const(value) => constant_poly(value.clone()),
        Term::Var(name) => factor_poly(Factor::Var(name.clone())),
        Term::Add(items) => {
            let mut poly = Poly::new();
            for item in items {
                for (monomial, coeff) in linearize(item) {
                    add_term(&mut poly, monomial, coeff);
                }
            }
            poly
        }
        Term::Mul(items) => items
            .iter()
            .fold(constant_poly(BigRational::one()), |acc, item| {
                multiply(&acc, &linearize(item))
            }),
        Term::Pow(base, exponent) if *exponent <= MAX_DEGREE => {
            let base = linearize(base);
            (0..*exponent).fold(constant_poly(BigRational::one()), |acc, _| {
                multiply(&acc, &base)
            })
        }
        Term::Div(numerator, denominator) => match as_constant(&linearize(denominator)) {
            Some(divisor) if !divisor.is_zero() => {
                multiply(&linearize(numerator), &constant_poly(BigRational::one() / divisor))
            }
            _ => factor_poly(Factor::Opaque(term.to_string())),
        },
        Term::Pow(..) | Term::Apply(..) | Term::Ite(..) => {
            factor_poly(Factor::Opaque(term.to_string()))
        }
    }
}

/// Splits the first conditional term found in `term`.
fn split_ite(term: &Term) -> Option<(Formula, Term, Term)> {
    match term {
        Term::Const(_) | Term::Var(_) => None,
        Term::Ite(cond, then, otherwise) => {
            Some(((**cond).clone(), (**then).clone(), (**otherwise).clone()))
        }
        Term::Add(items) => split_items(items).map(|(c, a, b)| (c, Term::Add(a), Term::Add(b))),
        Term::Mul(items) => split_items(items).map(|(c, a, b)| (c, Term::Mul(a), Term::Mul(b))),
        Term::Apply(name, items) => split_items(items)
            .map(|(c, a, b)| (c, Term::Apply(name.clone(), a), Term::Apply(name.clone(), b))),
        Term::Pow(base, exponent) => split_ite(base).map(|(c, a, b)| {
            (c, Term::Pow(Box::new(a), *exponent), Term::Pow(Box::new(b), *exponent))
        }),
        Term::Div(numerator, denominator) => split_ite(numerator)
            .map(|(c, a, b)| {
                (
                    c,
                    Term::Div(Box::new(a), denominator.clone()),
                    Term::Div(Box::new(b), denominator.clone()),
                )
            })
            .or_else(|| {
                split_ite(denominator).map(|(c, a, b)| {
                    (
                        c,
                        Term::Div(numerator.clone(), Box::new(a)),
                        Term::Div(numerator.clone(), Box::new(b)),
                    )
                })
            }),
    }
}

fn split_items(items: &[Term]) -> Option<(Formula, Vec<Term>, Vec<Term>)> {
    for (index, item) in items.iter().enumerate() {
        if let Some((cond, then, otherwise)) = split_ite(item) {
            let mut then_items = items.to_vec();
            then_items[index] = then;
            let mut else_items = items.to_vec();
            else_items[index] = otherwise;
            return Some((cond, then_items, else_items));
        }
    }
    None
}

/// Rewrites atoms over conditional terms into case splits.
fn lift_ite(formula: &Formula) -> Formula {
    match formula {
        Formula::Const(_) => formula.clone(),
        Formula::Atom(relation, lhs, rhs) => {
            if let Some((cond, then, otherwise)) = split_ite(lhs) {
                return lift_ite(&case_split(
                    cond,
                    Formula::atom(*relation, then, rhs.clone()),
                    Formula::atom(*relation, otherwise, rhs.clone()),
                ));
            }
            if let Some((cond, then, otherwise)) = split_ite(rhs) {
                return lift_ite(&case_split(
                    cond,
                    Formula::atom(*relation, lhs.clone(), then),
                    Formula::atom(*relation, lhs.clone(), otherwise),
                ));
            }
            formula.clone()
        }
        Formula::And(parts) => Formula::And(parts.iter().map(lift_ite).collect()),
        Formula::Or(parts) => Formula::Or(parts.iter().map(lift_ite).collect()),
        Formula::Not(inner) => Formula::Not(Box::new(lift_ite(inner))),
        Formula::Implies(hypothesis, conclusion) => Formula::Implies(
            Box::new(lift_ite(hypothesis)),
            Box::new(lift_ite(conclusion)),
        ),
    }
}

fn case_split(cond: Formula, then: Formula, otherwise: Formula) -> Formula {
    Formula::Or(vec![
        Formula::And(vec![cond.clone(), then]),
        Formula::And(vec![cond.negate(), otherwise]),
    ])
}

/// Negation normal form: only atoms, conjunctions and disjunctions remain.
fn nnf(formula: &Formula, positive: bool) -> Formula {
    match formula {
        Formula::Const(value) => Formula::Const(*value == positive),
        Formula::Atom(relation, lhs, rhs) => {
            let relation = if positive { *relation } else { relation.negated() };
            Formula::Atom(relation, lhs.clone(), rhs.clone())
        }
        Formula::Not(inner) => nnf(inner, !positive),
        Formula::And(parts) => {
            let parts = parts.iter().map(|part| nnf(part, positive)).collect();
            if positive {
                Formula::And(parts)
            } else {
                Formula::Or(parts)
            }
        }
        Formula::Or(parts) => {
            let parts = parts.iter().map(|part| nnf(part, positive)).collect();
            if positive {
                Formula::Or(parts)
            } else {
                Formula::And(parts)
            }
        }
        Formula::Implies(hypothesis, conclusion) => {
            let rewritten = Formula::Or(vec![(**hypothesis).clone().negate(), (**conclusion).clone()]);
            nnf(&rewritten, positive)
        }
    }
}

/// Disjunctive normal form of an NNF formula, or `None` past `limit` disjuncts.
fn dnf(formula: &Formula, limit: usize) -> Option<Vec<Vec<Literal>>> {
    match formula {
        Formula::Const(true) => Some(vec![Vec::new()]),
        Formula::Const(false) => Some(Vec::new()),
        Formula::Atom(Relation::Ne, lhs, rhs) => Some(vec![
            vec![(Relation::Lt, lhs.clone(), rhs.clone())],
            vec![(Relation::Gt, lhs.clone(), rhs.clone())],
        ]),
        Formula::Atom(relation, lhs, rhs) => Some(vec![vec![(*relation, lhs.clone(), rhs.clone())]]),
        Formula::Or(parts) => {
            let mut out = Vec::new();
            for part in parts {
                out.extend(dnf(part, limit)?);
                if out.len() > limit {
                    return None;
                }
            }
            Some(out)
        }
        Formula::And(parts) => {
            let mut out: Vec<Vec<Literal>> = vec![Vec::new()];
            for part in parts {
                let alternatives = dnf(part, limit)?;
                let mut next = Vec::with_capacity(out.len() * alternatives.len());
                for prefix in &out {
                    for alternative in &alternatives {
                        let mut conjunct = prefix.clone();
                        conjunct.extend(alternative.iter().cloned());
                        next.push(conjunct);
                    }
                }
                if next.len() > limit {
                    return None;
                }
                out = next;
                if out.is_empty() {
                    break;
                }
            }
            Some(out)
        }
        Formula::Not(_) | Formula::Implies(..) => dnf(&nnf(formula, true), limit),
    }
}

#[cfg(test)]
mod tests {
    use num_bigint::BigInt;

    use super::*;

    fn x() -> Term {
        Term::var("x")
    }

    fn int(value: i64) -> Term {
        Term::int(value)
    }

    fn check(assumptions: &[Formula], goal: Formula) -> SolverResponse {
        LinearArithmeticSolver::new()
            .check(assumptions, &goal)
            .unwrap()
    }

    #[test]
    fn strict_bounds_pick_interior_points() {
        let assumptions = [Formula::atom(Relation::Gt, x(), int(0))];
        let response = check(&assumptions, Formula::atom(Relation::Le, x(), int(1)));
        let SolverResponse::Sat(model) = response else {
            panic!("expected a model");
        };
        let half = BigRational::new(BigInt::from(1), BigInt::from(2));
        assert_eq!(model.get("x"), Some(&half));
    }

    #[test]
    fn contradictory_bounds_are_unsat() {
        let assumptions = [Formula::atom(Relation::Gt, x(), int(2))];
        let response = check(&assumptions, Formula::atom(Relation::Lt, x(), int(1)));
        assert_eq!(response, SolverResponse::Unsat);
    }

    #[test]
    fn equalities_are_substituted() {
        let y = Term::var("y");
        let assumptions = [Formula::atom(
            Relation::Eq,
            y.clone(),
            Term::Add(vec![x(), int(3)]),
        )];
        let goal = Formula::atom(Relation::Eq, x(), int(2));
        let SolverResponse::Sat(model) = check(&assumptions, goal) else {
            panic!("expected a model");
        };
        assert_eq!(model.get("y"), Some(&BigRational::from_integer(BigInt::from(5))));
    }

    #[test]
    fn disequalities_split_into_two_cases() {
        let assumptions = [
            Formula::atom(Relation::Ge, x(), int(0)),
            Formula::atom(Relation::Le, x(), int(0)),
        ];
        let response = check(&assumptions, Formula::atom(Relation::Ne, x(), int(0)));
        assert_eq!(response, SolverResponse::Unsat);
    }

    #[test]
    fn sign_lemmas_refute_negative_products() {
        let y = Term::var("y");
        let assumptions = [
            Formula::atom(Relation::Gt, x(), int(0)),
            Formula::atom(Relation::Gt, y.clone(), int(0)),
        ];
        let goal = Formula::atom(Relation::Le, Term::Mul(vec![x(), y]), int(0));
        assert_eq!(check(&assumptions, goal), SolverResponse::Unsat);
    }

    #[test]
    fn uninterpreted_functions_are_unknown_when_satisfiable() {
        let goal = Formula::atom(
            Relation::Gt,
            Term::Apply("sin".to_string(), vec![x()]),
            int(1),
        );
        assert!(matches!(check(&[], goal), SolverResponse::Unknown(_)));
    }

    #[test]
    fn conditional_terms_are_split() {
        let abs = Term::Ite(
            Box::new(Formula::atom(Relation::Ge, x(), int(0))),
            Box::new(x()),
            Box::new(Term::Mul(vec![int(-1), x()])),
        );
        let goal = Formula::atom(Relation::Lt, abs, int(0));
        assert_eq!(check(&[], goal), SolverResponse::Unsat);
    }

    #[test]
    fn disjunct_limit_yields_unknown() {
        let solver = LinearArithmeticSolver::new().with_limits(2, 4_096);
        let split = |name: &str| {
            Formula::Or(vec![
                Formula::atom(Relation::Lt, Term::var(name), int(0)),
                Formula::atom(Relation::Gt, Term::var(name), int(0)),
            ])
        };
        let response = solver
            .check(&[split("a"), split("b")], &Formula::Const(true))
            .unwrap();
        assert!(matches!(response, SolverResponse::Unknown(_)));
    }
}
