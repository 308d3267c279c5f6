use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

/// Identifier of a symbol inside a symbol table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SymbolId(u32);

impl SymbolId {
    /// Creates a new identifier from its raw integer representation.
    pub fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the raw integer representation of the identifier.
    pub fn as_raw(&self) -> u32 {
        self.0
    }

    /// Returns the identifier as an index into arena storage.
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

/// Numeric literal compared and hashed by bit pattern so it can key caches.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Literal(f64);

impl Literal {
    /// Wraps a float, folding negative zero into zero.
    pub fn new(value: f64) -> Self {
        if value == 0.0 {
            Self(0.0)
        } else {
            Self(value)
        }
    }

    /// Returns the wrapped value.
    pub fn value(&self) -> f64 {
        self.0
    }
}

impl PartialEq for Literal {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_bits() == other.0.to_bits()
    }
}

impl Eq for Literal {}

impl Hash for Literal {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.to_bits().hash(state);
    }
}

impl PartialOrd for Literal {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Literal {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// Elementary functions understood by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Func {
    /// Square root.
    Sqrt,
    /// Natural exponential.
    Exp,
    /// Natural logarithm.
    Ln,
    /// Sine.
    Sin,
    /// Cosine.
    Cos,
    /// Tangent.
    Tan,
    /// Absolute value.
    Abs,
}

impl Func {
    /// Lowercase name used by the plain renderer.
    pub fn name(&self) -> &'static str {
        match self {
            Func::Sqrt => "sqrt",
            Func::Exp => "exp",
            Func::Ln => "ln",
            Func::Sin => "sin",
            Func::Cos => "cos",
            Func::Tan => "tan",
            Func::Abs => "abs",
        }
    }

    /// Applies the function to a number.
    pub fn apply(&self, value: f64) -> f64 {
        match self {
            Func::Sqrt => value.sqrt(),
            Func::Exp => value.exp(),
            Func::Ln => value.ln(),
            Func::Sin => value.sin(),
            Func::Cos => value.cos(),
            Func::Tan => value.tan(),
            Func::Abs => value.abs(),
        }
    }
}

/// Binary relations between real valued expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Relation {
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `==`
    Eq,
    /// `!=`
    Ne,
}

impl Relation {
    /// Returns the relation that holds exactly when this one does not.
    pub fn negated(&self) -> Relation {
        match self {
            Relation::Lt => Relation::Ge,
            Relation::Le => Relation::Gt,
            Relation::Gt => Relation::Le,
            Relation::Ge => Relation::Lt,
            Relation::Eq => Relation::Ne,
            Relation::Ne => Relation::Eq,
        }
    }

    /// Evaluates the relation on two numbers.
    pub fn holds(&self, lhs: f64, rhs: f64) -> bool {
        match self {
            Relation::Lt => lhs < rhs,
            Relation::Le => lhs <= rhs,
            Relation::Gt => lhs > rhs,
            Relation::Ge => lhs >= rhs,
            Relation::Eq => lhs == rhs,
            Relation::Ne => lhs != rhs,
        }
    }

    /// Operator spelling shared by the plain and Rust renderers.
    pub fn symbol(&self) -> &'static str {
        match self {
            Relation::Lt => "<",
            Relation::Le => "<=",
            Relation::Gt => ">",
            Relation::Ge => ">=",
            Relation::Eq => "==",
            Relation::Ne => "!=",
        }
    }
}

/// Expression tree over symbols and numeric literals.
///
/// Subtraction is stored as addition of a term scaled by `-1` and division as
/// multiplication by a power with exponent `-1`; the renderers recover both forms.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "op", content = "args", rename_all = "snake_case")]
pub enum Expr {
    /// Numeric literal.
    Num(Literal),
    /// Reference to a symbol in the owning table.
    Sym(SymbolId),
    /// N-ary sum.
    Add(Vec<Expr>),
    /// N-ary product.
    Mul(Vec<Expr>),
    /// Base raised to an exponent.
    Pow(Box<Expr>, Box<Expr>),
    /// Elementary function call.
    Call(Func, Box<Expr>),
    /// Ordered `(value, condition)` branches; the first satisfied condition wins.
    Piecewise(Vec<(Expr, Expr)>),
    /// Boolean literal.
    Bool(bool),
    /// Relation between two real expressions.
    Cmp(Relation, Box<Expr>, Box<Expr>),
    /// N-ary conjunction.
    And(Vec<Expr>),
    /// N-ary disjunction.
    Or(Vec<Expr>),
    /// Negation.
    Not(Box<Expr>),
    /// Material implication.
    Implies(Box<Expr>, Box<Expr>),
}

impl Expr {
    /// Numeric literal.
    pub fn num(value: f64) -> Expr {
        Expr::Num(Literal::new(value))
    }

    /// Integer literal.
    pub fn int(value: i64) -> Expr {
        Expr::num(value as f64)
    }

    /// Symbol reference.
    pub fn symbol(id: SymbolId) -> Expr {
        Expr::Sym(id)
    }

    /// `lhs + rhs`, flattening nested sums.
    pub fn add(lhs: Expr, rhs: Expr) -> Expr {
        Expr::sum([lhs, rhs])
    }

    /// Sum of all terms; an empty sum is zero.
    pub fn sum<I: IntoIterator<Item = Expr>>(terms: I) -> Expr {
        let mut flat = Vec::new();
        for term in terms {
            match term {
                Expr::Add(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        match flat.len() {
            0 => Expr::num(0.0),
            1 => flat.remove(0),
            _ => Expr::Add(flat),
        }
    }

    /// `lhs - rhs`.
    pub fn sub(lhs: Expr, rhs: Expr) -> Expr {
        Expr::add(lhs, Expr::neg(rhs))
    }

    /// `-value`.
    pub fn neg(value: Expr) -> Expr {
        match value {
            Expr::Num(lit) => Expr::num(-lit.value()),
            other => Expr::Mul(vec![Expr::num(-1.0), other]),
        }
    }

    /// `lhs * rhs`, flattening nested products.
    pub fn mul(lhs: Expr, rhs: Expr) -> Expr {
        Expr::product([lhs, rhs])
    }

    /// Product of all factors; an empty product is one.
    pub fn product<I: IntoIterator<Item = Expr>>(factors: I) -> Expr {
        let mut flat = Vec::new();
        for factor in factors {
            match factor {
                Expr::Mul(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        match flat.len() {
            0 => Expr::num(1.0),
            1 => flat.remove(0),
            _ => Expr::Mul(flat),
        }
    }

    /// `lhs / rhs`.
    pub fn div(lhs: Expr, rhs: Expr) -> Expr {
        Expr::mul(lhs, Expr::recip(rhs))
    }

    /// `1 / value`.
    pub fn recip(value: Expr) -> Expr {
        Expr::pow(value, Expr::num(-1.0))
    }

    /// `base ^ exponent`.
    pub fn pow(base: Expr, exponent: Expr) -> Expr {
        Expr::Pow(Box::new(base), Box::new(exponent))
    }

    /// `base ^ exponent` for a numeric exponent.
    pub fn powf(base: Expr, exponent: f64) -> Expr {
        Expr::pow(base, Expr::num(exponent))
    }

    /// Elementary function application.
    pub fn call(func: Func, arg: Expr) -> Expr {
        Expr::Call(func, Box::new(arg))
    }

    /// Square root.
    pub fn sqrt(arg: Expr) -> Expr {
        Expr::call(Func::Sqrt, arg)
    }

    /// Natural logarithm.
    pub fn ln(arg: Expr) -> Expr {
        Expr::call(Func::Ln, arg)
    }

    /// Natural exponential.
    pub fn exp(arg: Expr) -> Expr {
        Expr::call(Func::Exp, arg)
    }

    /// Piecewise definition from `(value, condition)` branches.
    pub fn piecewise<I: IntoIterator<Item = (Expr, Expr)>>(branches: I) -> Expr {
        Expr::Piecewise(branches.into_iter().collect())
    }

    /// Relation between two expressions.
    pub fn compare(relation: Relation, lhs: Expr, rhs: Expr) -> Expr {
        Expr::Cmp(relation, Box::new(lhs), Box::new(rhs))
    }

    /// `lhs < rhs`.
    pub fn lt(lhs: Expr, rhs: Expr) -> Expr {
        Expr::compare(Relation::Lt, lhs, rhs)
    }

    /// `lhs <= rhs`.
    pub fn le(lhs: Expr, rhs: Expr) -> Expr {
        Expr::compare(Relation::Le, lhs, rhs)
    }

    /// `lhs > rhs`.
    pub fn gt(lhs: Expr, rhs: Expr) -> Expr {
        Expr::compare(Relation::Gt, lhs, rhs)
    }

    /// `lhs >= rhs`.
    pub fn ge(lhs: Expr, rhs: Expr) -> Expr {
        Expr::compare(Relation::Ge, lhs, rhs)
    }

    /// `lhs == rhs`.
    pub fn eq(lhs: Expr, rhs: Expr) -> Expr {
        Expr::compare(Relation::Eq, lhs, rhs)
    }

    /// `lhs != rhs`.
    pub fn ne(lhs: Expr, rhs: Expr) -> Expr {
        Expr::compare(Relation::Ne, lhs, rhs)
    }

    /// `lhs && rhs`, flattening nested conjunctions.
    pub fn and(lhs: Expr, rhs: Expr) -> Expr {
        Expr::all([lhs, rhs])
    }

    /// Conjunction of all operands; an empty conjunction is true.
    pub fn all<I: IntoIterator<Item = Expr>>(operands: I) -> Expr {
        let mut flat = Vec::new();
        for operand in operands {
            match operand {
                Expr::And(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        match flat.len() {
            0 => Expr::Bool(true),
            1 => flat.remove(0),
            _ => Expr::And(flat),
        }
    }

    /// `lhs || rhs`, flattening nested disjunctions.
    pub fn or(lhs: Expr, rhs: Expr) -> Expr {
        Expr::any([lhs, rhs])
    }

    /// Disjunction of all operands; an empty disjunction is false.
    pub fn any<I: IntoIterator<Item = Expr>>(operands: I) -> Expr {
        let mut flat = Vec::new();
        for operand in operands {
            match operand {
                Expr::Or(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        match flat.len() {
            0 => Expr::Bool(false),
            1 => flat.remove(0),
            _ => Expr::Or(flat),
        }
    }

    /// `!value`.
    pub fn not(value: Expr) -> Expr {
        Expr::Not(Box::new(value))
    }

    /// `hypothesis => conclusion`.
    pub fn implies(hypothesis: Expr, conclusion: Expr) -> Expr {
        Expr::Implies(Box::new(hypothesis), Box::new(conclusion))
    }

    /// Returns the literal value when the expression is a number.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Expr::Num(lit) => Some(lit.value()),
            _ => None,
        }
    }

    /// Returns the symbol when the expression is a bare reference.
    pub fn as_symbol(&self) -> Option<SymbolId> {
        match self {
            Expr::Sym(id) => Some(*id),
            _ => None,
        }
    }

    /// Whether the expression denotes a truth value rather than a number.
    pub fn is_boolean(&self) -> bool {
        matches!(
            self,
            Expr::Bool(_)
                | Expr::Cmp(..)
                | Expr::And(_)
                | Expr::Or(_)
                | Expr::Not(_)
                | Expr::Implies(..)
        )
    }

    /// Immediate sub-expressions in left-to-right order.
    pub fn children(&self) -> Vec<&Expr> {
        match self {
            Expr::Num(_) | Expr::Sym(_) | Expr::Bool(_) => Vec::new(),
            Expr::Add(items) | Expr::Mul(items) | Expr::And(items) | Expr::Or(items) => {
                items.iter().collect()
            }
            Expr::Pow(base, exponent) => vec![base.as_ref(), exponent.as_ref()],
            Expr::Call(_, arg) | Expr::Not(arg) => vec![arg.as_ref()],
            Expr::Piecewise(branches) => branches
                .iter()
                .flat_map(|(value, condition)| [value, condition])
                .collect(),
            Expr::Cmp(_, lhs, rhs) | Expr::Implies(lhs, rhs) => vec![lhs.as_ref(), rhs.as_ref()],
        }
    }

    /// Free symbols in discovery order (pre-order, left to right, first occurrence wins).
    pub fn free_symbols(&self) -> Vec<SymbolId> {
        let mut seen = IndexSet::new();
        self.collect_symbols(&mut seen);
        seen.into_iter().collect()
    }

    fn collect_symbols(&self, seen: &mut IndexSet<SymbolId>) {
        if let Expr::Sym(id) = self {
            seen.insert(*id);
            return;
        }
        for child in self.children() {
            child.collect_symbols(seen);
        }
    }

    /// Whether the symbol occurs anywhere in the tree.
    pub fn contains_symbol(&self, id: SymbolId) -> bool {
        match self {
            Expr::Sym(other) => *other == id,
            _ => self.children().iter().any(|child| child.contains_symbol(id)),
        }
    }

    /// Number of occurrences of the symbol in the tree.
    pub fn count_symbol(&self, id: SymbolId) -> usize {
        match self {
            Expr::Sym(other) => usize::from(*other == id),
            _ => self
                .children()
                .iter()
                .map(|child| child.count_symbol(id))
                .sum(),
        }
    }

    /// Replaces every mapped symbol by its replacement in a single pass.
    ///
    /// Replacements are inserted verbatim and never revisited, so `{x -> y, y -> x}`
    /// swaps the two symbols instead of collapsing them.
    pub fn substitute(&self, mapping: &BTreeMap<SymbolId, Expr>) -> Expr {
        if mapping.is_empty() {
            return self.clone();
        }
        match self {
            Expr::Sym(id) => mapping.get(id).cloned().unwrap_or(Expr::Sym(*id)),
            Expr::Num(_) | Expr::Bool(_) => self.clone(),
            Expr::Add(items) => Expr::Add(items.iter().map(|e| e.substitute(mapping)).collect()),
            Expr::Mul(items) => Expr::Mul(items.iter().map(|e| e.substitute(mapping)).collect()),
            Expr::And(items) => Expr::And(items.iter().map(|e| e.substitute(mapping)).collect()),
            Expr::Or(items) => Expr::Or(items.iter().map(|e| e.substitute(mapping)).collect()),
            Expr::Pow(base, exponent) => Expr::Pow(
                Box::new(base.substitute(mapping)),
                Box::new(exponent.substitute(mapping)),
            ),
            Expr::Call(func, arg) => Expr::Call(*func, Box::new(arg.substitute(mapping))),
            Expr::Piecewise(branches) => Expr::Piecewise(
                branches
                    .iter()
                    .map(|(value, condition)| {
                        (value.substitute(mapping), condition.substitute(mapping))
                    })
                    .collect(),
            ),
            Expr::Cmp(relation, lhs, rhs) => Expr::Cmp(
                *relation,
                Box::new(lhs.substitute(mapping)),
                Box::new(rhs.substitute(mapping)),
            ),
            Expr::Not(inner) => Expr::Not(Box::new(inner.substitute(mapping))),
            Expr::Implies(lhs, rhs) => Expr::Implies(
                Box::new(lhs.substitute(mapping)),
                Box::new(rhs.substitute(mapping)),
            ),
        }
    }

    /// Total number of nodes in the tree.
    pub fn size(&self) -> usize {
        1 + self.children().iter().map(|child| child.size()).sum::<usize>()
    }
}

impl From<SymbolId> for Expr {
    fn from(id: SymbolId) -> Self {
        Expr::Sym(id)
    }
}

impl From<f64> for Expr {
    fn from(value: f64) -> Self {
        Expr::num(value)
    }
}
