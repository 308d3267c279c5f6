//! Structural normalisation: flattening, constant folding, like-term and like-base collection.
//!
//! The rules never change the value of an expression wherever the original was defined.

use indexmap::IndexMap;

use crate::expr::{Expr, Func};

/// Returns a normalised copy of the expression.
pub fn simplify(expr: &Expr) -> Expr {
    match expr {
        Expr::Num(_) | Expr::Sym(_) | Expr::Bool(_) => expr.clone(),
        Expr::Add(terms) => simplify_add(terms.iter().map(simplify).collect()),
        Expr::Mul(factors) => simplify_mul(factors.iter().map(simplify).collect()),
        Expr::Pow(base, exponent) => simplify_pow(simplify(base), simplify(exponent)),
        Expr::Call(func, arg) => simplify_call(*func, simplify(arg)),
        Expr::Piecewise(branches) => simplify_piecewise(branches),
        Expr::Cmp(relation, lhs, rhs) => {
            let lhs = simplify(lhs);
            let rhs = simplify(rhs);
            match (lhs.as_number(), rhs.as_number()) {
                (Some(a), Some(b)) => Expr::Bool(relation.holds(a, b)),
                _ => Expr::compare(*relation, lhs, rhs),
            }
        }
        Expr::And(items) => {
            let mut kept = Vec::new();
            for item in items.iter().map(simplify) {
                match item {
                    Expr::Bool(true) => {}
                    Expr::Bool(false) => return Expr::Bool(false),
                    other => kept.push(other),
                }
            }
            Expr::all(kept)
        }
        Expr::Or(items) => {
            let mut kept = Vec::new();
            for item in items.iter().map(simplify) {
                match item {
                    Expr::Bool(false) => {}
                    Expr::Bool(true) => return Expr::Bool(true),
                    other => kept.push(other),
                }
            }
            Expr::any(kept)
        }
        Expr::Not(inner) => match simplify(inner) {
            Expr::Bool(value) => Expr::Bool(!value),
            Expr::Not(twice) => *twice,
            other => Expr::not(other),
        },
        Expr::Implies(lhs, rhs) => match (simplify(lhs), simplify(rhs)) {
            (Expr::Bool(false), _) | (_, Expr::Bool(true)) => Expr::Bool(true),
            (Expr::Bool(true), rhs) => rhs,
            (lhs, rhs) => Expr::implies(lhs, rhs),
        },
    }
}

fn finite(value: f64) -> Option<Expr> {
    value.is_finite().then(|| Expr::num(value))
}

/// Splits a term into its numeric coefficient and the remaining factors.
fn split_coefficient(term: Expr) -> (f64, Expr) {
    match term {
        Expr::Num(lit) => (lit.value(), Expr::num(1.0)),
        Expr::Mul(factors) => {
            let mut coefficient = 1.0;
            let mut rest = Vec::new();
            for factor in factors {
                match factor {
                    Expr::Num(lit) => coefficient *= lit.value(),
                    other => rest.push(other),
                }
            }
            (coefficient, Expr::product(rest))
        }
        other => (1.0, other),
    }
}

fn simplify_add(terms: Vec<Expr>) -> Expr {
    let mut flat = Vec::new();
    for term in terms {
        match term {
            Expr::Add(inner) => flat.extend(inner),
            other => flat.push(other),
        }
    }
    let mut constant = 0.0;
    let mut collected: IndexMap<Expr, f64> = IndexMap::new();
    for term in flat {
        let (coefficient, rest) = split_coefficient(term);
        if rest == Expr::num(1.0) {
            constant += coefficient;
        } else {
            *collected.entry(rest).or_insert(0.0) += coefficient;
        }
    }
    let mut out = Vec::new();
    for (rest, coefficient) in collected {
        if coefficient == 0.0 {
            continue;
        }
        if coefficient == 1.0 {
            out.push(rest);
        } else {
            out.push(simplify_mul(vec![Expr::num(coefficient), rest]));
        }
    }
    if constant != 0.0 || out.is_empty() {
        out.push(Expr::num(constant));
    }
    Expr::sum(out)
}

fn split_power(factor: Expr) -> (Expr, Expr) {
    match factor {
        Expr::Pow(base, exponent) => (*base, *exponent),
        other => (other, Expr::num(1.0)),
    }
}

fn simplify_mul(factors: Vec<Expr>) -> Expr {
    let mut flat = Vec::new();
    for factor in factors {
        match factor {
            Expr::Mul(inner) => flat.extend(inner),
            other => flat.push(other),
        }
    }
    let mut coefficient = 1.0;
    let mut bases: IndexMap<Expr, Vec<Expr>> = IndexMap::new();
    for factor in flat {
        match factor {
            Expr::Num(lit) => coefficient *= lit.value(),
            other => {
                let (base, exponent) = split_power(other);
                bases.entry(base).or_default().push(exponent);
            }
        }
    }
    if coefficient == 0.0 {
        return Expr::num(0.0);
    }
    let mut rest = Vec::new();
    for (base, exponents) in bases {
        let exponent = simplify_add(exponents);
        match simplify_pow(base, exponent) {
            Expr::Num(lit) => coefficient *= lit.value(),
            Expr::Mul(inner) => rest.extend(inner),
            other => rest.push(other),
        }
    }
    if let [Expr::Add(terms)] = rest.as_slice() {
        if coefficient != 1.0 {
            let distributed = terms
                .iter()
                .map(|term| simplify_mul(vec![Expr::num(coefficient), term.clone()]))
                .collect();
            return simplify_add(distributed);
        }
    }
    if coefficient != 1.0 || rest.is_empty() {
        rest.insert(0, Expr::num(coefficient));
    }
    Expr::product(rest)
}

fn is_integer(value: f64) -> bool {
    value.fract() == 0.0 && value.is_finite()
}

fn simplify_pow(base: Expr, exponent: Expr) -> Expr {
    if let Some(e) = exponent.as_number() {
        if e == 0.0 {
            return Expr::num(1.0);
        }
        if e == 1.0 {
            return base;
        }
        if let Some(b) = base.as_number() {
            if b >= 0.0 || is_integer(e) {
                if let Some(folded) = finite(b.powf(e)) {
                    return folded;
                }
            }
        }
        if let Expr::Pow(inner_base, inner_exponent) = &base {
            if let Some(inner) = inner_exponent.as_number() {
                if is_integer(e) {
                    return simplify_pow((**inner_base).clone(), Expr::num(inner * e));
                }
            }
        }
    }
    if base == Expr::num(1.0) {
        return Expr::num(1.0);
    }
    Expr::pow(base, exponent)
}

fn simplify_call(func: Func, arg: Expr) -> Expr {
    if let Some(value) = arg.as_number() {
        if let Some(folded) = finite(func.apply(value)) {
            return folded;
        }
    }
    Expr::call(func, arg)
}

fn simplify_piecewise(branches: &[(Expr, Expr)]) -> Expr {
    let mut kept = Vec::new();
    for (value, condition) in branches {
        let value = simplify(value);
        match simplify(condition) {
            Expr::Bool(false) => {}
            Expr::Bool(true) if kept.is_empty() => return value,
            Expr::Bool(true) => {
                kept.push((value, Expr::Bool(true)));
                break;
            }
            condition => kept.push((value, condition)),
        }
    }
    Expr::Piecewise(kept)
}
