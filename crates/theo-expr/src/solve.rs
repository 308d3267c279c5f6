//! Equation solving by isolation of the target symbol.

use tracing::debug;

use crate::expr::{Expr, Func, SymbolId};
use crate::simplify::simplify;

/// Solves `lhs = rhs` for `target`, returning every candidate found.
///
/// Candidates are simplified, free of `target`, and de-duplicated in the order the
/// isolation produced them. An empty result means the equation could not be solved.
pub fn solve(lhs: &Expr, rhs: &Expr, target: SymbolId) -> Vec<Expr> {
    let lhs = simplify(lhs);
    let rhs = simplify(rhs);
    let raw = match (lhs.contains_symbol(target), rhs.contains_symbol(target)) {
        (true, false) => isolate(&lhs, rhs, target),
        (false, true) => isolate(&rhs, lhs, target),
        (true, true) => isolate(&simplify(&Expr::sub(lhs, rhs)), Expr::num(0.0), target),
        (false, false) => Vec::new(),
    };
    let mut out: Vec<Expr> = Vec::new();
    for candidate in raw {
        let candidate = simplify(&candidate);
        if candidate.contains_symbol(target) || out.contains(&candidate) {
            continue;
        }
        out.push(candidate);
    }
    debug!(
        target = target.as_raw(),
        candidates = out.len(),
        "solved equation by isolation"
    );
    out
}

fn isolate(expr: &Expr, rhs: Expr, target: SymbolId) -> Vec<Expr> {
    match expr {
        Expr::Sym(id) if *id == target => vec![rhs],
        Expr::Add(terms) => isolate_sum(terms, rhs, target),
        Expr::Mul(factors) => {
            let (dependent, others): (Vec<&Expr>, Vec<&Expr>) =
                factors.iter().partition(|f| f.contains_symbol(target));
            match dependent.as_slice() {
                [single] => {
                    let divided = Expr::product(
                        std::iter::once(rhs).chain(others.into_iter().map(|f| Expr::recip(f.clone()))),
                    );
                    isolate(single, simplify(&divided), target)
                }
                _ => Vec::new(),
            }
        }
        Expr::Pow(base, exponent) => {
            match (base.contains_symbol(target), exponent.contains_symbol(target)) {
                (true, false) => invert_power(exponent, rhs)
                    .into_iter()
                    .flat_map(|candidate| isolate(base, candidate, target))
                    .collect(),
                (false, true) => {
                    let logged = Expr::div(Expr::ln(rhs), Expr::ln((**base).clone()));
                    isolate(exponent, simplify(&logged), target)
                }
                _ => Vec::new(),
            }
        }
        Expr::Call(func, arg) => invert_call(*func, rhs)
            .into_iter()
            .flat_map(|candidate| isolate(arg, candidate, target))
            .collect(),
        _ => Vec::new(),
    }
}

fn isolate_sum(terms: &[Expr], rhs: Expr, target: SymbolId) -> Vec<Expr> {
    let (dependent, others): (Vec<&Expr>, Vec<&Expr>) =
        terms.iter().partition(|t| t.contains_symbol(target));
    let remainder = simplify(&Expr::sub(rhs, Expr::sum(others.into_iter().cloned())));
    if let [single] = dependent.as_slice() {
        return isolate(single, remainder, target);
    }
    // Several terms: only a linear combination of the bare target is handled.
    let mut coefficients = Vec::new();
    for term in dependent {
        match linear_coefficient(term, target) {
            Some(coefficient) => coefficients.push(coefficient),
            None => return Vec::new(),
        }
    }
    let coefficient = simplify(&Expr::sum(coefficients));
    if coefficient.as_number() == Some(0.0) {
        return Vec::new();
    }
    vec![Expr::div(remainder, coefficient)]
}

fn linear_coefficient(term: &Expr, target: SymbolId) -> Option<Expr> {
    match term {
        Expr::Sym(id) if *id == target => Some(Expr::num(1.0)),
        Expr::Mul(factors) => {
            let bare = factors.iter().filter(|f| **f == Expr::Sym(target)).count();
            let tangled = factors
                .iter()
                .any(|f| *f != Expr::Sym(target) && f.contains_symbol(target));
            if bare != 1 || tangled {
                return None;
            }
            Some(Expr::product(
                factors.iter().filter(|f| **f != Expr::Sym(target)).cloned(),
            ))
        }
        _ => None,
    }
}

fn invert_power(exponent: &Expr, rhs: Expr) -> Vec<Expr> {
    let Some(e) = exponent.as_number() else {
        return vec![Expr::pow(rhs, Expr::recip(exponent.clone()))];
    };
    if e == 0.0 {
        return Vec::new();
    }
    let root = Expr::powf(rhs.clone(), 1.0 / e);
    let even = e.fract() == 0.0 && (e as i64) % 2 == 0;
    if !even {
        return vec![root];
    }
    if rhs.as_number().is_some_and(|value| value < 0.0) {
        return Vec::new();
    }
    vec![root.clone(), Expr::neg(root)]
}

fn invert_call(func: Func, rhs: Expr) -> Vec<Expr> {
    match func {
        Func::Sqrt => {
            if rhs.as_number().is_some_and(|value| value < 0.0) {
                return Vec::new();
            }
            vec![Expr::powf(rhs, 2.0)]
        }
        Func::Exp => vec![Expr::ln(rhs)],
        Func::Ln => vec![Expr::exp(rhs)],
        Func::Abs => vec![rhs.clone(), Expr::neg(rhs)],
        Func::Sin | Func::Cos | Func::Tan => {
            debug!(func = func.name(), "no inverse available for isolation");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(raw: u32) -> Expr {
        Expr::symbol(SymbolId::from_raw(raw))
    }

    #[test]
    fn isolates_linear_target() {
        // y = 2 * x + 3  =>  x = (y - 3) / 2
        let x = SymbolId::from_raw(0);
        let lhs = s(1);
        let rhs = Expr::add(Expr::mul(Expr::num(2.0), s(0)), Expr::num(3.0));
        let solutions = solve(&lhs, &rhs, x);
        assert_eq!(solutions.len(), 1);
        let expected = simplify(&Expr::mul(
            Expr::num(0.5),
            Expr::sub(s(1), Expr::num(3.0)),
        ));
        assert_eq!(solutions[0], expected);
    }

    #[test]
    fn even_power_yields_two_roots() {
        let x = SymbolId::from_raw(0);
        let solutions = solve(&Expr::powf(s(0), 2.0), &s(1), x);
        assert_eq!(solutions.len(), 2);
        assert_eq!(solutions[1], simplify(&Expr::neg(solutions[0].clone())));
    }

    #[test]
    fn unsupported_shapes_return_nothing() {
        let x = SymbolId::from_raw(0);
        assert!(solve(&Expr::call(Func::Sin, s(0)), &s(1), x).is_empty());
        assert!(solve(&s(1), &s(2), x).is_empty());
    }
}
