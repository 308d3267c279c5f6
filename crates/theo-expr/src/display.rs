//! Rendering of expressions as plain text, LaTeX, or Rust source.

use crate::expr::{Expr, Func, Relation, SymbolId};

/// Resolves symbol identifiers to printable names.
pub trait SymbolNames {
    /// Identifier used in plain text and generated code.
    fn symbol_name(&self, id: SymbolId) -> String;

    /// LaTeX spelling; defaults to the plain name.
    fn symbol_latex(&self, id: SymbolId) -> String {
        self.symbol_name(id)
    }
}

impl<F> SymbolNames for F
where
    F: Fn(SymbolId) -> String,
{
    fn symbol_name(&self, id: SymbolId) -> String {
        self(id)
    }
}

/// Output dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Style {
    /// Compact ASCII math, used in logs and error messages.
    Plain,
    /// LaTeX math mode.
    Latex,
    /// Rust `f64` expression.
    Rust,
}

const LOWEST: u8 = 0;
const OR: u8 = 1;
const AND: u8 = 2;
const CMP: u8 = 3;
const ADD: u8 = 4;
const MUL: u8 = 5;
const NEG: u8 = 6;
const POW: u8 = 7;
const ATOM: u8 = 8;

/// Renders an expression in the requested style.
pub fn render<N: SymbolNames + ?Sized>(expr: &Expr, names: &N, style: Style) -> String {
    Renderer { names, style }.render(expr).0
}

struct Renderer<'a, N: ?Sized> {
    names: &'a N,
    style: Style,
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

fn rust_literal(value: f64) -> String {
    if value.is_nan() {
        "f64::NAN".to_string()
    } else if value == f64::INFINITY {
        "f64::INFINITY".to_string()
    } else if value == f64::NEG_INFINITY {
        "f64::NEG_INFINITY".to_string()
    } else {
        format!("{value:?}")
    }
}

/// Splits a leading negative coefficient off a term.
fn split_sign(term: &Expr) -> Option<Expr> {
    match term {
        Expr::Num(lit) if lit.value() < 0.0 => Some(Expr::num(-lit.value())),
        Expr::Mul(factors) => match factors.first().and_then(Expr::as_number) {
            Some(c) if c < 0.0 => {
                let rest = factors[1..].iter().cloned();
                if c == -1.0 {
                    Some(Expr::product(rest))
                } else {
                    Some(Expr::product(std::iter::once(Expr::num(-c)).chain(rest)))
                }
            }
            _ => None,
        },
        _ => None,
    }
}

impl<'a, N: SymbolNames + ?Sized> Renderer<'a, N> {
    fn wrap(&self, (text, prec): (String, u8), min: u8) -> String {
        if prec >= min {
            return text;
        }
        match self.style {
            Style::Latex => format!("\\left({text}\\right)"),
            Style::Plain | Style::Rust => format!("({text})"),
        }
    }

    fn render(&self, expr: &Expr) -> (String, u8) {
        match expr {
            Expr::Num(lit) => self.number(lit.value()),
            Expr::Sym(id) => match self.style {
                Style::Latex => (self.names.symbol_latex(*id), ATOM),
                Style::Plain | Style::Rust => (self.names.symbol_name(*id), ATOM),
            },
            Expr::Add(terms) => self.sum(terms),
            Expr::Mul(factors) => self.product(factors),
            Expr::Pow(base, exponent) => self.power(base, exponent),
            Expr::Call(func, arg) => self.call(*func, arg),
            Expr::Piecewise(branches) => self.piecewise(branches),
            Expr::Bool(value) => match self.style {
                Style::Latex => (format!("\\text{{{value}}}"), ATOM),
                Style::Plain | Style::Rust => (value.to_string(), ATOM),
            },
            Expr::Cmp(relation, lhs, rhs) => {
                let op = match self.style {
                    Style::Latex => latex_relation(*relation),
                    Style::Plain | Style::Rust => relation.symbol(),
                };
                let lhs = self.wrap(self.render(lhs), ADD);
                let rhs = self.wrap(self.render(rhs), ADD);
                (format!("{lhs} {op} {rhs}"), CMP)
            }
            Expr::And(items) => {
                let op = match self.style {
                    Style::Latex => " \\land ",
                    Style::Plain => " & ",
                    Style::Rust => " && ",
                };
                self.joined(items, op, AND)
            }
            Expr::Or(items) => {
                let op = match self.style {
                    Style::Latex => " \\lor ",
                    Style::Plain => " | ",
                    Style::Rust => " || ",
                };
                self.joined(items, op, OR)
            }
            Expr::Not(inner) => {
                let inner = self.wrap(self.render(inner), ATOM);
                match self.style {
                    Style::Latex => (format!("\\lnot {inner}"), NEG),
                    Style::Plain | Style::Rust => (format!("!{inner}"), NEG),
                }
            }
            Expr::Implies(lhs, rhs) => {
                let lhs_text = self.wrap(self.render(lhs), OR);
                let rhs_text = self.wrap(self.render(rhs), OR);
                match self.style {
                    Style::Latex => (format!("{lhs_text} \\Rightarrow {rhs_text}"), LOWEST),
                    Style::Plain => (format!("{lhs_text} => {rhs_text}"), LOWEST),
                    Style::Rust => {
                        let negated = self.wrap(self.render(lhs), ATOM);
                        (format!("!{negated} || {rhs_text}"), OR)
                    }
                }
            }
        }
    }

    fn number(&self, value: f64) -> (String, u8) {
        let text = match self.style {
            Style::Rust => rust_literal(value),
            Style::Plain | Style::Latex => format_number(value),
        };
        let prec = if value < 0.0 { NEG } else { ATOM };
        (text, prec)
    }

    /// Renders a method receiver, suffixing bare literals so the call type checks.
    fn receiver(&self, expr: &Expr) -> String {
        match expr.as_number() {
            Some(value) if value.is_finite() && value >= 0.0 => {
                format!("{}_f64", rust_literal(value))
            }
            Some(value) if value.is_finite() => format!("({}_f64)", rust_literal(value)),
            _ => self.wrap(self.render(expr), ATOM),
        }
    }

    fn joined(&self, items: &[Expr], op: &str, prec: u8) -> (String, u8) {
        let parts: Vec<String> = items
            .iter()
            .map(|item| self.wrap(self.render(item), prec + 1))
            .collect();
        (parts.join(op), prec)
    }

    fn sum(&self, terms: &[Expr]) -> (String, u8) {
        let mut out = String::new();
        for (idx, term) in terms.iter().enumerate() {
            match split_sign(term) {
                Some(positive) => {
                    let text = self.wrap(self.render(&positive), MUL);
                    if idx == 0 {
                        out.push('-');
                    } else {
                        out.push_str(" - ");
                    }
                    out.push_str(&text);
                }
                None => {
                    let text = self.wrap(self.render(term), ADD);
                    if idx > 0 {
                        out.push_str(" + ");
                    }
                    out.push_str(&text);
                }
            }
        }
        (out, ADD)
    }

    fn product(&self, factors: &[Expr]) -> (String, u8) {
        let mut negative = false;
        let mut numerator = Vec::new();
        let mut denominator = Vec::new();
        for (idx, factor) in factors.iter().enumerate() {
            match factor {
                Expr::Num(lit) if idx == 0 && lit.value() == -1.0 => negative = true,
                Expr::Num(lit) if idx == 0 && lit.value() < 0.0 => {
                    negative = true;
                    numerator.push(Expr::num(-lit.value()));
                }
                Expr::Pow(base, exponent) => match exponent.as_number() {
                    Some(e) if e == -1.0 => denominator.push((**base).clone()),
                    Some(e) if e < 0.0 => denominator.push(Expr::powf((**base).clone(), -e)),
                    _ => numerator.push(factor.clone()),
                },
                other => numerator.push(other.clone()),
            }
        }

        let sep = match self.style {
            Style::Latex => " \\cdot ",
            Style::Plain => "*",
            Style::Rust => " * ",
        };
        let join = |items: &[Expr], min: u8| -> String {
            items
                .iter()
                .map(|item| self.wrap(self.render(item), min))
                .collect::<Vec<_>>()
                .join(sep)
        };

        let (body, prec) = if denominator.is_empty() {
            (join(&numerator, MUL), MUL)
        } else if self.style == Style::Latex {
            let top = if numerator.is_empty() {
                "1".to_string()
            } else {
                join(&numerator, MUL)
            };
            (format!("\\frac{{{top}}}{{{}}}", join(&denominator, MUL)), ATOM)
        } else {
            let top = match numerator.len() {
                0 => match self.style {
                    Style::Rust => "1.0".to_string(),
                    _ => "1".to_string(),
                },
                _ => join(&numerator, MUL),
            };
            let bottom = match denominator.as_slice() {
                [single] => self.wrap(self.render(single), POW),
                many => format!("({})", join(many, MUL)),
            };
            let slash = if self.style == Style::Rust { " / " } else { "/" };
            (format!("{top}{slash}{bottom}"), MUL)
        };

        if !negative {
            return (body, prec);
        }
        if body.is_empty() {
            return self.number(-1.0);
        }
        (format!("-{body}"), if prec == ATOM { NEG } else { MUL })
    }

    fn power(&self, base: &Expr, exponent: &Expr) -> (String, u8) {
        let numeric = exponent.as_number();
        if numeric == Some(0.5) {
            return self.call(Func::Sqrt, base);
        }
        match self.style {
            Style::Rust => {
                let receiver = self.receiver(base);
                match numeric {
                    Some(e) if e.fract() == 0.0 && e.abs() < 2_147_483_648.0 => {
                        (format!("{receiver}.powi({})", e as i64), ATOM)
                    }
                    _ => {
                        let exponent = self.render(exponent).0;
                        (format!("{receiver}.powf({exponent})"), ATOM)
                    }
                }
            }
            Style::Latex => {
                let base = self.wrap(self.render(base), ATOM);
                let exponent = self.render(exponent).0;
                (format!("{base}^{{{exponent}}}"), POW)
            }
            Style::Plain => {
                let base = self.wrap(self.render(base), ATOM);
                let exponent = self.wrap(self.render(exponent), ATOM);
                (format!("{base}^{exponent}"), POW)
            }
        }
    }

    fn call(&self, func: Func, arg: &Expr) -> (String, u8) {
        match self.style {
            Style::Rust => (format!("{}.{}()", self.receiver(arg), func.name()), ATOM),
            Style::Plain => (format!("{}({})", func.name(), self.render(arg).0), ATOM),
            Style::Latex => {
                let inner = self.render(arg).0;
                let text = match func {
                    Func::Sqrt => format!("\\sqrt{{{inner}}}"),
                    Func::Exp => format!("e^{{{inner}}}"),
                    Func::Abs => format!("\\left|{inner}\\right|"),
                    Func::Ln | Func::Sin | Func::Cos | Func::Tan => {
                        format!("\\{}\\left({inner}\\right)", func.name())
                    }
                };
                (text, ATOM)
            }
        }
    }

    fn piecewise(&self, branches: &[(Expr, Expr)]) -> (String, u8) {
        match self.style {
            Style::Rust => {
                let mut out = String::new();
                for (idx, (value, condition)) in branches.iter().enumerate() {
                    if idx > 0 {
                        out.push_str(" else ");
                    }
                    out.push_str(&format!(
                        "if {} {{ {} }}",
                        self.render(condition).0,
                        self.render(value).0
                    ));
                }
                if branches.is_empty() {
                    return ("f64::NAN".to_string(), ATOM);
                }
                out.push_str(" else { f64::NAN }");
                (out, LOWEST)
            }
            Style::Latex => {
                let rows: Vec<String> = branches
                    .iter()
                    .map(|(value, condition)| {
                        format!(
                            "{} & \\text{{if }} {}",
                            self.render(value).0,
                            self.render(condition).0
                        )
                    })
                    .collect();
                (
                    format!("\\begin{{cases}} {} \\end{{cases}}", rows.join(" \\\\ ")),
                    ATOM,
                )
            }
            Style::Plain => {
                let rows: Vec<String> = branches
                    .iter()
                    .map(|(value, condition)| {
                        format!("({}, {})", self.render(value).0, self.render(condition).0)
                    })
                    .collect();
                (format!("piecewise({})", rows.join(", ")), ATOM)
            }
        }
    }
}

fn latex_relation(relation: Relation) -> &'static str {
    match relation {
        Relation::Lt => "<",
        Relation::Le => "\\leq",
        Relation::Gt => ">",
        Relation::Ge => "\\geq",
        Relation::Eq => "=",
        Relation::Ne => "\\neq",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(id: SymbolId) -> String {
        ["x", "y", "z"][id.index()].to_string()
    }

    fn s(raw: u32) -> Expr {
        Expr::symbol(SymbolId::from_raw(raw))
    }

    #[test]
    fn plain_recovers_subtraction_and_division() {
        let expr = Expr::sub(s(0), Expr::div(s(1), s(2)));
        assert_eq!(render(&expr, &names, Style::Plain), "x - y/z");
    }

    #[test]
    fn rust_uses_float_methods() {
        let expr = Expr::mul(Expr::num(0.5), Expr::powf(s(0), 2.0));
        assert_eq!(render(&expr, &names, Style::Rust), "0.5 * x.powi(2)");
        let root = Expr::sqrt(Expr::add(s(0), s(1)));
        assert_eq!(render(&root, &names, Style::Rust), "(x + y).sqrt()");
    }

    #[test]
    fn latex_uses_fractions() {
        let expr = Expr::div(s(0), Expr::mul(s(1), s(2)));
        assert_eq!(
            render(&expr, &names, Style::Latex),
            "\\frac{x}{y \\cdot z}"
        );
    }
}
