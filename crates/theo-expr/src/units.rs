//! Physical units: SI dimensions with rational exponents and scale factors.

use std::collections::BTreeMap;
use std::f64::consts::PI;
use std::fmt::{self, Display};

use num_rational::Rational32;
use num_traits::{One, Zero};
use serde::{Deserialize, Serialize};
use theo_core::{ErrorInfo, TheoError};

use crate::expr::{Expr, Func, SymbolId};

const BASE_SYMBOLS: [&str; 7] = ["m", "kg", "s", "A", "K", "mol", "cd"];

/// Exponents over the seven SI base dimensions, in the order
/// length, mass, time, current, temperature, amount, luminous intensity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dimension([Rational32; 7]);

impl Dimension {
    /// The dimension of pure numbers.
    pub fn none() -> Self {
        Self([Rational32::zero(); 7])
    }

    fn base(index: usize) -> Self {
        let mut exponents = [Rational32::zero(); 7];
        exponents[index] = Rational32::one();
        Self(exponents)
    }

    /// Whether every exponent is zero.
    pub fn is_dimensionless(&self) -> bool {
        self.0.iter().all(Zero::is_zero)
    }

    /// Exponent of each base dimension.
    pub fn exponents(&self) -> &[Rational32; 7] {
        &self.0
    }

    /// Sum of exponents (dimension of a product).
    pub fn mul(&self, other: &Dimension) -> Dimension {
        let mut out = self.0;
        for (slot, rhs) in out.iter_mut().zip(other.0.iter()) {
            *slot += *rhs;
        }
        Dimension(out)
    }

    /// Difference of exponents (dimension of a quotient).
    pub fn div(&self, other: &Dimension) -> Dimension {
        self.mul(&other.pow(-Rational32::one()))
    }

    /// Scales every exponent.
    pub fn pow(&self, exponent: Rational32) -> Dimension {
        let mut out = self.0;
        for slot in out.iter_mut() {
            *slot *= exponent;
        }
        Dimension(out)
    }
}

impl Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_dimensionless() {
            return write!(f, "1");
        }
        let mut first = true;
        for (symbol, exponent) in BASE_SYMBOLS.iter().zip(self.0.iter()) {
            if exponent.is_zero() {
                continue;
            }
            if !first {
                write!(f, "*")?;
            }
            first = false;
            if exponent.is_one() {
                write!(f, "{symbol}")?;
            } else {
                write!(f, "{symbol}^{exponent}")?;
            }
        }
        Ok(())
    }
}

/// A unit: a dimension plus the factor converting one of it into SI base units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    /// Physical dimension.
    pub dimension: Dimension,
    /// Multiplier to the coherent SI unit of the same dimension.
    pub scale: f64,
    /// Display symbol, when the unit has a conventional name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
}

impl Unit {
    /// Creates an unnamed unit.
    pub fn new(dimension: Dimension, scale: f64) -> Self {
        Self {
            dimension,
            scale,
            symbol: None,
        }
    }

    /// Replaces the display symbol.
    pub fn with_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.symbol = Some(symbol.into());
        self
    }

    fn named(dimension: Dimension, scale: f64, symbol: &str) -> Self {
        Self::new(dimension, scale).with_symbol(symbol)
    }

    /// Pure number.
    pub fn dimensionless() -> Self {
        Self::new(Dimension::none(), 1.0)
    }

    /// Metre.
    pub fn meter() -> Self {
        Self::named(Dimension::base(0), 1.0, "m")
    }

    /// Kilogram.
    pub fn kilogram() -> Self {
        Self::named(Dimension::base(1), 1.0, "kg")
    }

    /// Gram.
    pub fn gram() -> Self {
        Self::named(Dimension::base(1), 1e-3, "g")
    }

    /// Second.
    pub fn second() -> Self {
        Self::named(Dimension::base(2), 1.0, "s")
    }

    /// Minute.
    pub fn minute() -> Self {
        Self::named(Dimension::base(2), 60.0, "min")
    }

    /// Hour.
    pub fn hour() -> Self {
        Self::named(Dimension::base(2), 3600.0, "h")
    }

    /// Ampere.
    pub fn ampere() -> Self {
        Self::named(Dimension::base(3), 1.0, "A")
    }

    /// Kelvin.
    pub fn kelvin() -> Self {
        Self::named(Dimension::base(4), 1.0, "K")
    }

    /// Mole.
    pub fn mole() -> Self {
        Self::named(Dimension::base(5), 1.0, "mol")
    }

    /// Candela.
    pub fn candela() -> Self {
        Self::named(Dimension::base(6), 1.0, "cd")
    }

    /// Radian (dimensionless).
    pub fn radian() -> Self {
        Self::named(Dimension::none(), 1.0, "rad")
    }

    /// Hertz.
    pub fn hertz() -> Self {
        Self::second().powi(-1).with_symbol("Hz")
    }

    /// Revolutions per minute, as an angular rate.
    pub fn rpm() -> Self {
        Self::named(Dimension::base(2).pow(-Rational32::one()), 2.0 * PI / 60.0, "rpm")
    }

    /// Newton.
    pub fn newton() -> Self {
        Self::kilogram()
            .mul(&Self::meter())
            .div(&Self::second().powi(2))
            .with_symbol("N")
    }

    /// Joule.
    pub fn joule() -> Self {
        Self::newton().mul(&Self::meter()).with_symbol("J")
    }

    /// Watt.
    pub fn watt() -> Self {
        Self::joule().div(&Self::second()).with_symbol("W")
    }

    /// Pascal.
    pub fn pascal() -> Self {
        Self::newton().div(&Self::meter().powi(2)).with_symbol("Pa")
    }

    /// Bar.
    pub fn bar() -> Self {
        Self::named(Self::pascal().dimension, 1e5, "bar")
    }

    /// Standard atmosphere.
    pub fn atm() -> Self {
        Self::named(Self::pascal().dimension, 101_325.0, "atm")
    }

    /// Litre.
    pub fn liter() -> Self {
        Self::named(Self::meter().powi(3).dimension, 1e-3, "L")
    }

    /// Product of two units.
    pub fn mul(&self, other: &Unit) -> Unit {
        Unit {
            dimension: self.dimension.mul(&other.dimension),
            scale: self.scale * other.scale,
            symbol: match (&self.symbol, &other.symbol) {
                (Some(a), Some(b)) => Some(format!("{a}*{b}")),
                _ => None,
            },
        }
    }

    /// Quotient of two units.
    pub fn div(&self, other: &Unit) -> Unit {
        Unit {
            dimension: self.dimension.div(&other.dimension),
            scale: self.scale / other.scale,
            symbol: match (&self.symbol, &other.symbol) {
                (Some(a), Some(b)) => Some(format!("{a}/{}", group(b))),
                _ => None,
            },
        }
    }

    /// Integer power.
    pub fn powi(&self, exponent: i32) -> Unit {
        self.pow(Rational32::from_integer(exponent))
    }

    /// Rational power.
    pub fn pow(&self, exponent: Rational32) -> Unit {
        let as_float = *exponent.numer() as f64 / *exponent.denom() as f64;
        Unit {
            dimension: self.dimension.pow(exponent),
            scale: self.scale.powf(as_float),
            symbol: self
                .symbol
                .as_ref()
                .map(|symbol| format!("{}^{exponent}", group(symbol))),
        }
    }

    /// Square root.
    pub fn sqrt(&self) -> Unit {
        self.pow(Rational32::new(1, 2))
    }

    /// Whether both units measure the same dimension.
    pub fn is_compatible(&self, other: &Unit) -> bool {
        self.dimension == other.dimension
    }

    /// Factor converting a value in `self` into a value in `other`.
    pub fn conversion_factor(&self, other: &Unit) -> Result<f64, TheoError> {
        if !self.is_compatible(other) {
            return Err(incompatible("convert", self, other));
        }
        Ok(self.scale / other.scale)
    }
}

fn group(symbol: &str) -> String {
    if symbol.contains(['*', '/', '^']) {
        format!("({symbol})")
    } else {
        symbol.to_string()
    }
}

impl Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.symbol {
            Some(symbol) => write!(f, "{symbol}"),
            None if self.scale == 1.0 => write!(f, "{}", self.dimension),
            None => write!(f, "{} {}", self.scale, self.dimension),
        }
    }
}

fn incompatible(code: &str, lhs: &Unit, rhs: &Unit) -> TheoError {
    TheoError::IncompatibleUnits(
        ErrorInfo::new(code, "units measure different dimensions")
            .with_context("lhs", lhs)
            .with_context("rhs", rhs),
    )
}

/// Source of declared units for symbols.
pub trait UnitEnv {
    /// Declared unit of the symbol, if any.
    fn unit_of_symbol(&self, id: SymbolId) -> Option<Unit>;
}

impl UnitEnv for BTreeMap<SymbolId, Unit> {
    fn unit_of_symbol(&self, id: SymbolId) -> Option<Unit> {
        self.get(&id).cloned()
    }
}

/// Unit inference and conversion over expressions.
pub trait UnitAlgebra {
    /// Infers the unit of a real valued expression.
    ///
    /// `Ok(None)` means the unit is unknown (some symbol carries none) or the
    /// expression is boolean.
    fn unit_of(&self, expr: &Expr, env: &dyn UnitEnv) -> Result<Option<Unit>, TheoError>;

    /// Converts a value between compatible units.
    fn convert(&self, value: f64, from: &Unit, to: &Unit) -> Result<f64, TheoError>;
}

/// Unit algebra over SI base dimensions.
#[derive(Debug, Clone, Copy, Default)]
pub struct SiUnitAlgebra;

impl SiUnitAlgebra {
    fn same_unit<'e>(
        &self,
        items: impl Iterator<Item = &'e Expr>,
        env: &dyn UnitEnv,
    ) -> Result<Option<Unit>, TheoError> {
        let mut first: Option<Unit> = None;
        for item in items {
            // Bare numbers adopt the unit of their neighbours.
            if item.as_number().is_some() {
                continue;
            }
            let Some(unit) = self.unit_of(item, env)? else {
                return Ok(None);
            };
            match &first {
                Some(existing) if !existing.is_compatible(&unit) => {
                    return Err(incompatible("add", existing, &unit));
                }
                Some(_) => {}
                None => first = Some(unit),
            }
        }
        Ok(Some(first.unwrap_or_else(Unit::dimensionless)))
    }

    fn require_dimensionless(
        &self,
        expr: &Expr,
        env: &dyn UnitEnv,
        code: &str,
    ) -> Result<(), TheoError> {
        if let Some(unit) = self.unit_of(expr, env)? {
            if !unit.dimension.is_dimensionless() {
                return Err(TheoError::IncompatibleUnits(
                    ErrorInfo::new(code, "argument must be dimensionless")
                        .with_context("unit", &unit),
                ));
            }
        }
        Ok(())
    }

    fn check_boolean(&self, expr: &Expr, env: &dyn UnitEnv) -> Result<(), TheoError> {
        match expr {
            Expr::Cmp(_, lhs, rhs) => {
                self.same_unit([lhs.as_ref(), rhs.as_ref()].into_iter(), env)?;
            }
            _ => {
                for child in expr.children() {
                    self.check_boolean(child, env)?;
                }
            }
        }
        Ok(())
    }
}

impl UnitAlgebra for SiUnitAlgebra {
    fn unit_of(&self, expr: &Expr, env: &dyn UnitEnv) -> Result<Option<Unit>, TheoError> {
        match expr {
            Expr::Num(_) => Ok(Some(Unit::dimensionless())),
            Expr::Sym(id) => Ok(env.unit_of_symbol(*id)),
            Expr::Add(terms) => self.same_unit(terms.iter(), env),
            Expr::Mul(factors) => {
                let mut acc = Unit::dimensionless();
                for factor in factors {
                    match self.unit_of(factor, env)? {
                        Some(unit) => acc = acc.mul(&unit),
                        None => return Ok(None),
                    }
                }
                Ok(Some(acc))
            }
            Expr::Pow(base, exponent) => {
                let Some(base_unit) = self.unit_of(base, env)? else {
                    return Ok(None);
                };
                self.require_dimensionless(exponent, env, "dimensioned-exponent")?;
                if base_unit.dimension.is_dimensionless() {
                    return Ok(Some(match exponent.as_number() {
                        Some(e) => Unit::new(Dimension::none(), base_unit.scale.powf(e)),
                        None => Unit::dimensionless(),
                    }));
                }
                let rational = exponent.as_number().and_then(Rational32::approximate_float);
                match rational {
                    Some(e) => Ok(Some(base_unit.pow(e))),
                    None => Err(TheoError::IncompatibleUnits(
                        ErrorInfo::new(
                            "symbolic-exponent",
                            "a dimensioned base needs a numeric exponent",
                        )
                        .with_context("unit", &base_unit),
                    )),
                }
            }
            Expr::Call(func, arg) => match func {
                Func::Sqrt => Ok(self.unit_of(arg, env)?.map(|unit| unit.sqrt())),
                Func::Abs => self.unit_of(arg, env),
                Func::Exp | Func::Ln | Func::Sin | Func::Cos | Func::Tan => {
                    self.require_dimensionless(arg, env, "dimensioned-argument")?;
                    Ok(Some(Unit::dimensionless()))
                }
            },
            Expr::Piecewise(branches) => {
                for (_, condition) in branches {
                    self.check_boolean(condition, env)?;
                }
                self.same_unit(branches.iter().map(|(value, _)| value), env)
            }
            Expr::Bool(_) | Expr::Cmp(..) | Expr::And(_) | Expr::Or(_) | Expr::Not(_)
            | Expr::Implies(..) => {
                self.check_boolean(expr, env)?;
                Ok(None)
            }
        }
    }

    fn convert(&self, value: f64, from: &Unit, to: &Unit) -> Result<f64, TheoError> {
        Ok(value * from.conversion_factor(to)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_units_share_dimensions() {
        assert!(Unit::pascal().is_compatible(&Unit::bar()));
        assert!(Unit::joule().is_compatible(&Unit::newton().mul(&Unit::meter())));
        assert!(!Unit::watt().is_compatible(&Unit::joule()));
        assert_eq!(Unit::pascal().dimension.to_string(), "m^-1*kg*s^-2");
    }

    #[test]
    fn conversion_uses_scale_ratio() -> Result<(), TheoError> {
        let factor = Unit::bar().conversion_factor(&Unit::pascal())?;
        assert!((factor - 1e5).abs() < 1e-9);
        let err = Unit::meter().conversion_factor(&Unit::second());
        assert_eq!(err.map_err(|e| e.code().to_string()), Err("convert".to_string()));
        Ok(())
    }
}
