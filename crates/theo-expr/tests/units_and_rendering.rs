use std::collections::BTreeMap;

use theo_core::TheoError;
use theo_expr::{render, Expr, SiUnitAlgebra, Style, SymbolId, Unit, UnitAlgebra};

fn names(id: SymbolId) -> String {
    ["m", "v", "g", "h", "t"][id.index()].to_string()
}

fn env() -> BTreeMap<SymbolId, Unit> {
    let mut units = BTreeMap::new();
    units.insert(SymbolId::from_raw(0), Unit::kilogram());
    units.insert(SymbolId::from_raw(1), Unit::meter().div(&Unit::second()));
    units.insert(
        SymbolId::from_raw(2),
        Unit::meter().div(&Unit::second().powi(2)),
    );
    units.insert(SymbolId::from_raw(3), Unit::meter());
    units.insert(SymbolId::from_raw(4), Unit::second());
    units
}

fn s(raw: u32) -> Expr {
    Expr::symbol(SymbolId::from_raw(raw))
}

#[test]
fn kinetic_plus_potential_energy_is_joules() -> Result<(), TheoError> {
    let kinetic = Expr::mul(Expr::num(0.5), Expr::mul(s(0), Expr::powf(s(1), 2.0)));
    let potential = Expr::product([s(0), s(2), s(3)]);
    let total = Expr::add(kinetic, potential);
    let unit = SiUnitAlgebra.unit_of(&total, &env())?;
    assert!(unit.map(|u| u.is_compatible(&Unit::joule())).unwrap_or(false));
    Ok(())
}

#[test]
fn adding_length_to_time_is_rejected() {
    let expr = Expr::add(s(3), s(4));
    let err = SiUnitAlgebra.unit_of(&expr, &env()).unwrap_err();
    assert!(matches!(err, TheoError::IncompatibleUnits(info) if info.code == "add"));
}

#[test]
fn transcendental_arguments_must_be_dimensionless() {
    let err = SiUnitAlgebra
        .unit_of(&Expr::exp(s(3)), &env())
        .unwrap_err();
    assert_eq!(err.code(), "dimensioned-argument");
    let ok = SiUnitAlgebra
        .unit_of(&Expr::exp(Expr::div(s(3), s(3))), &env())
        .unwrap();
    assert_eq!(ok.map(|u| u.dimension.is_dimensionless()), Some(true));
}

#[test]
fn unknown_units_propagate() {
    let expr = Expr::mul(s(0), Expr::symbol(SymbolId::from_raw(9)));
    assert_eq!(SiUnitAlgebra.unit_of(&expr, &env()).unwrap(), None);
}

#[test]
fn rpm_converts_to_radians_per_second() {
    let per_second = Unit::second().powi(-1);
    let value = SiUnitAlgebra
        .convert(60.0, &Unit::rpm(), &per_second)
        .unwrap();
    assert!((value - 2.0 * std::f64::consts::PI).abs() < 1e-12);
}

#[test]
fn piecewise_renders_in_every_style() {
    let expr = Expr::piecewise([
        (s(3), Expr::gt(s(3), Expr::num(0.0))),
        (Expr::num(0.0), Expr::Bool(true)),
    ]);
    assert_eq!(
        render(&expr, &names, Style::Rust),
        "if h > 0.0 { h } else if true { 0.0 } else { f64::NAN }"
    );
    assert_eq!(
        render(&expr, &names, Style::Plain),
        "piecewise((h, h > 0), (0, true))"
    );
    assert!(render(&expr, &names, Style::Latex).starts_with("\\begin{cases}"));
}

#[test]
fn negative_terms_render_as_subtraction() {
    let expr = Expr::sub(Expr::mul(Expr::num(2.0), s(0)), Expr::mul(Expr::num(3.0), s(1)));
    assert_eq!(render(&expr, &names, Style::Plain), "2*m - 3*v");
    assert_eq!(render(&expr, &names, Style::Rust), "2.0 * m - 3.0 * v");
}
