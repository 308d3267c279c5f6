use theo_core::{from_json_slice, to_canonical_json_bytes, TheoError};
use theo_expr::{Expr, SymbolId, Unit};

fn s(raw: u32) -> Expr {
    Expr::symbol(SymbolId::from_raw(raw))
}

#[test]
fn expression_roundtrip() -> Result<(), TheoError> {
    let expr = Expr::piecewise([
        (Expr::num(1.0), Expr::le(s(0), Expr::num(1.0))),
        (
            Expr::sub(Expr::num(1.0), Expr::mul(Expr::num(0.5), Expr::powf(s(0), 1.5))),
            Expr::and(Expr::gt(s(0), Expr::num(1.0)), Expr::not(Expr::eq(s(1), Expr::num(0.0)))),
        ),
    ]);
    let bytes = to_canonical_json_bytes(&expr)?;
    let decoded: Expr = from_json_slice(&bytes)?;
    assert_eq!(expr, decoded);
    assert_eq!(to_canonical_json_bytes(&decoded)?, bytes);
    Ok(())
}

#[test]
fn unit_roundtrip_keeps_scale_and_symbol() -> Result<(), TheoError> {
    for unit in [
        Unit::minute(),
        Unit::joule().div(&Unit::kilogram().mul(&Unit::kelvin())),
        Unit::meter().div(&Unit::second()).sqrt(),
    ] {
        let bytes = to_canonical_json_bytes(&unit)?;
        let decoded: Unit = from_json_slice(&bytes)?;
        assert_eq!(unit, decoded);
        assert_eq!(unit.to_string(), decoded.to_string());
    }
    Ok(())
}

#[test]
fn malformed_json_is_a_serde_error() {
    let err = from_json_slice::<Expr>(b"{\"Sym\":").unwrap_err();
    assert!(matches!(err, TheoError::Serde(ref info) if info.code == "json-deserialize"));
}
