use theo_core::{from_json_slice, to_canonical_json_bytes, ProofPolicy, TheoError};
use theo_doc::{DataObject, Documentation, Section};
use theo_expr::{Expr, SymbolId, Unit};
use theo_graph::{SymbolSpec, SymbolTable};

fn sym(id: SymbolId) -> Expr {
    Expr::symbol(id)
}

fn sample() -> Result<(SymbolTable, Documentation), TheoError> {
    let mut table = SymbolTable::new();
    let a = table.declare(SymbolSpec::new("a").unit(Unit::meter()))?;
    let b = table.declare(SymbolSpec::new("b").value(2.0).unit(Unit::meter()))?;
    let c = table.declare(
        SymbolSpec::new("c")
            .expression(Expr::add(sym(a), sym(b)))
            .unit(Unit::meter()),
    )?;
    let d = table.declare(SymbolSpec::new("d").expression(Expr::mul(sym(c), Expr::num(0.5))))?;

    let mut proofs = Section::new("Positivity");
    proofs.add_assumption(&table, Expr::gt(sym(a), Expr::num(0.0)), "a is positive")?;
    proofs.add_theorem(&table, Expr::gt(sym(c), Expr::num(2.0)), "c exceeds b")?;

    let object = DataObject::new("Lengths", [c, d]);
    let mut documentation = Documentation::with_sections(
        "Lengths",
        [
            Section::from_symbol(&table, c, "Sum", &[a])?.with_citation("Handbook, p. 12"),
            Section::from_data_object(&table, &object, "Lengths", &[a])?,
            proofs,
        ],
    );
    let broken = Section::from_symbol(&table, d, "Broken", &[]);
    assert!(!documentation.push_result("Broken", broken));
    Ok((table, documentation))
}

#[test]
fn documentation_roundtrip() -> Result<(), TheoError> {
    let (table, mut documentation) = sample()?;
    documentation.verify_theorems(&table, &ProofPolicy::default())?;
    let bytes = to_canonical_json_bytes(&documentation)?;
    let decoded: Documentation = from_json_slice(&bytes)?;
    assert_eq!(documentation, decoded);
    assert_eq!(decoded.failures()[0].error.code(), "unbound-leaf");
    Ok(())
}

#[test]
fn views_roundtrip() -> Result<(), TheoError> {
    let (table, documentation) = sample()?;
    let views = documentation.views(&table)?;
    let bytes = to_canonical_json_bytes(&views)?;
    let decoded: Vec<theo_doc::SectionView> = from_json_slice(&bytes)?;
    assert_eq!(views, decoded);
    assert_eq!(decoded[0].citation.as_deref(), Some("Handbook, p. 12"));
    assert_eq!(decoded[1].data_object.as_deref(), Some("Lengths"));
    Ok(())
}
