use theo_core::{CodegenOptions, ProofPolicy, TheoError};
use theo_doc::{CodeGenerator, Documentation, DocumentationGenerator, Section, SectionBuilder};
use theo_expr::{Expr, SymbolId, Unit};
use theo_graph::{SymbolSpec, SymbolTable};

fn sym(id: SymbolId) -> Expr {
    Expr::symbol(id)
}

fn energy_documentation() -> Result<(SymbolTable, Documentation), TheoError> {
    let mut table = SymbolTable::new();
    let m = table.declare(
        SymbolSpec::new("m")
            .description("Mass of the object")
            .unit(Unit::kilogram()),
    )?;
    let v = table.declare(
        SymbolSpec::new("v")
            .description("Velocity of the object")
            .unit(Unit::meter().div(&Unit::second())),
    )?;
    let h = table.declare(SymbolSpec::new("h").unit(Unit::meter()))?;
    let g = table.declare(
        SymbolSpec::new("g")
            .value(9.81)
            .description("Acceleration due to gravity"),
    )?;
    let kinetic = table.declare(
        SymbolSpec::new("E_k")
            .expression(Expr::product([Expr::num(0.5), sym(m), Expr::powf(sym(v), 2.0)]))
            .description("Kinetic energy of the object")
            .unit(Unit::joule()),
    )?;
    let potential = table.declare(
        SymbolSpec::new("E_p").expression(Expr::product([sym(m), sym(g), sym(h)])),
    )?;
    let total = table.declare(
        SymbolSpec::new("E_total")
            .expression(Expr::add(sym(kinetic), sym(potential)))
            .description("Total mechanical energy of the object")
            .latex("E_{total}"),
    )?;

    let mut documentation = Documentation::new("Mechanical Energy Example");
    let built = documentation.build_section(
        &table,
        SectionBuilder::for_symbol("Energy Calculation", total)
            .arguments([m, v, h])
            .statements([kinetic, potential, total]),
    );
    assert!(built);
    Ok((table, documentation))
}

#[test]
fn code_follows_the_resolved_order() -> Result<(), TheoError> {
    let (table, documentation) = energy_documentation()?;
    let code = CodeGenerator::new(CodegenOptions::default()).generate(&table, &documentation)?;

    assert!(code.starts_with("//! Mechanical Energy Example\n"));
    assert!(code.contains("#![allow(non_snake_case, unused_variables)]"));
    assert!(code.contains("pub fn energy_calculation(m: f64, v: f64, h: f64) -> f64 {"));
    assert!(code.contains("    let g = 9.81;\n"));
    assert!(code.contains("    let E_k = 0.5 * m * v.powi(2); // J\n"));
    assert!(code.contains("    let E_p = m * g * h;\n"));
    assert!(code.contains("    let E_total = E_k + E_p;\n    E_total\n}\n"));

    let kinetic = code.find("let E_k").unwrap_or(usize::MAX);
    let potential = code.find("let E_p").unwrap_or(usize::MAX);
    let total = code.find("let E_total").unwrap_or(usize::MAX);
    assert!(kinetic < potential && potential < total);
    Ok(())
}

#[test]
fn module_doc_can_be_disabled() -> Result<(), TheoError> {
    let (table, documentation) = energy_documentation()?;
    let options = CodegenOptions {
        module_doc: false,
        ..CodegenOptions::default()
    };
    let code = CodeGenerator::new(options).generate(&table, &documentation)?;
    assert!(code.starts_with("#![allow(non_snake_case, unused_variables)]\n"));
    Ok(())
}

#[test]
fn external_symbols_call_the_external_module() -> Result<(), TheoError> {
    let mut table = SymbolTable::new();
    let t0 = table.declare(SymbolSpec::new("T0").unit(Unit::kelvin()))?;
    let gamma = table.declare(
        SymbolSpec::new("gamma")
            .external()
            .description("ratio of specific heats")
            .latex("\\gamma")
            .unit(Unit::dimensionless()),
    )?;
    let section = Section::from_symbol(&table, gamma, "Ratio of Specific Heats", &[t0])?;
    assert_eq!(section.statements(), &[gamma]);
    let documentation = Documentation::with_sections("Thermodynamics", [section]);

    let options = CodegenOptions {
        external_module: "crate::gas".to_string(),
        ..CodegenOptions::default()
    };
    let code = CodeGenerator::new(options).generate(&table, &documentation)?;
    assert!(code.contains("pub fn ratio_of_specific_heats(T0: f64) -> f64 {"));
    assert!(code.contains("    let gamma = crate::gas::gamma(T0);"));

    let markdown = DocumentationGenerator::new().generate(&table, &documentation)?;
    assert!(markdown.contains("\\gamma = f\\left(T0\\right)"));
    assert!(markdown.contains("provided by an external function"));
    Ok(())
}

#[test]
fn scaled_statements_are_converted_in_code() -> Result<(), TheoError> {
    let mut table = SymbolTable::new();
    let t = table.declare(SymbolSpec::new("t").unit(Unit::second()))?;
    let minutes = table.declare(
        SymbolSpec::new("t_min")
            .expression(sym(t))
            .unit(Unit::minute()),
    )?;
    let section = Section::from_symbol(&table, minutes, "Minutes", &[t])?;
    let documentation = Documentation::with_sections("Time", [section]);
    let code = CodeGenerator::default().generate(&table, &documentation)?;
    assert!(code.contains("    let t_min = (t) * 0.01666"));
    Ok(())
}

#[test]
fn duplicate_section_names_get_distinct_functions() -> Result<(), TheoError> {
    let mut table = SymbolTable::new();
    let a = table.declare(SymbolSpec::new("a"))?;
    let b = table.declare(SymbolSpec::new("b").expression(Expr::mul(sym(a), Expr::num(2.0))))?;
    let c = table.declare(SymbolSpec::new("c").expression(Expr::mul(sym(a), Expr::num(3.0))))?;
    let documentation = Documentation::with_sections(
        "Twice",
        [
            Section::from_symbol(&table, b, "Scale", &[a])?,
            Section::from_symbol(&table, c, "Scale", &[a])?,
        ],
    );
    let code = CodeGenerator::default().generate(&table, &documentation)?;
    assert!(code.contains("pub fn scale(a: f64) -> f64 {"));
    assert!(code.contains("pub fn scale_2(a: f64) -> f64 {"));
    Ok(())
}

#[test]
fn markdown_lists_arguments_and_equations() -> Result<(), TheoError> {
    let (table, documentation) = energy_documentation()?;
    let markdown = DocumentationGenerator::new().generate(&table, &documentation)?;

    assert!(markdown.starts_with("# Mechanical Energy Example\n"));
    assert!(markdown.contains("## Energy Calculation\n\nTotal mechanical energy of the object\n"));
    assert!(markdown.contains("| $m$ | Mass of the object | kg |"));
    assert!(markdown.contains("| $g$ | Acceleration due to gravity | 9.81 |  |"));
    assert!(markdown.contains("$$\nE_k = 0.5 \\cdot m \\cdot v^{2}\n$$"));
    assert!(markdown.contains("$$\nE_{total} = E_k + E_p\n$$"));
    assert!(markdown.contains("Kinetic energy of the object [J]"));

    let kinetic = markdown.find("E_k = ").unwrap_or(usize::MAX);
    let total = markdown.find("E_{total} = ").unwrap_or(usize::MAX);
    assert!(kinetic < total);
    Ok(())
}

#[test]
fn hidden_sections_are_only_skipped_by_the_documentation() -> Result<(), TheoError> {
    let (table, mut documentation) = energy_documentation()?;
    for section in documentation.sections_mut() {
        section.set_show_in_documentation(false);
    }
    let markdown = DocumentationGenerator::new().generate(&table, &documentation)?;
    assert!(!markdown.contains("## Energy Calculation"));
    let code = CodeGenerator::default().generate(&table, &documentation)?;
    assert!(code.contains("pub fn energy_calculation("));
    Ok(())
}

#[test]
fn failed_sections_are_listed_without_stopping_the_rest() -> Result<(), TheoError> {
    let (table, mut documentation) = energy_documentation()?;
    let total = table.find("E_total").expect("declared above");
    let added = documentation.build_section(&table, SectionBuilder::for_symbol("Broken", total));
    assert!(!added);
    assert_eq!(documentation.sections().len(), 1);
    assert_eq!(documentation.failures().len(), 1);
    assert!(!documentation.is_complete());

    let markdown = DocumentationGenerator::new().generate(&table, &documentation)?;
    assert!(markdown.contains("## Energy Calculation"));
    assert!(markdown.contains("## Unresolved sections\n\n- Broken: missing argument:"));
    Ok(())
}

#[test]
fn proof_summaries_are_rendered() -> Result<(), TheoError> {
    let mut table = SymbolTable::new();
    let x = table.declare(SymbolSpec::new("x"))?;
    let mut section = Section::new("Positivity").with_description("Proofs about x");
    section.add_assumption(&table, Expr::gt(sym(x), Expr::num(0.0)), "x is positive")?;
    section.add_theorem(
        &table,
        Expr::gt(Expr::add(sym(x), Expr::num(1.0)), Expr::num(0.0)),
        "shifted x is positive",
    )?;
    let mut documentation = Documentation::with_sections("Proofs", [section]);
    let reports = documentation.verify_theorems(&table, &ProofPolicy::default())?;
    assert_eq!(reports.len(), 1);

    let markdown = DocumentationGenerator::new().generate(&table, &documentation)?;
    assert!(markdown.contains("**Proofs**\n\n```text\nProof summary (builtin-linear)\n"));
    assert!(markdown.contains("- [proven] shifted x is positive: x + 1 > 0"));

    let code = CodeGenerator::default().generate(&table, &documentation)?;
    assert!(!code.contains("pub fn"));
    Ok(())
}

#[test]
fn colliding_identifiers_get_suffixes() -> Result<(), TheoError> {
    let mut table = SymbolTable::new();
    let spaced = table.declare(SymbolSpec::new("T 0"))?;
    let underscored = table.declare(SymbolSpec::new("T_0"))?;
    let sum = table.declare(
        SymbolSpec::new("E").expression(Expr::add(sym(spaced), sym(underscored))),
    )?;
    let x = table.declare(SymbolSpec::new("x"))?;
    let doubled =
        table.declare(SymbolSpec::new("x").expression(Expr::mul(sym(x), Expr::num(2.0))))?;
    let y = table.declare(SymbolSpec::new("y").expression(Expr::add(sym(doubled), sym(x))))?;
    let documentation = Documentation::with_sections(
        "Collisions",
        [
            Section::from_symbol(&table, sum, "Collide", &[spaced, underscored])?,
            Section::from_symbol(&table, y, "Shadow", &[x])?,
        ],
    );

    let code = CodeGenerator::default().generate(&table, &documentation)?;
    assert!(code.contains("pub fn collide(T_0: f64, T_0_2: f64) -> f64 {"));
    assert!(code.contains("    let E = T_0 + T_0_2;\n"));
    assert!(code.contains("pub fn shadow(x: f64) -> f64 {"));
    assert!(code.contains("    let x_2 = x * 2.0;\n    let y = x_2 + x;\n    y\n}\n"));
    Ok(())
}

#[test]
fn expressions_replaced_after_assembly_are_rejected() -> Result<(), TheoError> {
    let mut table = SymbolTable::new();
    let a = table.declare(SymbolSpec::new("A"))?;
    let b = table.declare(SymbolSpec::new("B").expression(Expr::mul(sym(a), Expr::num(2.0))))?;
    let e = table.declare(SymbolSpec::new("E").expression(Expr::add(sym(a), sym(b))))?;
    let c = table.declare(SymbolSpec::new("C").expression(Expr::mul(sym(a), Expr::num(3.0))))?;
    let mut documentation = Documentation::new("Stale");
    let builder = SectionBuilder::for_symbol("Stale", e).arguments([a]);
    assert!(documentation.build_section(&table, builder));

    table.set_expression(e, Expr::add(sym(c), sym(b)))?;
    let err = CodeGenerator::default()
        .generate(&table, &documentation)
        .unwrap_err();
    assert!(matches!(err, TheoError::InvalidSection(ref info)
        if info.code == "stale-section"
            && info.context.get("symbol").map(String::as_str) == Some("E")
            && info.context.get("section").map(String::as_str) == Some("Stale")));
    let err = DocumentationGenerator::new()
        .generate(&table, &documentation)
        .unwrap_err();
    assert_eq!(err.code(), "stale-section");

    let fresh = Section::from_symbol(&table, e, "Fresh", &[a])?;
    let rebuilt = Documentation::with_sections("Fresh", [fresh]);
    let code = CodeGenerator::default().generate(&table, &rebuilt)?;
    assert!(code.contains("    let C = A * 3.0;\n    let B = A * 2.0;\n    let E = C + B;\n"));
    Ok(())
}
