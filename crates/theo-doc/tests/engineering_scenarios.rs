use std::collections::BTreeMap;

use theo_core::{CodegenOptions, ProofPolicy, TheoError};
use theo_doc::{CodeGenerator, DataObject, Documentation, DocumentationGenerator, Section};
use theo_expr::{Expr, SymbolId, Unit};
use theo_graph::{evaluate_resolution, DependencyResolver, SymbolMapping, SymbolSpec, SymbolTable};
use theo_proof::{ConstraintStatus, ProofOutcome};

fn sym(id: SymbolId) -> Expr {
    Expr::symbol(id)
}

fn specific_heat_unit() -> Unit {
    Unit::joule().div(&Unit::kilogram().mul(&Unit::kelvin()))
}

#[test]
fn stagnation_temperature_is_solved_then_replaced() -> Result<(), TheoError> {
    let mut table = SymbolTable::new();
    let t = table.declare(
        SymbolSpec::new("T")
            .description("static fluid temperature")
            .unit(Unit::kelvin()),
    )?;
    let t0 = table.declare(
        SymbolSpec::new("T0")
            .description("stagnation temperature")
            .latex("T_0")
            .unit(Unit::kelvin()),
    )?;
    let u = table.declare(
        SymbolSpec::new("u")
            .description("flow velocity")
            .unit(Unit::meter().div(&Unit::second())),
    )?;
    let cp = table.declare(
        SymbolSpec::new("Cp")
            .external()
            .description("specific heat at constant pressure")
            .latex("C_p")
            .unit(specific_heat_unit()),
    )?;

    table.set_expression(
        t,
        Expr::sub(
            sym(t0),
            Expr::div(Expr::powf(sym(u), 2.0), Expr::mul(Expr::num(2.0), sym(cp))),
        ),
    )?;
    let solved = table.solve_from_definition(t0, t)?;
    assert!(!solved.contains_symbol(t0));

    let mut env = BTreeMap::new();
    env.insert(t, 300.0);
    env.insert(u, 100.0);
    env.insert(cp, 1000.0);
    assert!((solved.evaluate(&env)? - 305.0).abs() < 1e-9);

    let mut documentation = Documentation::new("Thermodynamics");
    let specific_heat = Section::from_symbol(&table, cp, "Specific Heat Constant Pressure", &[t0]);
    documentation.push_result("Specific Heat Constant Pressure", specific_heat);
    let static_temperature = Section::from_symbol(&table, t, "Static Temperature", &[t0, u, cp]);
    documentation.push_result("Static Temperature", static_temperature);
    let stagnation = Section::from_symbol(&table, t0, "Stagnation Temperature", &[t, u, cp]);
    documentation.push_result("Stagnation Temperature", stagnation);
    let circular = Section::from_symbol(&table, t0, "Circular", &[u, cp]);
    documentation.push_result("Circular", circular);

    assert_eq!(documentation.sections().len(), 3);
    assert_eq!(documentation.failures().len(), 1);
    assert!(matches!(
        documentation.failures()[0].error,
        TheoError::CycleDetected(_)
    ));
    let stagnation = documentation
        .section("Stagnation Temperature")
        .expect("stagnation section is assembled");
    assert_eq!(stagnation.statements(), &[t0]);

    let code = CodeGenerator::new(CodegenOptions::default()).generate(&table, &documentation)?;
    assert!(code.contains("pub fn specific_heat_constant_pressure(T0: f64) -> f64 {"));
    assert!(code.contains("    let Cp = external::Cp(T0);"));
    assert!(code.contains("pub fn static_temperature(T0: f64, u: f64, Cp: f64) -> f64 {"));
    assert!(code.contains("pub fn stagnation_temperature(T: f64, u: f64, Cp: f64) -> f64 {"));
    Ok(())
}

#[test]
fn inlet_data_object_reuses_the_mach_formula() -> Result<(), TheoError> {
    let mut table = SymbolTable::new();
    let u = table.declare(
        SymbolSpec::new("u")
            .description("flow velocity")
            .unit(Unit::meter().div(&Unit::second())),
    )?;
    let t = table.declare(
        SymbolSpec::new("T")
            .description("static fluid temperature")
            .unit(Unit::kelvin()),
    )?;
    let gamma = table.declare(
        SymbolSpec::new("gamma")
            .description("ratio of specific heats")
            .unit(Unit::dimensionless()),
    )?;
    let rs = table.declare(
        SymbolSpec::new("Rs")
            .value(287.05)
            .description("specific gas constant")
            .unit(specific_heat_unit()),
    )?;
    let mach = table.declare(
        SymbolSpec::new("M")
            .expression(Expr::div(
                sym(u),
                Expr::sqrt(Expr::product([sym(gamma), sym(rs), sym(t)])),
            ))
            .description("Mach number")
            .unit(Unit::dimensionless()),
    )?;
    let pressure_ratio = table.declare(
        SymbolSpec::new("PR")
            .description("pressure ratio")
            .unit(Unit::dimensionless()),
    )?;

    let u_i = table.inherit(u, SymbolSpec::new("u_i").description("engine inlet {description}"))?;
    let t1_i = table.inherit(
        t,
        SymbolSpec::new("T1_i")
            .description("engine inlet {description}")
            .latex("T_{1_i}"),
    )?;
    let gamma_i = table.inherit(
        gamma,
        SymbolSpec::new("gamma_i")
            .description("inlet {description}")
            .latex("\\gamma_i"),
    )?;
    let m_i = table.function_symbol(
        mach,
        &[
            SymbolMapping::new(u, u_i),
            SymbolMapping::new(gamma, gamma_i),
            SymbolMapping::new(t, t1_i),
        ],
        SymbolSpec::new("M_i").description("engine inlet {description}"),
    )?;
    assert_eq!(table.get(m_i)?.description(), "engine inlet Mach number");

    let supersonic_loss = Expr::sub(
        Expr::num(1.0),
        Expr::mul(
            Expr::num(0.075),
            Expr::powf(Expr::sub(sym(m_i), Expr::num(1.0)), 1.35),
        ),
    );
    let pr_i = table.inherit(
        pressure_ratio,
        SymbolSpec::new("PR_i")
            .expression(Expr::piecewise([
                (Expr::num(1.0), Expr::le(sym(m_i), Expr::num(1.0))),
                (supersonic_loss, Expr::gt(sym(m_i), Expr::num(1.0))),
            ]))
            .description("{description} between engine inlet and compressor"),
    )?;
    let eta_i = table.declare(
        SymbolSpec::new("eta_i")
            .expression(sym(pr_i))
            .description("efficiency between engine inlet and compressor")
            .latex("\\eta_i"),
    )?;

    let object = DataObject::new("InletThermodynamics", [gamma_i, m_i, eta_i, pr_i]);
    let arguments = [gamma_i, rs, u_i, t1_i];
    let section = Section::from_data_object(&table, &object, "Inlet Thermodynamics", &arguments)?;
    assert_eq!(section.statements(), &[m_i, pr_i, eta_i]);
    assert_eq!(section.outputs(), &[gamma_i, m_i, eta_i, pr_i]);
    assert!(section.constants().is_empty());

    let resolution = DependencyResolver::new(&table).resolve_all(section.outputs(), section.arguments())?;
    let mut inputs = BTreeMap::new();
    inputs.insert(gamma_i, 1.4);
    inputs.insert(rs, 287.05);
    inputs.insert(u_i, 500.0);
    inputs.insert(t1_i, 250.0);
    let values = evaluate_resolution(&table, &resolution, &inputs)?;
    assert!(values[&m_i] > 1.0);
    assert!(values[&pr_i] > 0.95 && values[&pr_i] < 0.98);
    assert_eq!(values[&eta_i], values[&pr_i]);

    let documentation = Documentation::with_sections("Inlet Thermodynamics", [section]);
    let code = CodeGenerator::default().generate(&table, &documentation)?;
    assert!(code.contains("pub struct InletThermodynamics {"));
    assert!(code.contains("    /// engine inlet Mach number [1]\n    pub M_i: f64,"));
    assert!(code.contains(
        "pub fn inlet_thermodynamics(gamma_i: f64, Rs: f64, u_i: f64, T1_i: f64) -> InletThermodynamics {"
    ));
    assert!(code.contains("    let PR_i = if M_i <= 1.0 { 1.0 } else if M_i > 1.0 {"));
    assert!(code.contains("    let eta_i = PR_i;\n"));
    assert!(code.contains(
        "    InletThermodynamics {\n        gamma_i,\n        M_i,\n        eta_i,\n        PR_i,\n    }\n}"
    ));

    let markdown = DocumentationGenerator::new().generate(&table, &documentation)?;
    assert!(markdown.contains("| $T_{1_i}$ | engine inlet static fluid temperature | K |"));
    Ok(())
}

#[test]
fn proof_section_reports_every_theorem() -> Result<(), TheoError> {
    let mut table = SymbolTable::new();
    let x = table.declare(SymbolSpec::new("x"))?;
    let y = table.declare(SymbolSpec::new("y"))?;
    let zero = || Expr::num(0.0);

    let mut section = Section::new("Basic Mathematical Properties")
        .with_description("Proofs of basic mathematical properties");
    section.add_assumption(&table, Expr::gt(sym(x), zero()), "x is positive")?;
    section.add_assumption(&table, Expr::gt(sym(y), zero()), "y is positive")?;
    section.add_theorem(
        &table,
        Expr::gt(Expr::add(sym(x), sym(y)), zero()),
        "Sum of positive numbers is positive",
    )?;
    section.add_theorem(
        &table,
        Expr::gt(Expr::mul(sym(x), sym(y)), zero()),
        "Product of positive numbers is positive",
    )?;
    section.add_theorem(&table, Expr::gt(sym(x), Expr::num(1.0)), "x exceeds one")?;
    section.add_implication_theorem(
        &table,
        Expr::gt(sym(x), sym(y)),
        Expr::gt(Expr::powf(sym(x), 2.0), Expr::powf(sym(y), 2.0)),
        "If x > y > 0, then x^2 > y^2",
    )?;

    let report = section.verify_theorems(&table, &ProofPolicy::default())?.clone();
    let statuses: Vec<&str> = report
        .theorems
        .iter()
        .map(|theorem| theorem.outcome.status())
        .collect();
    assert_eq!(statuses, vec!["proven", "proven", "disproven", "inconclusive"]);
    assert!(section
        .theorems()
        .iter()
        .all(|theorem| theorem.outcome.is_some()));

    let summary = section.proof_summary().expect("theorems were verified");
    assert!(summary.contains("Theorems: 2 proven, 1 disproven, 1 inconclusive, 0 failed"));
    assert!(summary.contains("- [proven] Sum of positive numbers is positive: x + y > 0"));
    assert!(summary.contains("- [inconclusive] If x > y > 0, then x^2 > y^2: x > y => x^2 > y^2"));

    let again = section.verify_theorems(&table, &ProofPolicy::default())?;
    assert_eq!(again.report_hash, report.report_hash);
    Ok(())
}

#[test]
fn ideal_gas_constraints_ride_along_with_section_proofs() -> Result<(), TheoError> {
    let mut table = SymbolTable::new();
    let r = table.declare(SymbolSpec::new("R").value(8.314))?;
    let t = table.declare(SymbolSpec::new("T").value(300.0))?;
    let v = table.declare(SymbolSpec::new("V").value(0.0224))?;
    let n = table.declare(SymbolSpec::new("n").value(1.0))?;
    let p = table.declare(
        SymbolSpec::new("P")
            .expression(Expr::div(Expr::product([sym(n), sym(r), sym(t)]), sym(v)))
            .unit(Unit::pascal()),
    )?;
    table.add_constraint(p, Expr::gt(sym(p), Expr::num(0.0)), "Pressure is always positive")?;

    let mut section = Section::from_symbol(&table, p, "Ideal Gas", &[])?;
    let mut constants = section.constants().to_vec();
    constants.sort();
    assert_eq!(constants, vec![r, t, v, n]);
    section.add_theorem(
        &table,
        Expr::gt(sym(p), Expr::num(1000.0)),
        "pressure exceeds a kilopascal",
    )?;
    section.add_theorem(
        &table,
        Expr::lt(sym(p), Expr::num(1000.0)),
        "pressure stays below a kilopascal",
    )?;

    let report = section.verify_theorems(&table, &ProofPolicy::default())?;
    assert_eq!(report.theorems[0].outcome, ProofOutcome::Proven);
    assert!(report.theorems[1].outcome.is_disproven());
    assert_eq!(report.constraints.len(), 1);
    assert_eq!(report.constraints[0].status, ConstraintStatus::Satisfiable);
    assert!(!report.all_verified());
    Ok(())
}
