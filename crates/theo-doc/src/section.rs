//! Sections: dependency ordered computation units with optional proofs.
//!
//! A section is assembled from one target symbol or from a data object.
//! Assembly resolves the targets with the declared arguments frozen, rejects
//! unbound leaves, optionally validates an explicit statement order and
//! checks every statement's unit against its declared unit.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use theo_core::{ErrorInfo, ProofPolicy, TheoError, UnitPolicy};
use theo_expr::{render, Expr, SiUnitAlgebra, Style, SymbolId, UnitAlgebra};
use theo_graph::{DependencyResolver, Resolution, SymbolTable};
use theo_proof::{ProofEngine, ProofOutcome, ProofReport, TheoremResult};
use tracing::{debug, warn};

use crate::data_object::DataObject;

/// Relative scale difference below which two units are treated as identical.
const SCALE_TOLERANCE: f64 = 1e-12;

/// A boolean expression with a human readable label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelledExpr {
    /// Boolean expression over symbols.
    pub expr: Expr,
    /// Label used in summaries.
    pub label: String,
}

/// A theorem attached to a section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TheoremRecord {
    /// Optional premise of an implication theorem.
    pub hypothesis: Option<Expr>,
    /// Statement to prove.
    pub conclusion: Expr,
    /// Label used in summaries.
    pub label: String,
    /// Outcome of the last verification, if any.
    pub outcome: Option<ProofOutcome>,
}

/// A unit conversion applied to a statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitNote {
    /// Converted statement.
    pub symbol: SymbolId,
    /// Name of the converted statement.
    pub name: String,
    /// Unit inferred from the expression.
    pub expression_unit: String,
    /// Unit declared on the symbol.
    pub declared_unit: String,
    /// Factor turning an expression value into the declared unit. `None` marks
    /// a forced conversion between incompatible units.
    pub factor: Option<f64>,
}

impl UnitNote {
    /// Whether the conversion was forced across dimensions.
    pub fn is_forced(&self) -> bool {
        self.factor.is_none()
    }
}

/// A named, dependency ordered computation unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    name: String,
    description: String,
    statements: Vec<SymbolId>,
    arguments: Vec<SymbolId>,
    outputs: Vec<SymbolId>,
    constants: Vec<SymbolId>,
    conversions: Vec<UnitNote>,
    assumptions: Vec<LabelledExpr>,
    theorems: Vec<TheoremRecord>,
    citation: Option<String>,
    show_in_documentation: bool,
    data_object: Option<String>,
    proof: Option<ProofReport>,
}

fn invalid(code: &str, message: impl Into<String>) -> TheoError {
    TheoError::InvalidSection(ErrorInfo::new(code, message))
}

fn require_boolean(table: &SymbolTable, expr: &Expr, role: &str) -> Result<(), TheoError> {
    if expr.is_boolean() {
        return Ok(());
    }
    Err(TheoError::Expression(
        ErrorInfo::new("not-boolean", format!("{role} must be a boolean expression"))
            .with_context("expr", render(expr, table, Style::Plain)),
    ))
}

impl Section {
    /// Creates an empty section, typically used for assumptions and theorems only.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            statements: Vec::new(),
            arguments: Vec::new(),
            outputs: Vec::new(),
            constants: Vec::new(),
            conversions: Vec::new(),
            assumptions: Vec::new(),
            theorems: Vec::new(),
            citation: None,
            show_in_documentation: true,
            data_object: None,
            proof: None,
        }
    }

    /// Builds the section computing `target` from `arguments` with default settings.
    pub fn from_symbol(
        table: &SymbolTable,
        target: SymbolId,
        name: impl Into<String>,
        arguments: &[SymbolId],
    ) -> Result<Self, TheoError> {
        SectionBuilder::for_symbol(name, target)
            .arguments(arguments.iter().copied())
            .build(table)
    }

    /// Builds the section computing every attribute of `object` from `arguments`.
    pub fn from_data_object(
        table: &SymbolTable,
        object: &DataObject,
        name: impl Into<String>,
        arguments: &[SymbolId],
    ) -> Result<Self, TheoError> {
        SectionBuilder::for_data_object(name, object.clone())
            .arguments(arguments.iter().copied())
            .build(table)
    }

    /// Replaces the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Attaches citation text.
    pub fn with_citation(mut self, citation: impl Into<String>) -> Self {
        self.citation = Some(citation.into());
        self
    }

    /// Includes or hides the section in generated documentation.
    pub fn set_show_in_documentation(&mut self, show: bool) {
        self.show_in_documentation = show;
    }

    /// Section name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Section description.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Computed statements in resolved order.
    pub fn statements(&self) -> &[SymbolId] {
        &self.statements
    }

    /// Declared arguments in declaration order.
    pub fn arguments(&self) -> &[SymbolId] {
        &self.arguments
    }

    /// Symbols the section produces.
    pub fn outputs(&self) -> &[SymbolId] {
        &self.outputs
    }

    /// Valued leaves used by the statements and not declared as arguments.
    pub fn constants(&self) -> &[SymbolId] {
        &self.constants
    }

    /// Unit conversions applied to statements.
    pub fn conversions(&self) -> &[UnitNote] {
        &self.conversions
    }

    /// Conversion recorded for a statement, if any.
    pub fn conversion_for(&self, id: SymbolId) -> Option<&UnitNote> {
        self.conversions.iter().find(|note| note.symbol == id)
    }

    /// Assumptions in insertion order.
    pub fn assumptions(&self) -> &[LabelledExpr] {
        &self.assumptions
    }

    /// Theorems in insertion order.
    pub fn theorems(&self) -> &[TheoremRecord] {
        &self.theorems
    }

    /// Citation text.
    pub fn citation(&self) -> Option<&str> {
        self.citation.as_deref()
    }

    /// Whether the documentation generator renders the section.
    pub fn show_in_documentation(&self) -> bool {
        self.show_in_documentation
    }

    /// Name of the data object the section computes, if any.
    pub fn data_object(&self) -> Option<&str> {
        self.data_object.as_deref()
    }

    /// Report of the last verification.
    pub fn proof_report(&self) -> Option<&ProofReport> {
        self.proof.as_ref()
    }

    /// Adds an assumption shared by every theorem of the section.
    pub fn add_assumption(
        &mut self,
        table: &SymbolTable,
        expr: Expr,
        label: impl Into<String>,
    ) -> Result<(), TheoError> {
        require_boolean(table, &expr, "assumption")?;
        self.assumptions.push(LabelledExpr {
            expr,
            label: label.into(),
        });
        Ok(())
    }

    /// Adds a theorem that must follow from the assumptions.
    pub fn add_theorem(
        &mut self,
        table: &SymbolTable,
        conclusion: Expr,
        label: impl Into<String>,
    ) -> Result<(), TheoError> {
        require_boolean(table, &conclusion, "theorem")?;
        self.theorems.push(TheoremRecord {
            hypothesis: None,
            conclusion,
            label: label.into(),
            outcome: None,
        });
        Ok(())
    }

    /// Adds a theorem `hypothesis => conclusion`.
    pub fn add_implication_theorem(
        &mut self,
        table: &SymbolTable,
        hypothesis: Expr,
        conclusion: Expr,
        label: impl Into<String>,
    ) -> Result<(), TheoError> {
        require_boolean(table, &hypothesis, "hypothesis")?;
        require_boolean(table, &conclusion, "theorem")?;
        self.theorems.push(TheoremRecord {
            hypothesis: Some(hypothesis),
            conclusion,
            label: label.into(),
            outcome: None,
        });
        Ok(())
    }

    /// Verifies every theorem and the constraints of every computed symbol.
    ///
    /// Outcomes are stored on the theorem records and the report is kept on
    /// the section. Only an unavailable solver aborts the pass.
    pub fn verify_theorems(
        &mut self,
        table: &SymbolTable,
        policy: &ProofPolicy,
    ) -> Result<&ProofReport, TheoError> {
        let mut engine = ProofEngine::new(table, policy);
        let assumptions: Vec<Expr> = self
            .assumptions
            .iter()
            .map(|assumption| assumption.expr.clone())
            .collect();

        let mut results = Vec::with_capacity(self.theorems.len());
        for theorem in &mut self.theorems {
            let outcome = engine.verify_theorem(
                &assumptions,
                theorem.hypothesis.as_ref(),
                &theorem.conclusion,
            )?;
            let statement = engine.statement(theorem.hypothesis.as_ref(), &theorem.conclusion);
            results.push(TheoremResult::new(&theorem.label, statement, outcome.clone()));
            theorem.outcome = Some(outcome);
        }

        let mut constraints = Vec::new();
        let mut seen = HashSet::new();
        for id in self.statements.iter().chain(&self.outputs) {
            if seen.insert(*id) && !table.get(*id)?.constraints().is_empty() {
                constraints.extend(engine.verify_constraints(*id)?);
            }
        }

        let report = ProofReport::new(engine.solver_name(), results, constraints)?;
        debug!(
            section = %self.name,
            report = %report.report_hash,
            "verified section"
        );
        Ok(self.proof.insert(report))
    }

    /// Summary of the last verification.
    pub fn proof_summary(&self) -> Option<String> {
        self.proof.as_ref().map(ProofReport::summary)
    }

    /// Checks that the stored statement order still matches the table.
    ///
    /// Every statement must read only arguments, constants and earlier
    /// statements, and must still be defined by an expression or an external
    /// function. Expressions replaced after assembly fail with `stale-section`.
    pub fn ensure_current(&self, table: &SymbolTable) -> Result<(), TheoError> {
        let mut bound: HashSet<SymbolId> = self
            .arguments
            .iter()
            .chain(&self.constants)
            .copied()
            .collect();
        for id in &self.statements {
            let node = table.get(*id)?;
            let stale = match node.expression() {
                Some(expression) => expression
                    .free_symbols()
                    .into_iter()
                    .find(|dep| !bound.contains(dep))
                    .map(|dep| format!("reads `{}` before it is computed", table.name_of(dep))),
                None if node.is_external() => None,
                None => Some("no longer has an expression".to_string()),
            };
            if let Some(reason) = stale {
                return Err(invalid(
                    "stale-section",
                    format!("statement {reason}; rebuild the section"),
                )
                .with_context("symbol", node.name())
                .with_context("section", &self.name));
            }
            bound.insert(*id);
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
enum Target {
    Symbol(SymbolId),
    Object(DataObject),
}

/// Configures and assembles a [`Section`].
#[derive(Debug, Clone)]
pub struct SectionBuilder {
    name: String,
    target: Target,
    arguments: Vec<SymbolId>,
    statements: Option<Vec<SymbolId>>,
    description: Option<String>,
    citation: Option<String>,
    show_in_documentation: bool,
    units: UnitPolicy,
}

impl SectionBuilder {
    /// Starts a section computing a single symbol.
    pub fn for_symbol(name: impl Into<String>, target: SymbolId) -> Self {
        Self::with_target(name.into(), Target::Symbol(target))
    }

    /// Starts a section computing the attributes of a data object.
    pub fn for_data_object(name: impl Into<String>, object: DataObject) -> Self {
        Self::with_target(name.into(), Target::Object(object))
    }

    fn with_target(name: String, target: Target) -> Self {
        Self {
            name,
            target,
            arguments: Vec::new(),
            statements: None,
            description: None,
            citation: None,
            show_in_documentation: true,
            units: UnitPolicy::default(),
        }
    }

    /// Name of the section being built.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declares inputs. Arguments with an expression are frozen: the section
    /// takes their value instead of computing it.
    pub fn arguments(mut self, arguments: impl IntoIterator<Item = SymbolId>) -> Self {
        self.arguments.extend(arguments);
        self
    }

    /// Requests an explicit statement order, validated against the resolved one.
    pub fn statements(mut self, statements: impl IntoIterator<Item = SymbolId>) -> Self {
        self.statements = Some(statements.into_iter().collect());
        self
    }

    /// Overrides the description, which defaults to the target's.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Attaches citation text.
    pub fn citation(mut self, citation: impl Into<String>) -> Self {
        self.citation = Some(citation.into());
        self
    }

    /// Includes or hides the section in generated documentation.
    pub fn show_in_documentation(mut self, show: bool) -> Self {
        self.show_in_documentation = show;
        self
    }

    /// Replaces the unit checking policy.
    pub fn unit_policy(mut self, units: UnitPolicy) -> Self {
        self.units = units;
        self
    }

    /// Resolves, validates and assembles the section.
    pub fn build(self, table: &SymbolTable) -> Result<Section, TheoError> {
        let name = self.name;
        let mut arguments: Vec<SymbolId> = Vec::with_capacity(self.arguments.len());
        for id in self.arguments {
            table.get(id)?;
            if !arguments.contains(&id) {
                arguments.push(id);
            }
        }

        let (targets, data_object, description) = match &self.target {
            Target::Symbol(target) => {
                let node = table.get(*target)?;
                if arguments.contains(target) {
                    return Err(invalid(
                        "target-declared-as-argument",
                        "the section target cannot also be an argument",
                    )
                    .with_context("symbol", node.name())
                    .with_context("section", &name));
                }
                (vec![*target], None, node.description().to_string())
            }
            Target::Object(object) => {
                if object.attributes().is_empty() {
                    return Err(invalid("empty-data-object", "data object has no attributes")
                        .with_context("object", object.name())
                        .with_context("section", &name));
                }
                (
                    object.attributes().to_vec(),
                    Some(object.name().to_string()),
                    String::new(),
                )
            }
        };

        let resolution = DependencyResolver::new(table)
            .resolve_all(&targets, &arguments)
            .map_err(|err| err.with_context("section", &name))?;
        if !resolution.leaves.is_empty() {
            return Err(missing_arguments(table, &resolution, &name));
        }

        let statements = match self.statements {
            Some(explicit) => check_statement_order(table, &resolution, explicit, &name)?,
            None => resolution.order.clone(),
        };
        let conversions = check_units(table, &statements, &self.units, &name)?;

        debug!(
            section = %name,
            statements = statements.len(),
            arguments = arguments.len(),
            constants = resolution.constants.len(),
            conversions = conversions.len(),
            "assembled section"
        );
        Ok(Section {
            name,
            description: self.description.unwrap_or(description),
            statements,
            arguments,
            outputs: targets,
            constants: resolution.constants,
            conversions,
            assumptions: Vec::new(),
            theorems: Vec::new(),
            citation: self.citation,
            show_in_documentation: self.show_in_documentation,
            data_object,
            proof: None,
        })
    }
}

fn missing_arguments(table: &SymbolTable, resolution: &Resolution, section: &str) -> TheoError {
    let names: Vec<String> = resolution
        .leaves
        .iter()
        .map(|id| table.name_of(*id))
        .collect();
    let first = names.first().cloned().unwrap_or_default();
    TheoError::MissingArgument(
        ErrorInfo::new(
            "unbound-leaf",
            format!("symbol `{first}` is neither an argument nor defined"),
        )
        .with_context("symbol", &first)
        .with_context("missing", names.join(", "))
        .with_context("section", section)
        .with_hint("declare the symbol as a section argument or give it an expression"),
    )
}

fn check_statement_order(
    table: &SymbolTable,
    resolution: &Resolution,
    explicit: Vec<SymbolId>,
    section: &str,
) -> Result<Vec<SymbolId>, TheoError> {
    let mut placed: HashSet<SymbolId> = HashSet::with_capacity(explicit.len());
    for id in &explicit {
        let node = table.get(*id)?;
        if !resolution.computes(*id) {
            return Err(invalid(
                "unexpected-statement",
                "statement is not computed by the section",
            )
            .with_context("symbol", node.name())
            .with_context("section", section));
        }
        if !placed.insert(*id) {
            return Err(invalid("duplicate-statement", "statement is listed twice")
                .with_context("symbol", node.name())
                .with_context("section", section));
        }
        let Some(expression) = node.expression() else {
            continue;
        };
        if let Some(dependency) = expression
            .free_symbols()
            .into_iter()
            .find(|dep| resolution.computes(*dep) && !placed.contains(dep))
        {
            return Err(invalid(
                "statement-order",
                "statement is listed before a statement it depends on",
            )
            .with_context("symbol", node.name())
            .with_context("depends_on", table.name_of(dependency))
            .with_context("section", section));
        }
    }
    if let Some(omitted) = resolution.order.iter().find(|id| !placed.contains(id)) {
        return Err(invalid(
            "statement-order",
            "explicit statements omit a required statement",
        )
        .with_context("symbol", table.name_of(*omitted))
        .with_context("section", section));
    }
    Ok(explicit)
}

fn check_units(
    table: &SymbolTable,
    statements: &[SymbolId],
    policy: &UnitPolicy,
    section: &str,
) -> Result<Vec<UnitNote>, TheoError> {
    let mut notes = Vec::new();
    for id in statements {
        let node = table.get(*id)?;
        let (Some(expression), Some(declared)) = (node.expression(), node.unit()) else {
            continue;
        };
        let (expression_unit, err) = match SiUnitAlgebra.unit_of(expression, table) {
            Ok(None) => continue,
            Ok(Some(unit)) => match unit.conversion_factor(declared) {
                Ok(factor) => {
                    if (factor - 1.0).abs() > SCALE_TOLERANCE {
                        debug!(symbol = %node.name(), factor, "scaling statement");
                        notes.push(UnitNote {
                            symbol: *id,
                            name: node.name().to_string(),
                            expression_unit: unit.to_string(),
                            declared_unit: declared.to_string(),
                            factor: Some(factor),
                        });
                    }
                    continue;
                }
                Err(err) => (unit.to_string(), err),
            },
            Err(err) => ("inconsistent".to_string(), err),
        };
        if !matches!(err, TheoError::IncompatibleUnits(_)) {
            return Err(err.with_context("symbol", node.name()).with_context("section", section));
        }
        if node.forced_unit_conversion() || !policy.enforce {
            warn!(
                symbol = %node.name(),
                section = %section,
                from = %expression_unit,
                to = %declared,
                "forcing unit conversion"
            );
            notes.push(UnitNote {
                symbol: *id,
                name: node.name().to_string(),
                expression_unit,
                declared_unit: declared.to_string(),
                factor: None,
            });
        } else {
            return Err(err
                .with_context("symbol", node.name())
                .with_context("declared", declared)
                .with_context("section", section));
        }
    }
    Ok(notes)
}
