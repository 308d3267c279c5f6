use serde::{Deserialize, Serialize};
use theo_core::{ErrorInfo, TheoError};
use theo_expr::{render, solve, Expr, Style, SymbolId, SymbolNames, Unit, UnitEnv};
use tracing::{debug, warn};

use crate::mapping::{substitution_table, SymbolMapping};
use crate::symbol::{fill_description, Constraint, SymbolNode, SymbolSpec};

/// Arena owning every symbol of a calculation.
///
/// Expressions refer to symbols by [`SymbolId`]; identifiers are never reused.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SymbolTable {
    nodes: Vec<SymbolNode>,
}

fn symbol_error(code: &str, message: impl Into<String>) -> TheoError {
    TheoError::Symbol(ErrorInfo::new(code, message))
}

fn unresolvable(code: &str, message: impl Into<String>) -> TheoError {
    TheoError::SymbolUnresolvable(ErrorInfo::new(code, message))
}

impl SymbolTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of declared symbols.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether no symbol has been declared.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Identifiers in declaration order.
    pub fn ids(&self) -> impl Iterator<Item = SymbolId> + '_ {
        (0..self.nodes.len()).map(|idx| SymbolId::from_raw(idx as u32))
    }

    /// Declares a new symbol.
    pub fn declare(&mut self, spec: SymbolSpec) -> Result<SymbolId, TheoError> {
        let node = SymbolNode {
            name: spec.name,
            latex: spec.latex,
            description: spec.description.unwrap_or_default(),
            unit: spec.unit,
            value: spec.value,
            expression: spec.expression,
            forced_unit_conversion: spec.forced_unit_conversion,
            external: spec.external,
            constraints: Vec::new(),
        };
        self.insert(node)
    }

    fn insert(&mut self, node: SymbolNode) -> Result<SymbolId, TheoError> {
        if node.name.trim().is_empty() {
            return Err(symbol_error("empty-name", "symbol names must not be empty"));
        }
        if node.value.is_some() && node.expression.is_some() {
            return Err(
                symbol_error("value-and-expression", "a symbol is either a constant or defined")
                    .with_context("symbol", &node.name),
            );
        }
        if node.external && node.expression.is_some() {
            return Err(symbol_error(
                "external-with-expression",
                "external symbols are computed outside the symbol graph",
            )
            .with_context("symbol", &node.name));
        }
        if let Some(expression) = &node.expression {
            self.check_references(expression)?;
        }
        let id = SymbolId::from_raw(self.nodes.len() as u32);
        debug!(symbol = %node.name, id = id.as_raw(), "declared symbol");
        self.nodes.push(node);
        Ok(id)
    }

    /// Looks a symbol up by identifier.
    pub fn get(&self, id: SymbolId) -> Result<&SymbolNode, TheoError> {
        self.nodes.get(id.index()).ok_or_else(|| {
            symbol_error("unknown-symbol", "symbol does not exist").with_context("id", id.as_raw())
        })
    }

    fn get_mut(&mut self, id: SymbolId) -> Result<&mut SymbolNode, TheoError> {
        self.nodes.get_mut(id.index()).ok_or_else(|| {
            symbol_error("unknown-symbol", "symbol does not exist").with_context("id", id.as_raw())
        })
    }

    /// Finds a symbol by name. When names repeat, the most recent declaration wins.
    pub fn find(&self, name: &str) -> Option<SymbolId> {
        self.nodes
            .iter()
            .rposition(|node| node.name == name)
            .map(|idx| SymbolId::from_raw(idx as u32))
    }

    /// Name of a symbol, or a placeholder for unknown identifiers.
    pub fn name_of(&self, id: SymbolId) -> String {
        self.nodes
            .get(id.index())
            .map(|node| node.name.clone())
            .unwrap_or_else(|| format!("#{}", id.as_raw()))
    }

    fn check_references(&self, expr: &Expr) -> Result<(), TheoError> {
        for id in expr.free_symbols() {
            if id.index() >= self.nodes.len() {
                return Err(symbol_error(
                    "unknown-symbol",
                    "expression references an undeclared symbol",
                )
                .with_context("id", id.as_raw()));
            }
        }
        Ok(())
    }

    /// Replaces the defining expression of a symbol.
    ///
    /// Constants lose their value. Self references are accepted here and
    /// rejected by dependency resolution.
    pub fn set_expression(&mut self, id: SymbolId, expr: Expr) -> Result<(), TheoError> {
        self.check_references(&expr)?;
        let node = self.get_mut(id)?;
        if node.external {
            return Err(symbol_error(
                "external-with-expression",
                "external symbols are computed outside the symbol graph",
            )
            .with_context("symbol", &node.name));
        }
        node.value = None;
        node.expression = Some(expr);
        debug!(symbol = %node.name, "replaced expression");
        Ok(())
    }

    /// Removes the defining expression, turning the symbol back into a leaf.
    pub fn clear_expression(&mut self, id: SymbolId) -> Result<Option<Expr>, TheoError> {
        Ok(self.get_mut(id)?.expression.take())
    }

    /// Sets the value of a constant, clearing any expression.
    pub fn set_value(&mut self, id: SymbolId, value: f64) -> Result<(), TheoError> {
        let node = self.get_mut(id)?;
        node.expression = None;
        node.value = Some(value);
        Ok(())
    }

    /// Attaches a boolean constraint to a symbol.
    pub fn add_constraint(
        &mut self,
        id: SymbolId,
        expr: Expr,
        label: impl Into<String>,
    ) -> Result<(), TheoError> {
        if !expr.is_boolean() {
            return Err(TheoError::Expression(
                ErrorInfo::new("not-boolean", "constraints must be boolean expressions")
                    .with_context("expr", render(&expr, &*self, Style::Plain)),
            ));
        }
        self.check_references(&expr)?;
        let label = label.into();
        self.get_mut(id)?.constraints.push(Constraint { expr, label });
        Ok(())
    }

    /// Declares a symbol of the same kind as `source`.
    ///
    /// Unit, expression and forced conversion flag fall back to the source's,
    /// the description template is filled with the source description. Value
    /// and constraints are not carried over.
    pub fn inherit(&mut self, source: SymbolId, spec: SymbolSpec) -> Result<SymbolId, TheoError> {
        let src = self.get(source)?;
        let node = SymbolNode {
            name: spec.name,
            latex: spec.latex,
            description: fill_description(spec.description.as_deref(), &src.description),
            unit: spec.unit.or_else(|| src.unit.clone()),
            value: spec.value,
            expression: spec.expression.or_else(|| src.expression.clone()),
            forced_unit_conversion: spec.forced_unit_conversion || src.forced_unit_conversion,
            external: spec.external,
            constraints: Vec::new(),
        };
        self.insert(node)
    }

    /// Declares a symbol whose expression is the template's expression with every
    /// mapping applied simultaneously.
    pub fn function_symbol(
        &mut self,
        template: SymbolId,
        mappings: &[SymbolMapping],
        spec: SymbolSpec,
    ) -> Result<SymbolId, TheoError> {
        let src = self.get(template)?;
        let Some(expression) = &src.expression else {
            return Err(unresolvable(
                "template-without-expression",
                "function symbols need a template with an expression",
            )
            .with_context("template", &src.name));
        };
        for mapping in mappings {
            self.get(mapping.source())?;
            self.check_references(mapping.replacement())?;
        }
        let node = SymbolNode {
            name: spec.name,
            latex: spec.latex,
            description: fill_description(spec.description.as_deref(), &src.description),
            unit: spec.unit.or_else(|| src.unit.clone()),
            value: None,
            expression: Some(expression.substitute(&substitution_table(mappings))),
            forced_unit_conversion: spec.forced_unit_conversion || src.forced_unit_conversion,
            external: false,
            constraints: Vec::new(),
        };
        self.insert(node)
    }

    /// Solves `lhs = rhs` for `target` and installs the result as its expression.
    ///
    /// With several candidates the first one is used.
    pub fn solve_and_set(
        &mut self,
        target: SymbolId,
        lhs: &Expr,
        rhs: &Expr,
    ) -> Result<Expr, TheoError> {
        let name = self.get(target)?.name.clone();
        let candidates = solve(lhs, rhs, target);
        let Some(first) = candidates.first().cloned() else {
            return Err(unresolvable("no-solution", "equation could not be solved")
                .with_context("symbol", &name)
                .with_context(
                    "equation",
                    format!(
                        "{} = {}",
                        render(lhs, &*self, Style::Plain),
                        render(rhs, &*self, Style::Plain)
                    ),
                ));
        };
        if candidates.len() > 1 {
            warn!(
                symbol = %name,
                candidates = candidates.len(),
                "equation has several solutions, using the first"
            );
        }
        self.set_expression(target, first.clone())?;
        Ok(first)
    }

    /// Inverts the definition of `defined` for `target`.
    ///
    /// `defined = expr(target, ...)` is solved for `target`, which then gets
    /// the solution as its expression.
    pub fn solve_from_definition(
        &mut self,
        target: SymbolId,
        defined: SymbolId,
    ) -> Result<Expr, TheoError> {
        let node = self.get(defined)?;
        let Some(definition) = node.expression.clone() else {
            return Err(unresolvable("no-definition", "symbol has no expression to invert")
                .with_context("symbol", &node.name));
        };
        self.solve_and_set(target, &definition, &Expr::symbol(defined))
    }
}

impl SymbolNames for SymbolTable {
    fn symbol_name(&self, id: SymbolId) -> String {
        self.name_of(id)
    }

    fn symbol_latex(&self, id: SymbolId) -> String {
        self.nodes
            .get(id.index())
            .map(|node| node.latex().to_string())
            .unwrap_or_else(|| self.name_of(id))
    }
}

impl UnitEnv for SymbolTable {
    fn unit_of_symbol(&self, id: SymbolId) -> Option<Unit> {
        self.nodes.get(id.index()).and_then(|node| node.unit.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declare_rejects_value_with_expression() {
        let mut table = SymbolTable::new();
        let x = table.declare(SymbolSpec::new("x")).unwrap();
        let err = table
            .declare(SymbolSpec::new("y").value(1.0).expression(x))
            .unwrap_err();
        assert_eq!(err.code(), "value-and-expression");
    }

    #[test]
    fn find_prefers_latest_declaration() {
        let mut table = SymbolTable::new();
        table.declare(SymbolSpec::new("x")).unwrap();
        let second = table.declare(SymbolSpec::new("x")).unwrap();
        assert_eq!(table.find("x"), Some(second));
        assert_eq!(table.find("missing"), None);
    }

    #[test]
    fn expressions_must_reference_declared_symbols() {
        let mut table = SymbolTable::new();
        let x = table.declare(SymbolSpec::new("x")).unwrap();
        let err = table
            .set_expression(x, Expr::symbol(SymbolId::from_raw(7)))
            .unwrap_err();
        assert_eq!(err.code(), "unknown-symbol");
    }
}
