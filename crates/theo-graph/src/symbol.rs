use serde::{Deserialize, Serialize};
use theo_expr::{Expr, Unit};

/// Placeholder replaced by the source symbol's description when deriving symbols.
pub const DESCRIPTION_PLACEHOLDER: &str = "{description}";

/// A labelled boolean condition a symbol must satisfy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constraint {
    /// Boolean expression over symbols.
    pub expr: Expr,
    /// Human readable label used in reports.
    pub label: String,
}

/// A named physical quantity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolNode {
    pub(crate) name: String,
    pub(crate) latex: Option<String>,
    pub(crate) description: String,
    pub(crate) unit: Option<Unit>,
    pub(crate) value: Option<f64>,
    pub(crate) expression: Option<Expr>,
    pub(crate) forced_unit_conversion: bool,
    pub(crate) external: bool,
    pub(crate) constraints: Vec<Constraint>,
}

impl SymbolNode {
    /// Identifier used in generated code.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// LaTeX spelling, falling back to the name.
    pub fn latex(&self) -> &str {
        self.latex.as_deref().unwrap_or(&self.name)
    }

    /// Human readable description.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Declared unit, if any.
    pub fn unit(&self) -> Option<&Unit> {
        self.unit.as_ref()
    }

    /// Numeric value of a constant.
    pub fn value(&self) -> Option<f64> {
        self.value
    }

    /// Current defining expression.
    pub fn expression(&self) -> Option<&Expr> {
        self.expression.as_ref()
    }

    /// Whether unit mismatches are converted instead of rejected.
    pub fn forced_unit_conversion(&self) -> bool {
        self.forced_unit_conversion
    }

    /// Whether the value comes from a user supplied function of the section arguments.
    pub fn is_external(&self) -> bool {
        self.external
    }

    /// Constraints attached to the symbol.
    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// A leaf has no expression and is not computed externally.
    pub fn is_leaf(&self) -> bool {
        self.expression.is_none() && !self.external
    }
}

/// Builder describing a symbol to declare.
///
/// Unset fields of a spec passed to [`crate::SymbolTable::inherit`] or
/// [`crate::SymbolTable::function_symbol`] are taken from the source symbol.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SymbolSpec {
    pub(crate) name: String,
    pub(crate) latex: Option<String>,
    pub(crate) description: Option<String>,
    pub(crate) unit: Option<Unit>,
    pub(crate) value: Option<f64>,
    pub(crate) expression: Option<Expr>,
    pub(crate) forced_unit_conversion: bool,
    pub(crate) external: bool,
}

impl SymbolSpec {
    /// Starts a spec for a symbol with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Sets the LaTeX spelling.
    pub fn latex(mut self, latex: impl Into<String>) -> Self {
        self.latex = Some(latex.into());
        self
    }

    /// Sets the description; `{description}` is filled in when deriving.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the unit.
    pub fn unit(mut self, unit: Unit) -> Self {
        self.unit = Some(unit);
        self
    }

    /// Makes the symbol a constant.
    pub fn value(mut self, value: f64) -> Self {
        self.value = Some(value);
        self
    }

    /// Sets the defining expression.
    pub fn expression(mut self, expression: impl Into<Expr>) -> Self {
        self.expression = Some(expression.into());
        self
    }

    /// Allows unit conversion where units would otherwise be rejected.
    pub fn forced_unit_conversion(mut self) -> Self {
        self.forced_unit_conversion = true;
        self
    }

    /// Marks the symbol as computed by an external function.
    pub fn external(mut self) -> Self {
        self.external = true;
        self
    }
}

/// Fills the `{description}` placeholder of `template` with `source`.
pub fn fill_description(template: Option<&str>, source: &str) -> String {
    match template {
        Some(template) => template.replace(DESCRIPTION_PLACEHOLDER, source),
        None => source.to_string(),
    }
}
