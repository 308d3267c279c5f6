//! Read-only views handed to the code and documentation generators.
//!
//! Views carry names, units and pre-rendered formulas so emitters never
//! reach back into the symbol table for presentation data.

use serde::{Deserialize, Serialize};
use theo_core::TheoError;
use theo_expr::{render, Expr, Style, SymbolId};
use theo_graph::SymbolTable;

use crate::section::{Section, UnitNote};

/// Presentation data of one symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolView {
    /// Identifier in the symbol table.
    pub id: SymbolId,
    /// Plain name.
    pub name: String,
    /// LaTeX spelling.
    pub latex: String,
    /// Description, possibly empty.
    pub description: String,
    /// Declared unit.
    pub unit: Option<String>,
    /// Current defining expression.
    pub expression: Option<Expr>,
    /// Expression in plain text.
    pub formula: Option<String>,
    /// Expression in LaTeX.
    pub formula_latex: Option<String>,
    /// Value of a constant.
    pub value: Option<f64>,
    /// Whether the value comes from an external function.
    pub external: bool,
}

impl SymbolView {
    /// Captures the current state of a symbol.
    pub fn new(table: &SymbolTable, id: SymbolId) -> Result<Self, TheoError> {
        let node = table.get(id)?;
        let expression = node.expression().cloned();
        Ok(Self {
            id,
            name: node.name().to_string(),
            latex: node.latex().to_string(),
            description: node.description().to_string(),
            unit: node.unit().map(ToString::to_string),
            formula: expression
                .as_ref()
                .map(|expr| render(expr, table, Style::Plain)),
            formula_latex: expression
                .as_ref()
                .map(|expr| render(expr, table, Style::Latex)),
            expression,
            value: node.value(),
            external: node.is_external(),
        })
    }
}

/// Presentation data of one section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionView {
    /// Section name.
    pub name: String,
    /// Section description.
    pub description: String,
    /// Citation text.
    pub citation: Option<String>,
    /// Computed statements in resolved order.
    pub statements: Vec<SymbolView>,
    /// Inputs in declaration order.
    pub arguments: Vec<SymbolView>,
    /// Valued leaves bound inside the section.
    pub constants: Vec<SymbolView>,
    /// Produced symbols.
    pub outputs: Vec<SymbolView>,
    /// Struct name when the section computes a data object.
    pub data_object: Option<String>,
    /// Unit conversions applied to statements.
    pub conversions: Vec<UnitNote>,
    /// Whether documentation includes the section.
    pub show_in_documentation: bool,
    /// Summary of the last proof pass.
    pub proof_summary: Option<String>,
}

fn views(table: &SymbolTable, ids: &[SymbolId]) -> Result<Vec<SymbolView>, TheoError> {
    ids.iter().map(|id| SymbolView::new(table, *id)).collect()
}

impl SectionView {
    /// Captures a section together with the symbols it references.
    ///
    /// Fails when the table changed in a way that breaks the statement order.
    pub fn new(table: &SymbolTable, section: &Section) -> Result<Self, TheoError> {
        section.ensure_current(table)?;
        Ok(Self {
            name: section.name().to_string(),
            description: section.description().to_string(),
            citation: section.citation().map(str::to_string),
            statements: views(table, section.statements())?,
            arguments: views(table, section.arguments())?,
            constants: views(table, section.constants())?,
            outputs: views(table, section.outputs())?,
            data_object: section.data_object().map(str::to_string),
            conversions: section.conversions().to_vec(),
            show_in_documentation: section.show_in_documentation(),
            proof_summary: section.proof_summary(),
        })
    }

    /// Whether the section produces any value.
    pub fn computes_anything(&self) -> bool {
        !self.outputs.is_empty()
    }

    /// Conversion recorded for a statement.
    pub fn conversion_for(&self, id: SymbolId) -> Option<&UnitNote> {
        self.conversions.iter().find(|note| note.symbol == id)
    }
}
