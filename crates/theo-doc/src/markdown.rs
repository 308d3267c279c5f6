//! Markdown emitter.

use theo_core::TheoError;
use theo_graph::SymbolTable;
use tracing::debug;

use crate::documentation::Documentation;
use crate::view::{SectionView, SymbolView};

/// Renders a documentation as a Markdown page.
///
/// Each visible section gets a heading, its description and citation, tables
/// of arguments and constants, one display equation per statement in resolved
/// order and, when theorems were verified, the proof summary. Hidden sections
/// are left out; sections that failed to assemble are listed at the end.
#[derive(Debug, Clone, Copy, Default)]
pub struct DocumentationGenerator;

impl DocumentationGenerator {
    /// Creates a generator.
    pub fn new() -> Self {
        Self
    }

    /// Emits the Markdown page.
    pub fn generate(
        &self,
        table: &SymbolTable,
        documentation: &Documentation,
    ) -> Result<String, TheoError> {
        let mut out = format!("# {}\n", documentation.name());
        for view in documentation.views(table)? {
            if !view.show_in_documentation {
                debug!(section = %view.name, "section hidden from documentation");
                continue;
            }
            out.push('\n');
            section(&mut out, &view);
        }
        if !documentation.failures().is_empty() {
            out.push_str("\n## Unresolved sections\n\n");
            for failure in documentation.failures() {
                out.push_str(&format!("- {}: {}\n", failure.name, failure.error));
            }
        }
        Ok(out)
    }
}

fn cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}

fn symbol_table(out: &mut String, title: &str, symbols: &[SymbolView], with_value: bool) {
    if symbols.is_empty() {
        return;
    }
    out.push_str(&format!("**{title}**\n\n"));
    if with_value {
        out.push_str("| Symbol | Description | Value | Unit |\n| --- | --- | --- | --- |\n");
    } else {
        out.push_str("| Symbol | Description | Unit |\n| --- | --- | --- |\n");
    }
    for symbol in symbols {
        let unit = symbol.unit.as_deref().unwrap_or("");
        if with_value {
            let value = symbol.value.map(|value| value.to_string()).unwrap_or_default();
            out.push_str(&format!(
                "| ${}$ | {} | {} | {} |\n",
                cell(&symbol.latex),
                cell(&symbol.description),
                value,
                cell(unit)
            ));
        } else {
            out.push_str(&format!(
                "| ${}$ | {} | {} |\n",
                cell(&symbol.latex),
                cell(&symbol.description),
                cell(unit)
            ));
        }
    }
    out.push('\n');
}

fn section(out: &mut String, view: &SectionView) {
    out.push_str(&format!("## {}\n\n", view.name));
    if !view.description.is_empty() {
        out.push_str(&format!("{}\n\n", view.description));
    }
    if let Some(citation) = &view.citation {
        out.push_str(&format!("> {citation}\n\n"));
    }
    symbol_table(out, "Arguments", &view.arguments, false);
    symbol_table(out, "Constants", &view.constants, true);

    if !view.statements.is_empty() {
        out.push_str("**Statements**\n\n");
    }
    let inputs: Vec<&str> = view.arguments.iter().map(|arg| arg.latex.as_str()).collect();
    for statement in &view.statements {
        let rhs = match &statement.formula_latex {
            Some(formula) => formula.clone(),
            None => format!("f\\left({}\\right)", inputs.join(", ")),
        };
        out.push_str(&format!("$$\n{} = {}\n$$\n\n", statement.latex, rhs));
        let mut caption = statement.description.clone();
        if let Some(unit) = &statement.unit {
            if caption.is_empty() {
                caption = format!("[{unit}]");
            } else {
                caption = format!("{caption} [{unit}]");
            }
        }
        if statement.external {
            caption.push_str(if caption.is_empty() {
                "Provided by an external function."
            } else {
                ", provided by an external function."
            });
        }
        if let Some(note) = view.conversion_for(statement.id) {
            match note.factor {
                Some(factor) => {
                    caption.push_str(&format!(
                        " Converted from {} with factor {factor}.",
                        note.expression_unit
                    ));
                }
                None => {
                    caption.push_str(&format!(
                        " Forced conversion from {}.",
                        note.expression_unit
                    ));
                }
            }
        }
        let caption = caption.trim();
        if !caption.is_empty() {
            out.push_str(&format!("{caption}\n\n"));
        }
    }

    if let Some(summary) = &view.proof_summary {
        out.push_str(&format!("**Proofs**\n\n```text\n{summary}```\n\n"));
    }
}
