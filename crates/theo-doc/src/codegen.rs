//! Rust source emitter.
//!
//! Every section that produces a value becomes one `pub fn` taking its
//! arguments as `f64` parameters. Constants become `let` bindings, statements
//! follow in resolved order and external symbols call into a user supplied
//! module. Sections computing a data object return a generated struct.

use std::collections::{HashMap, HashSet};

use theo_core::{CodegenOptions, TheoError};
use theo_expr::{render, Style, SymbolId};
use theo_graph::SymbolTable;
use tracing::debug;

use crate::documentation::Documentation;
use crate::view::{SectionView, SymbolView};

const KEYWORDS: &[&str] = &[
    "as", "async", "await", "break", "const", "continue", "dyn", "else", "enum", "extern", "false",
    "fn", "for", "if", "impl", "in", "let", "loop", "match", "mod", "move", "mut", "pub", "ref",
    "return", "static", "struct", "trait", "true", "type", "unsafe", "use", "where", "while",
];

const RESERVED: &[&str] = &["self", "Self", "super", "crate"];

/// Turns a symbol name into a Rust identifier.
pub fn rust_identifier(name: &str) -> String {
    let mut ident: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if ident.is_empty() || ident.starts_with(|c: char| c.is_ascii_digit()) {
        ident.insert(0, '_');
    }
    if KEYWORDS.contains(&ident.as_str()) {
        format!("r#{ident}")
    } else if RESERVED.contains(&ident.as_str()) {
        format!("{ident}_")
    } else {
        ident
    }
}

/// Turns a section name such as `Energy Calculation` into `energy_calculation`.
pub fn function_name(section: &str) -> String {
    let mut out = String::new();
    let mut previous: Option<char> = None;
    for c in section.chars() {
        if c.is_ascii_alphanumeric() {
            let boundary = c.is_ascii_uppercase()
                && previous.map_or(false, |p| p.is_ascii_lowercase() || p.is_ascii_digit());
            if boundary && !out.ends_with('_') {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
        } else if !out.is_empty() && !out.ends_with('_') {
            out.push('_');
        }
        previous = Some(c);
    }
    while out.ends_with('_') {
        out.pop();
    }
    rust_identifier(&out)
}

/// Renders a documentation as a Rust module.
#[derive(Debug, Clone, Default)]
pub struct CodeGenerator {
    options: CodegenOptions,
}

/// Local identifiers of one generated function.
///
/// Symbols whose sanitised names collide get a numeric suffix, in the order
/// they are bound: arguments, then constants, then statements.
#[derive(Debug, Default)]
struct Identifiers {
    by_id: HashMap<SymbolId, String>,
    taken: HashSet<String>,
}

impl Identifiers {
    fn for_section(view: &SectionView) -> Self {
        let mut idents = Self::default();
        for symbol in view
            .arguments
            .iter()
            .chain(&view.constants)
            .chain(&view.statements)
            .chain(&view.outputs)
        {
            idents.bind(symbol.id, &symbol.name);
        }
        idents
    }

    fn bind(&mut self, id: SymbolId, name: &str) {
        if self.by_id.contains_key(&id) {
            return;
        }
        let base = rust_identifier(name);
        let mut ident = base.clone();
        let mut suffix = 1;
        while self.taken.contains(&ident) {
            suffix += 1;
            ident = format!("{base}_{suffix}");
        }
        self.taken.insert(ident.clone());
        self.by_id.insert(id, ident);
    }

    fn get<'a>(&'a self, symbol: &'a SymbolView) -> &'a str {
        self.by_id.get(&symbol.id).map_or(symbol.name.as_str(), String::as_str)
    }
}

impl CodeGenerator {
    /// Creates a generator with the given options.
    pub fn new(options: CodegenOptions) -> Self {
        Self { options }
    }

    /// Emits the module source.
    ///
    /// Sections without outputs, such as proof-only sections, are skipped.
    pub fn generate(
        &self,
        table: &SymbolTable,
        documentation: &Documentation,
    ) -> Result<String, TheoError> {
        let views = documentation.views(table)?;

        let mut out = String::new();
        if self.options.module_doc {
            out.push_str(&format!(
                "//! {}\n//!\n//! Generated by theoris.\n",
                documentation.name()
            ));
        }
        out.push_str("#![allow(non_snake_case, unused_variables)]\n");

        let mut used: HashMap<String, usize> = HashMap::new();
        for view in &views {
            if !view.computes_anything() {
                debug!(section = %view.name, "skipping section without outputs");
                continue;
            }
            let base = function_name(&view.name);
            let count = used.entry(base.clone()).or_insert(0);
            *count += 1;
            let fn_name = if *count == 1 {
                base
            } else {
                format!("{base}_{count}")
            };
            out.push('\n');
            self.section(&mut out, table, view, &fn_name);
        }
        debug!(
            documentation = %documentation.name(),
            bytes = out.len(),
            "generated code"
        );
        Ok(out)
    }

    fn section(&self, out: &mut String, table: &SymbolTable, view: &SectionView, fn_name: &str) {
        let idents = Identifiers::for_section(view);
        let names = |id: SymbolId| match idents.by_id.get(&id) {
            Some(ident) => ident.clone(),
            None => rust_identifier(&table.name_of(id)),
        };

        let struct_name = view.data_object.as_deref().map(rust_identifier);
        if let Some(struct_name) = &struct_name {
            self.data_struct(out, view, struct_name, &idents);
            out.push('\n');
        }

        out.push_str(&format!("/// {}\n", view.name));
        if !view.description.is_empty() {
            out.push_str(&format!("///\n/// {}\n", view.description));
        }
        let params: Vec<String> = view
            .arguments
            .iter()
            .map(|arg| format!("{}: f64", idents.get(arg)))
            .collect();
        let returns = struct_name.clone().unwrap_or_else(|| "f64".to_string());
        out.push_str(&format!(
            "pub fn {fn_name}({params}) -> {returns} {{\n",
            params = params.join(", ")
        ));

        for constant in &view.constants {
            out.push_str(&format!(
                "    let {ident} = {value:?};{comment}\n",
                ident = idents.get(constant),
                value = constant.value.unwrap_or(f64::NAN),
                comment = unit_comment(constant)
            ));
        }

        let call_args: Vec<&str> = view.arguments.iter().map(|arg| idents.get(arg)).collect();
        for statement in &view.statements {
            let body = match &statement.expression {
                Some(expr) => render(expr, &names, Style::Rust),
                None => format!(
                    "{}::{}({})",
                    self.options.external_module,
                    rust_identifier(&statement.name),
                    call_args.join(", ")
                ),
            };
            let body = match view.conversion_for(statement.id) {
                Some(note) => match note.factor {
                    Some(factor) => format!("({body}) * {factor:?}"),
                    None => {
                        out.push_str(&format!(
                            "    // forced conversion from {} to {}\n",
                            note.expression_unit, note.declared_unit
                        ));
                        body
                    }
                },
                None => body,
            };
            out.push_str(&format!(
                "    let {ident} = {body};{comment}\n",
                ident = idents.get(statement),
                comment = unit_comment(statement)
            ));
        }

        match &struct_name {
            Some(struct_name) => {
                out.push_str(&format!("    {struct_name} {{\n"));
                for output in &view.outputs {
                    out.push_str(&format!("        {},\n", idents.get(output)));
                }
                out.push_str("    }\n");
            }
            None => {
                if let Some(output) = view.outputs.first() {
                    out.push_str(&format!("    {}\n", idents.get(output)));
                }
            }
        }
        out.push_str("}\n");
    }

    fn data_struct(
        &self,
        out: &mut String,
        view: &SectionView,
        struct_name: &str,
        idents: &Identifiers,
    ) {
        out.push_str(&format!("/// Outputs of {}.\n", view.name));
        out.push_str("#[derive(Debug, Clone, Copy, PartialEq)]\n");
        out.push_str(&format!("pub struct {struct_name} {{\n"));
        for output in &view.outputs {
            let doc = match (&output.description, &output.unit) {
                (description, Some(unit)) if !description.is_empty() => {
                    format!("{description} [{unit}]")
                }
                (description, None) if !description.is_empty() => description.clone(),
                (_, Some(unit)) => format!("[{unit}]"),
                (_, None) => String::new(),
            };
            if !doc.is_empty() {
                out.push_str(&format!("    /// {doc}\n"));
            }
            out.push_str(&format!("    pub {}: f64,\n", idents.get(output)));
        }
        out.push_str("}\n");
    }
}

fn unit_comment(symbol: &SymbolView) -> String {
    match &symbol.unit {
        Some(unit) => format!(" // {unit}"),
        None => String::new(),
    }
}
