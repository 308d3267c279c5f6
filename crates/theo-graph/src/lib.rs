#![deny(missing_docs)]
#![doc = "Symbol table, function symbols and deterministic dependency resolution for theoris."]

mod mapping;
pub mod resolver;
mod symbol;
mod table;

pub use mapping::{substitution_table, SymbolMapping};
pub use resolver::{evaluate_resolution, DependencyResolver, Resolution};
pub use symbol::{fill_description, Constraint, SymbolNode, SymbolSpec, DESCRIPTION_PLACEHOLDER};
pub use table::SymbolTable;
