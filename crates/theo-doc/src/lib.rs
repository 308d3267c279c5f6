#![deny(missing_docs)]
#![doc = "Sections, documentation assembly and the Rust and Markdown emitters of theoris."]

pub mod codegen;
/// Named bundles of attribute symbols.
pub mod data_object;
pub mod documentation;
pub mod markdown;
pub mod section;
pub mod view;

pub use codegen::{function_name, rust_identifier, CodeGenerator};
pub use data_object::DataObject;
pub use documentation::{Documentation, SectionFailure};
pub use markdown::DocumentationGenerator;
pub use section::{LabelledExpr, Section, SectionBuilder, TheoremRecord, UnitNote};
pub use view::{SectionView, SymbolView};
