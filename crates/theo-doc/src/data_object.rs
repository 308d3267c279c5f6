use serde::{Deserialize, Serialize};
use theo_expr::SymbolId;

/// A named bundle of attribute symbols computed by one section.
///
/// The code generator turns it into a struct with one field per attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataObject {
    name: String,
    attributes: Vec<SymbolId>,
}

impl DataObject {
    /// Creates a data object. Repeated attributes are kept once.
    pub fn new(name: impl Into<String>, attributes: impl IntoIterator<Item = SymbolId>) -> Self {
        let mut unique: Vec<SymbolId> = Vec::new();
        for id in attributes {
            if !unique.contains(&id) {
                unique.push(id);
            }
        }
        Self {
            name: name.into(),
            attributes: unique,
        }
    }

    /// Struct name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Attributes in declaration order.
    pub fn attributes(&self) -> &[SymbolId] {
        &self.attributes
    }
}
