use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use theo_expr::{Expr, SymbolId};

/// Replacement of one symbol by an expression inside a function symbol template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolMapping {
    source: SymbolId,
    replacement: Expr,
}

impl SymbolMapping {
    /// Maps `source` onto another symbol.
    pub fn new(source: SymbolId, replacement: SymbolId) -> Self {
        Self::to_expr(source, Expr::symbol(replacement))
    }

    /// Maps `source` onto an arbitrary expression.
    pub fn to_expr(source: SymbolId, replacement: Expr) -> Self {
        Self {
            source,
            replacement,
        }
    }

    /// Symbol being replaced.
    pub fn source(&self) -> SymbolId {
        self.source
    }

    /// Expression inserted in its place.
    pub fn replacement(&self) -> &Expr {
        &self.replacement
    }
}

/// Collects mappings into a substitution table. Later mappings of the same source win.
pub fn substitution_table(mappings: &[SymbolMapping]) -> BTreeMap<SymbolId, Expr> {
    mappings
        .iter()
        .map(|mapping| (mapping.source, mapping.replacement.clone()))
        .collect()
}
