#![deny(missing_docs)]
#![doc = "Expression trees over symbols with substitution, simplification, equation solving, evaluation, rendering and unit algebra."]

/// Rendering in plain, LaTeX and Rust styles.
pub mod display;
/// Numeric evaluation.
pub mod eval;
/// Expression tree and constructors.
pub mod expr;
pub mod simplify;
pub mod solve;
pub mod units;

pub use display::{render, Style, SymbolNames};
pub use eval::Environment;
pub use expr::{Expr, Func, Literal, Relation, SymbolId};
pub use simplify::simplify;
pub use solve::solve;
pub use units::{Dimension, SiUnitAlgebra, Unit, UnitAlgebra, UnitEnv};
