//! Data models
//!
//! Rust structs representing database entities.

mod columns;
mod formula;
mod saved_result;

pub use formula::{
    BaseIngredient, Formula, FormulaData, FormulaSort, FormulaSortKey, OtherIngredient,
    SortDirection,
};
pub use saved_result::{SavedResult, SavedResultWithFormula};
