//! Ratio/amount reconciliation
//!
//! Keeps every displayed amount of a formula consistent while one field at
//! a time is edited.

mod amount;
mod detail;

pub use amount::{CalcError, DetailChange, LiveAmount};
pub use detail::{DetailRow, DetailView, FormulaDetail};
