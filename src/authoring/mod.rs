//! Formula authoring
//!
//! Turns "by ratio" and "by amount" drafts into formula data, and prefills
//! drafts for editing stored formulas.

mod draft;

pub use draft::{
    AmountDraft, AmountRow, AuthoringError, FormulaDraft, RatioDraft, RatioRow, UnitSelection,
};
