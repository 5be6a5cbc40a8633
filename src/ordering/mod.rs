//! Ingredient list ordering
//!
//! Stable reordering of ordered rows and the pointer gesture that drives it.

mod drag;
mod list;

pub use drag::{DragGesture, Move, PointerId};
pub use list::{move_item, OrderingError};
