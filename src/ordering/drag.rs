//! Pointer drag gesture over list rows
//!
//! Only the pointer that started a drag can move, drop or cancel it.

use serde::Serialize;

pub type PointerId = u32;

/// A committed reorder request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Move {
    pub from: usize,
    pub to: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ActiveDrag {
    pointer: PointerId,
    from: usize,
    hovered: Option<usize>,
}

/// Drag state for one list; idle until a row is pressed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DragGesture {
    active: Option<ActiveDrag>,
}

impl DragGesture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_dragging(&self) -> bool {
        self.active.is_some()
    }

    /// Row being dragged, if any
    pub fn dragged(&self) -> Option<usize> {
        self.active.map(|a| a.from)
    }

    /// Row currently under the dragging pointer
    pub fn hovered(&self) -> Option<usize> {
        self.active.and_then(|a| a.hovered)
    }

    /// Start dragging `index`; ignored while another drag is active
    pub fn press(&mut self, index: usize, pointer: PointerId) -> bool {
        if self.active.is_some() {
            return false;
        }
        self.active = Some(ActiveDrag {
            pointer,
            from: index,
            hovered: Some(index),
        });
        true
    }

    pub fn enter(&mut self, index: usize, pointer: PointerId) {
        if let Some(active) = self.active_for(pointer) {
            active.hovered = Some(index);
        }
    }

    pub fn leave(&mut self, index: usize, pointer: PointerId) {
        if let Some(active) = self.active_for(pointer) {
            if active.hovered == Some(index) {
                active.hovered = None;
            }
        }
    }

    /// End the drag; yields a move when dropped over a different row
    pub fn release(&mut self, pointer: PointerId) -> Option<Move> {
        let active = self.take_for(pointer)?;
        let to = active.hovered?;
        (to != active.from).then_some(Move {
            from: active.from,
            to,
        })
    }

    /// Abort the drag without moving anything
    pub fn cancel(&mut self, pointer: PointerId) -> bool {
        self.take_for(pointer).is_some()
    }

    fn active_for(&mut self, pointer: PointerId) -> Option<&mut ActiveDrag> {
        self.active.as_mut().filter(|a| a.pointer == pointer)
    }

    fn take_for(&mut self, pointer: PointerId) -> Option<ActiveDrag> {
        match self.active {
            Some(active) if active.pointer == pointer => self.active.take(),
            _ => None,
        }
    }
}
