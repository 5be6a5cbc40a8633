//! Move one element of a list to a new position

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderingError {
    #[error("Index {index} is out of bounds for a list of {len} items")]
    OutOfBounds { index: usize, len: usize },
}

/// Move the element at `from` so that it ends up at `to`
///
/// Elements between the two positions shift one slot toward the vacated
/// slot; everything outside that range keeps its place.
pub fn move_item<T>(items: &mut [T], from: usize, to: usize) -> Result<(), OrderingError> {
    let len = items.len();
    for index in [from, to] {
        if index >= len {
            return Err(OrderingError::OutOfBounds { index, len });
        }
    }

    if from < to {
        items[from..=to].rotate_left(1);
    } else if to < from {
        items[to..=from].rotate_right(1);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn abcd() -> Vec<char> {
        vec!['A', 'B', 'C', 'D']
    }

    #[test]
    fn test_move_forward() {
        let mut items = abcd();
        move_item(&mut items, 0, 2).unwrap();
        assert_eq!(items, ['B', 'C', 'A', 'D']);
    }

    #[test]
    fn test_move_backward() {
        let mut items = abcd();
        move_item(&mut items, 2, 0).unwrap();
        assert_eq!(items, ['C', 'A', 'B', 'D']);
    }

    #[test]
    fn test_move_to_ends() {
        let mut items = abcd();
        move_item(&mut items, 0, 3).unwrap();
        assert_eq!(items, ['B', 'C', 'D', 'A']);

        move_item(&mut items, 3, 0).unwrap();
        assert_eq!(items, abcd());
    }

    #[test]
    fn test_same_index_is_noop() {
        for i in 0..4 {
            let mut items = abcd();
            move_item(&mut items, i, i).unwrap();
            assert_eq!(items, abcd());
        }
    }

    #[test]
    fn test_out_of_bounds() {
        let mut items = abcd();
        assert_eq!(
            move_item(&mut items, 4, 0),
            Err(OrderingError::OutOfBounds { index: 4, len: 4 })
        );
        assert_eq!(
            move_item(&mut items, 1, 9),
            Err(OrderingError::OutOfBounds { index: 9, len: 4 })
        );
        assert_eq!(items, abcd());

        let mut empty: Vec<char> = Vec::new();
        assert!(move_item(&mut empty, 0, 0).is_err());
    }
}
