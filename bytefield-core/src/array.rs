//! Row-major index arithmetic for multi-dimensional array fields

use crate::error::LayoutError;
use alloc::vec::Vec;

/// Number of elements in an array of the given shape
pub fn element_count(shape: &[usize]) -> usize {
    shape.iter().product()
}

/// Map an n-dimensional index to its row-major linear position
///
/// The last dimension varies fastest: for shape `(2, 3)` the index `(1, 2)`
/// maps to `1 * 3 + 2 = 5`.
pub fn linear_index(shape: &[usize], index: &[usize]) -> Result<usize, LayoutError> {
    if shape.is_empty()
        || shape.len() != index.len()
        || index.iter().zip(shape).any(|(i, s)| i >= s)
    {
        return Err(LayoutError::IndexOutOfRange {
            index: index.to_vec(),
            shape: shape.to_vec(),
        });
    }

    let mut linear = 0usize;
    for (i, s) in index.iter().zip(shape) {
        linear = linear * s + i;
    }
    Ok(linear)
}

/// Inverse of [`linear_index`]
pub fn unravel_index(shape: &[usize], mut linear: usize) -> Result<Vec<usize>, LayoutError> {
    let count = element_count(shape);
    if shape.is_empty() || linear >= count {
        return Err(LayoutError::IndexOutOfRange {
            index: alloc::vec![linear],
            shape: shape.to_vec(),
        });
    }

    let mut index = alloc::vec![0usize; shape.len()];
    for (slot, s) in index.iter_mut().zip(shape).rev() {
        *slot = linear % s;
        linear /= s;
    }
    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn test_linear_index_2d() {
        assert_eq!(linear_index(&[2, 3], &[1, 2]).unwrap(), 5);
        assert_eq!(linear_index(&[2, 3], &[0, 0]).unwrap(), 0);
        assert_eq!(linear_index(&[2, 3], &[1, 0]).unwrap(), 3);
    }

    #[test]
    fn test_linear_index_3d() {
        // 1 * (3 * 4) + 2 * 4 + 3
        assert_eq!(linear_index(&[2, 3, 4], &[1, 2, 3]).unwrap(), 23);
    }

    #[test]
    fn test_linear_index_rejects_bad_index() {
        assert!(linear_index(&[2, 3], &[2, 0]).is_err());
        assert!(linear_index(&[2, 3], &[0]).is_err());
        assert!(linear_index(&[], &[]).is_err());
    }

    #[test]
    fn test_unravel_inverts_linear() {
        let shape = [3, 2, 5];
        for linear in 0..element_count(&shape) {
            let index = unravel_index(&shape, linear).unwrap();
            assert_eq!(linear_index(&shape, &index).unwrap(), linear);
        }
        assert_eq!(unravel_index(&[2, 3], 5).unwrap(), vec![1, 2]);
        assert!(unravel_index(&[2, 3], 6).is_err());
    }
}
