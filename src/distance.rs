//! Distances used by both engines.
//!
//! Feature-space distance is Euclidean. Unlike a zip-based sum, every
//! function here rejects vectors of differing length instead of silently
//! comparing the shorter prefix.
//!
//! The SOM additionally measures distance *on the grid* between two node
//! coordinates, see [`GridDistance`].

use crate::error::{Error, Result};
use ndarray::ArrayView1;

/// Squared Euclidean distance between two equal-length vectors.
///
/// Accumulates in `f64` so long sparse vectors do not lose precision.
pub fn squared_euclidean(a: ArrayView1<'_, f32>, b: ArrayView1<'_, f32>) -> Result<f64> {
    if a.len() != b.len() {
        return Err(Error::DimensionMismatch {
            expected: a.len(),
            found: b.len(),
        });
    }
    Ok(a
        .iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = f64::from(*x) - f64::from(*y);
            d * d
        })
        .sum())
}

/// Euclidean distance between two equal-length vectors.
///
/// # Example
///
/// ```rust
/// use ndarray::aview1;
/// use protomap::distance::euclidean;
///
/// let d = euclidean(aview1(&[0.0, 0.0]), aview1(&[3.0, 4.0])).unwrap();
/// assert!((d - 5.0).abs() < 1e-12);
///
/// assert!(euclidean(aview1(&[0.0]), aview1(&[0.0, 1.0])).is_err());
/// ```
pub fn euclidean(a: ArrayView1<'_, f32>, b: ArrayView1<'_, f32>) -> Result<f64> {
    squared_euclidean(a, b).map(f64::sqrt)
}

/// Distance between two coordinates on the SOM grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GridDistance {
    /// `|dx| + |dy|`: diamond-shaped neighborhoods.
    #[default]
    Manhattan,
    /// `max(|dx|, |dy|)`: square neighborhoods.
    Chebyshev,
}

impl GridDistance {
    /// Distance between grid coordinates `a` and `b`, given as `(x, y)`.
    #[inline]
    pub fn between(self, a: (usize, usize), b: (usize, usize)) -> usize {
        let dx = a.0.abs_diff(b.0);
        let dy = a.1.abs_diff(b.1);
        match self {
            GridDistance::Manhattan => dx + dy,
            GridDistance::Chebyshev => dx.max(dy),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::aview1;

    #[test]
    fn test_euclidean_known_value() {
        let d = euclidean(aview1(&[1.0, 2.0, 3.0]), aview1(&[4.0, 6.0, 3.0])).unwrap();
        assert!((d - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_euclidean_zero_on_identical() {
        let v = [0.25, 1.0, 0.0, 7.5];
        assert_eq!(euclidean(aview1(&v), aview1(&v)).unwrap(), 0.0);
    }

    #[test]
    fn test_euclidean_rejects_mismatched_lengths() {
        let err = euclidean(aview1(&[1.0, 2.0]), aview1(&[1.0, 2.0, 3.0])).unwrap_err();
        assert_eq!(
            err,
            Error::DimensionMismatch {
                expected: 2,
                found: 3
            }
        );
    }

    #[test]
    fn test_grid_distances() {
        assert_eq!(GridDistance::Manhattan.between((0, 0), (2, 3)), 5);
        assert_eq!(GridDistance::Chebyshev.between((0, 0), (2, 3)), 3);
        assert_eq!(GridDistance::Manhattan.between((4, 1), (1, 4)), 6);
        assert_eq!(GridDistance::Chebyshev.between((1, 1), (1, 1)), 0);
    }
}
