//! Dense feature matrices.
//!
//! Client access vectors arrive from a loader as rows of `f32`. They are
//! copied once into an `n × dim` [`Array2`] so that every row is guaranteed
//! to have the configured dimension before any engine touches it.

use crate::error::{Error, Result};
use ndarray::{Array2, ArrayView1};

/// An ordered, fixed-dimension set of feature vectors.
///
/// Row position is the client identity used as a membership key.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    data: Array2<f32>,
}

impl FeatureMatrix {
    /// Build a matrix from rows, rejecting any row whose length is not `dim`.
    ///
    /// An empty `rows` slice yields an empty matrix of width `dim`.
    pub fn from_rows(rows: &[Vec<f32>], dim: usize) -> Result<Self> {
        if dim == 0 {
            return Err(Error::InvalidParameter {
                name: "dim",
                message: "must be positive",
            });
        }

        let mut flat: Vec<f32> = Vec::with_capacity(rows.len() * dim);
        for row in rows {
            if row.len() != dim {
                return Err(Error::DimensionMismatch {
                    expected: dim,
                    found: row.len(),
                });
            }
            flat.extend_from_slice(row);
        }
        let data = Array2::from_shape_vec((rows.len(), dim), flat)
            .map_err(|e| Error::Other(e.to_string()))?;
        Ok(Self { data })
    }

    /// Number of vectors.
    pub fn len(&self) -> usize {
        self.data.nrows()
    }

    /// Whether the matrix holds no vectors.
    pub fn is_empty(&self) -> bool {
        self.data.nrows() == 0
    }

    /// Dimension of every vector.
    pub fn dim(&self) -> usize {
        self.data.ncols()
    }

    /// The `i`-th vector.
    ///
    /// # Panics
    ///
    /// Panics if `i >= self.len()`.
    pub fn row(&self, i: usize) -> ArrayView1<'_, f32> {
        self.data.row(i)
    }

    /// Iterate over vectors in order.
    pub fn rows(&self) -> impl Iterator<Item = ArrayView1<'_, f32>> + '_ {
        self.data.rows().into_iter()
    }

    /// The underlying `n × dim` array.
    pub fn as_array(&self) -> &Array2<f32> {
        &self.data
    }
}
