//! Prototype storage shared by both engines.
//!
//! A [`PrototypeStore`] holds one prototype vector per *unit* (a k-means
//! cluster or a SOM node) in a single `units × dim` array, plus each unit's
//! set of member indices into the training set. Units are addressed by a
//! flat index; a [`Topology::Grid`] store additionally maps indices to
//! `(x, y)` coordinates in row-major order.

use std::collections::BTreeSet;

use crate::dataset::FeatureMatrix;
use crate::distance::squared_euclidean;
use crate::error::{Error, Result};
use ndarray::{Array1, Array2, ArrayView1, ArrayViewMut1};

/// How units are arranged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topology {
    /// Independent clusters `0..k`.
    Flat,
    /// A `side × side` grid; unit `i` sits at `(i / side, i % side)`.
    Grid {
        /// Grid side length.
        side: usize,
    },
}

/// Prototypes and memberships, indexed by unit.
#[derive(Debug, Clone)]
pub struct PrototypeStore {
    topology: Topology,
    prototypes: Array2<f32>,
    members: Vec<BTreeSet<usize>>,
}

impl PrototypeStore {
    /// `k` flat clusters with zero-valued prototypes and no members.
    pub fn flat(k: usize, dim: usize) -> Self {
        Self {
            topology: Topology::Flat,
            prototypes: Array2::zeros((k, dim)),
            members: vec![BTreeSet::new(); k],
        }
    }

    /// A `side × side` grid whose prototypes are the rows of `prototypes`.
    pub fn grid(side: usize, prototypes: Array2<f32>) -> Result<Self> {
        let units = side * side;
        if prototypes.nrows() != units {
            return Err(Error::DimensionMismatch {
                expected: units,
                found: prototypes.nrows(),
            });
        }
        Ok(Self {
            topology: Topology::Grid { side },
            prototypes,
            members: vec![BTreeSet::new(); units],
        })
    }

    /// Number of units.
    pub fn len(&self) -> usize {
        self.prototypes.nrows()
    }

    /// Whether the store has no units.
    pub fn is_empty(&self) -> bool {
        self.prototypes.nrows() == 0
    }

    /// Prototype dimension.
    pub fn dim(&self) -> usize {
        self.prototypes.ncols()
    }

    /// Unit arrangement.
    pub fn topology(&self) -> Topology {
        self.topology
    }

    /// Prototype of unit `u`.
    pub fn prototype(&self, u: usize) -> ArrayView1<'_, f32> {
        self.prototypes.row(u)
    }

    /// All prototypes, one row per unit.
    pub fn prototypes(&self) -> &Array2<f32> {
        &self.prototypes
    }

    pub(crate) fn prototype_mut(&mut self, u: usize) -> ArrayViewMut1<'_, f32> {
        self.prototypes.row_mut(u)
    }

    /// Overwrite the prototype of unit `u`.
    pub fn set_prototype(&mut self, u: usize, values: ArrayView1<'_, f32>) -> Result<()> {
        if values.len() != self.dim() {
            return Err(Error::DimensionMismatch {
                expected: self.dim(),
                found: values.len(),
            });
        }
        self.prototypes.row_mut(u).assign(&values);
        Ok(())
    }

    /// Grid coordinate of unit `u`. Flat units report `(u, 0)`.
    pub fn coord(&self, u: usize) -> (usize, usize) {
        match self.topology {
            Topology::Flat => (u, 0),
            Topology::Grid { side } => (u / side, u % side),
        }
    }

    /// Unit at grid coordinate `(x, y)`, if it exists.
    pub fn unit_at(&self, x: usize, y: usize) -> Option<usize> {
        match self.topology {
            Topology::Flat => (y == 0 && x < self.len()).then_some(x),
            Topology::Grid { side } => (x < side && y < side).then_some(x * side + y),
        }
    }

    /// Member indices of unit `u`.
    pub fn members(&self, u: usize) -> &BTreeSet<usize> {
        &self.members[u]
    }

    pub(crate) fn insert_member(&mut self, u: usize, index: usize) {
        self.members[u].insert(index);
    }

    /// Detach and return unit `u`'s members, leaving it empty.
    pub(crate) fn take_members(&mut self, u: usize) -> BTreeSet<usize> {
        std::mem::take(&mut self.members[u])
    }

    /// Empty every membership set.
    pub fn clear_members(&mut self) {
        for set in &mut self.members {
            set.clear();
        }
    }

    /// Unit whose prototype is closest to `v`, with its Euclidean distance.
    ///
    /// Linear scan; on ties the lowest unit index wins.
    pub fn nearest(&self, v: ArrayView1<'_, f32>) -> Result<(usize, f64)> {
        if self.is_empty() {
            return Err(Error::EmptyInput);
        }
        let mut best = 0;
        let mut best_dist = f64::INFINITY;
        for (u, proto) in self.prototypes.rows().into_iter().enumerate() {
            let d = squared_euclidean(proto, v)?;
            if d < best_dist {
                best_dist = d;
                best = u;
            }
        }
        Ok((best, best_dist.sqrt()))
    }

    /// Coordinate-wise mean of unit `u`'s members, read from `data`.
    ///
    /// Fails with [`Error::EmptyCluster`] when `u` has no members; what to
    /// do about it is the caller's policy.
    pub fn mean_of_members(&self, u: usize, data: &FeatureMatrix) -> Result<Array1<f32>> {
        if data.dim() != self.dim() {
            return Err(Error::DimensionMismatch {
                expected: self.dim(),
                found: data.dim(),
            });
        }
        let members = &self.members[u];
        if members.is_empty() {
            return Err(Error::EmptyCluster { cluster: u });
        }

        let mut sum = Array1::<f64>::zeros(self.dim());
        for &i in members {
            if i >= data.len() {
                return Err(Error::Unassigned { index: i });
            }
            sum.zip_mut_with(&data.row(i), |s, &x| *s += f64::from(x));
        }
        let count = members.len() as f64;
        Ok(sum.mapv(|s| (s / count) as f32))
    }

    /// Reverse membership map: entry `i` is the unit owning index `i`.
    ///
    /// Built in one pass over the membership sets. Indices owned by no unit
    /// are `None`; if several units claim an index, the lowest unit wins.
    pub fn owners(&self, n_items: usize) -> Vec<Option<usize>> {
        let mut owners = vec![None; n_items];
        for (u, set) in self.members.iter().enumerate().rev() {
            for &i in set.range(..n_items) {
                owners[i] = Some(u);
            }
        }
        owners
    }

    fn label(&self, u: usize) -> String {
        match self.topology {
            Topology::Flat => format!("[{u}]"),
            Topology::Grid { .. } => {
                let (x, y) = self.coord(u);
                format!("[{x}][{y}]")
            }
        }
    }

    /// One line per unit listing its member indices.
    pub fn describe_members(&self) -> String {
        let mut out = String::new();
        for (u, set) in self.members.iter().enumerate() {
            let ids: Vec<String> = set.iter().map(usize::to_string).collect();
            out.push_str(&format!("members {}: [{}]\n", self.label(u), ids.join(",")));
        }
        out
    }

    /// One line per unit listing its prototype values.
    pub fn describe_prototypes(&self) -> String {
        let mut out = String::new();
        for (u, proto) in self.prototypes.rows().into_iter().enumerate() {
            let values: Vec<String> = proto.iter().map(|x| format!("{x:.3}")).collect();
            out.push_str(&format!("prototype {}: {}\n", self.label(u), values.join(" ")));
        }
        out
    }
}
