//! Kohonen self-organizing map.
//!
//! An `n × n` grid of nodes, each holding a prototype in feature space,
//! trained by competitive learning: for every training vector the closest
//! node (the *best matching unit*, BMU) and all nodes within a grid radius
//! of it move toward the vector.
//!
//! # Schedule
//!
//! Both the learning rate and the neighborhood radius decay linearly to
//! zero over the run. For epoch `t` of `T`:
//!
//! ```text
//! η(t) = η₀ · (1 − t/T)
//! r(t) = (n/2) · (1 − t/T)
//! ```
//!
//! A node `u` is in the neighborhood when `grid_distance(u, bmu) ≤ r(t)`,
//! and moves as `w ← (1 − η)·w + η·v`.
//!
//! # Ordering
//!
//! Updates are applied immediately, so the BMU search for vector `i + 1`
//! already sees the prototypes moved for vector `i`. Training vectors are
//! visited in their original order every epoch, and this loop is never
//! parallelized: doing so would change the result, not just the speed.
//!
//! # Example
//!
//! ```rust
//! use protomap::{Kohonen, PrefetchModel};
//!
//! let clients = vec![
//!     vec![1.0, 1.0, 0.0, 0.0],
//!     vec![1.0, 1.0, 0.0, 0.0],
//!     vec![0.0, 0.0, 1.0, 1.0],
//! ];
//! let mut map = Kohonen::new(2, 20).with_seed(1).initialize(4, &clients, &clients).unwrap();
//! let report = map.train().unwrap();
//! assert_eq!(report.epochs, 20);
//!
//! let score = map.test().unwrap();
//! assert!(score.hitrate().is_some());
//! ```

use super::traits::PrefetchModel;
use crate::dataset::FeatureMatrix;
use crate::distance::GridDistance;
use crate::error::{Error, Result};
use crate::metrics::{
    validate_threshold, PrefetchEvaluator, PrefetchScore, TestAssignment,
    DEFAULT_PREFETCH_THRESHOLD,
};
use crate::store::PrototypeStore;
use ndarray::{Array2, ArrayView1};
use rand::prelude::*;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Default initial learning rate.
pub const DEFAULT_LEARNING_RATE: f64 = 0.8;

/// How node prototypes are drawn before training.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PrototypeInit {
    /// Independent uniform values in `[0, 1)`.
    #[default]
    Uniform,
    /// Independent fair coin flips, `0.0` or `1.0`.
    Binary,
}

/// Self-organizing map parameters.
#[derive(Debug, Clone)]
pub struct Kohonen {
    /// Grid side length.
    n: usize,
    /// Passes over the training set.
    epochs: usize,
    initial_learning_rate: f64,
    grid_distance: GridDistance,
    init: PrototypeInit,
    seed: Option<u64>,
    prefetch_threshold: f64,
    test_assignment: TestAssignment,
}

impl Kohonen {
    /// Create parameters for an `n × n` map trained for `epochs` passes.
    pub fn new(n: usize, epochs: usize) -> Self {
        Self {
            n,
            epochs,
            initial_learning_rate: DEFAULT_LEARNING_RATE,
            grid_distance: GridDistance::default(),
            init: PrototypeInit::default(),
            seed: None,
            prefetch_threshold: DEFAULT_PREFETCH_THRESHOLD,
            test_assignment: TestAssignment::default(),
        }
    }

    /// Set the learning rate at epoch 0. Must be in `(0, 1]`.
    pub fn with_initial_learning_rate(mut self, rate: f64) -> Self {
        self.initial_learning_rate = rate;
        self
    }

    /// Set the grid metric that defines neighborhoods.
    pub fn with_grid_distance(mut self, metric: GridDistance) -> Self {
        self.grid_distance = metric;
        self
    }

    /// Set the prototype initialization.
    pub fn with_init(mut self, init: PrototypeInit) -> Self {
        self.init = init;
        self
    }

    /// Set random seed for reproducibility.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Set the prefetch threshold used by `test`.
    pub fn with_prefetch_threshold(mut self, threshold: f64) -> Self {
        self.prefetch_threshold = threshold;
        self
    }

    /// Set how test clients are matched to nodes.
    pub fn with_test_assignment(mut self, assignment: TestAssignment) -> Self {
        self.test_assignment = assignment;
        self
    }

    /// Grid side length.
    pub fn side(&self) -> usize {
        self.n
    }

    /// Number of epochs.
    pub fn epochs(&self) -> usize {
        self.epochs
    }

    /// Fraction of the run remaining at epoch `t`; 0 from `t = epochs` on.
    fn remaining(&self, t: usize) -> f64 {
        if self.epochs == 0 {
            return 0.0;
        }
        1.0 - t.min(self.epochs) as f64 / self.epochs as f64
    }

    /// Learning rate at epoch `t`.
    pub fn learning_rate(&self, t: usize) -> f64 {
        self.initial_learning_rate * self.remaining(t)
    }

    /// Neighborhood radius, in grid units, at epoch `t`.
    pub fn radius(&self, t: usize) -> f64 {
        self.n as f64 / 2.0 * self.remaining(t)
    }

    /// Validate parameters and draw random prototypes of length `dim` for
    /// every node.
    pub fn initialize(
        self,
        dim: usize,
        train: &[Vec<f32>],
        test: &[Vec<f32>],
    ) -> Result<KohonenMap> {
        if self.n == 0 {
            return Err(Error::InvalidParameter {
                name: "n",
                message: "grid side must be positive",
            });
        }
        if self.epochs == 0 {
            return Err(Error::InvalidParameter {
                name: "epochs",
                message: "must be positive",
            });
        }
        if !(self.initial_learning_rate > 0.0 && self.initial_learning_rate <= 1.0) {
            return Err(Error::InvalidParameter {
                name: "initial_learning_rate",
                message: "must be in (0, 1]",
            });
        }
        validate_threshold(self.prefetch_threshold)?;
        let units = self.n.checked_mul(self.n).ok_or(Error::InvalidParameter {
            name: "n",
            message: "grid too large",
        })?;

        let train = FeatureMatrix::from_rows(train, dim)?;
        let test = FeatureMatrix::from_rows(test, dim)?;
        if train.is_empty() {
            return Err(Error::EmptyInput);
        }

        let mut rng: Box<dyn RngCore> = match self.seed {
            Some(s) => Box::new(StdRng::seed_from_u64(s)),
            None => Box::new(rand::rng()),
        };
        let initial = match self.init {
            PrototypeInit::Uniform => {
                Array2::from_shape_fn((units, dim), |_| rng.random::<f32>())
            }
            PrototypeInit::Binary => Array2::from_shape_fn((units, dim), |_| {
                if rng.random_bool(0.5) {
                    1.0
                } else {
                    0.0
                }
            }),
        };
        let nodes = PrototypeStore::grid(self.n, initial.clone())?;

        Ok(KohonenMap {
            params: self,
            train,
            test,
            initial,
            nodes,
            trained: false,
        })
    }
}

/// Summary of one [`KohonenMap::train`] run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KohonenReport {
    /// Epochs run.
    pub epochs: usize,
    /// Mean distance from each training vector to its BMU after training.
    pub quantization_error: f64,
}

/// A self-organizing map bound to its training and test sets.
#[derive(Debug, Clone)]
pub struct KohonenMap {
    params: Kohonen,
    train: FeatureMatrix,
    test: FeatureMatrix,
    /// Prototypes as drawn at initialization; every `train` starts here.
    initial: Array2<f32>,
    nodes: PrototypeStore,
    trained: bool,
}

impl KohonenMap {
    /// The map's parameters, including its schedule.
    pub fn params(&self) -> &Kohonen {
        &self.params
    }

    /// Prototype of the node at `(x, y)`.
    pub fn node(&self, x: usize, y: usize) -> Option<ArrayView1<'_, f32>> {
        self.nodes.unit_at(x, y).map(|u| self.nodes.prototype(u))
    }

    /// Grid coordinate of the node closest to `v`, with its distance.
    pub fn find_bmu(&self, v: ArrayView1<'_, f32>) -> Result<((usize, usize), f64)> {
        let (u, d) = self.nodes.nearest(v)?;
        Ok((self.nodes.coord(u), d))
    }

    /// Move every node within `radius` of `bmu` toward training vector `i`.
    fn adjust_neighbourhood(&mut self, bmu: usize, radius: f64, rate: f64, i: usize) {
        let center = self.nodes.coord(bmu);
        let v = self.train.row(i);
        for u in 0..self.nodes.len() {
            let d = self.params.grid_distance.between(self.nodes.coord(u), center);
            if d as f64 > radius {
                continue;
            }
            self.nodes.prototype_mut(u).zip_mut_with(&v, |w, &x| {
                *w = ((1.0 - rate) * f64::from(*w) + rate * f64::from(x)) as f32;
            });
        }
    }

    /// Record every training index under its BMU. Returns the mean BMU
    /// distance.
    fn populate_members(&mut self) -> Result<f64> {
        let nodes = &self.nodes;
        let train = &self.train;

        #[cfg(feature = "parallel")]
        let bmus: Vec<(usize, f64)> = (0..train.len())
            .into_par_iter()
            .map(|i| nodes.nearest(train.row(i)))
            .collect::<Result<_>>()?;

        #[cfg(not(feature = "parallel"))]
        let bmus: Vec<(usize, f64)> = (0..train.len())
            .map(|i| nodes.nearest(train.row(i)))
            .collect::<Result<_>>()?;

        self.nodes.clear_members();
        let mut total = 0.0;
        for (i, (u, d)) in bmus.into_iter().enumerate() {
            self.nodes.insert_member(u, i);
            total += d;
        }
        Ok(total / self.train.len() as f64)
    }
}

impl PrefetchModel for KohonenMap {
    type Report = KohonenReport;

    /// Run exactly `epochs` passes from the initial prototypes, then assign
    /// each training index to its BMU.
    fn train(&mut self) -> Result<KohonenReport> {
        self.trained = false;
        self.nodes = PrototypeStore::grid(self.params.n, self.initial.clone())?;

        for t in 0..self.params.epochs {
            let rate = self.params.learning_rate(t);
            let radius = self.params.radius(t);
            tracing::debug!(epoch = t, learning_rate = rate, radius, "som epoch");

            for i in 0..self.train.len() {
                let (bmu, _) = self.nodes.nearest(self.train.row(i))?;
                self.adjust_neighbourhood(bmu, radius, rate, i);
            }
        }

        let quantization_error = self.populate_members()?;
        tracing::info!(
            side = self.params.n,
            epochs = self.params.epochs,
            quantization_error,
            "som training complete"
        );

        self.trained = true;
        Ok(KohonenReport {
            epochs: self.params.epochs,
            quantization_error,
        })
    }

    fn test(&self) -> Result<PrefetchScore> {
        if !self.trained {
            return Err(Error::NotTrained);
        }
        PrefetchEvaluator::new(self.params.prefetch_threshold).evaluate(
            &self.nodes,
            &self.test,
            self.params.test_assignment,
            self.train.len(),
        )
    }

    fn set_prefetch_threshold(&mut self, threshold: f64) -> Result<()> {
        validate_threshold(threshold)?;
        self.params.prefetch_threshold = threshold;
        Ok(())
    }

    fn prefetch_threshold(&self) -> f64 {
        self.params.prefetch_threshold
    }

    fn store(&self) -> &PrototypeStore {
        &self.nodes
    }
}
