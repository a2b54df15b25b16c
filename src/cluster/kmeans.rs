//! K-means clustering over client access vectors.
//!
//! Partitions the training set into k clusters whose prototypes are the
//! coordinate-wise means of their members.
//!
//! # Algorithm
//!
//! 1. **Random partition**: every training index joins a uniformly random
//!    cluster.
//! 2. **Update**: each prototype becomes the mean of its members.
//! 3. **Assign**: stage current members as previous, then visit points in a
//!    fresh random order and move each to its nearest prototype.
//! 4. **Update** again, and count indices that joined a cluster they were
//!    not in before. Stop when that count is zero.
//!
//! Assignment reads one prototype snapshot for the whole pass, so the visit
//! order never changes the resulting partition.
//!
//! # Failure Modes
//!
//! - **Empty clusters**: a cluster can lose every member, leaving its mean
//!   undefined. See [`EmptyClusterPolicy`].
//! - **No convergence**: there is no useful bound on the number of passes,
//!   so training stops at `max_iter` and says so in [`KmeansReport`].

use std::collections::BTreeSet;

use super::traits::PrefetchModel;
use crate::dataset::FeatureMatrix;
use crate::error::{Error, Result};
use crate::metrics::{
    validate_threshold, PrefetchEvaluator, PrefetchScore, TestAssignment,
    DEFAULT_PREFETCH_THRESHOLD,
};
use crate::store::PrototypeStore;
use rand::prelude::*;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// What to do with a cluster that has no members at update time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmptyClusterPolicy {
    /// Replace the prototype with a training vector chosen uniformly among
    /// those no prototype matches exactly.
    ///
    /// A pass that reseeds never counts as converged. When every vector is
    /// already matched exactly the cluster stays empty.
    #[default]
    Reseed,
    /// Keep the prototype from before the pass (zeros if it never had
    /// members).
    RetainPrevious,
}

/// K-means parameters.
#[derive(Debug, Clone)]
pub struct Kmeans {
    /// Number of clusters.
    k: usize,
    /// Iteration cap.
    max_iter: usize,
    /// Random seed.
    seed: Option<u64>,
    prefetch_threshold: f64,
    empty_policy: EmptyClusterPolicy,
    test_assignment: TestAssignment,
}

impl Kmeans {
    /// Create K-means parameters for `k` clusters.
    pub fn new(k: usize) -> Self {
        Self {
            k,
            max_iter: 100,
            seed: None,
            prefetch_threshold: DEFAULT_PREFETCH_THRESHOLD,
            empty_policy: EmptyClusterPolicy::default(),
            test_assignment: TestAssignment::default(),
        }
    }

    /// Set the iteration cap.
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
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

    /// Set the empty-cluster policy.
    pub fn with_empty_cluster_policy(mut self, policy: EmptyClusterPolicy) -> Self {
        self.empty_policy = policy;
        self
    }

    /// Set how test clients are matched to clusters.
    pub fn with_test_assignment(mut self, assignment: TestAssignment) -> Self {
        self.test_assignment = assignment;
        self
    }

    /// Number of clusters.
    pub fn n_clusters(&self) -> usize {
        self.k
    }

    /// Validate parameters against the data and allocate `k` empty clusters
    /// with zero prototypes of length `dim`.
    pub fn initialize(
        self,
        dim: usize,
        train: &[Vec<f32>],
        test: &[Vec<f32>],
    ) -> Result<KmeansModel> {
        let train = FeatureMatrix::from_rows(train, dim)?;
        let test = FeatureMatrix::from_rows(test, dim)?;

        if train.is_empty() {
            return Err(Error::EmptyInput);
        }
        if self.k == 0 || self.k > train.len() {
            return Err(Error::InvalidClusterCount {
                requested: self.k,
                n_items: train.len(),
            });
        }
        if self.max_iter == 0 {
            return Err(Error::InvalidParameter {
                name: "max_iter",
                message: "must be positive",
            });
        }
        validate_threshold(self.prefetch_threshold)?;

        Ok(KmeansModel {
            clusters: PrototypeStore::flat(self.k, dim),
            previous: vec![BTreeSet::new(); self.k],
            params: self,
            train,
            test,
            trained: false,
        })
    }
}

/// How a training run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KmeansOutcome {
    /// A pass moved no index to a new cluster.
    Converged,
    /// `max_iter` passes ran without stabilizing.
    IterationCapReached,
}

/// Summary of one [`KmeansModel::train`] run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KmeansReport {
    /// How the run ended.
    pub outcome: KmeansOutcome,
    /// Assignment passes performed.
    pub iterations: usize,
    /// Membership changes in the final pass.
    pub last_changes: usize,
    /// Times an empty cluster was found at update time, summed over passes.
    pub empty_cluster_events: usize,
}

impl KmeansReport {
    /// Whether membership stabilized.
    pub fn converged(&self) -> bool {
        self.outcome == KmeansOutcome::Converged
    }

    /// Turn an unconverged run into [`Error::ConvergenceFailure`].
    pub fn ensure_converged(&self) -> Result<()> {
        match self.outcome {
            KmeansOutcome::Converged => Ok(()),
            KmeansOutcome::IterationCapReached => Err(Error::ConvergenceFailure {
                iterations: self.iterations,
            }),
        }
    }
}

/// A K-means model bound to its training and test sets.
#[derive(Debug, Clone)]
pub struct KmeansModel {
    params: Kmeans,
    train: FeatureMatrix,
    test: FeatureMatrix,
    clusters: PrototypeStore,
    /// Members of each cluster before the latest assignment pass.
    previous: Vec<BTreeSet<usize>>,
    trained: bool,
}

impl KmeansModel {
    /// Number of clusters.
    pub fn k(&self) -> usize {
        self.params.k
    }

    /// Members of cluster `c` before the latest assignment pass.
    pub fn previous_members(&self, c: usize) -> &BTreeSet<usize> {
        &self.previous[c]
    }

    /// The training set.
    pub fn train_set(&self) -> &FeatureMatrix {
        &self.train
    }

    /// The test set.
    pub fn test_set(&self) -> &FeatureMatrix {
        &self.test
    }

    fn random_partition(&mut self, rng: &mut impl Rng) {
        for i in 0..self.train.len() {
            let c = rng.random_range(0..self.params.k);
            self.clusters.insert_member(c, i);
        }
    }

    /// Move every cluster's current members to its previous set.
    fn stage(&mut self) {
        for c in 0..self.params.k {
            self.previous[c] = self.clusters.take_members(c);
        }
    }

    /// Assign each index, in `order`, to its nearest prototype.
    fn assign(&mut self, order: &[usize]) -> Result<()> {
        let clusters = &self.clusters;
        let train = &self.train;

        #[cfg(feature = "parallel")]
        let nearest: Vec<usize> = order
            .par_iter()
            .map(|&i| clusters.nearest(train.row(i)).map(|(c, _)| c))
            .collect::<Result<_>>()?;

        #[cfg(not(feature = "parallel"))]
        let nearest: Vec<usize> = order
            .iter()
            .map(|&i| clusters.nearest(train.row(i)).map(|(c, _)| c))
            .collect::<Result<_>>()?;

        for (&i, &c) in order.iter().zip(nearest.iter()) {
            self.clusters.insert_member(c, i);
        }
        Ok(())
    }

    /// Recompute every prototype as its members' mean. Returns the number of
    /// empty clusters encountered and how many of them were reseeded.
    fn update_prototypes(&mut self, rng: &mut impl Rng) -> Result<(usize, usize)> {
        let mut empty = Vec::new();
        for c in 0..self.params.k {
            match self.clusters.mean_of_members(c, &self.train) {
                Ok(mean) => self.clusters.set_prototype(c, mean.view())?,
                Err(Error::EmptyCluster { .. }) => empty.push(c),
                Err(e) => return Err(e),
            }
        }

        let mut reseeded = 0;
        for &c in &empty {
            match self.params.empty_policy {
                EmptyClusterPolicy::Reseed => {
                    let candidates = self.unmatched_points()?;
                    if candidates.is_empty() {
                        tracing::debug!(cluster = c, "every vector has an exact prototype");
                        continue;
                    }
                    let idx = candidates[rng.random_range(0..candidates.len())];
                    self.clusters.set_prototype(c, self.train.row(idx))?;
                    reseeded += 1;
                    tracing::warn!(cluster = c, seed_index = idx, "reseeded empty cluster");
                }
                EmptyClusterPolicy::RetainPrevious => {
                    tracing::warn!(cluster = c, "empty cluster kept its previous prototype");
                }
            }
        }
        Ok((empty.len(), reseeded))
    }

    /// Training indices not exactly matched by any current prototype.
    fn unmatched_points(&self) -> Result<Vec<usize>> {
        let mut out = Vec::new();
        for (i, v) in self.train.rows().enumerate() {
            let (_, d) = self.clusters.nearest(v)?;
            if d > 0.0 {
                out.push(i);
            }
        }
        Ok(out)
    }

    /// Indices present in a cluster now but absent from its previous set.
    fn membership_changes(&self) -> usize {
        (0..self.params.k)
            .map(|c| self.clusters.members(c).difference(&self.previous[c]).count())
            .sum()
    }
}

impl PrefetchModel for KmeansModel {
    type Report = KmeansReport;

    /// Run k-means from a fresh random partition until membership is stable
    /// or the iteration cap is reached.
    fn train(&mut self) -> Result<KmeansReport> {
        let n = self.train.len();
        let k = self.params.k;

        let mut rng: Box<dyn RngCore> = match self.params.seed {
            Some(s) => Box::new(StdRng::seed_from_u64(s)),
            None => Box::new(rand::rng()),
        };

        self.trained = false;
        self.clusters = PrototypeStore::flat(k, self.train.dim());
        for set in &mut self.previous {
            set.clear();
        }

        self.random_partition(&mut rng);
        let (mut empty_cluster_events, _) = self.update_prototypes(&mut rng)?;

        let mut order: Vec<usize> = (0..n).collect();
        let mut report = KmeansReport {
            outcome: KmeansOutcome::IterationCapReached,
            iterations: 0,
            last_changes: n,
            empty_cluster_events,
        };

        for iteration in 1..=self.params.max_iter {
            order.shuffle(&mut rng);
            self.stage();
            self.assign(&order)?;
            let (empty, reseeded) = self.update_prototypes(&mut rng)?;
            empty_cluster_events += empty;

            let changes = self.membership_changes();
            tracing::debug!(iteration, changes, empty, reseeded, "k-means pass");

            report.iterations = iteration;
            report.last_changes = changes;
            report.empty_cluster_events = empty_cluster_events;

            if changes == 0 && reseeded == 0 {
                report.outcome = KmeansOutcome::Converged;
                break;
            }
        }

        match report.outcome {
            KmeansOutcome::Converged => tracing::info!(
                k,
                iterations = report.iterations,
                empty_cluster_events,
                "k-means converged"
            ),
            KmeansOutcome::IterationCapReached => tracing::warn!(
                k,
                iterations = report.iterations,
                changes = report.last_changes,
                "k-means hit the iteration cap before membership stabilized"
            ),
        }

        self.trained = true;
        Ok(report)
    }

    fn test(&self) -> Result<PrefetchScore> {
        if !self.trained {
            return Err(Error::NotTrained);
        }
        PrefetchEvaluator::new(self.params.prefetch_threshold).evaluate(
            &self.clusters,
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
        &self.clusters
    }
}
