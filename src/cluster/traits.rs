//! Prefetch model trait.

use crate::error::Result;
use crate::metrics::PrefetchScore;
use crate::store::PrototypeStore;

/// A clustering model with a train/test lifecycle.
///
/// `train` mutates the model's prototypes; `test` only reads them and
/// scores prefetch decisions on the held-out set.
pub trait PrefetchModel {
    /// What a training run reports (convergence, epochs, ...).
    type Report;

    /// Fit prototypes to the training set.
    fn train(&mut self) -> Result<Self::Report>;

    /// Score prefetch decisions on the test set.
    ///
    /// Fails with [`Error::NotTrained`](crate::Error::NotTrained) before the
    /// first successful [`train`](Self::train).
    fn test(&self) -> Result<PrefetchScore>;

    /// Set the threshold above which a prototype feature is prefetched.
    ///
    /// A NaN threshold is rejected and the previous value kept.
    fn set_prefetch_threshold(&mut self, threshold: f64) -> Result<()>;

    /// Current prefetch threshold.
    fn prefetch_threshold(&self) -> f64;

    /// Trained prototypes and memberships.
    fn store(&self) -> &PrototypeStore;
}
