//! Prefetch evaluation.
//!
//! A trained model predicts, per client, which features (pages) to
//! prefetch: every dimension whose prototype value exceeds the prefetch
//! threshold. Comparing that prediction against the client's actual test
//! vector (nonzero = requested) yields three counts and two ratios.
//!
//! | Metric | Formula | Meaning |
//! |--------|---------|---------|
//! | hit rate | hits / requests | share of requests that were prefetched |
//! | accuracy | hits / prefetched | share of prefetches that were requested |
//!
//! Either ratio is *undefined* when its denominator is zero (for example a
//! test set of all-zero vectors). [`PrefetchScore`] reports that as `None`
//! rather than NaN or a panic.
//!
//! # Example
//!
//! ```rust
//! use ndarray::aview1;
//! use protomap::metrics::PrefetchEvaluator;
//!
//! let eval = PrefetchEvaluator::new(0.5);
//! let proto = [0.9f32, 0.8, 0.1];
//! let request = [1.0f32, 0.0, 1.0];
//! let score = eval.score([(aview1(&proto[..]), aview1(&request[..]))]).unwrap();
//!
//! assert_eq!(score.hits, 1);
//! assert_eq!(score.hitrate(), Some(0.5));
//! assert_eq!(score.accuracy(), Some(0.5));
//! ```

use std::fmt;

use crate::dataset::FeatureMatrix;
use crate::error::{Error, Result};
use crate::store::PrototypeStore;
use ndarray::ArrayView1;

/// Default prefetch threshold.
pub const DEFAULT_PREFETCH_THRESHOLD: f64 = 0.5;

/// Reject a prefetch threshold no feature value can be compared against.
pub(crate) fn validate_threshold(threshold: f64) -> Result<()> {
    if threshold.is_nan() {
        return Err(Error::InvalidParameter {
            name: "prefetch_threshold",
            message: "must not be NaN",
        });
    }
    Ok(())
}

/// How a test client is matched to a trained unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TestAssignment {
    /// Search the nearest prototype for the test vector itself.
    ///
    /// Correct whether or not test and training clients coincide.
    #[default]
    NearestPrototype,
    /// Use the unit that owned the same index during training.
    ///
    /// Only meaningful when test row `i` is the same client as training
    /// row `i`; rejected when the test set is larger than the training set.
    TrainingMembership,
}

/// Hit/request/prefetch counts from one evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PrefetchScore {
    /// Threshold the counts were taken at.
    pub threshold: f64,
    /// Features both requested and prefetched.
    pub hits: usize,
    /// Features requested (nonzero in the test vector).
    pub requests: usize,
    /// Features prefetched (prototype above threshold).
    pub prefetched: usize,
    /// Total features inspected (`test clients × dim`).
    pub features: usize,
}

impl PrefetchScore {
    fn empty(threshold: f64) -> Self {
        Self {
            threshold,
            hits: 0,
            requests: 0,
            prefetched: 0,
            features: 0,
        }
    }

    /// `hits / requests`, or `None` when nothing was requested.
    pub fn hitrate(&self) -> Option<f64> {
        ratio(self.hits, self.requests)
    }

    /// `hits / prefetched`, or `None` when nothing was prefetched.
    pub fn accuracy(&self) -> Option<f64> {
        ratio(self.hits, self.prefetched)
    }

    /// Like [`hitrate`](Self::hitrate), but an undefined value is an error.
    pub fn hitrate_checked(&self) -> Result<f64> {
        self.hitrate()
            .ok_or(Error::UndefinedMetric { metric: "hitrate" })
    }

    /// Like [`accuracy`](Self::accuracy), but an undefined value is an error.
    pub fn accuracy_checked(&self) -> Result<f64> {
        self.accuracy()
            .ok_or(Error::UndefinedMetric { metric: "accuracy" })
    }
}

fn ratio(num: usize, den: usize) -> Option<f64> {
    (den > 0).then(|| num as f64 / den as f64)
}

struct Metric(Option<f64>);

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(v) => write!(f, "{v:.4}"),
            None => write!(f, "undefined"),
        }
    }
}

impl fmt::Display for PrefetchScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hitrate = self.hitrate();
        let accuracy = self.accuracy();
        writeln!(f, "prefetch threshold: {}", self.threshold)?;
        writeln!(f, "hitrate: {}", Metric(hitrate))?;
        writeln!(f, "accuracy: {}", Metric(accuracy))?;
        let sum = hitrate.zip(accuracy).map(|(h, a)| h + a);
        write!(f, "hitrate+accuracy: {}", Metric(sum))
    }
}

/// Turns prototype/test-vector pairs into a [`PrefetchScore`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PrefetchEvaluator {
    threshold: f64,
}

impl Default for PrefetchEvaluator {
    fn default() -> Self {
        Self::new(DEFAULT_PREFETCH_THRESHOLD)
    }
}

impl PrefetchEvaluator {
    /// Evaluator prefetching every feature whose prototype value is strictly
    /// above `threshold`.
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    /// The prefetch threshold.
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Accumulate counts over `(prototype, test vector)` pairs.
    pub fn score<'a, I>(&self, pairs: I) -> Result<PrefetchScore>
    where
        I: IntoIterator<Item = (ArrayView1<'a, f32>, ArrayView1<'a, f32>)>,
    {
        let mut score = PrefetchScore::empty(self.threshold);
        for (proto, request) in pairs {
            if proto.len() != request.len() {
                return Err(Error::DimensionMismatch {
                    expected: proto.len(),
                    found: request.len(),
                });
            }
            for (&p, &r) in proto.iter().zip(request.iter()) {
                let prefetched = f64::from(p) > self.threshold;
                let requested = r != 0.0;
                score.requests += usize::from(requested);
                score.prefetched += usize::from(prefetched);
                score.hits += usize::from(requested && prefetched);
            }
            score.features += proto.len();
        }
        Ok(score)
    }

    /// Score a trained store against a test set.
    ///
    /// `train_len` is the size of the training set the store's memberships
    /// index into; it bounds [`TestAssignment::TrainingMembership`].
    pub fn evaluate(
        &self,
        store: &PrototypeStore,
        test: &FeatureMatrix,
        assignment: TestAssignment,
        train_len: usize,
    ) -> Result<PrefetchScore> {
        if test.dim() != store.dim() {
            return Err(Error::DimensionMismatch {
                expected: store.dim(),
                found: test.dim(),
            });
        }

        let units: Vec<usize> = match assignment {
            TestAssignment::NearestPrototype => test
                .rows()
                .map(|v| store.nearest(v).map(|(u, _)| u))
                .collect::<Result<_>>()?,
            TestAssignment::TrainingMembership => {
                if test.len() > train_len {
                    return Err(Error::InvalidParameter {
                        name: "test_assignment",
                        message: "test clients must be a prefix of training clients",
                    });
                }
                store
                    .owners(train_len)
                    .into_iter()
                    .take(test.len())
                    .enumerate()
                    .map(|(i, owner)| owner.ok_or(Error::Unassigned { index: i }))
                    .collect::<Result<_>>()?
            }
        };

        let score = self.score(
            units
                .iter()
                .enumerate()
                .map(|(i, &u)| (store.prototype(u), test.row(i))),
        )?;
        tracing::info!(
            threshold = self.threshold,
            hits = score.hits,
            requests = score.requests,
            prefetched = score.prefetched,
            "prefetch evaluation complete"
        );
        Ok(score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{aview1, Array2};

    #[test]
    fn test_counts_per_feature() {
        let eval = PrefetchEvaluator::default();
        let p1 = [0.9f32, 0.6, 0.2, 0.0];
        let r1 = [1.0f32, 0.0, 3.0, 0.0];
        let p2 = [0.1f32, 0.7, 0.7, 0.5];
        let r2 = [0.0f32, 1.0, 1.0, 1.0];

        let score = eval
            .score([
                (aview1(&p1[..]), aview1(&r1[..])),
                (aview1(&p2[..]), aview1(&r2[..])),
            ])
            .unwrap();

        // Prefetched: p1[0], p1[1], p2[1], p2[2] (0.5 is not above 0.5).
        assert_eq!(score.prefetched, 4);
        // Requested: r1[0], r1[2], r2[1], r2[2], r2[3].
        assert_eq!(score.requests, 5);
        assert_eq!(score.hits, 3);
        assert_eq!(score.features, 8);
        assert_eq!(score.hitrate(), Some(3.0 / 5.0));
        assert_eq!(score.accuracy(), Some(3.0 / 4.0));
    }

    #[test]
    fn test_all_zero_requests_is_undefined_hitrate() {
        let eval = PrefetchEvaluator::default();
        let proto = [0.9f32, 0.9];
        let zeros = [0.0f32, 0.0];
        let score = eval
            .score([(aview1(&proto[..]), aview1(&zeros[..]))])
            .unwrap();

        assert_eq!(score.requests, 0);
        assert_eq!(score.hitrate(), None);
        assert_eq!(score.accuracy(), Some(0.0));
        assert_eq!(
            score.hitrate_checked().unwrap_err(),
            Error::UndefinedMetric { metric: "hitrate" }
        );
        assert!(score.to_string().contains("hitrate: undefined"));
    }

    #[test]
    fn test_nothing_prefetched_is_undefined_accuracy() {
        let eval = PrefetchEvaluator::new(2.0);
        let proto = [0.9f32, 1.5];
        let req = [1.0f32, 1.0];
        let score = eval.score([(aview1(&proto[..]), aview1(&req[..]))]).unwrap();
        assert_eq!(score.hitrate(), Some(0.0));
        assert_eq!(score.accuracy(), None);
        assert!(score.accuracy_checked().is_err());
    }

    #[test]
    fn test_zero_threshold_prefetches_all_positive_features() {
        let eval = PrefetchEvaluator::new(0.0);
        let proto = [0.01f32, 0.2, 0.9, 0.3];
        let req = [1.0f32, 0.0, 1.0, 0.0];
        let score = eval.score([(aview1(&proto[..]), aview1(&req[..]))]).unwrap();
        assert_eq!(score.prefetched, score.features);
        assert_eq!(score.accuracy(), Some(score.hits as f64 / score.features as f64));
    }

    #[test]
    fn test_score_rejects_mismatched_pair() {
        let eval = PrefetchEvaluator::default();
        let proto = [0.9f32, 0.9];
        let req = [1.0f32];
        assert!(eval.score([(aview1(&proto[..]), aview1(&req[..]))]).is_err());
    }

    #[test]
    fn test_evaluate_nearest_vs_membership() {
        let mut store = PrototypeStore::flat(2, 2);
        store.set_prototype(0, aview1(&[1.0, 0.0])).unwrap();
        store.set_prototype(1, aview1(&[0.0, 1.0])).unwrap();
        // Training client 0 was (wrongly, for this test vector) owned by unit 1.
        store.insert_member(1, 0);

        let test = FeatureMatrix::from_rows(&[vec![1.0, 0.0]], 2).unwrap();
        let eval = PrefetchEvaluator::default();

        let nearest = eval
            .evaluate(&store, &test, TestAssignment::NearestPrototype, 1)
            .unwrap();
        assert_eq!(nearest.hitrate(), Some(1.0));

        let member = eval
            .evaluate(&store, &test, TestAssignment::TrainingMembership, 1)
            .unwrap();
        assert_eq!(member.hitrate(), Some(0.0));
    }

    #[test]
    fn test_training_membership_rejects_larger_test_set() {
        let store = PrototypeStore::flat(1, 2);
        let test = FeatureMatrix::from_rows(&[vec![1.0, 0.0], vec![0.0, 1.0]], 2).unwrap();
        let eval = PrefetchEvaluator::default();
        assert!(eval
            .evaluate(&store, &test, TestAssignment::TrainingMembership, 1)
            .is_err());
    }

    #[test]
    fn test_training_membership_reports_unassigned() {
        let store = PrototypeStore::grid(1, Array2::zeros((1, 2))).unwrap();
        let test = FeatureMatrix::from_rows(&[vec![1.0, 0.0]], 2).unwrap();
        let err = PrefetchEvaluator::default()
            .evaluate(&store, &test, TestAssignment::TrainingMembership, 3)
            .unwrap_err();
        assert_eq!(err, Error::Unassigned { index: 0 });
    }
}
