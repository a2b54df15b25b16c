//! # protomap
//!
//! Prototype clustering of client web-access vectors for prefetch prediction.
//!
//! Two engines, [`Kmeans`] and the [`Kohonen`] self-organizing map, learn
//! prototypes from a training set of access vectors. A prototype then
//! predicts which pages to prefetch for clients assigned to it, and
//! [`metrics`] scores those predictions as hit rate and accuracy.
//!
//! Data loading and drivers live outside the crate: the engines take rows
//! of `f32` and return scores.
//!
//! ```rust
//! use protomap::{Kohonen, PrefetchModel};
//!
//! let clients = vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![1.0, 0.0]];
//! let mut map = Kohonen::new(2, 10).with_seed(3).initialize(2, &clients, &clients).unwrap();
//! map.train().unwrap();
//! let score = map.test().unwrap();
//! assert_eq!(score.features, 6);
//! ```

#![forbid(unsafe_code)]

pub mod cluster;
pub mod dataset;
pub mod distance;
/// Error types used across `protomap`.
pub mod error;
pub mod metrics;
pub mod store;

pub use cluster::{
    EmptyClusterPolicy, Kmeans, KmeansModel, KmeansOutcome, KmeansReport, Kohonen, KohonenMap,
    KohonenReport, PrefetchModel, PrototypeInit,
};
pub use dataset::FeatureMatrix;
pub use distance::{euclidean, GridDistance};
pub use error::{Error, Result};
pub use metrics::{PrefetchEvaluator, PrefetchScore, TestAssignment};
pub use store::{PrototypeStore, Topology};
