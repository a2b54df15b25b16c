use thiserror::Error;

/// Result alias for `protomap`.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by the clustering engines and the prefetch evaluator.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Training set was empty.
    #[error("empty input provided")]
    EmptyInput,

    /// Two vectors that must share a dimension do not.
    #[error("dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch {
        /// Expected dimension.
        expected: usize,
        /// Found dimension.
        found: usize,
    },

    /// Invalid number of clusters requested.
    #[error("cannot create {requested} clusters from {n_items} items")]
    InvalidClusterCount {
        /// Requested count.
        requested: usize,
        /// Number of training items.
        n_items: usize,
    },

    /// Invalid parameter value.
    #[error("invalid parameter '{name}': {message}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Error message.
        message: &'static str,
    },

    /// A cluster had no members when its mean was requested.
    #[error("cluster {cluster} has no members")]
    EmptyCluster {
        /// Index of the empty cluster.
        cluster: usize,
    },

    /// Clustering did not converge within iteration limit.
    #[error("did not converge after {iterations} iterations")]
    ConvergenceFailure {
        /// Number of iterations attempted.
        iterations: usize,
    },

    /// A ratio metric had a zero denominator.
    #[error("{metric} is undefined: zero denominator")]
    UndefinedMetric {
        /// Metric name (`hitrate` or `accuracy`).
        metric: &'static str,
    },

    /// `test()` was called before `train()`.
    #[error("model has not been trained")]
    NotTrained,

    /// No unit owns the given training index.
    #[error("index {index} is not a member of any unit")]
    Unassigned {
        /// The unowned index.
        index: usize,
    },

    /// Generic error with message.
    #[error("{0}")]
    Other(String),
}
