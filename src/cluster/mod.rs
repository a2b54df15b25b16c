//! Prototype-based clustering engines.
//!
//! Both engines summarize a population of client access vectors with a
//! small set of *prototypes*, and predict that a client will request every
//! feature its prototype rates above the prefetch threshold.
//!
//! ## Algorithms
//!
//! ### K-means
//!
//! Flat partitioning: assign each point to the nearest prototype, then
//! move every prototype to the mean of its points. Repeat until no point
//! changes cluster.
//!
//! **Objective**: Minimize within-cluster sum of squares:
//!
//! ```text
//! J = Σ_k Σ_{x ∈ C_k} ||x - μ_k||²
//! ```
//!
//! ### Kohonen self-organizing map
//!
//! Prototypes sit on an `n × n` grid. Each training vector pulls its best
//! matching node *and that node's grid neighbors* toward itself, so nearby
//! nodes end up with similar prototypes. Learning rate and neighborhood
//! radius shrink linearly to zero over a fixed number of epochs.
//!
//! | | K-means | SOM |
//! |---|---|---|
//! | Topology | flat, k units | grid, n² units |
//! | Update | batch mean after each pass | online, per vector |
//! | Stops | membership stable (or cap) | after `epochs` |
//!
//! ## Usage
//!
//! ```rust
//! use protomap::cluster::{Kmeans, PrefetchModel};
//!
//! let train = vec![
//!     vec![1.0, 1.0, 0.0],
//!     vec![1.0, 1.0, 0.0],
//!     vec![0.0, 0.0, 1.0],
//!     vec![0.0, 1.0, 1.0],
//! ];
//! let test = vec![vec![1.0, 0.0, 0.0], vec![0.0, 0.0, 1.0]];
//!
//! let mut model = Kmeans::new(2).with_seed(42).initialize(3, &train, &test).unwrap();
//! let report = model.train().unwrap();
//! assert!(report.converged());
//!
//! let score = model.test().unwrap();
//! println!("{score}");
//! ```

mod kmeans;
mod kohonen;
mod traits;

pub use kmeans::{EmptyClusterPolicy, Kmeans, KmeansModel, KmeansOutcome, KmeansReport};
pub use kohonen::{Kohonen, KohonenMap, KohonenReport, PrototypeInit, DEFAULT_LEARNING_RATE};
pub use traits::PrefetchModel;
