//! Density clustering for reduced embeddings.
//!
//! ## HDBSCAN
//!
//! Density-based clustering that discovers non-convex clusters of varying
//! density and labels points it cannot confidently assign as noise
//! ([`NOISE_LABEL`]). Besides hard labels, a fit reports everything the tuning
//! objective scores:
//!
//! - **probabilities**: how strongly each point belongs to its cluster
//! - **outlier scores** (GLOSH): how much of an outlier each point is
//! - **persistence**: per-cluster stability, normalized by cluster size
//! - **relative validity**: a DBCV-style index computed on the mutual
//!   reachability MST, usable without ground truth
//!
//! ## Usage
//!
//! ```rust
//! use clump_tune::cluster::{DensityClusterer, Hdbscan, NOISE_LABEL};
//!
//! let mut data: Vec<Vec<f32>> = (0..6).map(|i| vec![i as f32 * 0.1, 0.0]).collect();
//! data.extend((0..6).map(|i| vec![10.0 + i as f32 * 0.1, 10.0]));
//!
//! let result = Hdbscan::new(3).with_min_samples(2).fit(&data).unwrap();
//! assert_eq!(result.labels.len(), data.len());
//! assert_ne!(result.labels[0], NOISE_LABEL);
//! assert_ne!(result.labels[0], result.labels[11]);
//! ```

mod distance;
mod hdbscan;
mod result;
mod traits;
pub(crate) mod util;

pub use distance::DistanceMetric;
pub use hdbscan::{ClusterSelectionMethod, Hdbscan};
pub use result::{ClusteringResult, NOISE_LABEL};
pub use traits::DensityClusterer;
