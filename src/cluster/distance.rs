//! Distance metrics available to the density clustering step.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Point-to-point distance used when building the mutual reachability graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    /// L2 distance.
    #[default]
    Euclidean,
    /// L1 distance.
    Manhattan,
    /// L-infinity distance.
    Chebyshev,
    /// `1 - cos(a, b)`; zero vectors are at distance 1 from everything.
    Cosine,
}

impl DistanceMetric {
    /// Name as it appears in logs and exported tables.
    pub fn as_str(self) -> &'static str {
        match self {
            DistanceMetric::Euclidean => "euclidean",
            DistanceMetric::Manhattan => "manhattan",
            DistanceMetric::Chebyshev => "chebyshev",
            DistanceMetric::Cosine => "cosine",
        }
    }

    /// Distance between two points of equal length.
    pub fn distance(self, a: &[f32], b: &[f32]) -> f64 {
        debug_assert_eq!(a.len(), b.len());
        let pairs = a.iter().zip(b.iter()).map(|(&x, &y)| (x as f64, y as f64));
        match self {
            DistanceMetric::Euclidean => pairs.map(|(x, y)| (x - y) * (x - y)).sum::<f64>().sqrt(),
            DistanceMetric::Manhattan => pairs.map(|(x, y)| (x - y).abs()).sum(),
            DistanceMetric::Chebyshev => pairs.map(|(x, y)| (x - y).abs()).fold(0.0, f64::max),
            DistanceMetric::Cosine => {
                let (mut dot, mut na, mut nb) = (0.0, 0.0, 0.0);
                for (x, y) in pairs {
                    dot += x * y;
                    na += x * x;
                    nb += y * y;
                }
                if na == 0.0 || nb == 0.0 {
                    1.0
                } else {
                    (1.0 - dot / (na.sqrt() * nb.sqrt())).max(0.0)
                }
            }
        }
    }
}

impl fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DistanceMetric {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "euclidean" | "l2" => Ok(DistanceMetric::Euclidean),
            "manhattan" | "l1" | "cityblock" => Ok(DistanceMetric::Manhattan),
            "chebyshev" | "linf" => Ok(DistanceMetric::Chebyshev),
            "cosine" => Ok(DistanceMetric::Cosine),
            other => Err(Error::invalid("metric", format!("unknown metric {other:?}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_distances() {
        let a = [0.0, 0.0];
        let b = [3.0, 4.0];
        assert!((DistanceMetric::Euclidean.distance(&a, &b) - 5.0).abs() < 1e-12);
        assert!((DistanceMetric::Manhattan.distance(&a, &b) - 7.0).abs() < 1e-12);
        assert!((DistanceMetric::Chebyshev.distance(&a, &b) - 4.0).abs() < 1e-12);
        assert_eq!(DistanceMetric::Cosine.distance(&a, &b), 1.0);
        assert!(DistanceMetric::Cosine.distance(&b, &b).abs() < 1e-12);
    }

    #[test]
    fn parse_round_trips_names() {
        for m in [
            DistanceMetric::Euclidean,
            DistanceMetric::Manhattan,
            DistanceMetric::Chebyshev,
            DistanceMetric::Cosine,
        ] {
            assert_eq!(m.as_str().parse::<DistanceMetric>().unwrap(), m);
        }
        assert_eq!("L1".parse::<DistanceMetric>().unwrap(), DistanceMetric::Manhattan);
        assert!("minkowski".parse::<DistanceMetric>().is_err());
    }
}
