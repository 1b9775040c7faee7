use thiserror::Error;

/// Errors returned by the reduction, clustering, scoring, and search layers of this crate.
#[derive(Debug, Error)]
pub enum Error {
    /// Input slice is empty.
    #[error("empty input")]
    EmptyInput,

    /// Invalid parameter value.
    #[error("invalid parameter {name}: {message}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Human-readable explanation.
        message: String,
    },

    /// Points in a dataset have inconsistent dimensionality.
    #[error("dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch {
        /// Expected dimensionality.
        expected: usize,
        /// Found dimensionality.
        found: usize,
    },

    /// The dataset is too small for the requested neighborhood or cluster size.
    #[error("too few points: have {n_points}, need more than {required}")]
    TooFewPoints {
        /// Number of points supplied.
        n_points: usize,
        /// Neighborhood size that has to fit inside the dataset.
        required: usize,
    },

    /// Two per-point sequences that must line up have different lengths.
    #[error("length mismatch: expected {expected}, found {found}")]
    LengthMismatch {
        /// Expected length.
        expected: usize,
        /// Found length.
        found: usize,
    },

    /// Reading or writing a file failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A file was readable but did not contain what we expected.
    #[error("invalid format: {0}")]
    InvalidFormat(String),

    /// The search space has no parameters to sample.
    #[error("empty search space")]
    EmptySpace,

    /// A sampled configuration lacks a parameter the pipeline needs.
    #[error("missing parameter: {0}")]
    MissingParameter(String),

    /// No trial was run, so there is no best configuration.
    #[error("no trials completed")]
    NoTrials,

    /// Two columns of a trial record share a name.
    #[error("column name collision: {0}")]
    SchemaCollision(String),

    /// Trainer configuration could not be resolved.
    #[error("configuration error: {0}")]
    Config(String),

    /// Building or writing an exported table failed.
    #[error(transparent)]
    Frame(#[from] polars::prelude::PolarsError),
}

impl Error {
    pub(crate) fn invalid(name: &'static str, message: impl Into<String>) -> Self {
        Error::InvalidParameter {
            name,
            message: message.into(),
        }
    }
}

/// Result type used by this crate.
pub type Result<T> = std::result::Result<T, Error>;
