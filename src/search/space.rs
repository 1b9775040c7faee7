//! Parameter values, domains, and the search space they form.

use std::collections::BTreeMap;
use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// One sampled configuration: parameter name -> value.
pub type ParameterConfig = BTreeMap<String, ParameterValue>;

/// Parameter value (sampled from a domain).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl ParameterValue {
    /// Get as float (converts int to float if needed)
    pub fn as_float(&self) -> Option<f64> {
        match self {
            ParameterValue::Float(v) => Some(*v),
            ParameterValue::Int(v) => Some(*v as f64),
            ParameterValue::Text(_) => None,
        }
    }

    /// Get as int; floats must be integral.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            ParameterValue::Int(v) => Some(*v),
            ParameterValue::Float(v) if v.fract() == 0.0 => Some(*v as i64),
            _ => None,
        }
    }

    /// Get as string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParameterValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterValue::Int(v) => write!(f, "{v}"),
            ParameterValue::Float(v) => write!(f, "{v}"),
            ParameterValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for ParameterValue {
    fn from(v: i64) -> Self {
        ParameterValue::Int(v)
    }
}

impl From<f64> for ParameterValue {
    fn from(v: f64) -> Self {
        ParameterValue::Float(v)
    }
}

impl From<&str> for ParameterValue {
    fn from(v: &str) -> Self {
        ParameterValue::Text(v.to_string())
    }
}

/// Distribution a parameter is drawn from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ParameterDomain {
    /// Continuous range `[low, high]`.
    Uniform { low: f64, high: f64 },
    /// Continuous range `[low, high]` sampled uniformly in log space.
    LogUniform { low: f64, high: f64 },
    /// Integer range `[low, high]`, both ends inclusive.
    IntRange { low: i64, high: i64 },
    /// One of a fixed list of values.
    Choice { options: Vec<ParameterValue> },
}

impl ParameterDomain {
    /// Sample a random value from this domain
    pub fn sample<R: Rng>(&self, rng: &mut R) -> ParameterValue {
        match self {
            ParameterDomain::Uniform { low, high } => {
                ParameterValue::Float(low + rng.random::<f64>() * (high - low))
            }
            ParameterDomain::LogUniform { low, high } => {
                let (log_low, log_high) = (low.ln(), high.ln());
                let log_val = log_low + rng.random::<f64>() * (log_high - log_low);
                ParameterValue::Float(log_val.exp().clamp(*low, *high))
            }
            ParameterDomain::IntRange { low, high } => ParameterValue::Int(rng.random_range(*low..=*high)),
            ParameterDomain::Choice { options } => {
                options[rng.random_range(0..options.len())].clone()
            }
        }
    }

    /// Check if a value is valid for this domain
    pub fn is_valid(&self, value: &ParameterValue) -> bool {
        match (self, value) {
            (
                ParameterDomain::Uniform { low, high } | ParameterDomain::LogUniform { low, high },
                ParameterValue::Float(v),
            ) => *v >= *low && *v <= *high,
            (ParameterDomain::IntRange { low, high }, ParameterValue::Int(v)) => {
                *v >= *low && *v <= *high
            }
            (ParameterDomain::Choice { options }, v) => options.contains(v),
            _ => false,
        }
    }

    fn check(&self, name: &str) -> Result<()> {
        let bad = |why: &str| Err(Error::Config(format!("domain for {name}: {why}")));
        match self {
            ParameterDomain::Uniform { low, high } if !(low.is_finite() && high.is_finite() && low <= high) => {
                bad("bounds must be finite with low <= high")
            }
            ParameterDomain::LogUniform { low, high } if !(*low > 0.0 && high.is_finite() && low <= high) => {
                bad("bounds must be positive with low <= high")
            }
            ParameterDomain::IntRange { low, high } if low > high => bad("low must not exceed high"),
            ParameterDomain::Choice { options } if options.is_empty() => bad("no options"),
            _ => Ok(()),
        }
    }
}

/// Hyperparameter search space
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SearchSpace {
    /// Parameter name -> domain mapping, iterated in name order.
    params: BTreeMap<String, ParameterDomain>,
}

impl SearchSpace {
    /// Create an empty search space
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a parameter to the search space
    pub fn add(&mut self, name: &str, domain: ParameterDomain) {
        self.params.insert(name.to_string(), domain);
    }

    /// Builder form of [`SearchSpace::add`].
    pub fn with(mut self, name: &str, domain: ParameterDomain) -> Self {
        self.add(name, domain);
        self
    }

    /// Get a parameter domain
    pub fn get(&self, name: &str) -> Option<&ParameterDomain> {
        self.params.get(name)
    }

    /// Check if space is empty
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Get number of parameters
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Iterate over parameters
    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParameterDomain)> {
        self.params.iter()
    }

    /// Check that the space is non-empty and every domain can be sampled.
    pub fn validate(&self) -> Result<()> {
        if self.is_empty() {
            return Err(Error::EmptySpace);
        }
        self.params.iter().try_for_each(|(name, domain)| domain.check(name))
    }

    /// Sample a random configuration
    pub fn sample_random<R: Rng>(&self, rng: &mut R) -> ParameterConfig {
        self.params
            .iter()
            .map(|(name, domain)| (name.clone(), domain.sample(rng)))
            .collect()
    }

    /// Validate a configuration against the space
    pub fn validate_config(&self, config: &ParameterConfig) -> Result<()> {
        for (name, domain) in &self.params {
            match config.get(name) {
                Some(value) if domain.is_valid(value) => {}
                Some(value) => {
                    return Err(Error::Config(format!(
                        "value {value} is outside the domain of {name}"
                    )))
                }
                None => return Err(Error::MissingParameter(name.clone())),
            }
        }
        Ok(())
    }
}
