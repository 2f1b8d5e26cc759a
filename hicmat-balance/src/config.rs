use std::fs::read_to_string;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_TOLERANCE: f64 = 1e-6;
pub const DEFAULT_MAX_ITERATIONS: usize = 300;
pub const DEFAULT_MAX_INNER_ITERATIONS: usize = 1000;
pub const DEFAULT_TARGET_SUM: f64 = 1.0;
pub const DEFAULT_LOWER_BOUND: f64 = 0.1;
pub const DEFAULT_UPPER_BOUND: f64 = 3.0;

#[derive(Error, Debug)]
pub enum BalancerConfigError {
    #[error("Invalid balancer setting: {0}")]
    InvalidValue(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Toml(#[from] toml::de::Error),
}

///
/// Settings for the Knight–Ruiz balancer. Every field is optional in a
/// TOML config file and falls back to its default.
///
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct BalancerConfig {
    /// Stop once every row sum is within this distance of the target,
    /// relative to the target.
    pub tolerance: f64,
    /// Outer (Newton) iterations before giving up with a non-convergence error.
    pub max_iterations: usize,
    /// Conjugate-gradient steps allowed inside one Newton iteration.
    pub max_inner_iterations: usize,
    /// The value every unmasked row sum is scaled to.
    pub target_sum: f64,
    /// Lower edge of the cone the multiplicative Newton step must stay in.
    pub lower_bound: f64,
    /// Upper edge of the cone the multiplicative Newton step must stay in.
    pub upper_bound: f64,
    /// Treat rows without any contacts as masked instead of failing.
    pub exclude_empty_rows: bool,
}

impl Default for BalancerConfig {
    fn default() -> Self {
        BalancerConfig {
            tolerance: DEFAULT_TOLERANCE,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            max_inner_iterations: DEFAULT_MAX_INNER_ITERATIONS,
            target_sum: DEFAULT_TARGET_SUM,
            lower_bound: DEFAULT_LOWER_BOUND,
            upper_bound: DEFAULT_UPPER_BOUND,
            exclude_empty_rows: false,
        }
    }
}

impl BalancerConfig {
    pub fn validate(&self) -> Result<(), BalancerConfigError> {
        if !(self.tolerance > 0.0 && self.tolerance.is_finite()) {
            return Err(BalancerConfigError::InvalidValue(format!(
                "tolerance must be positive, got {}",
                self.tolerance
            )));
        }
        if !(self.target_sum > 0.0 && self.target_sum.is_finite()) {
            return Err(BalancerConfigError::InvalidValue(format!(
                "target_sum must be positive, got {}",
                self.target_sum
            )));
        }
        if !(self.lower_bound >= 0.0 && self.lower_bound < 1.0) {
            return Err(BalancerConfigError::InvalidValue(format!(
                "lower_bound must be in [0, 1), got {}",
                self.lower_bound
            )));
        }
        if !(self.upper_bound > 1.0) {
            return Err(BalancerConfigError::InvalidValue(format!(
                "upper_bound must be greater than 1, got {}",
                self.upper_bound
            )));
        }
        Ok(())
    }
}

impl TryFrom<&Path> for BalancerConfig {
    type Error = BalancerConfigError;

    fn try_from(path: &Path) -> Result<Self, Self::Error> {
        let toml_str = read_to_string(path)?;
        let config: BalancerConfig = toml::from_str(&toml_str)?;
        config.validate()?;
        Ok(config)
    }
}
