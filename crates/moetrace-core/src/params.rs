//! Generation parameters.
//!
//! Sizes are hard constraints (must be > 0). Shape and noise parameters have
//! *recommended* ranges only: values outside them are reported as
//! [`OutOfRangeParameter`] and generation proceeds with the given value.

use crate::distribution::{Distribution, DistributionKind};
use crate::error::{Result, TraceError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Recommended skew range for `zipf`.
pub const SKEW_RANGE: (f64, f64) = (0.5, 0.95);
/// Recommended concentration range for `power_law`.
pub const CONCENTRATION_RANGE: (f64, f64) = (1.0, 3.0);
/// Recommended per-token noise range.
pub const NOISE_RANGE: (f64, f64) = (0.0, 0.2);

/// Everything needed to generate one trace.
///
/// Deserializes from a TOML profile; missing fields take the defaults.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerateParams {
    /// Tokens per batch.
    pub batch_size: u32,
    /// Experts per layer.
    pub num_experts: u32,
    /// Transformer layers.
    pub num_layers: u32,
    /// Base distribution shape.
    pub distribution: DistributionKind,
    /// Zipf skew factor.
    pub skew: f64,
    /// Power-law exponent.
    pub concentration: f64,
    /// Per-token noise amplitude; `<= 0` disables noise.
    pub noise: f64,
    /// RNG seed. `None` lets the caller pick one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for GenerateParams {
    fn default() -> Self {
        Self {
            batch_size: 512,
            num_experts: 8,
            num_layers: 1,
            distribution: DistributionKind::Zipf,
            skew: 0.8,
            concentration: 2.0,
            noise: 0.05,
            seed: None,
        }
    }
}

/// A parameter outside its recommended range. Non-fatal.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OutOfRangeParameter {
    /// Parameter name.
    pub name: &'static str,
    /// Given value.
    pub value: f64,
    /// Recommended lower bound.
    pub min: f64,
    /// Recommended upper bound.
    pub max: f64,
}

impl fmt::Display for OutOfRangeParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}={} outside recommended range [{}, {}]",
            self.name, self.value, self.min, self.max
        )
    }
}

impl GenerateParams {
    /// The tagged distribution this parameter set selects.
    #[must_use]
    pub const fn shape(&self) -> Distribution {
        match self.distribution {
            DistributionKind::Uniform => Distribution::Uniform,
            DistributionKind::Zipf => Distribution::Zipf { skew: self.skew },
            DistributionKind::PowerLaw => Distribution::PowerLaw {
                concentration: self.concentration,
            },
        }
    }

    /// Total number of rows the trace will contain.
    #[must_use]
    pub fn total_rows(&self) -> u64 {
        u64::from(self.num_layers) * u64::from(self.batch_size)
    }

    /// Check hard constraints and collect soft range warnings.
    ///
    /// All three of skew, concentration and noise are checked regardless of
    /// the selected distribution.
    ///
    /// # Errors
    /// - [`TraceError::InvalidDimension`] for a zero size.
    /// - [`TraceError::NonFiniteParameter`] for NaN/infinite skew,
    ///   concentration or noise.
    pub fn validate(&self) -> Result<Vec<OutOfRangeParameter>> {
        for (name, value) in [
            ("batch_size", self.batch_size),
            ("num_experts", self.num_experts),
            ("num_layers", self.num_layers),
        ] {
            if value == 0 {
                return Err(TraceError::InvalidDimension { name });
            }
        }

        let soft = [
            ("skew", self.skew, SKEW_RANGE),
            ("concentration", self.concentration, CONCENTRATION_RANGE),
            ("noise", self.noise, NOISE_RANGE),
        ];

        let mut warnings = Vec::new();
        for (name, value, (min, max)) in soft {
            if !value.is_finite() {
                return Err(TraceError::NonFiniteParameter { name, value });
            }
            if value < min || value > max {
                warnings.push(OutOfRangeParameter {
                    name,
                    value,
                    min,
                    max,
                });
            }
        }
        Ok(warnings)
    }
}
