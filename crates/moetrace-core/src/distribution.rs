//! Base expert distributions.
//!
//! Experts are ranked by index (expert 0 = rank 1), so the Zipf and power-law
//! shapes always put the largest share on the lowest indices.

use crate::error::{Result, TraceError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Name of a distribution shape, as accepted on the command line and in profiles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DistributionKind {
    /// Every expert equally likely.
    Uniform,
    /// Zipf-like decay controlled by a skew factor.
    Zipf,
    /// Power-law decay controlled by a concentration exponent.
    PowerLaw,
}

impl DistributionKind {
    /// All accepted kinds, in the order they are listed in help text.
    pub const ALL: [Self; 3] = [Self::Uniform, Self::Zipf, Self::PowerLaw];

    /// Canonical spelling.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Uniform => "uniform",
            Self::Zipf => "zipf",
            Self::PowerLaw => "power_law",
        }
    }
}

impl fmt::Display for DistributionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DistributionKind {
    type Err = TraceError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| TraceError::InvalidDistributionKind(s.to_owned()))
    }
}

impl TryFrom<String> for DistributionKind {
    type Error = TraceError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<DistributionKind> for String {
    fn from(k: DistributionKind) -> Self {
        k.as_str().to_owned()
    }
}

/// A distribution shape together with its parameter.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Distribution {
    /// `1 / num_experts` each.
    Uniform,
    /// `1 / k^alpha` with `alpha = zipf_alpha(skew)`.
    Zipf {
        /// Skew factor, recommended in `[0.5, 0.95]`.
        skew: f64,
    },
    /// `1 / k^concentration`.
    PowerLaw {
        /// Exponent, recommended in `[1.0, 3.0]`.
        concentration: f64,
    },
}

impl Distribution {
    /// The kind tag of this distribution.
    #[must_use]
    pub const fn kind(&self) -> DistributionKind {
        match self {
            Self::Uniform => DistributionKind::Uniform,
            Self::Zipf { .. } => DistributionKind::Zipf,
            Self::PowerLaw { .. } => DistributionKind::PowerLaw,
        }
    }
}

/// Map a skew factor in `(0, 1)` to a Zipf exponent: `-ln(1 - skew) / ln(2)`.
///
/// `skew = 0.8` gives `alpha ≈ 2.3219`.
#[must_use]
pub fn zipf_alpha(skew: f64) -> f64 {
    -(1.0 - skew).ln() / std::f64::consts::LN_2
}

/// Build the base distribution over `num_experts` experts.
///
/// The result has length `num_experts`, no negative entries, and sums to 1.
///
/// # Errors
/// - [`TraceError::InvalidDimension`] if `num_experts == 0`.
/// - [`TraceError::DegenerateNormalization`] if the shape parameter yields
///   weights that cannot be normalized (e.g. `skew > 1` gives NaN weights).
pub fn base_distribution(num_experts: usize, dist: &Distribution) -> Result<Vec<f64>> {
    if num_experts == 0 {
        return Err(TraceError::InvalidDimension {
            name: "num_experts",
        });
    }

    match *dist {
        Distribution::Uniform => Ok(uniform(num_experts)),
        Distribution::Zipf { skew } => normalize(rank_weights(num_experts, zipf_alpha(skew))),
        Distribution::PowerLaw { concentration } => {
            normalize(rank_weights(num_experts, concentration))
        }
    }
}

/// Exactly `1 / n` for each of `n` experts.
#[must_use]
pub fn uniform(n: usize) -> Vec<f64> {
    vec![1.0 / n as f64; n]
}

/// Unnormalized `1 / k^exponent` for ranks `k = 1..=n`.
fn rank_weights(n: usize, exponent: f64) -> Vec<f64> {
    (1..=n).map(|k| 1.0 / (k as f64).powf(exponent)).collect()
}

/// Divide every weight by the total so the vector sums to 1.
///
/// # Errors
/// [`TraceError::DegenerateNormalization`] when the sum is zero, negative or
/// not finite.
pub fn normalize(mut weights: Vec<f64>) -> Result<Vec<f64>> {
    let sum: f64 = weights.iter().sum();
    if !sum.is_finite() || sum <= 0.0 {
        return Err(TraceError::DegenerateNormalization { sum });
    }
    for w in &mut weights {
        *w /= sum;
    }
    Ok(weights)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: f64, b: f64, tol: f64) {
        assert!((a - b).abs() < tol, "{a} vs {b}");
    }

    #[test]
    fn kind_parses_canonical_names_only() {
        assert_eq!("uniform".parse::<DistributionKind>().ok(), Some(DistributionKind::Uniform));
        assert_eq!("zipf".parse::<DistributionKind>().ok(), Some(DistributionKind::Zipf));
        assert_eq!(
            "power_law".parse::<DistributionKind>().ok(),
            Some(DistributionKind::PowerLaw)
        );
        for bad in ["custom", "Zipf", "power-law", ""] {
            let err = bad.parse::<DistributionKind>().unwrap_err();
            assert!(matches!(err, TraceError::InvalidDistributionKind(ref s) if s == bad));
        }
    }

    #[test]
    fn alpha_for_default_skew() {
        assert_close(zipf_alpha(0.8), 2.321_928, 1e-6);
        assert_close(zipf_alpha(0.5), 1.0, 1e-12);
    }

    #[test]
    fn uniform_is_exact() {
        let p = base_distribution(4, &Distribution::Uniform).unwrap();
        assert_eq!(p, vec![0.25; 4]);
    }

    #[test]
    fn power_law_three_experts() {
        let p = base_distribution(3, &Distribution::PowerLaw { concentration: 2.0 }).unwrap();
        assert_close(p[0], 0.734_694, 1e-6);
        assert_close(p[1], 0.183_673, 1e-6);
        assert_close(p[2], 0.081_633, 1e-6);
    }

    #[test]
    fn zipf_zero_skew_is_uniform() {
        let p = base_distribution(5, &Distribution::Zipf { skew: 0.0 }).unwrap();
        for v in p {
            assert_close(v, 0.2, 1e-12);
        }
    }

    #[test]
    fn single_expert_takes_everything() {
        for d in [
            Distribution::Uniform,
            Distribution::Zipf { skew: 0.9 },
            Distribution::PowerLaw { concentration: 3.0 },
        ] {
            assert_eq!(base_distribution(1, &d).unwrap(), vec![1.0]);
        }
    }

    #[test]
    fn zero_experts_rejected() {
        let err = base_distribution(0, &Distribution::Uniform).unwrap_err();
        assert!(matches!(err, TraceError::InvalidDimension { name: "num_experts" }));
    }

    #[test]
    fn skew_above_one_is_degenerate() {
        let err = base_distribution(4, &Distribution::Zipf { skew: 1.5 }).unwrap_err();
        assert!(matches!(err, TraceError::DegenerateNormalization { .. }));
    }

    #[test]
    fn shape_reports_its_kind() {
        assert_eq!(Distribution::Uniform.kind(), DistributionKind::Uniform);
        assert_eq!(Distribution::Zipf { skew: 0.8 }.kind(), DistributionKind::Zipf);
        assert_eq!(
            Distribution::PowerLaw { concentration: 2.0 }.kind(),
            DistributionKind::PowerLaw
        );
    }

    #[test]
    fn normalize_rejects_zero_sum() {
        let err = normalize(vec![0.0, 0.0]).unwrap_err();
        assert!(matches!(err, TraceError::DegenerateNormalization { sum } if sum == 0.0));
    }
}
