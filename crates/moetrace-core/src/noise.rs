//! Per-token noise: jitter each expert's share, clamp at zero, renormalize.

use crate::distribution::{normalize, uniform};
use rand::Rng;

/// One noisy instance of a base distribution.
#[derive(Clone, Debug, PartialEq)]
pub struct Perturbation {
    /// Non-negative probabilities summing to 1.
    pub probs: Vec<f64>,
    /// Set when every entry clamped to zero and the row fell back to uniform.
    pub fallback: bool,
}

/// Whether `noise_level` turns perturbation on. Zero, negative and NaN levels
/// leave rows equal to the base.
#[inline]
#[must_use]
pub fn noise_enabled(noise_level: f64) -> bool {
    noise_level > 0.0
}

/// Draw `U(-noise_level, +noise_level)` per expert, add it to `base`, clamp
/// negatives to 0 and renormalize.
///
/// If the clamped vector sums to zero the row becomes the uniform
/// distribution and [`Perturbation::fallback`] is set.
///
/// With noise disabled the result is a copy of `base`.
///
/// The offset is `noise_level * (2u - 1)` for `u ~ U[0, 1)`, so any finite
/// level is accepted, however large.
pub fn perturb<R: Rng>(base: &[f64], noise_level: f64, rng: &mut R) -> Perturbation {
    if !noise_enabled(noise_level) {
        return Perturbation {
            probs: base.to_vec(),
            fallback: false,
        };
    }

    let noisy: Vec<f64> = base
        .iter()
        .map(|&p| {
            let u: f64 = rng.random();
            let v = p + noise_level * 2.0f64.mul_add(u, -1.0);
            if v > 0.0 {
                v
            } else {
                0.0
            }
        })
        .collect();

    match normalize(noisy) {
        Ok(probs) => Perturbation {
            probs,
            fallback: false,
        },
        Err(_) => Perturbation {
            probs: uniform(base.len()),
            fallback: true,
        },
    }
}
