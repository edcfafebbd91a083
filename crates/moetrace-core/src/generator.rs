//! Trace generation: base distribution → per-row noise → table.
//!
//! Rows are produced layer-major, token-minor. Each row is an independent
//! copy of the base distribution, perturbed with a fresh noise draw when
//! noise is enabled.

use crate::distribution::base_distribution;
use crate::error::Result;
use crate::noise::perturb;
use crate::params::GenerateParams;
use crate::table::{RoutingRow, TraceTable};
use rand::Rng;
use tracing::{debug, warn};

/// Output of [`generate_trace`].
#[derive(Clone, Debug, PartialEq)]
pub struct GeneratedTrace {
    /// The base distribution every row was derived from.
    pub base: Vec<f64>,
    /// `num_layers × batch_size` rows.
    pub table: TraceTable,
    /// Rows whose noisy weights clamped to all-zero and fell back to uniform.
    pub fallback_rows: usize,
}

/// Validate `params`, build the base distribution and assemble the table.
///
/// Range warnings from [`GenerateParams::validate`] are dropped here; callers
/// that report them call `validate` themselves first.
///
/// # Errors
/// Any hard validation failure, or a base distribution that cannot be
/// normalized.
pub fn generate_trace<R: Rng>(params: &GenerateParams, rng: &mut R) -> Result<GeneratedTrace> {
    params.validate()?;

    let shape = params.shape();
    let base = base_distribution(params.num_experts as usize, &shape)?;
    debug!(?base, distribution = %shape.kind(), "base distribution");

    let (table, fallback_rows) = assemble_table(
        params.num_layers,
        params.batch_size,
        &base,
        params.noise,
        rng,
    )?;

    Ok(GeneratedTrace {
        base,
        table,
        fallback_rows,
    })
}

/// Build the table from an existing base distribution.
///
/// Returns the table and the number of rows that fell back to uniform.
///
/// # Errors
/// Propagates [`TraceTable::push`] failures.
pub fn assemble_table<R: Rng>(
    num_layers: u32,
    batch_size: u32,
    base: &[f64],
    noise_level: f64,
    rng: &mut R,
) -> Result<(TraceTable, usize)> {
    let total = num_layers as usize * batch_size as usize;
    let mut table = TraceTable::with_capacity(base.len(), total);
    let mut fallback_rows = 0usize;

    for layer_id in 0..num_layers {
        for token_id in 0..batch_size {
            let p = perturb(base, noise_level, rng);
            if p.fallback {
                fallback_rows += 1;
                warn!(layer_id, token_id, "noisy row degenerated; using uniform");
            }
            table.push(RoutingRow {
                layer_id,
                token_id,
                probs: p.probs,
            })?;
        }
    }

    Ok((table, fallback_rows))
}
