//! Top-k assignment statistics over a trace table.
//!
//! Each row's `k` most probable experts each receive one assignment. Ties go
//! to the lower expert index.

use crate::table::TraceTable;
use serde::Serialize;

/// Experts selected per token in the generation report.
pub const DEFAULT_TOP_K: usize = 2;
/// Layers covered by the generation report.
pub const DEFAULT_SUMMARY_LAYERS: usize = 3;

/// Indices of the `k` largest entries of `probs`, largest first.
///
/// Uses a stable sort, so among equal probabilities the lower index wins.
/// Returns fewer than `k` indices when `probs` is shorter than `k`.
#[must_use]
pub fn top_k_experts(probs: &[f64], k: usize) -> Vec<usize> {
    let mut idx: Vec<usize> = (0..probs.len()).collect();
    idx.sort_by(|&a, &b| probs[b].total_cmp(&probs[a]));
    idx.truncate(k);
    idx
}

/// Per-expert assignment counts for one layer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LayerAssignment {
    /// Layer the counts belong to.
    pub layer_id: u32,
    /// Experts selected per token.
    pub top_k: usize,
    /// Tokens seen in this layer.
    pub tokens: usize,
    /// `counts[e]` = number of tokens that selected expert `e`.
    pub counts: Vec<u64>,
}

impl LayerAssignment {
    /// Count top-`k` selections over every row of `layer_id`.
    #[must_use]
    pub fn from_table(table: &TraceTable, layer_id: u32, top_k: usize) -> Self {
        let mut counts = vec![0u64; table.num_experts()];
        let mut tokens = 0usize;
        for row in table.layer(layer_id) {
            tokens += 1;
            for e in top_k_experts(&row.probs, top_k) {
                counts[e] += 1;
            }
        }
        Self {
            layer_id,
            top_k,
            tokens,
            counts,
        }
    }

    /// Total assignments (`tokens × min(k, num_experts)`).
    #[must_use]
    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// Share of all assignments that went to `expert`, in percent.
    #[must_use]
    pub fn percent(&self, expert: usize) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        100.0 * self.counts[expert] as f64 / total as f64
    }

    /// Experts with at least one assignment as `(expert, count)`, by count
    /// descending; lower expert id first among equal counts.
    #[must_use]
    pub fn ranked(&self) -> Vec<(usize, u64)> {
        let mut v: Vec<(usize, u64)> = self
            .counts
            .iter()
            .copied()
            .enumerate()
            .filter(|&(_, c)| c > 0)
            .collect();
        v.sort_by(|a, b| b.1.cmp(&a.1));
        v
    }

    /// Mean assignments per expert.
    #[must_use]
    pub fn mean(&self) -> f64 {
        if self.counts.is_empty() {
            return 0.0;
        }
        self.total() as f64 / self.counts.len() as f64
    }

    /// Smallest per-expert count.
    #[must_use]
    pub fn min(&self) -> u64 {
        self.counts.iter().copied().min().unwrap_or(0)
    }

    /// Largest per-expert count.
    #[must_use]
    pub fn max(&self) -> u64 {
        self.counts.iter().copied().max().unwrap_or(0)
    }

    /// `max / mean`; 1.0 is perfectly balanced. Zero when nothing was assigned.
    #[must_use]
    pub fn imbalance_ratio(&self) -> f64 {
        let mean = self.mean();
        if mean == 0.0 {
            return 0.0;
        }
        self.max() as f64 / mean
    }
}

/// Summaries for the first `max_layers` layers present in `table`.
#[must_use]
pub fn summarize(table: &TraceTable, top_k: usize, max_layers: usize) -> Vec<LayerAssignment> {
    table
        .layer_ids()
        .into_iter()
        .take(max_layers)
        .map(|layer_id| LayerAssignment::from_table(table, layer_id, top_k))
        .collect()
}
