//! Routing rows and the in-memory trace table.

use crate::error::{Result, TraceError};
use std::collections::BTreeSet;

/// Expert probabilities for one `(layer, token)` pair.
#[derive(Clone, Debug, PartialEq)]
pub struct RoutingRow {
    /// Layer index in `[0, num_layers)`.
    pub layer_id: u32,
    /// Token index in `[0, batch_size)`.
    pub token_id: u32,
    /// One probability per expert, summing to 1.
    pub probs: Vec<f64>,
}

/// All routing rows of a trace, in the order they were produced or read.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TraceTable {
    num_experts: usize,
    rows: Vec<RoutingRow>,
}

impl TraceTable {
    /// Empty table over `num_experts` experts.
    #[must_use]
    pub const fn new(num_experts: usize) -> Self {
        Self {
            num_experts,
            rows: Vec::new(),
        }
    }

    /// Empty table with room for `rows` rows.
    #[must_use]
    pub fn with_capacity(num_experts: usize, rows: usize) -> Self {
        Self {
            num_experts,
            rows: Vec::with_capacity(rows),
        }
    }

    /// Append a row.
    ///
    /// # Errors
    /// [`TraceError::RowWidthMismatch`] if the row does not have exactly
    /// `num_experts` probabilities; the table is left unchanged.
    pub fn push(&mut self, row: RoutingRow) -> Result<()> {
        if row.probs.len() != self.num_experts {
            return Err(TraceError::RowWidthMismatch {
                expected: self.num_experts,
                got: row.probs.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    /// Number of experts per row.
    #[inline]
    #[must_use]
    pub const fn num_experts(&self) -> usize {
        self.num_experts
    }

    /// Number of rows.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows in table order.
    #[inline]
    #[must_use]
    pub fn rows(&self) -> &[RoutingRow] {
        &self.rows
    }

    /// Distinct layer ids, ascending.
    #[must_use]
    pub fn layer_ids(&self) -> Vec<u32> {
        self.rows
            .iter()
            .map(|r| r.layer_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Rows belonging to `layer_id`, in table order.
    pub fn layer(&self, layer_id: u32) -> impl Iterator<Item = &RoutingRow> + '_ {
        self.rows.iter().filter(move |r| r.layer_id == layer_id)
    }

    /// Header cells: `layer_id, token_id, expert_0 .. expert_{N-1}`.
    #[must_use]
    pub fn column_names(&self) -> Vec<String> {
        ["layer_id".to_owned(), "token_id".to_owned()]
            .into_iter()
            .chain((0..self.num_experts).map(|i| format!("expert_{i}")))
            .collect()
    }
}
