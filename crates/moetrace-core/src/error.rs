//! Errors surfaced by trace generation and trace I/O.

use std::path::PathBuf;
use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T, E = TraceError> = std::result::Result<T, E>;

/// Everything that can make a generation or read fail.
///
/// Out-of-range shape parameters are *not* errors; see
/// [`crate::params::OutOfRangeParameter`].
#[derive(Debug, Error)]
pub enum TraceError {
    /// Distribution name outside `{uniform, zipf, power_law}`.
    #[error("unknown distribution '{0}' (expected one of: uniform, zipf, power_law)")]
    InvalidDistributionKind(String),

    /// A size parameter was zero.
    #[error("{name} must be greater than 0")]
    InvalidDimension {
        /// Parameter name as it appears on the command line.
        name: &'static str,
    },

    /// NaN or infinite shape/noise parameter.
    #[error("{name} must be a finite number (got {value})")]
    NonFiniteParameter {
        /// Parameter name.
        name: &'static str,
        /// Offending value.
        value: f64,
    },

    /// Weights summed to zero (or to a non-finite value) before normalization.
    #[error("cannot normalize expert weights: sum is {sum}")]
    DegenerateNormalization {
        /// The sum that could not be divided by.
        sum: f64,
    },

    /// I/O failure on a caller-provided writer or reader.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// I/O failure tied to a path.
    #[error("{}: {source}", .path.display())]
    File {
        /// File being read or written.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// A row's probability count differs from the table's expert count.
    #[error("row has {got} probabilities, table has {expected} experts")]
    RowWidthMismatch {
        /// Experts per row in the table.
        expected: usize,
        /// Width of the rejected row.
        got: usize,
    },

    /// The input does not follow the trace CSV layout.
    #[error("malformed trace at line {line}: {reason}")]
    MalformedTrace {
        /// 1-based line number.
        line: usize,
        /// What was wrong.
        reason: String,
    },
}

impl TraceError {
    pub(crate) fn file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::File {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn malformed(line: usize, reason: impl Into<String>) -> Self {
        Self::MalformedTrace {
            line,
            reason: reason.into(),
        }
    }
}
