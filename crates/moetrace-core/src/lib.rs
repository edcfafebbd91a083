//! moetrace-core: synthetic token-to-expert routing traces for MoE simulation.
//!
//! The crate is a single pipeline split into small modules:
//! - `distribution`: base expert distributions (uniform, Zipf, power-law).
//! - `noise`: independent per-token perturbation + renormalization.
//! - `generator`: assembles the `(layer, token)` table from a base distribution.
//! - `io`: CSV serialization and a strict reader for the same format.
//! - `summary`: top-k assignment counts and per-layer load statistics.
//! - `params`: generation parameters, defaults and range validation.
//!
//! ```
//! use moetrace_core::{generate_trace, GenerateParams};
//! use rand::{rngs::StdRng, SeedableRng};
//!
//! let params = GenerateParams { batch_size: 4, num_experts: 8, ..GenerateParams::default() };
//! let mut rng = StdRng::seed_from_u64(7);
//! let trace = generate_trace(&params, &mut rng)?;
//! assert_eq!(trace.table.len(), 4);
//! # Ok::<(), moetrace_core::TraceError>(())
//! ```

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![deny(missing_docs)]
#![warn(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(
    clippy::missing_errors_doc,
    clippy::module_name_repetitions,
    clippy::cast_precision_loss,
    clippy::doc_markdown
)]

/// Base expert distributions and normalization.
pub mod distribution;
/// Crate-wide error type.
pub mod error;
/// Table assembly from a base distribution.
pub mod generator;
/// CSV read/write for routing traces.
pub mod io;
/// Per-token noise perturbation.
pub mod noise;
/// Generation parameters and validation.
pub mod params;
/// Top-k assignment statistics.
pub mod summary;
/// Routing rows and the trace table.
pub mod table;

pub use distribution::{base_distribution, normalize, zipf_alpha, Distribution, DistributionKind};
pub use error::{Result, TraceError};
pub use generator::{assemble_table, generate_trace, GeneratedTrace};
pub use io::{read_trace, read_trace_csv, write_trace, write_trace_csv};
pub use noise::{perturb, Perturbation};
pub use params::{GenerateParams, OutOfRangeParameter};
pub use summary::{summarize, top_k_experts, LayerAssignment};
pub use table::{RoutingRow, TraceTable};
