//! File-level CSV behavior: exact output for a fixed scenario, overwrite
//! semantics, read-back coverage of every `(layer, token)` pair, and I/O
//! failures.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]

use moetrace_core::{
    generate_trace, read_trace_csv, summarize, write_trace_csv, DistributionKind, GenerateParams,
    TraceError,
};
use rand::{rngs::StdRng, SeedableRng};
use std::collections::HashSet;
use std::fs;
use tempfile::tempdir;

#[test]
fn uniform_scenario_file_contents() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("trace.csv");

    let params = GenerateParams {
        batch_size: 2,
        num_experts: 4,
        num_layers: 1,
        distribution: DistributionKind::Uniform,
        noise: 0.0,
        ..GenerateParams::default()
    };
    let out = generate_trace(&params, &mut StdRng::seed_from_u64(0)).unwrap();
    write_trace_csv(&path, &out.table).unwrap();

    let text = fs::read_to_string(&path).unwrap();
    assert_eq!(
        text,
        "layer_id,token_id,expert_0,expert_1,expert_2,expert_3\n\
         0,0,0.250000,0.250000,0.250000,0.250000\n\
         0,1,0.250000,0.250000,0.250000,0.250000\n"
    );
}

#[test]
fn read_back_covers_cartesian_product_once() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("trace.csv");

    let params = GenerateParams {
        batch_size: 37,
        num_experts: 16,
        num_layers: 4,
        ..GenerateParams::default()
    };
    let out = generate_trace(&params, &mut StdRng::seed_from_u64(11)).unwrap();
    write_trace_csv(&path, &out.table).unwrap();

    let back = read_trace_csv(&path).unwrap();
    assert_eq!(back.num_experts(), 16);
    assert_eq!(back.len(), 4 * 37);

    let seen: HashSet<(u32, u32)> = back
        .rows()
        .iter()
        .map(|r| (r.layer_id, r.token_id))
        .collect();
    assert_eq!(seen.len(), back.len(), "duplicate (layer, token) pair");
    for l in 0..4 {
        for t in 0..37 {
            assert!(seen.contains(&(l, t)), "missing ({l}, {t})");
        }
    }

    // Six decimals: each value within rounding of the in-memory one.
    for (a, b) in out.table.rows().iter().zip(back.rows()) {
        for (x, y) in a.probs.iter().zip(&b.probs) {
            assert!((x - y).abs() <= 5e-7 + 1e-12);
        }
    }
}

#[test]
fn second_write_overwrites() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("trace.csv");

    let big = GenerateParams {
        batch_size: 64,
        ..GenerateParams::default()
    };
    let small = GenerateParams {
        batch_size: 2,
        ..GenerateParams::default()
    };
    let mut rng = StdRng::seed_from_u64(3);
    write_trace_csv(&path, &generate_trace(&big, &mut rng).unwrap().table).unwrap();
    write_trace_csv(&path, &generate_trace(&small, &mut rng).unwrap().table).unwrap();

    let back = read_trace_csv(&path).unwrap();
    assert_eq!(back.len(), 2);
}

#[test]
fn missing_directory_is_an_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("no/such/dir/trace.csv");
    let out = generate_trace(&GenerateParams::default(), &mut StdRng::seed_from_u64(0)).unwrap();

    let err = write_trace_csv(&path, &out.table).unwrap_err();
    assert!(matches!(err, TraceError::File { .. }), "{err}");
    assert!(!path.exists());
}

#[test]
fn missing_file_is_an_error() {
    let dir = tempdir().unwrap();
    let err = read_trace_csv(dir.path().join("absent.csv")).unwrap_err();
    assert!(matches!(err, TraceError::File { .. }));
}

#[test]
fn summary_of_skewed_trace_favors_low_experts() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("trace.csv");
    let params = GenerateParams {
        batch_size: 256,
        num_experts: 8,
        num_layers: 5,
        noise: 0.0,
        ..GenerateParams::default()
    };
    let out = generate_trace(&params, &mut StdRng::seed_from_u64(0)).unwrap();
    write_trace_csv(&path, &out.table).unwrap();

    let s = summarize(&read_trace_csv(&path).unwrap(), 2, 3);
    assert_eq!(s.len(), 3);
    for layer in &s {
        assert_eq!(layer.ranked(), vec![(0, 256), (1, 256)]);
        assert_eq!(layer.total(), 512);
    }
}
