//! CSV I/O for routing traces.
//!
//! Layout:
//!
//! ```text
//! layer_id,token_id,expert_0,expert_1,...,expert_{N-1}
//! 0,0,0.450000,0.320000,...
//! 0,1,0.120000,0.550000,...
//! ```
//!
//! Probabilities are written with six decimals. Files are truncated on write,
//! never appended to. The reader is strict: the header must name the expert
//! columns in order and every row must have exactly `N + 2` cells.

use crate::error::{Result, TraceError};
use crate::table::{RoutingRow, TraceTable};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/* ---------------- Write ---------------- */

/// Serialize `table` as CSV into any writer.
pub fn write_trace<W: Write>(mut w: W, table: &TraceTable) -> Result<()> {
    writeln!(w, "{}", table.column_names().join(","))?;
    for row in table.rows() {
        write!(w, "{},{}", row.layer_id, row.token_id)?;
        for p in &row.probs {
            write!(w, ",{p:.6}")?;
        }
        w.write_all(b"\n")?;
    }
    w.flush()?;
    Ok(())
}

/// Create (or truncate) `path` and write `table` to it.
///
/// Parent directories are not created; a missing directory is an error.
pub fn write_trace_csv<P: AsRef<Path>>(path: P, table: &TraceTable) -> Result<()> {
    let path_ref = path.as_ref();
    let f = File::create(path_ref).map_err(|e| TraceError::file(path_ref, e))?;
    write_trace(BufWriter::new(f), table).map_err(|e| match e {
        TraceError::Io(source) => TraceError::file(path_ref, source),
        other => other,
    })
}

/* ---------------- Read ---------------- */

/// Parse a CSV trace from any buffered reader.
///
/// Blank lines are skipped. Errors carry the 1-based line number.
pub fn read_trace<R: BufRead>(r: R) -> Result<TraceTable> {
    let mut lines = r.lines().enumerate();

    let num_experts = loop {
        match lines.next() {
            None => return Err(TraceError::malformed(1, "missing header")),
            Some((idx, line)) => {
                let line = line?;
                let line = trim_eol(&line);
                if line.is_empty() {
                    continue;
                }
                break parse_header(line)
                    .map_err(|reason| TraceError::malformed(idx + 1, reason))?;
            }
        }
    };

    let mut table = TraceTable::new(num_experts);
    for (idx, line) in lines {
        let line = line?;
        let line = trim_eol(&line);
        if line.is_empty() {
            continue;
        }
        let row = parse_row(line, num_experts)
            .map_err(|reason| TraceError::malformed(idx + 1, reason))?;
        table.push(row)?;
    }
    Ok(table)
}

/// Open `path` and parse it with [`read_trace`].
pub fn read_trace_csv<P: AsRef<Path>>(path: P) -> Result<TraceTable> {
    let path_ref = path.as_ref();
    let f = File::open(path_ref).map_err(|e| TraceError::file(path_ref, e))?;
    read_trace(BufReader::new(f)).map_err(|e| match e {
        TraceError::Io(source) => TraceError::file(path_ref, source),
        other => other,
    })
}

/* ---------------- Small helpers ---------------- */

#[inline]
fn trim_eol(line: &str) -> &str {
    line.strip_suffix('\r').unwrap_or(line)
}

/// Returns the number of expert columns.
fn parse_header(line: &str) -> std::result::Result<usize, String> {
    let cells: Vec<&str> = line.split(',').map(str::trim).collect();
    if cells.len() < 3 || cells[0] != "layer_id" || cells[1] != "token_id" {
        return Err(format!(
            "header must start with layer_id,token_id,expert_0 (got '{line}')"
        ));
    }
    for (i, cell) in cells[2..].iter().enumerate() {
        let want = format!("expert_{i}");
        if *cell != want {
            return Err(format!("expected column '{want}', found '{cell}'"));
        }
    }
    Ok(cells.len() - 2)
}

fn parse_row(line: &str, num_experts: usize) -> std::result::Result<RoutingRow, String> {
    let cells: Vec<&str> = line.split(',').map(str::trim).collect();
    if cells.len() != num_experts + 2 {
        return Err(format!(
            "expected {} columns, got {}",
            num_experts + 2,
            cells.len()
        ));
    }

    let layer_id = cells[0]
        .parse::<u32>()
        .map_err(|e| format!("layer_id '{}': {e}", cells[0]))?;
    let token_id = cells[1]
        .parse::<u32>()
        .map_err(|e| format!("token_id '{}': {e}", cells[1]))?;
    let probs = cells[2..]
        .iter()
        .enumerate()
        .map(|(i, c)| {
            c.parse::<f64>()
                .map_err(|e| format!("expert_{i} '{c}': {e}"))
        })
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(RoutingRow {
        layer_id,
        token_id,
        probs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uniform_table() -> TraceTable {
        let mut t = TraceTable::new(4);
        for token_id in 0..2 {
            t.push(RoutingRow {
                layer_id: 0,
                token_id,
                probs: vec![0.25; 4],
            })
            .unwrap();
        }
        t
    }

    #[test]
    fn writes_fixed_six_decimals() {
        let mut buf = Vec::new();
        write_trace(&mut buf, &uniform_table()).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(
            text,
            "layer_id,token_id,expert_0,expert_1,expert_2,expert_3\n\
             0,0,0.250000,0.250000,0.250000,0.250000\n\
             0,1,0.250000,0.250000,0.250000,0.250000\n"
        );
    }

    #[test]
    fn reads_back_what_it_writes() {
        let mut buf = Vec::new();
        write_trace(&mut buf, &uniform_table()).unwrap();
        let t = read_trace(buf.as_slice()).unwrap();
        assert_eq!(t, uniform_table());
    }

    #[test]
    fn tolerates_crlf_and_blank_lines() {
        let src = "layer_id,token_id,expert_0,expert_1\r\n0,0,0.6,0.4\r\n\r\n0,1,0.5,0.5\r\n\n";
        let t = read_trace(src.as_bytes()).unwrap();
        assert_eq!(t.num_experts(), 2);
        assert_eq!(t.len(), 2);
        assert_eq!(t.rows()[0].probs, vec![0.6, 0.4]);
    }

    #[test]
    fn rejects_bad_header() {
        for src in [
            "",
            "token_id,layer_id,expert_0\n",
            "layer_id,token_id\n",
            "layer_id,token_id,expert_1\n",
        ] {
            let err = read_trace(src.as_bytes()).unwrap_err();
            assert!(
                matches!(err, TraceError::MalformedTrace { line: 1, .. }),
                "{src:?}: {err}"
            );
        }
    }

    #[test]
    fn rejects_short_row_with_line_number() {
        let src = "layer_id,token_id,expert_0,expert_1\n0,0,0.5,0.5\n0,1,0.5\n";
        let err = read_trace(src.as_bytes()).unwrap_err();
        assert!(matches!(err, TraceError::MalformedTrace { line: 3, .. }), "{err}");
    }

    #[test]
    fn rejects_non_numeric_cells() {
        let src = "layer_id,token_id,expert_0\n-1,0,1.0\n";
        assert!(read_trace(src.as_bytes()).is_err());
        let src = "layer_id,token_id,expert_0\n0,0,abc\n";
        let err = read_trace(src.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("expert_0 'abc'"), "{err}");
    }
}
