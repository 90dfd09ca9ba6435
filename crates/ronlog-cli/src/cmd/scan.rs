use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use ronlog_core::crdt::scan_tombstones;
use serde::Serialize;

use super::read_frame;
use crate::output::{OutputMode, pretty_kv, pretty_rule, pretty_section, render_mode};

/// Arguments for `ronlog scan`.
#[derive(Args, Debug)]
pub struct ScanArgs {
    /// A merged frame file.
    #[arg(value_name = "FILE")]
    pub file: PathBuf,
}

#[derive(Debug, Serialize)]
struct ScanRow {
    id: String,
    tomb: bool,
    op: String,
}

#[derive(Debug, Serialize)]
struct ScanReport {
    live: usize,
    tomb: usize,
    ops: Vec<ScanRow>,
}

const fn state(tomb: bool) -> &'static str {
    if tomb { "tomb" } else { "live" }
}

/// Report which ops of a frame are tombstoned.
///
/// # Errors
///
/// Returns an error if the file does not decode or a ref is unresolved.
pub fn run_scan(args: &ScanArgs, mode: OutputMode) -> Result<()> {
    let frame = read_frame(&args.file)?;
    let bits = scan_tombstones(&frame)
        .with_context(|| format!("failed to scan {}", args.file.display()))?;
    let ops = frame.ops()?;

    let rows: Vec<ScanRow> = ops
        .iter()
        .zip(&bits)
        .map(|(op, &tomb)| ScanRow {
            id: op.id.to_string(),
            tomb,
            op: op.to_string(),
        })
        .collect();
    let tomb = bits.iter().filter(|&&t| t).count();
    let report = ScanReport {
        live: bits.len() - tomb,
        tomb,
        ops: rows,
    };

    render_mode(
        mode,
        &report,
        |r, w| {
            for row in &r.ops {
                writeln!(w, "{} {}", state(row.tomb), row.op)?;
            }
            Ok(())
        },
        |r, w| {
            pretty_section(w, "Tombstones")?;
            for row in &r.ops {
                writeln!(w, "{:<5} {:<24} {}", state(row.tomb), row.id, row.op)?;
            }
            pretty_rule(w)?;
            pretty_kv(w, "live", r.live.to_string())?;
            pretty_kv(w, "tomb", r.tomb.to_string())
        },
    )
}
