use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use ronlog_core::config::ProjectConfig;
use ronlog_core::hash::{Digest, DigestEncoding};
use serde::Serialize;

use super::{ChainArgs, EncodingArg, parse_digest, read_frame};
use crate::output::{OutputMode, render_mode};

/// Arguments for `ronlog verify`.
#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// Frame file to check.
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Claimed digests, one per op in frame order. Shorter text is read as
    /// an abbreviated digest.
    #[arg(required = true, value_name = "DIGEST")]
    pub digests: Vec<String>,

    #[command(flatten)]
    pub chain: ChainArgs,

    /// Encoding of abbreviated digests [default: `hash.encoding`].
    #[arg(long, value_enum)]
    pub encoding: Option<EncodingArg>,
}

#[derive(Debug, Serialize)]
struct VerifyRow {
    id: String,
    claimed: Option<String>,
    computed: String,
    ok: bool,
}

#[derive(Debug, Serialize)]
struct VerifyReport {
    ok: bool,
    ops: Vec<VerifyRow>,
}

/// Check claimed digests against the chain recomputed from a frame.
///
/// Prints one `OK`/`FAIL` line per op, then fails if any check failed.
///
/// # Errors
///
/// Returns an error when the frame does not hash or any digest disagrees.
pub fn run_verify(args: &VerifyArgs, mode: OutputMode, config: &ProjectConfig) -> Result<()> {
    let frame = read_frame(&args.file)?;
    let settings = args.chain.resolve(&frame, config)?;
    let encoding = args.encoding.map_or(config.hash.encoding, DigestEncoding::from);

    let claimed = args
        .digests
        .iter()
        .map(|text| parse_digest(text, encoding).with_context(|| format!("invalid digest {text:?}")))
        .collect::<Result<Vec<Digest>>>()?;
    let computed = settings
        .chain
        .hash_frame(&frame)
        .with_context(|| format!("failed to hash {}", args.file.display()))?;
    let ops = frame.ops()?;

    let rows: Vec<VerifyRow> = ops
        .iter()
        .zip(&computed)
        .enumerate()
        .map(|(i, (op, actual))| {
            let expected = claimed.get(i);
            VerifyRow {
                id: op.id.to_string(),
                claimed: expected.map(|d| d.encode(encoding)),
                computed: actual.encode(encoding),
                ok: expected.is_some_and(|d| d.matches(actual)),
            }
        })
        .collect();
    let result = settings.chain.verify(&frame, &claimed);
    let report = VerifyReport {
        ok: result.is_ok(),
        ops: rows,
    };

    let print = |r: &VerifyReport, w: &mut dyn Write| -> std::io::Result<()> {
        for row in &r.ops {
            if row.ok {
                writeln!(w, "OK   {}", row.id)?;
            } else {
                writeln!(w, "FAIL {} (computed {})", row.id, row.computed)?;
            }
        }
        if claimed.len() != computed.len() {
            writeln!(w, "FAIL {} digests for {} ops", claimed.len(), computed.len())?;
        }
        Ok(())
    };
    render_mode(mode, &report, print, print)?;

    result.context("verify: failed")?;
    if !mode.is_json() {
        println!("verify: success");
    }
    Ok(())
}
