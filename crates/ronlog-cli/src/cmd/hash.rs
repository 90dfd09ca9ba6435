use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use ronlog_core::config::ProjectConfig;
use ronlog_core::hash::DigestEncoding;
use serde::Serialize;

use super::{ChainArgs, EncodingArg, read_frame};
use crate::output::{OutputMode, pretty_kv, pretty_rule, pretty_section, render_mode};

/// Arguments for `ronlog hash`.
#[derive(Args, Debug)]
pub struct HashArgs {
    /// Frame file to hash.
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    #[command(flatten)]
    pub chain: ChainArgs,

    /// Digest text encoding [default: `hash.encoding`].
    #[arg(long, value_enum)]
    pub encoding: Option<EncodingArg>,
}

#[derive(Debug, Serialize)]
struct HashRow {
    id: String,
    digest: String,
}

#[derive(Debug, Serialize)]
struct HashReport {
    seed: String,
    rdt: String,
    algorithm: String,
    encoding: DigestEncoding,
    ops: Vec<HashRow>,
}

/// Print the chained digest of every op in a frame.
///
/// # Errors
///
/// Returns an error if the file does not decode, a flag is invalid, or a ref
/// does not name an earlier op.
pub fn run_hash(args: &HashArgs, mode: OutputMode, config: &ProjectConfig) -> Result<()> {
    let frame = read_frame(&args.file)?;
    let settings = args.chain.resolve(&frame, config)?;
    let encoding = args.encoding.map_or(config.hash.encoding, DigestEncoding::from);

    let digests = settings
        .chain
        .hash_frame(&frame)
        .with_context(|| format!("failed to hash {}", args.file.display()))?;
    let ops = frame.ops()?;

    let report = HashReport {
        seed: settings.seed.to_string(),
        rdt: settings.rdt.to_string(),
        algorithm: format!("{:?}", settings.algorithm).to_lowercase(),
        encoding,
        ops: ops
            .iter()
            .zip(&digests)
            .map(|(op, digest)| HashRow {
                id: op.id.to_string(),
                digest: digest.encode(encoding),
            })
            .collect(),
    };

    render_mode(
        mode,
        &report,
        |r, w| {
            for row in &r.ops {
                writeln!(w, "{} {}", row.digest, row.id)?;
            }
            Ok(())
        },
        |r, w| {
            pretty_section(w, "Op digests")?;
            pretty_kv(w, "seed", &r.seed)?;
            pretty_kv(w, "type", &r.rdt)?;
            pretty_kv(w, "algorithm", &r.algorithm)?;
            pretty_rule(w)?;
            for row in &r.ops {
                writeln!(w, "{:<24} {}", row.id, row.digest)?;
            }
            Ok(())
        },
    )
}
