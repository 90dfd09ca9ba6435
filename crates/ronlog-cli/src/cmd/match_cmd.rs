use std::io::Write;

use anyhow::{Context, Result};
use clap::Args;
use ronlog_core::config::ProjectConfig;
use ronlog_core::hash::{Digest, DigestEncoding};
use serde::Serialize;

use super::{EncodingArg, parse_digest};
use crate::output::{OutputMode, pretty_kv, render_mode};

/// Arguments for `ronlog match`.
#[derive(Args, Debug)]
pub struct MatchArgs {
    /// Abbreviated (or full) digest.
    #[arg(value_name = "PREFIX")]
    pub prefix: String,

    /// Full digest, hex or base64.
    #[arg(value_name = "DIGEST")]
    pub digest: String,

    /// Encoding of PREFIX [default: `hash.encoding`].
    #[arg(long, value_enum)]
    pub encoding: Option<EncodingArg>,
}

#[derive(Debug, Serialize)]
struct MatchReport {
    prefix: String,
    digest: String,
    bits: u16,
    matches: bool,
}

/// Check whether PREFIX abbreviates DIGEST.
///
/// # Errors
///
/// Returns an error if either digest is malformed or they do not match.
pub fn run_match(args: &MatchArgs, mode: OutputMode, config: &ProjectConfig) -> Result<()> {
    let encoding = args.encoding.map_or(config.hash.encoding, DigestEncoding::from);
    let prefix = parse_digest(&args.prefix, encoding)
        .with_context(|| format!("invalid prefix {:?}", args.prefix))?;
    let digest = Digest::from_text(&args.digest)
        .with_context(|| format!("invalid digest {:?}", args.digest))?;

    let report = MatchReport {
        prefix: args.prefix.clone(),
        digest: digest.to_hex(),
        bits: prefix.bit_len(),
        matches: prefix.matches(&digest),
    };

    render_mode(
        mode,
        &report,
        |r, w| writeln!(w, "{}", if r.matches { "match" } else { "no match" }),
        |r, w| {
            pretty_kv(w, "prefix", format!("{} ({} bits)", r.prefix, r.bits))?;
            pretty_kv(w, "digest", &r.digest)?;
            pretty_kv(w, "result", if r.matches { "match" } else { "no match" })
        },
    )?;

    if !report.matches {
        anyhow::bail!("{} does not match {}", args.prefix, args.digest);
    }
    Ok(())
}
