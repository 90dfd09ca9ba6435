use std::fs;
use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use ronlog_core::config::ProjectConfig;
use serde::Serialize;
use tracing::info;

use super::{merge_frames, read_frames};
use crate::output::{OutputMode, pretty_kv, pretty_rule, pretty_section, render_mode};

/// Arguments for `ronlog merge`.
#[derive(Args, Debug)]
pub struct MergeArgs {
    /// Frame files to merge, in any order.
    #[arg(required = true, value_name = "FILE")]
    pub files: Vec<PathBuf>,

    /// Write the merged frame to PATH instead of stdout.
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct MergeReport {
    inputs: usize,
    ops: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    written_to: Option<String>,
    frame: String,
}

/// Merge frame files into one causally ordered frame.
///
/// # Errors
///
/// Returns an error if a file cannot be read or decoded, the merge is
/// rejected, or the output file cannot be written.
pub fn run_merge(args: &MergeArgs, mode: OutputMode, config: &ProjectConfig) -> Result<()> {
    let frames = read_frames(&args.files)?;
    let merged = merge_frames(&frames, config)?;
    let ops = merged.len();
    info!(inputs = frames.len(), ops, "merged frames");

    if let Some(path) = &args.output {
        fs::write(path, format!("{merged}\n"))
            .with_context(|| format!("failed to write {}", path.display()))?;
    }

    let report = MergeReport {
        inputs: frames.len(),
        ops,
        written_to: args.output.as_ref().map(|p| p.display().to_string()),
        frame: merged.into_string(),
    };

    render_mode(
        mode,
        &report,
        |r, w| match &r.written_to {
            Some(path) => writeln!(w, "wrote {} ops to {path}", r.ops),
            None => writeln!(w, "{}", r.frame),
        },
        |r, w| {
            pretty_section(w, "Merged frame")?;
            pretty_kv(w, "inputs", r.inputs.to_string())?;
            pretty_kv(w, "ops", r.ops.to_string())?;
            if let Some(path) = &r.written_to {
                pretty_kv(w, "written to", path)?;
            }
            pretty_rule(w)?;
            writeln!(w, "{}", r.frame)
        },
    )
}
