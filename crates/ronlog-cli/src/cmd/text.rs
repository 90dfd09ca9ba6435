use std::io::Write;
use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use ronlog_core::config::ProjectConfig;
use ronlog_core::crdt::visible_text;
use serde::Serialize;

use super::{merge_frames, read_frames};
use crate::output::{OutputMode, pretty_kv, pretty_section, render_mode};

/// Arguments for `ronlog text`.
#[derive(Args, Debug)]
pub struct TextArgs {
    /// Frame files holding one array object.
    #[arg(required = true, value_name = "FILE")]
    pub files: Vec<PathBuf>,
}

#[derive(Debug, Serialize)]
struct TextReport {
    ops: usize,
    chars: usize,
    text: String,
}

/// Merge the files and print the live string content of the array.
///
/// # Errors
///
/// Returns an error if the files do not merge or the result does not scan.
pub fn run_text(args: &TextArgs, mode: OutputMode, config: &ProjectConfig) -> Result<()> {
    let frames = read_frames(&args.files)?;
    let merged = merge_frames(&frames, config)?;
    let text = visible_text(&merged)?;
    let report = TextReport {
        ops: merged.len(),
        chars: text.chars().count(),
        text,
    };

    render_mode(
        mode,
        &report,
        |r, w| writeln!(w, "{}", r.text),
        |r, w| {
            pretty_section(w, "Visible text")?;
            pretty_kv(w, "ops", r.ops.to_string())?;
            pretty_kv(w, "chars", r.chars.to_string())?;
            writeln!(w)?;
            writeln!(w, "{}", r.text)
        },
    )
}
