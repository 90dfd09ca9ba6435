#![forbid(unsafe_code)]

mod cmd;
mod output;

use anyhow::Context;
use clap::{CommandFactory, Parser, Subcommand};
use output::{CliError, OutputMode};
use ronlog_core::config::resolve_config;
use std::env;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    name = "ronlog",
    author,
    version,
    about = "ronlog: merge, scan and hash replicated op frames",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    /// Output format.
    #[arg(long, global = true, value_enum)]
    format: Option<OutputMode>,

    /// Emit JSON output (same as `--format json`).
    #[arg(long, global = true, hide = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "Frames",
        about = "Merge frame files",
        long_about = "Merge frame files into one causally ordered frame. Input order does not matter.",
        after_help = "EXAMPLES:\n    # Merge two replicas of an object\n    ronlog merge left.ron right.ron\n\n    # Write the result to a file\n    ronlog merge left.ron right.ron -o merged.ron\n\n    # Emit machine-readable output\n    ronlog merge left.ron right.ron --json"
    )]
    Merge(cmd::merge::MergeArgs),

    #[command(
        next_help_heading = "Frames",
        about = "Show tombstoned ops",
        long_about = "Report, op by op, whether a merged frame's ops are live or removed.",
        after_help = "EXAMPLES:\n    # Scan a merged frame\n    ronlog scan merged.ron\n\n    # Emit machine-readable output\n    ronlog scan merged.ron --json"
    )]
    Scan(cmd::scan::ScanArgs),

    #[command(
        next_help_heading = "Frames",
        about = "Print the visible text of an array",
        long_about = "Merge frame files and print the string atoms of the ops still live.",
        after_help = "EXAMPLES:\n    # Render the text of a replicated array\n    ronlog text left.ron right.ron"
    )]
    Text(cmd::text::TextArgs),

    #[command(
        next_help_heading = "Integrity",
        about = "Print op digests",
        long_about = "Compute the chained digest of every op in a frame.",
        after_help = "EXAMPLES:\n    # Hash with the configured seed and encoding\n    ronlog hash merged.ron\n\n    # Pick seed, type and encoding explicitly\n    ronlog hash merged.ron --seed 0+src --type rga --encoding hex"
    )]
    Hash(cmd::hash::HashArgs),

    #[command(
        next_help_heading = "Integrity",
        about = "Check claimed op digests",
        long_about = "Recompute a frame's digests and compare them with claimed, possibly abbreviated, digests.",
        after_help = "EXAMPLES:\n    # Verify one digest per op\n    ronlog verify merged.ron a~d59U09 Xc0Ew\n\n    # Verify hex prefixes\n    ronlog verify merged.ron 97fa0525 3bd1 --encoding hex"
    )]
    Verify(cmd::verify::VerifyArgs),

    #[command(
        next_help_heading = "Integrity",
        about = "Test a digest prefix",
        long_about = "Check whether an abbreviated digest is a prefix of a full digest.",
        after_help = "EXAMPLES:\n    # Base64 prefix\n    ronlog match a~d5 a~d59U09XcgV~athSV_lLyztAJlalcAIoKnk8ldEEUl\n\n    # Hex prefix\n    ronlog match 97fa 97fa0525e009867adffe5e2c71f93057dfb8293c25c27292cd4caf230a0e39ec --encoding hex"
    )]
    Match(cmd::match_cmd::MatchArgs),

    #[command(
        next_help_heading = "Shell",
        about = "Generate shell completion scripts",
        after_help = "EXAMPLES:\n    # Generate bash completions\n    ronlog completions bash"
    )]
    Completions(cmd::completions::CompletionsArgs),
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("RONLOG_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if verbose || env::var("DEBUG").is_ok() {
            "ronlog=debug,info"
        } else {
            "ronlog=info,warn"
        })
    });

    let format = env::var("RONLOG_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let project_root = env::current_dir()?;
    let config = resolve_config(&project_root, cli.json).context("failed to load config")?;
    let output = output::resolve_output_mode(cli.format, &config.resolved_output);
    debug!(?output, "resolved output mode");

    if cli.verbose {
        info!("Verbose mode enabled");
    }

    let project = &config.project;
    let command_result = match cli.command {
        Commands::Merge(ref args) => cmd::merge::run_merge(args, output, project),
        Commands::Scan(ref args) => cmd::scan::run_scan(args, output),
        Commands::Text(ref args) => cmd::text::run_text(args, output, project),
        Commands::Hash(ref args) => cmd::hash::run_hash(args, output, project),
        Commands::Verify(ref args) => cmd::verify::run_verify(args, output, project),
        Commands::Match(ref args) => cmd::match_cmd::run_match(args, output, project),
        Commands::Completions(ref args) => {
            let mut command = Cli::command();
            cmd::completions::run_completions(args.shell, &mut command)
        }
    };

    if let Err(err) = command_result {
        output::render_error(output, &CliError::from_anyhow(&err))?;
        std::process::exit(1);
    }
    Ok(())
}
