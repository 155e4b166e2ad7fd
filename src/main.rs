//! CLI entrypoint for `quickmapper`.
//!
//! Takes a directory of BloodHound JSON exports (or prompts for one), loads
//! every export through the library engine, prints the triage summary, and
//! optionally writes CSV/TXT exports when an output directory is provided.
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use log::{LevelFilter, error};
use quickmapper::{
    engine::{Engine, EngineError},
    export::{save_delegation_txt, save_high_value_csv, save_sessions_csv},
    io::DEFAULT_MMAP_THRESHOLD_BYTES,
    report::render_summary,
};

#[derive(Parser, Debug)]
#[command(
    name = "quickmapper",
    version,
    about = "BloodHound JSON triage: high-value accounts, privileged sessions, unconstrained delegation"
)]
struct Args {
    /// Directory holding the BloodHound JSON files (prompted for when omitted)
    directory: Option<PathBuf>,

    /// Path to the output directory
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,

    /// Override mmap threshold in bytes. If zero, disable mmap.
    #[arg(long = "mmap-threshold", default_value_t = DEFAULT_MMAP_THRESHOLD_BYTES)]
    mmap_threshold: u64,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short = 'v', action = clap::ArgAction::Count)]
    verbose: u8,

    /// Control color output (auto, always, never)
    #[arg(long = "color", value_enum, default_value_t = ColorChoice::Auto)]
    color: ColorChoice,

    /// Suppress summary output (still writes exports if -o is provided)
    #[arg(short = 'q', long = "quiet")]
    quiet: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ColorChoice {
    Auto,
    Always,
    Never,
}

fn init_logger(verbosity: u8) {
    let level = match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    let _ = env_logger::Builder::from_default_env()
        .filter_level(level)
        .try_init();
}

fn prompt_for_directory() -> Result<PathBuf> {
    print!("Enter the path to your BloodHound JSON files: ");
    io::stdout().flush().context("flush stdout")?;
    let mut line = String::new();
    io::stdin()
        .read_line(&mut line)
        .context("read directory path from stdin")?;
    Ok(PathBuf::from(line.trim()))
}

fn write_exports(engine: &Engine, outdir: &Path) -> Result<()> {
    let ts = chrono::Local::now().format("%Y.%m.%d_%H.%M.%S");
    let hv = outdir.join(format!("quickmapper_high_value_{}.csv", ts));
    let sessions = outdir.join(format!("quickmapper_sessions_{}.csv", ts));
    let delegation = outdir.join(format!("quickmapper_unconstrained_delegation_{}.txt", ts));
    save_high_value_csv(engine, &hv).with_context(|| format!("write {}", hv.display()))?;
    save_sessions_csv(engine, &sessions)
        .with_context(|| format!("write {}", sessions.display()))?;
    save_delegation_txt(engine, &delegation)
        .with_context(|| format!("write {}", delegation.display()))?;
    Ok(())
}

fn main() {
    let args = Args::parse();
    init_logger(args.verbose);
    // Configure color policy
    match args.color {
        ColorChoice::Always => {
            colored::control::set_override(true);
        }
        ColorChoice::Never => {
            colored::control::set_override(false);
        }
        ColorChoice::Auto => {}
    }

    let directory = match args.directory {
        Some(d) => d,
        None => match prompt_for_directory() {
            Ok(d) => d,
            Err(e) => {
                error!("{:#}", e);
                std::process::exit(2);
            }
        },
    };

    let threshold = if args.mmap_threshold == 0 {
        u64::MAX
    } else {
        args.mmap_threshold
    };
    let mut engine = Engine::new();
    match engine.load_from_directory_with_threshold(&directory, threshold) {
        Ok(()) => {}
        Err(e @ EngineError::InvalidDirectory(_)) => {
            error!("{}. Please enter a valid path.", e);
            std::process::exit(2);
        }
        Err(e) => {
            error!("{}", e);
            std::process::exit(3);
        }
    }

    if !args.quiet {
        println!("{}", render_summary(&engine));
    }

    if let Some(outdir) = args.output {
        if let Err(e) = fs::create_dir_all(&outdir) {
            error!(
                "failed to create output directory {}: {}",
                outdir.display(),
                e
            );
            std::process::exit(4);
        }
        if let Err(e) = write_exports(&engine, &outdir) {
            error!("{:#}", e);
            std::process::exit(5);
        }
    }
}
