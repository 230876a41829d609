//! Command-line front end for the focus stacking engine.

use clap::{Parser, ValueEnum};
use focus_stack::image::io::{save_frame, OutputFormat};
use focus_stack::natsort::sort_paths_naturally;
use focus_stack::prelude::*;
use log::{debug, info};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

type CliError = Box<dyn std::error::Error>;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Filetype {
    Jpg,
    Jpeg,
    Png,
    Tif,
}

impl From<Filetype> for OutputFormat {
    fn from(ft: Filetype) -> Self {
        match ft {
            Filetype::Jpg | Filetype::Jpeg => OutputFormat::Jpg,
            Filetype::Png => OutputFormat::Png,
            Filetype::Tif => OutputFormat::Tif,
        }
    }
}

/// Stack focus-bracketed photographs into a single all-in-focus composite.
#[derive(Debug, Parser)]
#[command(name = "focus-stack", version, about)]
struct Cli {
    /// Input image files, or a single directory to expand (naturally sorted).
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Output path. Defaults to `stacked.<ext>` for the chosen filetype.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output filetype. Defaults to the output path's extension, or jpg.
    #[arg(short, long, value_enum)]
    filetype: Option<Filetype>,

    /// Quality: 0-100 for jpg, 0-9 for png compression. Not valid for tif.
    #[arg(short, long)]
    quality: Option<u8>,

    /// Write a JSON run report to this path.
    #[arg(long)]
    report: Option<PathBuf>,

    /// Upper bound on pyramid depth.
    #[arg(long, default_value_t = 8)]
    max_levels: usize,

    /// Memory budget in mebibytes for resident aligned frames.
    #[arg(long, default_value_t = 2048)]
    memory_budget_mib: usize,
}

/// A path is stackable input when its extension is a supported filetype.
fn is_supported_input(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .and_then(OutputFormat::from_token)
        .is_some()
}

/// Expand a single-directory argument into its image files, naturally
/// sorted; explicit file lists are taken in the given order.
fn resolve_inputs(inputs: Vec<PathBuf>) -> Result<Vec<PathBuf>, CliError> {
    if inputs.len() == 1 && inputs[0].is_dir() {
        let dir = &inputs[0];
        let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)
            .map_err(|e| format!("cannot read directory {}: {e}", dir.display()))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file() && is_supported_input(p))
            .collect();
        sort_paths_naturally(&mut paths);
        if paths.is_empty() {
            return Err(format!("no supported image files in {}", dir.display()).into());
        }
        return Ok(paths);
    }
    Ok(inputs)
}

fn output_format(cli: &Cli) -> Result<OutputFormat, CliError> {
    if let Some(ft) = cli.filetype {
        return Ok(ft.into());
    }
    match &cli.output {
        Some(path) => path
            .extension()
            .and_then(|e| e.to_str())
            .and_then(OutputFormat::from_token)
            .ok_or_else(|| {
                format!(
                    "cannot infer output filetype from {}; pass --filetype",
                    path.display()
                )
                .into()
            }),
        None => Ok(OutputFormat::Jpg),
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let format = output_format(&cli)?;
    if let Some(q) = cli.quality {
        match format.quality_range() {
            Some((lo, hi)) if q < lo || q > hi => {
                return Err(format!(
                    "quality {q} outside the valid range {lo}..={hi} for {}",
                    format.extension()
                )
                .into());
            }
            None => {
                return Err(format!(
                    "{} output does not accept a quality parameter",
                    format.extension()
                )
                .into());
            }
            _ => {}
        }
    }
    let output = cli
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(format!("stacked.{}", format.extension())));

    let paths = resolve_inputs(cli.inputs)?;
    info!("stacking {} frames into {}", paths.len(), output.display());

    let params = StackParams {
        max_pyramid_levels: cli.max_levels,
        memory_budget_bytes: cli.memory_budget_mib * 1024 * 1024,
        ..StackParams::default()
    };
    let stacker = FocusStacker::new(params);
    let cancel = CancelToken::new();
    let out = match stacker.run(&paths, &LogProgress, &cancel)? {
        StackOutcome::Completed(out) => out,
        StackOutcome::Cancelled => return Err("run was cancelled".into()),
    };

    save_frame(&out.composite, &output, format, cli.quality)?;
    info!("wrote {}", output.display());

    if let Some(report_path) = cli.report {
        let file = std::fs::File::create(&report_path)
            .map_err(|e| format!("cannot create {}: {e}", report_path.display()))?;
        serde_json::to_writer_pretty(file, &out.report)?;
        info!("wrote report to {}", report_path.display());
    }
    Ok(())
}

/// Progress sink that forwards stage updates to the log.
struct LogProgress;

impl ProgressSink for LogProgress {
    fn report(&self, stage: &str, percent: f32) {
        debug!("{stage}: {percent:.0}%");
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        eprintln!("error: {err}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
