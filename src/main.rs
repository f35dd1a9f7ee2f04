use anyhow::Context;
use clap::{Parser, Subcommand};
use drawing_diff::config::load_config_or_default;
use drawing_diff::logging::{init_logging, LoggingConfig};
use drawing_diff::pipeline::{Aligner, AlignmentOutcome, ChangePipeline, DiffRegion};
use drawing_diff::utils::{load_image, save_image, validate_image_size};
use serde::Serialize;
use std::path::PathBuf;

const MIN_IMAGE_SIZE: u32 = 10;
const MAX_IMAGE_SIZE: u32 = 10000;

#[derive(Parser)]
#[command(name = "drawdiff")]
#[command(about = "Alignment-tolerant change detection for scanned technical drawings")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (TOML or JSON); defaults are used when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare an original drawing against a modified capture and highlight
    /// the regions that changed
    Detect {
        /// Path to the original (reference) image
        #[arg(short, long)]
        original: PathBuf,

        /// Path to the modified image
        #[arg(short, long)]
        modified: PathBuf,

        /// Where to write the annotated result image
        #[arg(short = 'O', long)]
        output: PathBuf,

        /// Optional JSON report with the region list
        #[arg(short, long)]
        report: Option<PathBuf>,
    },

    /// Register a secondary image onto a reference image's frame and save the
    /// warped result
    Align {
        /// Path to the reference image
        #[arg(short = 'R', long)]
        reference: PathBuf,

        /// Path to the secondary image
        #[arg(short, long)]
        secondary: PathBuf,

        /// Where to write the warped image
        #[arg(short = 'O', long)]
        output: PathBuf,
    },
}

#[derive(Serialize)]
struct ChangeReport {
    changes_detected: usize,
    alignment: AlignmentOutcome,
    regions: Vec<DiffRegion>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let logging = LoggingConfig {
        level: match cli.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
        .to_string(),
        ..LoggingConfig::default()
    };
    let _guard = init_logging(&logging)?;

    let config = load_config_or_default(cli.config.as_deref());

    match cli.command {
        Commands::Detect {
            original,
            modified,
            output,
            report,
        } => handle_detect(&config, original, modified, output, report),
        Commands::Align {
            reference,
            secondary,
            output,
        } => handle_align(&config, reference, secondary, output),
    }
}

fn handle_detect(
    config: &drawing_diff::Config,
    original: PathBuf,
    modified: PathBuf,
    output: PathBuf,
    report: Option<PathBuf>,
) -> anyhow::Result<()> {
    let reference = load_image(&original)?;
    let secondary = load_image(&modified)?;

    validate_image_size(&reference, MIN_IMAGE_SIZE, MAX_IMAGE_SIZE)?;
    validate_image_size(&secondary, MIN_IMAGE_SIZE, MAX_IMAGE_SIZE)?;

    let pipeline = ChangePipeline::new(config);
    let outcome = pipeline.run(&reference, &secondary)?;

    save_image(&outcome.detection.annotated, &output)?;

    if !outcome.alignment.is_aligned() {
        println!("Note: alignment failed, the images were compared as-is.");
    }
    println!("Changes detected: {}", outcome.detection.change_count());

    if let Some(report_path) = report {
        let report_body = ChangeReport {
            changes_detected: outcome.detection.change_count(),
            alignment: outcome.alignment,
            regions: outcome.detection.regions.clone(),
        };
        let json = serde_json::to_string_pretty(&report_body)?;
        std::fs::write(&report_path, json)
            .with_context(|| format!("failed to write report to {}", report_path.display()))?;
        println!("Report saved to {}", report_path.display());
    }

    Ok(())
}

fn handle_align(
    config: &drawing_diff::Config,
    reference_path: PathBuf,
    secondary_path: PathBuf,
    output: PathBuf,
) -> anyhow::Result<()> {
    let reference = load_image(&reference_path)?;
    let secondary = load_image(&secondary_path)?;

    validate_image_size(&reference, MIN_IMAGE_SIZE, MAX_IMAGE_SIZE)?;
    validate_image_size(&secondary, MIN_IMAGE_SIZE, MAX_IMAGE_SIZE)?;

    let aligner = Aligner::from_config(config);
    let warped = aligner
        .align(&reference, &secondary)
        .map_err(|failure| anyhow::anyhow!("alignment failed: {failure}"))?;

    save_image(&warped, &output)?;
    println!("Aligned image saved to {}", output.display());

    Ok(())
}
