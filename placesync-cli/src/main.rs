//! PlaceSync CLI
//!
//! Command-line interface for projecting a place document to an editable
//! directory tree and rebuilding the document from edits.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use placesync_core::{extract_place, rebuild_place, ProjectConfig};

#[derive(Parser)]
#[command(name = "placesync")]
#[command(about = "Place document extraction and rebuild tool")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Project a place document into an editable directory tree
    Extract {
        /// Path to the input .rbxlx document
        input: PathBuf,

        /// Output directory for the projection
        output: PathBuf,

        /// Path to a placesync.json config file (default: ./placesync.json if present)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Rebuild a place document from an edited projection directory
    Rebuild {
        /// Projection directory produced by `extract`
        project: PathBuf,

        /// Path for the reconstructed document
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("placesync=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Extract {
            input,
            output,
            config,
        } => cmd_extract(input, output, config),
        Commands::Rebuild { project, output } => cmd_rebuild(project, output),
    }
}

fn cmd_extract(input: PathBuf, output: PathBuf, config: Option<PathBuf>) -> Result<()> {
    let document = std::fs::read_to_string(&input)
        .with_context(|| format!("Failed to read place document: {}", input.display()))?;
    let config = resolve_config(config)?;

    tracing::info!("Extracting {} into {}", input.display(), output.display());

    let stats = extract_place(&document, &output, &config)
        .context("Failed to extract place document")?;

    println!(
        "Extracted {} scripts, {} models, {} directories to {}",
        stats.scripts,
        stats.models,
        stats.directories,
        output.display()
    );
    if stats.excluded > 0 {
        println!("Excluded {} instances by class", stats.excluded);
    }
    Ok(())
}

fn cmd_rebuild(project: PathBuf, output: PathBuf) -> Result<()> {
    tracing::info!("Rebuilding {} from {}", output.display(), project.display());

    let stats = rebuild_place(&project, &output)
        .context("Failed to rebuild place document")?;

    println!(
        "Rebuilt {}: {} script patches, {} model patches, {} unchanged",
        output.display(),
        stats.patched_scripts,
        stats.patched_models,
        stats.unchanged
    );
    if stats.skipped > 0 {
        println!("Skipped {} files (missing or unlocatable)", stats.skipped);
    }
    Ok(())
}

fn resolve_config(explicit: Option<PathBuf>) -> Result<ProjectConfig> {
    match explicit {
        Some(path) => ProjectConfig::load(&path)
            .with_context(|| format!("Failed to load config: {}", path.display())),
        None => {
            let default_path = PathBuf::from("placesync.json");
            if default_path.exists() {
                ProjectConfig::load(&default_path).context("Failed to load placesync.json")
            } else {
                Ok(ProjectConfig::default())
            }
        }
    }
}
