#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs contraption battles and shares layouts.

mod battle;
mod config;
mod layout;

use std::{fs, path::PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use contraption_system_builder::BuildGrid;

use crate::{
    battle::{run_battle, BattleFiles},
    config::BattleConfig,
    layout::{budget_summary, encode_share_code, parse_layout, render_glyphs, SHARE_CODE_HEADER},
};

#[derive(Parser, Debug)]
#[command(
    name = "contraption",
    version,
    about = "Simulate contraption battles and render them to video"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Simulate a battle between two layouts and encode it as a video.
    Battle(BattleArgs),
    /// Print a layout's grid and remaining part budget.
    Board {
        /// Layout file or share code.
        layout: String,
    },
    /// Print a one-line share code for a layout.
    Share {
        /// Layout file or share code.
        layout: String,
    },
}

#[derive(Args, Debug)]
struct BattleArgs {
    /// Green team layout file or share code.
    #[arg(long)]
    green: String,
    /// Purple team layout file or share code.
    #[arg(long)]
    purple: String,
    /// Destination video file.
    #[arg(long)]
    output: PathBuf,
    /// Battle configuration (TOML).
    #[arg(long)]
    config: Option<PathBuf>,
    /// Soundtrack muxed into the video.
    #[arg(long)]
    audio: Option<PathBuf>,
    /// PNG refreshed with the latest frame while simulating.
    #[arg(long)]
    preview: Option<PathBuf>,
    /// Debris seed, overriding the configuration.
    #[arg(long)]
    seed: Option<u64>,
    /// Font for the victory caption, overriding the configuration.
    #[arg(long)]
    font: Option<PathBuf>,
}

/// Entry point for the contraption command-line interface.
fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match Cli::parse().command {
        Command::Battle(args) => battle(&args),
        Command::Board { layout } => {
            let grid = read_layout(&layout)?;
            println!("{}", render_glyphs(&grid));
            println!("{}", budget_summary(&grid));
            if let Err(error) = grid.validate_for_battle() {
                println!("not ready: {error}");
            }
            Ok(())
        }
        Command::Share { layout } => {
            let grid = read_layout(&layout)?;
            println!("{}", encode_share_code(&grid)?);
            Ok(())
        }
    }
}

fn battle(args: &BattleArgs) -> Result<()> {
    let green = read_layout(&args.green).context("invalid green layout")?;
    let purple = read_layout(&args.purple).context("invalid purple layout")?;
    let mut config = BattleConfig::load(args.config.as_deref())?;
    if args.seed.is_some() {
        config.simulation.seed = args.seed;
    }
    if let Some(font) = &args.font {
        config.rendering.caption_font = Some(font.clone());
    }

    let files = BattleFiles {
        output: &args.output,
        audio: args.audio.as_deref(),
        preview: args.preview.as_deref(),
    };
    let summary = run_battle(&green, &purple, &files, &config)?;

    println!("{}", summary.report.outcome.headline());
    println!(
        "{} ({:.1}s, {} bytes{})",
        args.output.display(),
        summary.video.output_secs,
        summary.video.bytes,
        if summary.oversized {
            ", too large to upload"
        } else {
            ""
        }
    );
    Ok(())
}

/// Accepts a share code directly or a path to a layout file.
fn read_layout(source: &str) -> Result<BuildGrid> {
    if source.starts_with(SHARE_CODE_HEADER) {
        return Ok(parse_layout(source)?);
    }
    let text =
        fs::read_to_string(source).with_context(|| format!("failed to read layout {source}"))?;
    parse_layout(&text).with_context(|| format!("invalid layout in {source}"))
}
