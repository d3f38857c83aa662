mod commands;
mod report;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use clicker_core::LegacyFormat;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ResetTarget {
    /// Set the score to zero
    Points,
    /// Forget every purchased upgrade
    Upgrades,
    /// Score and upgrades; achievements are always kept
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LegacyKind {
    /// JSON document with score, controls flag and achievements
    Document,
    /// score|controls|achievements|upgrades
    PipeV3,
    /// score|controls|achievements
    PipeV2,
    /// score|controls
    PipeV1,
}

impl From<LegacyKind> for LegacyFormat {
    fn from(kind: LegacyKind) -> Self {
        match kind {
            LegacyKind::Document => Self::Document,
            LegacyKind::PipeV3 => Self::PipeV3,
            LegacyKind::PipeV2 => Self::PipeV2,
            LegacyKind::PipeV1 => Self::PipeV1,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the decoded save
    Show {
        /// Print the save document as JSON instead
        #[arg(long)]
        json: bool,
    },
    /// Add points to the score
    AddPoints {
        #[arg(value_parser = clap::value_parser!(i64).range(0..))]
        amount: i64,
    },
    /// Remove points from the score (never below zero)
    RemovePoints {
        #[arg(value_parser = clap::value_parser!(i64).range(0..))]
        amount: i64,
    },
    /// Simulate manual clicks with the current upgrades
    Click {
        #[arg(long, default_value_t = 1)]
        count: u64,
    },
    /// Buy an upgrade by id
    Buy { id: String },
    /// Reset part of the progression
    Reset {
        #[arg(value_enum)]
        target: ResetTarget,
    },
    /// Catch one mini event and apply its reward
    MiniEvent {
        /// Seed for a reproducible reward
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Restore progress from the legacy backup (old.json)
    Restore {
        /// Apply the restore; without this only the decoded backup is shown
        #[arg(long)]
        yes: bool,
    },
    /// Copy the current save into a timestamped backup folder
    Backup,
    /// Write the current save as a legacy backup
    WriteLegacy {
        #[arg(value_enum)]
        format: LegacyKind,
    },
}

#[derive(Debug, Parser)]
#[command(name = "clicker-console", version)]
#[command(about = "Developer console for the clicker game save: inspect, adjust, migrate")]
pub struct Args {
    /// Save directory to use instead of %LOCALAPPDATA%/.assets
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// JSON file overriding the store layout (folder, file names, key)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    let store = commands::open_store(args.data_dir.as_deref(), args.config.as_deref())?;
    commands::run(args.command, store)
}
