//! CLI for the roadshield resolver.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use clap_complete::Shell;
use roadshield_core::config;
use std::path::PathBuf;

use commands::{run_completions, run_networks, run_replay, run_resolve, run_url};

/// Top-level CLI for the roadshield resolver.
#[derive(Debug, Parser)]
#[command(name = "roadshield")]
#[command(about = "Resolve road-shield images for turn-by-turn street labels", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Resolve a shield and optionally save it as PNG.
    Resolve {
        /// Network code, e.g. "US:I".
        network: String,
        /// Route number, e.g. "90".
        number: String,
        /// Shield height in points (default: label_height_pt from config).
        #[arg(long, value_name = "PT")]
        height_pt: Option<f64>,
        /// Display pixels per point (default: display_scale from config).
        #[arg(long)]
        scale: Option<f64>,
        /// Write the shield bitmap to this PNG file.
        #[arg(long, value_name = "PATH")]
        out: Option<PathBuf>,
    },

    /// Print the metadata query URL for a shield without fetching it.
    Url {
        /// Network code, e.g. "US:I".
        network: String,
        /// Route number, e.g. "90".
        number: String,
        /// Target height in pixels.
        #[arg(long, default_value = "64", value_name = "PX")]
        height_px: f64,
    },

    /// List supported networks and their image-name templates.
    Networks,

    /// Replay step-progress events from a JSON file and print banner updates.
    Replay {
        /// Path to a JSON array of step-progress events.
        path: PathBuf,
    },

    /// Print shell completions.
    Completions {
        /// Target shell.
        shell: Shell,
    },
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Resolve {
                network,
                number,
                height_pt,
                scale,
                out,
            } => run_resolve(&cfg, &network, &number, height_pt, scale, out.as_deref()).await?,
            CliCommand::Url {
                network,
                number,
                height_px,
            } => run_url(&cfg, &network, &number, height_px)?,
            CliCommand::Networks => run_networks(&cfg),
            CliCommand::Replay { path } => run_replay(&cfg, &path).await?,
            CliCommand::Completions { shell } => run_completions(shell)?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
