//! Plume CLI - Headless driver for Plume particle effect definitions

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{list, simulate};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "plume")]
#[command(about = "Load and simulate 2D particle effect definitions", long_about = None)]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the effects defined in a file
    List {
        /// Path to a TOML definition file
        file: PathBuf,
    },

    /// Run an effect headlessly and report particle counts
    Simulate {
        /// Path to a TOML definition file
        file: PathBuf,

        /// Effect name (defaults to the first effect in the file)
        #[arg(short, long)]
        effect: Option<String>,

        /// Number of frames to simulate
        #[arg(long, default_value = "120")]
        frames: u32,

        /// Seconds per frame
        #[arg(long, default_value = "0.016666668")]
        dt: f32,

        /// Spawn position X
        #[arg(long, default_value = "0", allow_hyphen_values = true)]
        x: f32,

        /// Spawn position Y
        #[arg(long, default_value = "0", allow_hyphen_values = true)]
        y: f32,

        /// Print a summary line every N frames (text format)
        #[arg(long, default_value = "10")]
        report_every: u32,

        /// Output format (text or json)
        #[arg(long, default_value = "text", value_parser = parse_format)]
        format: String,
    },
}

fn parse_format(s: &str) -> Result<String, String> {
    match s {
        "text" | "json" => Ok(s.to_string()),
        _ => Err(format!("unknown format '{}'; valid values: text, json", s)),
    }
}

/// Default log filter for a `-v` count; `RUST_LOG` still overrides it
fn log_filter(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(log_filter(cli.verbose)),
    )
    .init();

    match cli.command {
        Commands::List { file } => list::run(&file),
        Commands::Simulate {
            file,
            effect,
            frames,
            dt,
            x,
            y,
            report_every,
            format,
        } => simulate::run(simulate::SimulateArgs {
            file,
            effect,
            frames,
            dt,
            x,
            y,
            report_every,
            format,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_raises_log_filter() {
        assert_eq!(log_filter(0), "warn");
        assert_eq!(log_filter(1), "info");
        assert_eq!(log_filter(2), "debug");
        assert_eq!(log_filter(7), "trace");
    }

    #[test]
    fn verbose_flag_counts_after_subcommand() {
        let cli = Cli::try_parse_from(["plume", "list", "effects.toml", "-vv"]).unwrap();
        assert_eq!(cli.verbose, 2);
        assert_eq!(log_filter(cli.verbose), "debug");
    }
}
