//! Whiffy CLI - Command-line interface
//!
//! Downloads every feature in a bounding box from a WFS server that caps
//! its responses, writing a single GeoJSON FeatureCollection.

mod commands;
mod error;

use clap::{Parser, Subcommand};

use commands::cache::{CacheAction, CacheArgs};
use commands::common::QueryArgs;
use commands::get::GetArgs;

#[derive(Parser)]
#[command(name = "whiffy")]
#[command(version = whiffy::VERSION)]
#[command(about = "Retrieve complete feature collections from query-limited WFS servers")]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Retrieve, merge and deduplicate all features in the bounds
    Get(GetArgs),

    /// Print the accepted regions as JSON lines without merging
    Frontier(QueryArgs),

    /// Manage the response cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,

        #[command(flatten)]
        args: CacheArgs,
    },
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Get(args) => commands::get::run(args, cli.verbose),
        Commands::Frontier(args) => commands::frontier::run(args, cli.verbose),
        Commands::Cache { action, args } => commands::cache::run(action, args),
    };

    if let Err(e) = result {
        e.exit();
    }
}
