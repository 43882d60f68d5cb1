//! Cache management CLI commands.

use std::path::{Path, PathBuf};

use clap::{Args, Subcommand};
use whiffy::cache::{clear, disk_stats, CacheStats};
use whiffy::config::ConfigFile;

use crate::error::CliError;

/// Cache action subcommands.
#[derive(Debug, Subcommand)]
pub enum CacheAction {
    /// Delete every cached response
    Clear,
    /// Show disk cache statistics
    Stats,
}

/// Where to find the cache.
#[derive(Debug, Args)]
pub struct CacheArgs {
    /// Cache directory (overrides [cache] directory)
    #[arg(long, value_name = "DIR", global = true)]
    pub cache_dir: Option<PathBuf>,

    /// Config file (default: ~/.whiffy/config.ini)
    #[arg(long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,
}

impl CacheArgs {
    fn directory(&self) -> Result<PathBuf, CliError> {
        if let Some(dir) = &self.cache_dir {
            return Ok(dir.clone());
        }
        let config = match &self.config {
            Some(path) => ConfigFile::load_from(path)?,
            None => ConfigFile::load()?,
        };
        Ok(config.cache.directory)
    }
}

/// Run a cache subcommand.
pub fn run(action: CacheAction, args: CacheArgs) -> Result<(), CliError> {
    let cache_dir = args.directory()?;

    match action {
        CacheAction::Clear => {
            println!("Clearing disk cache at: {}", cache_dir.display());
            let removed = scan(&cache_dir, clear)?;
            println!(
                "Deleted {} entries and {} temporary files, freed {}",
                removed.entries,
                removed.temp_files,
                format_size(removed.bytes)
            );
        }
        CacheAction::Stats => {
            println!("Disk cache: {}", cache_dir.display());
            let stats = scan(&cache_dir, disk_stats)?;
            println!("  Entries: {}", stats.entries);
            if stats.temp_files > 0 {
                println!("  Temporary files: {}", stats.temp_files);
            }
            println!("  Size:    {}", format_size(stats.bytes));
        }
    }
    Ok(())
}

/// Runs a maintenance operation, treating a missing directory as empty.
fn scan(
    dir: &Path,
    op: fn(&Path) -> std::io::Result<CacheStats>,
) -> Result<CacheStats, CliError> {
    if !dir.exists() {
        return Ok(CacheStats::default());
    }
    op(dir).map_err(|error| CliError::Cache {
        path: dir.to_path_buf(),
        error,
    })
}

/// Formats a byte count for display.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];

    if bytes < 1024 {
        return format!("{} B", bytes);
    }
    let mut size = bytes as f64 / 1024.0;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", size, UNITS[unit])
}
