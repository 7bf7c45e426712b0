//! Command-line interface for inspecting the registry feed.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::archive_url;
use crate::error::Result;
use crate::fetch::{fetch_registry, parse_archive};
use crate::types::ParsedRegistry;

/// Feldplan Importer - inspect the BLV plant protection product registry.
#[derive(Parser)]
#[command(name = "feldplan-importer")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Download (or read) the registry archive and print summary counts.
    Inspect {
        /// Archive URL (default: the published BLV download)
        #[arg(short, long)]
        url: Option<String>,

        /// Read a local archive file instead of downloading
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Run the CLI.
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Inspect { url, file } => inspect_command(url.as_deref(), file.as_deref()),
    }
}

fn inspect_command(url: Option<&str>, file: Option<&std::path::Path>) -> Result<()> {
    let registry = match file {
        Some(path) => {
            let data = std::fs::read(path)?;
            parse_archive(&data)?
        }
        None => {
            let url = url.map(String::from).unwrap_or_else(archive_url);
            fetch_registry(&url)?
        }
    };

    print_summary(&registry);
    Ok(())
}

fn print_summary(registry: &ParsedRegistry) {
    println!("crops:       {}", registry.crops.len());
    println!("pests:       {}", registry.pests.len());
    println!("conditions:  {}", registry.conditions.len());
    println!("products:    {}", registry.products.len());
    println!("indications: {}", registry.indication_count());
    if registry.skipped_products > 0 {
        println!(
            "skipped:     {} product entries without name or number",
            registry.skipped_products
        );
    }
}
