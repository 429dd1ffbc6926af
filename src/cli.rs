//! Command-line interface definitions using clap

use std::fs;
use std::path::Path;

use clap::{Parser, Subcommand};
use colored::Colorize;

use crate::config::StaticConfig;
use crate::errors::{Result, ShortstatError};

#[derive(Parser)]
#[command(name = "shortstat")]
#[command(version)]
#[command(about = "URL shortener with per-link visit histograms", long_about = None)]
pub struct Cli {
    /// Path to config.toml
    #[arg(long, short = 'c', global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP server (default)
    Serve,

    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Write a sample configuration file
    Generate {
        output_path: Option<String>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Write the default configuration as TOML to `output_path`
/// (`config.example.toml` when omitted).
pub fn config_generate(output_path: Option<String>, force: bool) -> Result<String> {
    let path = output_path.unwrap_or_else(|| "config.example.toml".to_string());

    if !force && Path::new(&path).exists() {
        return Err(ShortstatError::config(format!(
            "{} already exists, use --force to overwrite",
            path
        )));
    }

    fs::write(&path, StaticConfig::generate_sample_config())
        .map_err(|e| ShortstatError::config(format!("Failed to write {}: {}", path, e)))?;

    println!(
        "  {} {}",
        "Configuration file generated successfully".green(),
        path.blue()
    );
    Ok(path)
}
