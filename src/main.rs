use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use custpulse::{cli, config, web};

#[derive(Debug, Parser)]
#[command(name = "custpulse")]
#[command(about = "Predictive customer behavior analytics")]
struct App {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Parse CSV files and list the customers they contain
    Preview {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Output format: table (default), json, csv
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Run one analysis over CSV files and/or manually specified customers
    Analyze {
        files: Vec<PathBuf>,
        /// A customer as `field=value;field=value` (repeatable)
        #[arg(long = "customer")]
        customers: Vec<String>,
        /// Output format: table (default), json
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Show the distribution of one numeric column
    Histogram {
        file: PathBuf,
        /// Column header or key, e.g. "Total Purchase Amount" or visitFrequency
        #[arg(long)]
        column: String,
        /// Number of bins (default from config)
        #[arg(long)]
        bins: Option<usize>,
    },
    /// Re-emit CSV files with the canonical header
    Export {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Show past analysis runs from the run log
    History {
        /// Output format: table (default), json, csv
        #[arg(long, default_value = "table")]
        format: String,
        /// Only include the last N days
        #[arg(long)]
        days: Option<u32>,
    },
    /// Serve the interactive dashboard
    Web {
        /// Listen address (default from config)
        #[arg(long)]
        addr: Option<String>,
    },
    /// Check credential, configuration and run log
    Health,
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Debug, Subcommand)]
enum ConfigAction {
    /// Show the effective configuration
    Show,
    /// Write a default config file to ~/.custpulse/config.toml
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Set one key in the global config file, e.g. `dashboard.bins 8`
    Set { key: String, value: String },
    /// Print the global config file path
    Path,
}

fn main() -> Result<()> {
    let app = App::parse();

    match app.command {
        Commands::Preview { files, format } => {
            let fmt = cli::OutputFormat::from_str_opt(Some(&format));
            cli::run_preview(&files, fmt)
        }
        Commands::Analyze {
            files,
            customers,
            format,
        } => {
            let fmt = cli::OutputFormat::from_str_opt(Some(&format));
            cli::run_analyze(&files, &customers, fmt)
        }
        Commands::Histogram { file, column, bins } => cli::run_histogram(&file, &column, bins),
        Commands::Export { files } => cli::run_export(&files),
        Commands::History { format, days } => {
            let fmt = cli::OutputFormat::from_str_opt(Some(&format));
            cli::run_history(fmt, days)
        }
        Commands::Web { addr } => {
            let config = config::load();
            let addr = addr.unwrap_or_else(|| config.dashboard.addr.clone());
            web::serve(&addr, config)
        }
        Commands::Health => cli::run_health(),
        Commands::Config { action } => match action {
            ConfigAction::Show => cli::run_config_show(),
            ConfigAction::Init { force } => cli::run_config_init(force),
            ConfigAction::Set { key, value } => cli::run_config_set(&key, &value),
            ConfigAction::Path => cli::run_config_path(),
        },
    }
}
