mod catalogue;
mod web;

use chrono::Utc;
use clap::{Parser, Subcommand};
use std::process::ExitCode;

use crate::web::api::dates::parse_date;
use crate::web::Config;

#[derive(Parser)]
#[command(name = "tle-catalog")]
#[command(about = "Satellite and solar position server backed by cached TLE catalogues")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the position API
    Serve {
        #[arg(short, long)]
        config: Option<String>,
    },
    /// Populate the catalogue cache for a date and report what was loaded
    Fetch {
        #[arg(short, long)]
        config: Option<String>,
        /// ISO-8601 date, defaults to now
        #[arg(short, long)]
        date: Option<String>,
        /// Print the name of every loaded record
        #[arg(short, long)]
        list: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { config } => serve(config.as_deref()).await,
        Commands::Fetch { config, date, list } => {
            fetch(config.as_deref(), date.as_deref(), list).await
        }
    }
}

fn load_config(path: Option<&str>) -> Option<Config> {
    let Some(path) = path else {
        return Some(Config::default());
    };
    match Config::from_file(path) {
        Ok(c) => Some(c),
        Err(e) => {
            eprintln!("Error loading config {}: {}", path, e);
            None
        }
    }
}

async fn serve(config_path: Option<&str>) -> ExitCode {
    let Some(config) = load_config(config_path) else {
        return ExitCode::FAILURE;
    };

    match web::run_server(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Server error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn fetch(config_path: Option<&str>, date: Option<&str>, list: bool) -> ExitCode {
    let Some(config) = load_config(config_path) else {
        return ExitCode::FAILURE;
    };

    let now = Utc::now();
    let date = match date.map(|d| parse_date(d, now)).transpose() {
        Ok(d) => d.unwrap_or(now),
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let registry = match web::build_registry(&config) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Error creating HTTP client: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let mut failed = false;
    for cache in registry.caches() {
        match cache.get_catalogue(date).await {
            Ok(catalogue) => {
                println!(
                    "{}: {} records ({})",
                    catalogue.key(),
                    catalogue.len(),
                    catalogue.provenance()
                );
                if list {
                    for name in catalogue.names() {
                        println!("  {}", name);
                    }
                }
            }
            Err(e) => {
                eprintln!("{}", e);
                failed = true;
            }
        }
    }

    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
