use crate::error::CliError;
use clap::Parser;
use commands::Commands;
use engine_config::settings::LoadSettings;
use engine_core::{
    progress::ProgressService,
    state::{JobProgressStore, sled_store::SledJobStore},
};
use std::{path::PathBuf, sync::Arc};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod commands;
mod error;
mod output;

#[derive(Parser)]
#[command(
    name = "vloader",
    version = "0.0.1",
    about = "Bulk load job inspection tool"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    // Initialize logger
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Progress {
            job,
            json,
            state_dir,
        } => {
            let service = ProgressService::new(open_job_store(state_dir)?);
            let report = service.job_report(&job).await?;
            if json {
                output::print_json(&report)?;
            } else {
                output::print_job_table(&report);
            }
        }
        Commands::Jobs { json, state_dir } => {
            let service = ProgressService::new(open_job_store(state_dir)?);
            let reports = service.all_reports().await?;
            if json {
                output::print_json(&reports)?;
            } else {
                output::print_jobs_table(&reports);
            }
        }
        Commands::Settings { config } => {
            let settings = match config {
                Some(path) => LoadSettings::load(&path).await?,
                None => {
                    info!("No settings file given, using defaults");
                    LoadSettings::default()
                }
            };
            output::print_json(&settings)?;
        }
    }

    Ok(())
}

fn open_job_store(state_dir: Option<String>) -> Result<Arc<dyn JobProgressStore>, CliError> {
    let path = match state_dir {
        Some(dir) => PathBuf::from(dir),
        None => dirs::home_dir()
            .ok_or_else(|| CliError::Unexpected("Could not determine home directory".into()))?
            .join(".vloader/state"),
    };

    let store = SledJobStore::open(&path).map_err(|source| CliError::StoreOpen {
        path: path.display().to_string(),
        source,
    })?;
    Ok(Arc::new(store))
}
