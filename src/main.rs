pub mod types;
pub mod config;
pub mod data;
pub mod processing;
pub mod render;
pub mod server;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the dataset and serve the dashboard (default)
    Serve {
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,
    },
    /// Load the dataset and print access point totals per borough
    Summary {
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Serve { config: None }) {
        Commands::Serve { config } => {
            info!(?config, "Serving dashboard");
            let app_config = config::AppConfig::load(config.as_deref())?;

            // Loaded once; a failure here is fatal.
            let dataset = data::load_data(&app_config).await?;

            server::start_server(app_config, dataset).await?;
        }
        Commands::Summary { config } => {
            let app_config = config::AppConfig::load(config.as_deref())?;
            let dataset = data::load_data(&app_config).await?;

            let width = dataset
                .borough_totals
                .iter()
                .map(|t| t.borough.chars().count())
                .max()
                .unwrap_or(0)
                .max("Alcaldía".chars().count());
            println!("{:<width$}  Puntos_de_acceso", "Alcaldía", width = width);
            for total in &dataset.borough_totals {
                println!("{:<width$}  {:>16}", total.borough, total.access_points, width = width);
            }
        }
    }

    Ok(())
}
