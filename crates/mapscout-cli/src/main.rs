use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod search;

#[derive(Debug, Parser)]
#[command(name = "mapscout-cli")]
#[command(about = "Extract business listings from a map search")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run one search session and write every record as a JSON line.
    Search {
        /// Business category, e.g. "bakery".
        #[arg(long)]
        category: String,
        #[arg(long)]
        region: String,
        #[arg(long)]
        city: String,
        /// Narrows the search to one district of the city.
        #[arg(long)]
        district: Option<String>,
        /// Output file; defaults to a timestamped file in the working directory.
        #[arg(long, short)]
        output: Option<PathBuf>,
        /// Run the browser without a window, overriding `MAPSCOUT_HEADLESS`.
        #[arg(long)]
        headless: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut config = mapscout_core::load_app_config()?;

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Some(Commands::Search {
            category,
            region,
            city,
            district,
            output,
            headless,
        }) => {
            if headless {
                config.headless = true;
            }
            let mut query = mapscout_scraper::SearchQuery::new(category, region, city);
            if let Some(district) = district {
                query = query.with_district(district);
            }
            search::run_search(&config, &query, output).await?;
        }
        None => Cli::command().print_help()?,
    }

    Ok(())
}
