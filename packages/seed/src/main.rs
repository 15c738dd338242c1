#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for seeding the civic map store.

use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use civic_map_cli_utils::{IndicatifProgress, init_logger};
use civic_map_database::villages::{upsert_villages, upsert_villages_sql};
use civic_map_database::{db, run_migrations};
use civic_map_seed::facilities::facilities_sql;
use civic_map_seed::population::population_sql;
use civic_map_seed::villages::parse_villages;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "civic_map_seed", about = "Civic map seed data tool")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a facility CSV into INSERT statements
    FacilitiesSql {
        /// Input CSV (`type,name,lat,lon,...,description`)
        input: PathBuf,
        /// Output SQL file
        output: PathBuf,
    },
    /// Convert a village population summary CSV into UPDATE statements
    PopulationSql {
        /// Input CSV with `name`, `gender_ratio`, `total_population`, and
        /// `age_average` columns
        input: PathBuf,
        /// Output SQL file
        output: PathBuf,
        /// County the villages belong to (e.g., "新竹市")
        #[arg(long)]
        county: String,
    },
    /// Import village boundaries from a `GeoJSON` `FeatureCollection`
    ImportVillages {
        /// Input `GeoJSON` file
        input: PathBuf,
        /// Write an upsert script here instead of connecting to `DATABASE_URL`
        #[arg(long)]
        sql: Option<PathBuf>,
    },
    /// Run database migrations
    Migrate,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = init_logger();
    let cli = Cli::parse();

    match cli.command {
        Commands::FacilitiesSql { input, output } => {
            let file = BufReader::new(File::open(&input)?);
            let out = facilities_sql(file)?;
            std::fs::write(&output, out.sql)?;
            log::info!(
                "Wrote {} facilities to {} ({} skipped)",
                out.inserted,
                output.display(),
                out.skipped
            );
        }
        Commands::PopulationSql {
            input,
            output,
            county,
        } => {
            let file = BufReader::new(File::open(&input)?);
            let sql = population_sql(file, &county)?;
            std::fs::write(&output, sql)?;
            log::info!("Wrote population updates to {}", output.display());
        }
        Commands::ImportVillages { input, sql } => {
            let text = std::fs::read_to_string(&input)?;
            let villages = parse_villages(&text)?;

            if let Some(path) = sql {
                std::fs::write(&path, upsert_villages_sql(&villages))?;
                log::info!("Wrote {} village upserts to {}", villages.len(), path.display());
            } else {
                let db = db::connect_from_env().await?;
                let progress = IndicatifProgress::rows_bar(&multi, "Upserting villages");
                upsert_villages(db.as_ref(), &villages, progress.as_ref()).await?;
            }
        }
        Commands::Migrate => {
            log::info!("Running database migrations...");
            let db = db::connect_from_env().await?;
            run_migrations(db.as_ref()).await?;
            log::info!("Migrations complete.");
        }
    }

    Ok(())
}
