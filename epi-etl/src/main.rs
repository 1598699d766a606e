use std::path::PathBuf;
use std::sync::Arc;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing::info;

use epi_core::domain::DatasetKind;
use epi_core::storage::{SqliteStorage, Storage};
use epi_etl::config::EtlConfig;
use epi_etl::ingest::{fetch::download_extract, read_csv_table};
use epi_etl::load::LoadReport;
use epi_etl::logging::init_logging;
use epi_etl::query::{SeriesQuery, TimeSeriesEngine, TimeSeriesPoint};

#[derive(Parser)]
#[command(name = "epi-etl")]
#[command(about = "COVID-19 and Mpox dimensional warehouse: fetch, load, and query")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download raw source extracts to the data directory
    Fetch {
        /// Restrict to one dataset (default: both)
        #[arg(long)]
        dataset: Option<DatasetKind>,
    },
    /// Normalize a raw extract and replace the dataset's fact table
    Load {
        #[arg(long)]
        dataset: DatasetKind,
        /// Extract to load (default: the fetched file in the data directory)
        #[arg(long)]
        input: Option<PathBuf>,
    },
    /// Read a metric time series from a fact table
    Query {
        #[arg(long)]
        dataset: DatasetKind,
        #[arg(long)]
        metric: String,
        #[arg(long)]
        location_id: Option<i64>,
        /// Inclusive lower date bound (YYYY-MM-DD)
        #[arg(long)]
        from: Option<NaiveDate>,
        /// Inclusive upper date bound (YYYY-MM-DD)
        #[arg(long)]
        to: Option<NaiveDate>,
        #[arg(long, default_value_t = 0)]
        offset: usize,
        #[arg(long)]
        limit: Option<usize>,
        /// Emit JSON instead of plain text
        #[arg(long)]
        json: bool,
    },
    /// Aggregate summary for a dataset
    Stats {
        #[arg(long)]
        dataset: DatasetKind,
        #[arg(long)]
        location_id: Option<i64>,
        #[arg(long)]
        json: bool,
    },
    /// List the location dimension
    Locations {
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load environment variables
    dotenv::dotenv().ok();
    init_logging();

    let config = EtlConfig::load()?;
    let storage: Arc<dyn Storage> = Arc::new(SqliteStorage::open(&config.database_path)?);

    match cli.command {
        Commands::Fetch { dataset } => {
            let datasets = match dataset {
                Some(d) => vec![d],
                None => vec![DatasetKind::Covid, DatasetKind::Mpox],
            };
            let client = reqwest::Client::new();
            for dataset in datasets {
                let dest = config.extract_path(dataset);
                download_extract(&client, config.source_url(dataset), &dest).await?;
                println!("✅ Fetched {} extract to {}", dataset, dest.display());
            }
        }
        Commands::Load { dataset, input } => {
            let path = input.unwrap_or_else(|| config.extract_path(dataset));
            info!("Loading {} from {}", dataset, path.display());
            let table = read_csv_table(&path)?;
            let report = epi_etl::pipeline::run_load(storage, dataset, &table).await?;
            print_report(&report);
        }
        Commands::Query {
            dataset,
            metric,
            location_id,
            from,
            to,
            offset,
            limit,
            json,
        } => {
            let engine = TimeSeriesEngine::new(storage);
            let query = SeriesQuery {
                metric,
                location_id,
                date_from: from,
                date_to: to,
                offset,
                limit,
            };
            let points = engine.series(dataset, &query).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&points)?);
            } else {
                for point in &points {
                    print_point(point);
                }
                println!("{} row(s)", points.len());
            }
        }
        Commands::Stats {
            dataset,
            location_id,
            json,
        } => {
            let engine = TimeSeriesEngine::new(storage);
            let stats = engine.stats(dataset, location_id).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                println!("dataset:            {}", stats.dataset);
                println!("rows:               {}", stats.row_count);
                println!("total cases:        {}", fmt_value(stats.total_cases));
                println!("total deaths:       {}", fmt_value(stats.total_deaths));
                println!("latest date:        {}", fmt_date(stats.latest_date));
                if stats.dataset == DatasetKind::Covid {
                    println!("total vaccinations: {}", fmt_value(stats.total_vaccinations));
                    println!("people vaccinated:  {}", fmt_value(stats.people_vaccinated));
                }
            }
        }
        Commands::Locations { json } => {
            let locations = storage.load_locations().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&locations)?);
            } else {
                for location in &locations {
                    println!("{:>6}  {}", location.location_id, location.location_name);
                }
                println!("{} location(s)", locations.len());
            }
        }
    }

    Ok(())
}

fn print_report(report: &LoadReport) {
    println!(
        "✅ {} load complete: {} rows loaded, {} skipped",
        report.dataset, report.rows_loaded, report.rows_skipped
    );
    for error in &report.errors {
        println!("   ⚠️  {error}");
    }
}

fn print_point(point: &TimeSeriesPoint) {
    println!(
        "{}  {:>6}  {:<24}  {}",
        fmt_date(point.date),
        point.location_id,
        point.location_name,
        fmt_value(point.value)
    );
}

fn fmt_date(date: Option<NaiveDate>) -> String {
    date.map(|d| d.to_string()).unwrap_or_else(|| "null".to_string())
}

fn fmt_value(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "null".to_string())
}
