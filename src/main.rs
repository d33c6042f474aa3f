use std::path::PathBuf;

use anyhow::Context;
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{info, warn};

mod aggregate;
mod config;
mod dashboard;
mod db;
mod delays;
mod filter;
mod models;
mod normalize;
mod report;
mod snapshot;
mod summary;

use config::{AnalyticsConfig, FilterArgs};
use dashboard::Dashboard;
use filter::{CaseFilter, CaseQuery, SortDirection, SortField, SortState};
use normalize::Normalizer;
use snapshot::{RawSnapshot, Snapshot};

#[derive(Parser)]
#[command(name = "hr-pipeline-analytics")]
#[command(about = "Recruitment pipeline efficiency analytics", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct SourceArgs {
    /// Read rows from a JSON snapshot instead of Postgres
    #[arg(long)]
    snapshot: Option<PathBuf>,
    #[command(flatten)]
    filter: FilterArgs,
    #[command(flatten)]
    config: AnalyticsConfig,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load realistic seed data
    Seed,
    /// Import cases from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Print headline metrics
    Summary {
        #[command(flatten)]
        source: SourceArgs,
    },
    /// Search, sort and page through cases
    Cases {
        #[command(flatten)]
        source: SourceArgs,
        #[arg(long, default_value = "")]
        search: String,
        #[arg(long, value_enum, default_value_t = SortField::TimeToHire)]
        sort: SortField,
        /// Defaults to desc for time-to-hire and asc for every other field
        #[arg(long, value_enum)]
        direction: Option<SortDirection>,
        #[arg(long, default_value_t = 1)]
        page: usize,
    },
    /// Generate a markdown report
    Report {
        #[command(flatten)]
        source: SourceArgs,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
    /// Write every chart series as JSON
    Export {
        #[command(flatten)]
        source: SourceArgs,
        #[arg(long, default_value = "dashboard.json")]
        out: PathBuf,
    },
}

async fn connect() -> anyhow::Result<PgPool> {
    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to a production Postgres instance")?;

    PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")
}

/// Loads, normalizes and filters the four collections for one command.
async fn load_snapshot(source: &SourceArgs, filter: &CaseFilter) -> anyhow::Result<Snapshot> {
    let raw = match &source.snapshot {
        Some(path) => RawSnapshot::load(path)?,
        None => {
            let pool = connect().await?;
            db::fetch_snapshot(&pool, filter).await?
        }
    };

    let normalizer = Normalizer::new(Utc::now()).strict_created_at(source.config.strict_created_at);
    let normalized = raw.normalize(&normalizer);
    if !normalized.rejected.is_empty() {
        warn!(
            rejected = normalized.rejected.len(),
            "some rows were skipped during normalization"
        );
    }

    let mut snapshot = normalized.snapshot;
    let defaulted = snapshot
        .cases
        .iter()
        .filter(|case| case.created_at_defaulted)
        .count();
    if defaulted > 0 {
        warn!(cases = defaulted, "created_at missing, using load time");
    }
    snapshot.retain_cases(filter);
    info!(cases = snapshot.cases.len(), "snapshot ready");
    Ok(snapshot)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("hr_pipeline_analytics=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::InitDb => {
            let pool = connect().await?;
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            let pool = connect().await?;
            db::seed(&pool).await?;
            println!("Seed data inserted.");
        }
        Commands::Import { csv } => {
            let pool = connect().await?;
            let upserted = db::import_csv(&pool, &csv).await?;
            println!("Upserted {upserted} cases from {}.", csv.display());
        }
        Commands::Summary { source } => {
            let filter = CaseFilter::from(source.filter.clone());
            let snapshot = load_snapshot(&source, &filter).await?;
            let metrics = summary::headline_metrics(
                &snapshot.cases,
                &snapshot.events,
                &snapshot.surveys,
                &source.config.completed_status,
            );
            let range = summary::time_to_hire_range(&snapshot.cases);

            println!(
                "Cases: {} ({} completed, {}%)",
                metrics.total_cases, metrics.completed_cases, metrics.completion_rate
            );
            println!(
                "Avg. time to hire: {} days (fastest {}, slowest {})",
                metrics.avg_time_to_hire, range.min, range.max
            );
            println!("Process stages: {}", metrics.total_stages);
            println!(
                "Avg. satisfaction: {:.1} from {} responses",
                metrics.avg_satisfaction_score, metrics.survey_count
            );
        }
        Commands::Cases {
            source,
            search,
            sort,
            direction,
            page,
        } => {
            let filter = CaseFilter::from(source.filter.clone());
            let snapshot = load_snapshot(&source, &filter).await?;
            let mut sort = SortState::for_field(sort);
            if let Some(direction) = direction {
                sort.direction = direction;
            }
            let query = CaseQuery {
                search,
                filter,
                sort,
                page,
            };
            let result = filter::evaluate(&snapshot.cases, &query, source.config.page_size);
            print!("{}", report::render_case_table(&result));
        }
        Commands::Report { source, out } => {
            let filter = CaseFilter::from(source.filter.clone());
            let snapshot = load_snapshot(&source, &filter).await?;
            let dashboard = Dashboard::build(&snapshot, &source.config, Utc::now());
            std::fs::write(&out, report::build_report(&dashboard, &filter))?;
            println!("Report written to {}.", out.display());
        }
        Commands::Export { source, out } => {
            let filter = CaseFilter::from(source.filter.clone());
            let snapshot = load_snapshot(&source, &filter).await?;
            let dashboard = Dashboard::build(&snapshot, &source.config, Utc::now());
            std::fs::write(&out, report::export_json(&dashboard)?)?;
            println!("Dashboard series written to {}.", out.display());
        }
    }

    Ok(())
}
