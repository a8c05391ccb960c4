use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use acompanar::config::Config;
use acompanar::coordinator::ApiServer;
use acompanar::matching::MatchRunner;
use acompanar::models::Term;
use acompanar::storage::repository::{
    PgAvailabilityRepository, PgHistoryRepository, PgNotificationRepository,
    PgRosterRepository, PgSnapshotRepository,
};
use acompanar::storage::Database;

#[derive(Parser)]
#[command(
    name = "acompanar",
    version,
    about = "Teacher-specialist matching backend with change tracking and notifications",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (TOML); environment variables are used when absent
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json)
    #[arg(long, global = true, default_value = "text")]
    log_format: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server
    Serve,

    /// Run the match for one term and print the summary
    RunMatch {
        /// Term identifier (YYYY-N, e.g. 2025-1)
        periodo: String,
    },

    /// Create or upgrade the database schema
    InitDb,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_tracing(&cli.log_format, cli.verbose)?;

    let config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::from_env()?,
    };

    match cli.command {
        Commands::Serve => serve(config).await?,
        Commands::RunMatch { periodo } => run_match(config, &periodo).await?,
        Commands::InitDb => init_db(config).await?,
    }

    Ok(())
}

fn setup_tracing(format: &str, verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        tracing_subscriber::EnvFilter::new("acompanar=debug,info")
    } else {
        tracing_subscriber::EnvFilter::new("acompanar=info,warn")
    };

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }

    Ok(())
}

async fn serve(config: Config) -> Result<()> {
    if let Err(e) = acompanar::metrics::init_metrics() {
        tracing::warn!("metrics initialization failed: {e}");
    }

    let database = Database::connect(&config.database)?;
    database.ping().await?;

    let server = ApiServer::new(config, &database)?;
    server
        .start_with_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("shutdown signal received");
        })
        .await?;

    Ok(())
}

async fn run_match(config: Config, periodo: &str) -> Result<()> {
    let periodo: Term = periodo.parse()?;

    let database = Database::connect(&config.database)?;
    let pool = database.pool();

    let runner = MatchRunner::new(
        Arc::new(PgRosterRepository::new(pool.clone())),
        Arc::new(PgAvailabilityRepository::new(pool.clone())),
        Arc::new(PgSnapshotRepository::new(pool.clone())),
        Arc::new(PgHistoryRepository::new(pool.clone())),
        Arc::new(PgNotificationRepository::new(pool)),
        config.matching.audit_policy(),
    );

    let summary = runner.run(&periodo).await?;

    println!("{}", summary.message);
    println!("  Procesados: {}", summary.total_procesados);
    println!("  Con especialista: {}", summary.matches);
    println!("  Sin especialista: {}", summary.sin_match);

    Ok(())
}

async fn init_db(config: Config) -> Result<()> {
    let database = Database::connect(&config.database)?;
    database.init_schema().await?;
    println!("Schema ready.");
    Ok(())
}
