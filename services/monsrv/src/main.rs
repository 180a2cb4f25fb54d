//! Monsrv entry point

use alarm_core::{AlarmStore, AlarmTracker};
use clap::{Parser, Subcommand};
use monsrv::{
    config::MonsrvConfig, create_router, load_catalog, logging, shutdown::wait_for_shutdown,
    store, AppState, MonsrvError, Publisher, Result, Simulator,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(author, version, about = "Monsrv - plant monitoring and alarm service")]
struct Args {
    /// Configuration file (yaml, toml or json)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override the API port
    #[arg(short, long)]
    port: Option<u16>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Validate configuration, catalog and database, then exit
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = MonsrvConfig::load(args.config.as_deref())?;
    if let Some(port) = args.port {
        config.api.port = port;
        config.validate()?;
    }

    logging::init(&config.logging)?;
    info!("Starting {} v{}", config.service.name, env!("CARGO_PKG_VERSION"));
    match MonsrvConfig::source_path(args.config.as_deref()) {
        Some(path) => info!("Configuration loaded from {}", path.display()),
        None => info!("No config file, using defaults and environment"),
    }

    match args.command {
        Some(Commands::Check) => check(config).await,
        None => run(config).await,
    }
}

async fn run(config: MonsrvConfig) -> Result<()> {
    let catalog = Arc::new(load_catalog(&config)?);
    let pool = store::connect(&config.database).await?;
    store::seed_tags(&pool, &catalog).await?;

    let alarm_store: Arc<dyn AlarmStore> = Arc::new(store::SqliteAlarmStore::new(pool.clone()));
    let tracker = Arc::new(Mutex::new(AlarmTracker::with_history_capacity(
        Arc::clone(&catalog),
        config.tracker.history_capacity,
    )));

    let publisher = Arc::new(Publisher::new(
        pool.clone(),
        Arc::clone(&alarm_store),
        Arc::clone(&tracker),
        Box::new(Simulator::new(Arc::clone(&catalog))),
        config.publisher.interval(),
    ));

    let publisher_task = if config.publisher.enabled {
        let publisher = Arc::clone(&publisher);
        Some(tokio::spawn(async move { publisher.start().await }))
    } else {
        info!("Publisher disabled; serving stored data only");
        None
    };

    let state = AppState::new(
        config.service.name.clone(),
        pool.clone(),
        alarm_store,
        tracker,
        catalog,
        publisher.stats(),
    );
    let app = create_router(state);

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("API listening on http://{}", addr);

    let serve_result = axum::serve(listener, app)
        .with_graceful_shutdown(async {
            wait_for_shutdown().await;
            info!("Shutdown signal received");
        })
        .await;

    publisher.stop();
    if let Some(task) = publisher_task {
        if let Err(e) = task.await {
            error!("Publisher task failed: {}", e);
        }
    }
    pool.close().await;

    serve_result.map_err(|e| MonsrvError::Internal(format!("Server error: {}", e)))?;
    info!("{} stopped", config.service.name);
    Ok(())
}

async fn check(config: MonsrvConfig) -> Result<()> {
    println!("=== Monsrv configuration check ===\n");
    println!("Service:   {}", config.service.name);
    println!("API:       http://{}", config.bind_addr());
    println!("Database:  {}", config.database.url);
    println!(
        "Publisher: {} (every {}s)",
        if config.publisher.enabled { "enabled" } else { "disabled" },
        config.publisher.interval_secs
    );

    let catalog = load_catalog(&config)?;
    println!("Catalog:   {} tags", catalog.len());

    let pool = store::connect(&config.database).await?;
    pool.close().await;
    println!("\n✓ Database reachable");
    println!("✓ Configuration valid");
    Ok(())
}
