// region:    --- Imports
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;
use vehicle_auction_service::handlers;
use vehicle_auction_service::hub::BroadcastHub;
use vehicle_auction_service::ledger::{Ledger, PgLedger};
use vehicle_auction_service::scheduler::FinalizationSweeper;
// endregion: --- Imports

// region:    --- Main
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .without_time()
        .with_target(false)
        .init();

    // Ledger
    let database_url = std::env::var("DATABASE_URL")?;
    let pg_ledger = PgLedger::connect(&database_url).await?;
    pg_ledger.initialize_schema().await?;
    let ledger: Arc<dyn Ledger> = Arc::new(pg_ledger);
    info!("{:<12} --> ledger ready", "Main");

    // Observer fan-out
    let hub = Arc::new(BroadcastHub::new());

    // Scheduled finalization sweep; listings stay correct between ticks
    // because the active listing filters on the deadline itself.
    let sweep_secs = std::env::var("SWEEP_INTERVAL_SECS")
        .ok()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(1);
    let sweeper = Arc::new(FinalizationSweeper::new(Arc::clone(&ledger)));
    sweeper.start(Duration::from_secs(sweep_secs));
    info!("{:<12} --> sweeper running every {}s", "Main", sweep_secs);

    // Permissive CORS for browser observers
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let routes_all = handlers::routes(ledger, hub).layer(cors);

    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
    let listener = TcpListener::bind(&bind_addr).await?;
    info!(
        "{:<12} --> Web Server: Listening on {}",
        "Main",
        listener.local_addr()?
    );

    axum::serve(listener, routes_all.into_make_service()).await?;
    Ok(())
}
// endregion: --- Main
