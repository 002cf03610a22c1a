use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use roomyield::config::{Config, HorizonSeed};
use roomyield::ledger::Ledger;
use roomyield::pricing::RateTables;
use roomyield::store::InMemoryStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env();
    roomyield::observability::init(config.metrics_port)?;

    let tables = match &config.rate_tables {
        Some(path) => RateTables::load(path)?,
        None => RateTables::default(),
    };

    let ledger = Arc::new(Ledger::new(Arc::new(InMemoryStore::new()), config.ledger));
    if let Some(path) = &config.inventory {
        for seed in HorizonSeed::load(path)? {
            ledger
                .open_range(seed.room_type, seed.from, seed.nights, &seed.template)
                .await?;
        }
    }

    info!("roomyield ledger ready");
    info!(
        "  inventory: {}",
        config.inventory.as_ref().map_or("empty".into(), |p| p.display().to_string())
    );
    info!("  days: {}", ledger.day_count().await?);
    info!("  active reservations: {}", ledger.active_reservations().await?);
    info!("  rate tables: {}", config.rate_tables.as_ref().map_or("built-in".into(), |p| p.display().to_string()));
    info!("  seasonal multipliers: {:?}", tables.seasonal);
    info!(
        "  lock budget: {} x {:?}, backoff {:?}",
        config.ledger.lock_attempts, config.ledger.lock_timeout, config.ledger.lock_backoff
    );
    info!(
        "  metrics: {}",
        config.metrics_port.map_or("disabled".to_string(), |p| format!("http://0.0.0.0:{p}/metrics"))
    );

    let shutdown = async {
        let ctrl_c = tokio::signal::ctrl_c();
        #[cfg(unix)]
        {
            let mut sigterm =
                tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                    .expect("failed to register SIGTERM handler");
            tokio::select! {
                _ = ctrl_c => {}
                _ = sigterm.recv() => {}
            }
        }
        #[cfg(not(unix))]
        {
            ctrl_c.await.ok();
        }
    };
    shutdown.await;

    info!("shutdown signal received, bye");
    Ok(())
}
