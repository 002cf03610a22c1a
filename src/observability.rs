use std::net::SocketAddr;

// ── RED metrics (request-driven) ────────────────────────────────

/// Counter: reservation attempts. Labels: outcome.
pub const RESERVATIONS_TOTAL: &str = "roomyield_reservations_total";

/// Histogram: reserve_range latency in seconds, lock wait included.
pub const RESERVE_DURATION_SECONDS: &str = "roomyield_reserve_duration_seconds";

/// Counter: releases that changed state (idempotent repeats are not counted).
pub const RELEASES_TOTAL: &str = "roomyield_releases_total";

/// Counter: quotes. Labels: mode (quote, reserve), outcome.
pub const QUOTES_TOTAL: &str = "roomyield_quotes_total";

// ── USE metrics (resource utilization) ──────────────────────────

/// Counter: lock attempts that timed out and were retried or abandoned.
pub const LOCK_TIMEOUTS_TOTAL: &str = "roomyield_lock_timeouts_total";

/// Gauge: inventory days loaded into the ledger's lock table.
pub const DAYS_LOADED: &str = "roomyield_days_loaded";

/// Histogram: inventory store commit duration in seconds.
pub const STORE_COMMIT_DURATION_SECONDS: &str = "roomyield_store_commit_duration_seconds";

/// Counter: store commits that failed and left the ledger unchanged.
pub const STORE_COMMIT_FAILURES_TOTAL: &str = "roomyield_store_commit_failures_total";

/// Install the Prometheus exporter on the given port. No-op if port is None.
pub fn init(port: Option<u16>) -> Result<(), metrics_exporter_prometheus::BuildError> {
    let Some(port) = port else { return Ok(()) };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
    Ok(())
}
