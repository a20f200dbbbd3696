//! Process assembly for `run` and `status`.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{info, warn};
use upwatch_core::{StatusRecord, UpwatchConfig};
use upwatch_state::StateStore;
use upwatch_status::{HttpSource, StatusEngine, StatusSnapshot};

const DB_FILE: &str = "upwatch.redb";

fn build_engine(config: &UpwatchConfig, store: StateStore) -> anyhow::Result<StatusEngine> {
    let source = HttpSource::new(&config.upstream.base_url, config.upstream.timeout())?;
    info!(
        base_url = %source.base_url(),
        timeout_ms = source.timeout().as_millis() as u64,
        "upstream source configured"
    );
    Ok(StatusEngine::new(
        Arc::new(source),
        store,
        config.status.clone(),
    ))
}

/// Long-running daemon: refresh loop plus REST API until Ctrl-C.
pub async fn run(config: UpwatchConfig) -> anyhow::Result<()> {
    info!("upwatch daemon starting");

    // Ensure data directory exists.
    let data_dir = &config.daemon.data_dir;
    std::fs::create_dir_all(data_dir)?;
    let db_path = data_dir.join(DB_FILE);

    let store = StateStore::open(&db_path)?;
    info!(path = ?db_path, "manual-test store opened");

    let engine = build_engine(&config, store)?;

    // Initial pass so the API has something to serve.
    let report = engine.refresh().await;
    match &report.error {
        None => info!(endpoints = report.statuses.len(), "initial refresh complete"),
        Some(e) => warn!(error = %e, "initial refresh failed, serving empty statuses"),
    }

    // ── Shutdown signal ────────────────────────────────────────

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // ── Refresh loop ───────────────────────────────────────────

    let interval = config.daemon.refresh_interval();
    let refresh_handle = tokio::spawn({
        let engine = engine.clone();
        async move { engine.run(interval, shutdown_rx).await }
    });

    // ── API server ─────────────────────────────────────────────

    let router = upwatch_api::build_router(engine);
    let addr = SocketAddr::from(([0, 0, 0, 0], config.daemon.port));

    info!(%addr, "API server starting");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Graceful shutdown on Ctrl-C.
    let server = axum::serve(listener, router).with_graceful_shutdown(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl-C, shutting down");
        }
        info!("shutdown signal received");
        let _ = shutdown_tx.send(true);
    });

    server.await?;

    let _ = refresh_handle.await;

    info!("upwatch daemon stopped");
    Ok(())
}

/// One-shot refresh; prints the result to stdout.
pub async fn print_status(config: UpwatchConfig, json: bool) -> anyhow::Result<()> {
    let db_path = config.daemon.data_dir.join(DB_FILE);
    // A running daemon holds the database lock; fall back to no manual tests.
    let store = match StateStore::open(&db_path) {
        Ok(store) => store,
        Err(e) => {
            warn!(path = ?db_path, error = %e, "manual-test store unavailable, ignoring manual tests");
            StateStore::open_in_memory()?
        }
    };

    let engine = build_engine(&config, store)?;
    let report = engine.refresh().await;
    if let Some(e) = &report.error {
        anyhow::bail!("refresh failed: {e}");
    }

    if json {
        println!("{}", render_json(&report.statuses)?);
    } else {
        print!("{}", render_table(&report.statuses));
    }
    Ok(())
}

fn sorted(statuses: &StatusSnapshot) -> BTreeMap<&str, &StatusRecord> {
    statuses
        .iter()
        .map(|(id, record)| (id.as_str(), record))
        .collect()
}

fn render_json(statuses: &StatusSnapshot) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(&sorted(statuses))?)
}

fn render_table(statuses: &StatusSnapshot) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{:<24} {:<12} {:<16} {:>8}", "ENDPOINT", "STATUS", "SOURCE", "LATENCY");
    for (id, record) in sorted(statuses) {
        let latency = record
            .latency_ms
            .map(|ms| format!("{ms}ms"))
            .unwrap_or_else(|| "-".to_string());
        let _ = writeln!(
            out,
            "{:<24} {:<12} {:<16} {:>8}",
            id, record.status, record.source, latency
        );
    }
    out
}
