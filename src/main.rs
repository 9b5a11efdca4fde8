//! driftwatch demo host.
//!
//! Wires the checker against in-memory collaborators seeded with a little
//! drift, so the remediation loop can be watched end to end from logs. In
//! a real deployment the checker is embedded in the mirroring control
//! plane and the collaborators are backed by its caches and stores.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use driftwatch::config::Configuration;
use driftwatch::executor::RemediationExecutor;
use driftwatch::metrics::CheckerMetrics;
use driftwatch::model::{PhysicalObject, VirtualObject};
use driftwatch::scanner::ConsistencyChecker;
use driftwatch::scheduler::PeriodChecker;
use driftwatch::stores::{
    InMemoryPhysicalStore, InMemoryTenantRegistry, InMemoryTenantStore, ManualReadinessGate,
};
use tokio::sync::watch;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "driftwatch.toml")]
    config: String,
}

/// Waits for a shutdown signal (SIGINT or SIGTERM)
async fn wait_for_shutdown_signal() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut sigint =
            signal(SignalKind::interrupt()).context("Failed to install SIGINT handler")?;
        let mut sigterm =
            signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?;

        tokio::select! {
            _ = sigint.recv() => log::info!("Received SIGINT"),
            _ = sigterm.recv() => log::info!("Received SIGTERM"),
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c()
            .await
            .context("Failed to listen for shutdown signal")?;
        log::info!("Received Ctrl+C");
    }

    Ok(())
}

/// Seed the stores with one consistent pair, one missing mirror, and one
/// orphan, so every remediation path fires on the first cycle.
async fn seed_drift(tenants: &InMemoryTenantStore, physical: &InMemoryPhysicalStore) {
    tenants.insert(VirtualObject::new("t1", "web", "u-100")).await;
    physical
        .insert(PhysicalObject {
            name: driftwatch::identity::physical_name_for("t1", "web"),
            owner_tenant: Some("t1".to_string()),
            owner_name: Some("web".to_string()),
            delegated_fingerprint: Some("u-100".to_string()),
        })
        .await;

    // Missing mirror: will be requeued.
    tenants.insert(VirtualObject::new("t1", "api", "u-101")).await;

    // Orphan: its virtual owner no longer exists, will be deleted.
    physical
        .insert(PhysicalObject {
            name: driftwatch::identity::physical_name_for("t2", "batch"),
            owner_tenant: Some("t2".to_string()),
            owner_name: Some("batch".to_string()),
            delegated_fingerprint: Some("u-900".to_string()),
        })
        .await;
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    // Load configuration
    let config = if std::path::Path::new(&args.config).exists() {
        Configuration::load_from_path(std::path::Path::new(&args.config))
            .context("Failed to load configuration")?
    } else {
        log::info!("Configuration file not found, using defaults");
        Configuration::default()
    };

    if !config.checker.enabled {
        log::info!("Checker is disabled in configuration (checker.enabled = false)");
        log::info!("Set DRIFTWATCH__CHECKER__ENABLED=true or enable in config file to run");
        return Ok(());
    }
    config
        .checker
        .validate()
        .context("Invalid checker configuration")?;

    log::info!(
        "Starting driftwatch consistency checker with period {:?}",
        config.checker.period
    );

    let registry = Arc::new(InMemoryTenantRegistry::new(vec![
        "t1".to_string(),
        "t2".to_string(),
    ]));
    let tenants = Arc::new(InMemoryTenantStore::new());
    let physical = Arc::new(InMemoryPhysicalStore::new());
    let gate = Arc::new(ManualReadinessGate::synced());
    let metrics = CheckerMetrics::new();

    seed_drift(&tenants, &physical).await;

    let executor = RemediationExecutor::new(physical.clone(), tenants.clone(), metrics.clone());
    let checker = Arc::new(ConsistencyChecker::new(
        registry,
        tenants,
        physical,
        executor,
        metrics.clone(),
    ));
    let mut period_checker = PeriodChecker::new(checker, gate, config.checker.period);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let checker_task = tokio::spawn(async move { period_checker.run(shutdown_rx).await });

    log::info!("Checker running, waiting for shutdown signal");
    wait_for_shutdown_signal().await?;

    log::info!("Received shutdown signal, stopping checker");
    shutdown_tx.send(true).ok();

    checker_task
        .await
        .context("Checker task panicked")?
        .context("Checker failed to start")?;

    metrics.summary().log();
    log::info!("Checker stopped");

    Ok(())
}
