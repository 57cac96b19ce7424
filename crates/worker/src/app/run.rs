//! Scheduler loop: sweep on an interval, execute jobs on the worker pool.

use std::future::Future;

use anyhow::Context;
use docforge_infra::generation::GenerationExecutor;
use tokio::time::MissedTickBehavior;

use super::services::Services;

/// Run until Ctrl-C.
pub async fn run(services: Services) -> anyhow::Result<()> {
    run_until(services, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for shutdown signal");
        }
    })
    .await
}

/// Run until `shutdown` resolves, then stop sweeping and drain the pool.
pub async fn run_until(
    services: Services,
    shutdown: impl Future<Output = ()>,
) -> anyhow::Result<()> {
    let Services {
        config,
        queue,
        dispatcher,
        worker,
        ..
    } = services;

    let executor = GenerationExecutor::spawn(worker, queue.clone(), config.executor_config())
        .context("failed to start pdf workers")?;

    let mut ticker = tokio::time::interval(config.sweep_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    tokio::pin!(shutdown);

    tracing::info!(
        namespace = %config.lock_namespace,
        sweep_interval_secs = config.sweep_interval.as_secs(),
        workers = config.workers,
        "pdf generation worker started"
    );

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            _ = ticker.tick() => {
                let dispatcher = dispatcher.clone();
                // Repository and lock backends block; keep them off the reactor.
                match tokio::task::spawn_blocking(move || dispatcher.sweep()).await {
                    Ok(report) => tracing::debug!(dispatched = report.dispatched, "sweep done"),
                    Err(e) => tracing::error!(error = %e, "sweep task failed"),
                }
            }
        }
    }

    tracing::info!("shutting down pdf generation worker");
    queue.close();
    let stats = tokio::task::spawn_blocking(move || executor.shutdown())
        .await
        .context("failed to join pdf workers")?;
    tracing::info!(
        processed = stats.jobs_processed,
        generated = stats.jobs_generated,
        failed = stats.jobs_failed,
        panicked = stats.jobs_panicked,
        "pdf generation worker stopped"
    );
    Ok(())
}
