//! Subcommand implementations.

use std::sync::Arc;

use schemasync_client::HttpBackend;
use schemasync_core::MigrationPlan;
use schemasync_sync::{CycleReport, LocalFilesystem, PollingWatcher, SyncLoop};
use tokio::sync::broadcast;

use crate::config::CliConfig;
use crate::error::CliError;

fn sync_loop(config: CliConfig) -> Result<SyncLoop, CliError> {
    let backend = HttpBackend::new(config.client)?;
    Ok(SyncLoop::new(
        config.sync,
        Arc::new(backend),
        Arc::new(LocalFilesystem),
    ))
}

/// Watch the project and sync until Ctrl-C.
pub async fn dev(config: CliConfig) -> Result<(), CliError> {
    let roots = config.sync.watch_roots();
    let interval = config.sync.poll_interval;
    let sync = sync_loop(config)?;

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl+c");
            return;
        }
        tracing::info!("received shutdown signal");
        let _ = shutdown_tx.send(());
    });

    for root in &roots {
        tracing::info!(root = %root.display(), "watching");
    }
    let (watcher, events) = PollingWatcher::spawn(roots, interval);

    sync.run(events, shutdown_rx).await;
    watcher.join().await;

    Ok(())
}

/// Run one cycle and print its report.
pub async fn sync(config: CliConfig) -> Result<(), CliError> {
    let report = sync_loop(config)?.run_cycle().await?;
    print_report(&report);

    if report.is_success() {
        Ok(())
    } else {
        Err(CliError::OperationsFailed(report.failed.len()))
    }
}

/// Print the plan without applying it.
pub async fn plan(config: CliConfig, json: bool) -> Result<(), CliError> {
    let plan = sync_loop(config)?.plan().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
    } else {
        print_plan(&plan);
    }
    Ok(())
}

fn print_report(report: &CycleReport) {
    println!("{}", report.summary_line());
    for summary in &report.pending {
        println!("  would apply: {}", summary);
    }
    for (summary, error) in &report.failed {
        println!("  failed: {}: {}", summary, error);
    }
    for summary in &report.deferred {
        println!("  deferred: {}", summary);
    }
    if let Some(path) = &report.artifact {
        println!("review and complete {}", path.display());
    }
}

fn print_plan(plan: &MigrationPlan) {
    if plan.is_empty() {
        println!("schema is up to date");
        return;
    }
    if !plan.safe().is_empty() {
        println!("safe ({}):", plan.safe().len());
        for op in plan.safe() {
            println!("  {}", op.summary());
        }
    }
    if !plan.unsafe_ops().is_empty() {
        println!("unsafe ({}):", plan.unsafe_ops().len());
        for op in plan.unsafe_ops() {
            println!("  {}", op.summary());
        }
    }
}
