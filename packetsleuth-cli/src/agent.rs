//! Process wiring: capture, aggregation, export and shutdown

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{error, info, warn};

use packetsleuth_capture::{
    list_capture_interfaces, list_interfaces, CaptureSupervisor, PcapSource, SupervisorHandle,
    WorkerState,
};
use packetsleuth_metrics::{push, server, Aggregator, InfluxSink, Monitor, PointSink};

use crate::config::AgentConfig;

/// Run the agent until a shutdown signal or until every capture worker exits
pub async fn run(config: AgentConfig) -> Result<()> {
    // Bind first so a taken port fails before any capture starts
    let listener = server::bind(config.listen).await?;

    let aggregator = Arc::new(Aggregator::new(config.aggregator.clone()));

    // Export setup errors also surface before any device is opened
    let mut monitor = Monitor::new(Arc::clone(&aggregator));
    let exporter = match &config.influx {
        Some(influx) => {
            let sink = InfluxSink::new(influx.clone())?;
            let (queue, exporter) = push::channel(
                config.push.clone(),
                Arc::new(sink) as Arc<dyn PointSink>,
                Arc::clone(&aggregator),
            )?;
            info!(endpoint = %influx.endpoint, bucket = %influx.bucket, "Push export enabled");
            monitor = monitor.with_push(queue);
            Some(exporter)
        }
        None => None,
    };

    let source = Arc::new(PcapSource::new(config.capture.clone()));
    let stream = CaptureSupervisor::new(source, config.supervisor.clone()).start()?;
    let (packets, handle) = stream.into_parts();

    let exporter = exporter.map(|exporter| tokio::spawn(exporter.run()));
    let mut monitor = tokio::spawn(monitor.run(packets));

    let (stop_server, server_stopped) = oneshot::channel::<()>();
    let server = tokio::spawn(server::serve(listener, Arc::clone(&aggregator), async move {
        let _ = server_stopped.await;
    }));

    info!(interfaces = ?handle.interfaces(), "PacketSleuth running");

    let finished = tokio::select! {
        _ = shutdown_signal() => {
            info!("Shutdown requested");
            None
        }
        result = &mut monitor => {
            warn!("Every capture worker has exited");
            Some(result)
        }
    };

    let _ = stop_server.send(());

    let supervisor = handle.clone();
    tokio::task::spawn_blocking(move || supervisor.shutdown())
        .await
        .context("capture shutdown panicked")?;

    let processed = match finished {
        Some(result) => result,
        None => monitor.await,
    }
    .context("monitor task panicked")?;

    if let Some(exporter) = exporter {
        exporter.await.context("push exporter panicked")?;
    }

    server.await.context("metrics server panicked")??;

    report(&handle);
    let snapshot = aggregator.snapshot();
    info!(
        processed,
        bytes = snapshot.bytes,
        export_dropped = snapshot.export_dropped,
        export_failed = snapshot.export_failed,
        "PacketSleuth stopped"
    );

    Ok(())
}

/// Log the final per-interface capture statistics
fn report(handle: &SupervisorHandle) {
    for name in handle.interfaces() {
        let state = handle.worker_state(&name);
        let Some(stats) = handle.stats(&name) else {
            continue;
        };
        match state {
            Some(WorkerState::Failed(reason)) => {
                warn!(interface = %name, %reason, "{}", stats.format());
            }
            _ => info!(interface = %name, "{}", stats.format()),
        }
    }
}

/// Resolve on Ctrl-C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

/// Print the interfaces the agent would capture on
pub fn print_interfaces(all: bool) -> Result<()> {
    let interfaces = if all {
        list_interfaces()?
    } else {
        list_capture_interfaces(true)?
    };

    println!("{:<16} {:<6} {:<20} ADDRESSES", "NAME", "STATE", "MAC");
    for iface in &interfaces {
        let state = if iface.is_up { "up" } else { "down" };
        let mac = iface
            .mac
            .map(|mac| mac.to_string())
            .unwrap_or_else(|| "-".to_string());
        let ips: Vec<String> = iface.ips.iter().map(|ip| ip.to_string()).collect();
        let name = if iface.is_loopback {
            format!("{} (lo)", iface.name)
        } else {
            iface.name.clone()
        };
        println!("{:<16} {:<6} {:<20} {}", name, state, mac, ips.join(", "));
    }

    Ok(())
}
