//! HTTP scrape endpoint

use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

use packetsleuth_core::{Error, Result};

use crate::aggregator::Aggregator;
use crate::exposition::{self, CONTENT_TYPE};

/// Routes for `/metrics` and `/healthz`
pub fn router(aggregator: Arc<Aggregator>) -> Router {
    Router::new()
        .route("/metrics", get(metrics))
        .route("/healthz", get(healthz))
        .with_state(aggregator)
}

async fn metrics(State(aggregator): State<Arc<Aggregator>>) -> impl IntoResponse {
    let body = exposition::render(&aggregator.snapshot());
    ([(header::CONTENT_TYPE, CONTENT_TYPE)], body)
}

async fn healthz() -> &'static str {
    "ok"
}

/// Bind the scrape listener
///
/// Kept separate from [`serve`] so a taken port fails startup before any
/// capture begins.
pub async fn bind(addr: SocketAddr) -> Result<TcpListener> {
    TcpListener::bind(addr).await.map_err(|source| Error::Bind {
        addr: addr.to_string(),
        source,
    })
}

/// Serve scrapes until `shutdown` resolves
pub async fn serve<F>(
    listener: TcpListener,
    aggregator: Arc<Aggregator>,
    shutdown: F,
) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    info!(%addr, "Metrics endpoint listening");

    axum::serve(listener, router(aggregator))
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("Metrics endpoint stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use packetsleuth_core::{Packet, TransportType};
    use std::time::{Duration, SystemTime};
    use tokio::sync::oneshot;

    type Running = (SocketAddr, oneshot::Sender<()>, tokio::task::JoinHandle<Result<()>>);

    async fn start(aggregator: Arc<Aggregator>) -> Running {
        let listener = bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(serve(listener, aggregator, async move {
            let _ = stop_rx.await;
        }));
        (addr, stop_tx, task)
    }

    #[tokio::test]
    async fn test_metrics_endpoint_serves_exposition() {
        let agg = Arc::new(Aggregator::default());
        let mut packet = Packet::unknown("eth0", SystemTime::UNIX_EPOCH);
        packet.transport_type = TransportType::TCP;
        packet.payload_size = 42;
        agg.observe(&packet);

        let (addr, stop, task) = start(Arc::clone(&agg)).await;

        let resp = reqwest::get(format!("http://{}/metrics", addr)).await.unwrap();
        assert!(resp.status().is_success());
        let content_type = resp
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        assert_eq!(content_type.as_deref(), Some(CONTENT_TYPE));

        let body = resp.text().await.unwrap();
        assert!(body.contains("packetsleuth_packet_tcp_count 1\n"));
        assert!(body.contains("packetsleuth_traffic_total_bps 42\n"));

        stop.send(()).unwrap();
        tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_healthz() {
        let (addr, stop, _task) = start(Arc::new(Aggregator::default())).await;

        let resp = reqwest::get(format!("http://{}/healthz", addr)).await.unwrap();
        assert!(resp.status().is_success());
        assert_eq!(resp.text().await.unwrap(), "ok");

        let _ = stop.send(());
    }

    #[tokio::test]
    async fn test_scrapes_see_new_packets() {
        let agg = Arc::new(Aggregator::default());
        let (addr, stop, _task) = start(Arc::clone(&agg)).await;
        let url = format!("http://{}/metrics", addr);

        let before = reqwest::get(&url).await.unwrap().text().await.unwrap();
        assert!(before.contains("packetsleuth_packet_count 0\n"));

        agg.observe(&Packet::unknown("eth0", SystemTime::UNIX_EPOCH));
        let after = reqwest::get(&url).await.unwrap().text().await.unwrap();
        assert!(after.contains("packetsleuth_packet_count 1\n"));

        let _ = stop.send(());
    }

    #[tokio::test]
    async fn test_bind_conflict_reports_address() {
        let first = bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
        let addr = first.local_addr().unwrap();

        match bind(addr).await {
            Err(Error::Bind { addr: reported, .. }) => assert_eq!(reported, addr.to_string()),
            other => panic!("expected bind error, got {:?}", other.map(|_| ())),
        }
    }
}
