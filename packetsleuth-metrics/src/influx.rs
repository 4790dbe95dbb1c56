//! InfluxDB v2 write sink

use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

use packetsleuth_core::{Error, Result};

use crate::point::{encode_batch, Point};

/// Destination for batches of points
#[async_trait]
pub trait PointSink: Send + Sync {
    /// Write one batch; a failed batch is not retried by the caller
    async fn write(&self, points: &[Point]) -> Result<()>;
}

/// Connection settings for an InfluxDB v2 store
#[derive(Debug, Clone)]
pub struct InfluxConfig {
    pub endpoint: String,
    pub org: String,
    pub bucket: String,
    pub user: String,
    pub password: String,
    /// Per-request timeout
    pub timeout: Duration,
}

impl Default for InfluxConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8086".to_string(),
            org: "myorg".to_string(),
            bucket: "mybucket".to_string(),
            user: "admin".to_string(),
            password: "password".to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

/// Line-protocol writer over HTTP
pub struct InfluxSink {
    client: reqwest::Client,
    write_url: String,
    org: String,
    bucket: String,
    authorization: String,
}

impl InfluxSink {
    pub fn new(config: InfluxConfig) -> Result<Self> {
        if config.endpoint.is_empty() {
            return Err(Error::Config("InfluxDB endpoint is empty".to_string()));
        }

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::Config(format!("HTTP client: {}", e)))?;

        Ok(Self {
            client,
            write_url: format!("{}/api/v2/write", config.endpoint.trim_end_matches('/')),
            org: config.org,
            bucket: config.bucket,
            authorization: format!("Token {}:{}", config.user, config.password),
        })
    }

    pub fn write_url(&self) -> &str {
        &self.write_url
    }
}

#[async_trait]
impl PointSink for InfluxSink {
    async fn write(&self, points: &[Point]) -> Result<()> {
        if points.is_empty() {
            return Ok(());
        }

        let resp = self
            .client
            .post(&self.write_url)
            .query(&[
                ("org", self.org.as_str()),
                ("bucket", self.bucket.as_str()),
                ("precision", "ns"),
            ])
            .header(reqwest::header::AUTHORIZATION, &self.authorization)
            .header(reqwest::header::CONTENT_TYPE, "text/plain; charset=utf-8")
            .body(encode_batch(points))
            .send()
            .await
            .map_err(|e| Error::export(format!("request failed: {}", e)))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::export(format!("InfluxDB returned {}: {}", status, body.trim())));
        }

        debug!(points = points.len(), "Wrote batch to InfluxDB");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::{RawQuery, State};
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::Router;
    use std::sync::Arc;
    use std::time::{Duration, UNIX_EPOCH};
    use tokio::sync::Mutex;

    #[derive(Debug, Clone, Default)]
    struct Captured {
        query: Option<String>,
        authorization: Option<String>,
        body: String,
    }

    type Shared = Arc<Mutex<Vec<Captured>>>;

    async fn record(
        State(seen): State<Shared>,
        RawQuery(query): RawQuery,
        headers: HeaderMap,
        body: String,
    ) -> StatusCode {
        seen.lock().await.push(Captured {
            query,
            authorization: headers
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                .map(str::to_string),
            body,
        });
        StatusCode::NO_CONTENT
    }

    async fn reject() -> (StatusCode, &'static str) {
        (StatusCode::UNAUTHORIZED, "unauthorized access")
    }

    async fn spawn(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn config(endpoint: String) -> InfluxConfig {
        InfluxConfig {
            endpoint,
            org: "acme".to_string(),
            bucket: "net".to_string(),
            user: "admin".to_string(),
            password: "secret".to_string(),
            timeout: Duration::from_secs(5),
        }
    }

    fn points() -> Vec<Point> {
        vec![
            Point::new("m", UNIX_EPOCH + Duration::from_nanos(1)).field("v", 1i64),
            Point::new("m", UNIX_EPOCH + Duration::from_nanos(2)).field("v", 2i64),
        ]
    }

    #[test]
    fn test_write_url_trims_slash() {
        let sink = InfluxSink::new(config("http://db:8086/".to_string())).unwrap();
        assert_eq!(sink.write_url(), "http://db:8086/api/v2/write");
    }

    #[test]
    fn test_empty_endpoint_rejected() {
        assert!(matches!(
            InfluxSink::new(config(String::new())),
            Err(Error::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_write_sends_line_protocol() {
        let seen: Shared = Arc::default();
        let app = Router::new()
            .route("/api/v2/write", post(record))
            .with_state(Arc::clone(&seen));
        let endpoint = spawn(app).await;

        let sink = InfluxSink::new(config(endpoint)).unwrap();
        sink.write(&points()).await.unwrap();

        let seen = seen.lock().await;
        assert_eq!(seen.len(), 1);
        assert_eq!(
            seen[0].query.as_deref(),
            Some("org=acme&bucket=net&precision=ns")
        );
        assert_eq!(seen[0].authorization.as_deref(), Some("Token admin:secret"));
        assert_eq!(seen[0].body, "m v=1i 1\nm v=2i 2\n");
    }

    #[tokio::test]
    async fn test_empty_batch_skips_request() {
        let seen: Shared = Arc::default();
        let app = Router::new()
            .route("/api/v2/write", post(record))
            .with_state(Arc::clone(&seen));
        let endpoint = spawn(app).await;

        let sink = InfluxSink::new(config(endpoint)).unwrap();
        sink.write(&[]).await.unwrap();
        assert!(seen.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_error_status_becomes_export_error() {
        let app = Router::new().route("/api/v2/write", post(reject));
        let endpoint = spawn(app).await;

        let sink = InfluxSink::new(config(endpoint)).unwrap();
        match sink.write(&points()).await {
            Err(Error::Export(msg)) => {
                assert!(msg.contains("401"));
                assert!(msg.contains("unauthorized access"));
            }
            other => panic!("expected export error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unreachable_store_becomes_export_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let sink = InfluxSink::new(config(format!("http://{}", addr))).unwrap();
        assert!(matches!(sink.write(&points()).await, Err(Error::Export(_))));
    }
}
