//! Decoupled push export
//!
//! The monitor offers points to a [`PushQueue`] without ever waiting. A
//! [`PushExporter`] task drains the queue in batches and hands them to a
//! [`PointSink`]. A full queue drops the point, a failed write drops the
//! batch, and both are counted on the aggregator.

use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, info, warn};

use packetsleuth_core::{Error, Result};

use crate::aggregator::Aggregator;
use crate::influx::PointSink;
use crate::point::Point;

/// Default push queue capacity
pub const DEFAULT_EXPORT_QUEUE_CAPACITY: usize = 1024;

/// Default maximum points per write
pub const DEFAULT_EXPORT_BATCH_SIZE: usize = 500;

#[derive(Debug, Clone)]
pub struct PushConfig {
    pub queue_capacity: usize,
    pub batch_size: usize,
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_EXPORT_QUEUE_CAPACITY,
            batch_size: DEFAULT_EXPORT_BATCH_SIZE,
        }
    }
}

/// Create a connected queue and exporter
pub fn channel(
    config: PushConfig,
    sink: Arc<dyn PointSink>,
    aggregator: Arc<Aggregator>,
) -> Result<(PushQueue, PushExporter)> {
    if config.queue_capacity == 0 {
        return Err(Error::Config(
            "export queue capacity must be greater than zero".to_string(),
        ));
    }
    if config.batch_size == 0 {
        return Err(Error::Config(
            "export batch size must be greater than zero".to_string(),
        ));
    }

    let (tx, rx) = mpsc::channel(config.queue_capacity);
    let queue = PushQueue {
        tx,
        aggregator: Arc::clone(&aggregator),
    };
    let exporter = PushExporter {
        rx,
        sink,
        aggregator,
        batch_size: config.batch_size,
    };
    Ok((queue, exporter))
}

/// Producer side of the push path
#[derive(Clone)]
pub struct PushQueue {
    tx: mpsc::Sender<Point>,
    aggregator: Arc<Aggregator>,
}

impl PushQueue {
    /// Enqueue a point without waiting
    ///
    /// Returns `false` and counts a drop when the queue is full or the
    /// exporter has gone away.
    pub fn offer(&self, point: Point) -> bool {
        match self.tx.try_send(point) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) | Err(TrySendError::Closed(_)) => {
                self.aggregator.record_export_dropped(1);
                false
            }
        }
    }
}

/// Consumer side of the push path
pub struct PushExporter {
    rx: mpsc::Receiver<Point>,
    sink: Arc<dyn PointSink>,
    aggregator: Arc<Aggregator>,
    batch_size: usize,
}

impl PushExporter {
    /// Drain the queue until every [`PushQueue`] clone is dropped
    pub async fn run(mut self) {
        let mut batch = Vec::with_capacity(self.batch_size);
        let mut batches = 0u64;

        info!(batch_size = self.batch_size, "Push exporter started");

        loop {
            let received = self.rx.recv_many(&mut batch, self.batch_size).await;
            if received == 0 {
                break;
            }

            let count = batch.len() as u64;
            match self.sink.write(&batch).await {
                Ok(()) => {
                    self.aggregator.record_exported(count);
                    debug!(points = count, "Exported batch");
                }
                Err(e) => {
                    self.aggregator.record_export_failed(count);
                    warn!(error = %e, points = count, "Dropping batch after failed write");
                }
            }
            batches += 1;
            batch.clear();
        }

        info!(batches, "Push exporter stopped");
    }
}
