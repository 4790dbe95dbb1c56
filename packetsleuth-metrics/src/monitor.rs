//! Fan-in consumer driving aggregation and push export

use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info};

use packetsleuth_core::Packet;

use crate::aggregator::Aggregator;
use crate::point::Point;
use crate::push::PushQueue;

/// Drains classified packets into the aggregator
///
/// When a [`PushQueue`] is attached, every packet is also offered as a
/// point. The queue is dropped when the monitor finishes so the exporter can
/// drain and exit.
pub struct Monitor {
    aggregator: Arc<Aggregator>,
    push: Option<PushQueue>,
}

impl Monitor {
    pub fn new(aggregator: Arc<Aggregator>) -> Self {
        Self {
            aggregator,
            push: None,
        }
    }

    pub fn with_push(mut self, queue: PushQueue) -> Self {
        self.push = Some(queue);
        self
    }

    /// Aggregate one packet
    pub fn process(&self, packet: &Packet) {
        let traffic_total = self.aggregator.observe(packet);

        if let Some(queue) = &self.push {
            if !queue.offer(Point::from_packet(packet, traffic_total)) {
                debug!(interface = %packet.interface, "Push queue full, point dropped");
            }
        }
    }

    /// Consume until every producer has gone away
    ///
    /// Returns the number of packets processed.
    pub async fn run(self, mut packets: mpsc::Receiver<Packet>) -> u64 {
        let mut processed = 0u64;

        info!(push = self.push.is_some(), "Monitor started");

        while let Some(packet) = packets.recv().await {
            self.process(&packet);
            processed += 1;
        }

        info!(
            processed,
            total_bytes = self.aggregator.bytes(),
            "Monitor stopped, fan-in queue closed"
        );
        processed
    }
}
