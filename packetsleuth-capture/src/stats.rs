//! Per-worker capture statistics

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Statistics snapshot for one capture worker
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CaptureStats {
    /// Frames read from the handle
    pub frames_received: u64,
    /// Bytes captured across those frames
    pub bytes_received: u64,
    /// Frames dropped because their metadata was unreadable
    pub decode_errors: u64,
    /// Sends that found the fan-in queue full and had to wait
    pub blocked_sends: u64,
    /// Frames dropped by the kernel, sampled when the handle closes
    pub kernel_drops: u64,
    /// Time since the worker started
    pub duration: Duration,
    /// Frames per second over the worker's lifetime
    pub frames_per_second: f64,
}

impl CaptureStats {
    /// Fraction of frames that had to wait for queue space, as a percentage
    pub fn blocked_rate(&self) -> f64 {
        if self.frames_received == 0 {
            return 0.0;
        }
        (self.blocked_sends as f64 / self.frames_received as f64) * 100.0
    }

    /// Format statistics as human-readable string
    pub fn format(&self) -> String {
        format!(
            "Received: {} frames ({} bytes), decode errors: {}, \
             blocked sends: {} ({:.2}%), kernel drops: {}, \
             duration: {:.2}s, rate: {:.2} fps",
            self.frames_received,
            self.bytes_received,
            self.decode_errors,
            self.blocked_sends,
            self.blocked_rate(),
            self.kernel_drops,
            self.duration.as_secs_f64(),
            self.frames_per_second,
        )
    }
}

/// Thread-safe accumulator shared between a worker and the supervisor
#[derive(Debug, Clone)]
pub struct StatsAccumulator {
    frames_received: Arc<AtomicU64>,
    bytes_received: Arc<AtomicU64>,
    decode_errors: Arc<AtomicU64>,
    blocked_sends: Arc<AtomicU64>,
    kernel_drops: Arc<AtomicU64>,
    start_time: Instant,
}

impl StatsAccumulator {
    pub fn new() -> Self {
        Self {
            frames_received: Arc::new(AtomicU64::new(0)),
            bytes_received: Arc::new(AtomicU64::new(0)),
            decode_errors: Arc::new(AtomicU64::new(0)),
            blocked_sends: Arc::new(AtomicU64::new(0)),
            kernel_drops: Arc::new(AtomicU64::new(0)),
            start_time: Instant::now(),
        }
    }

    /// Record a frame read from the handle
    pub fn record_frame(&self, size: usize) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
        self.bytes_received
            .fetch_add(size as u64, Ordering::Relaxed);
    }

    pub fn record_decode_error(&self) {
        self.decode_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_blocked_send(&self) {
        self.blocked_sends.fetch_add(1, Ordering::Relaxed);
    }

    pub fn set_kernel_drops(&self, count: u64) {
        self.kernel_drops.store(count, Ordering::Relaxed);
    }

    /// Get current statistics snapshot
    pub fn snapshot(&self) -> CaptureStats {
        let frames_received = self.frames_received.load(Ordering::Relaxed);
        let duration = self.start_time.elapsed();

        let secs = duration.as_secs_f64();
        let frames_per_second = if secs > 0.0 {
            frames_received as f64 / secs
        } else {
            0.0
        };

        CaptureStats {
            frames_received,
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            decode_errors: self.decode_errors.load(Ordering::Relaxed),
            blocked_sends: self.blocked_sends.load(Ordering::Relaxed),
            kernel_drops: self.kernel_drops.load(Ordering::Relaxed),
            duration,
            frames_per_second,
        }
    }
}

impl Default for StatsAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_blocked_rate() {
        let stats = CaptureStats {
            frames_received: 200,
            blocked_sends: 50,
            ..Default::default()
        };
        assert_eq!(stats.blocked_rate(), 25.0);
        assert_eq!(CaptureStats::default().blocked_rate(), 0.0);
    }

    #[test]
    fn test_stats_format() {
        let stats = CaptureStats {
            frames_received: 1000,
            bytes_received: 64000,
            decode_errors: 3,
            blocked_sends: 50,
            kernel_drops: 7,
            duration: Duration::from_secs(10),
            frames_per_second: 100.0,
        };

        let formatted = stats.format();
        assert!(formatted.contains("1000 frames"));
        assert!(formatted.contains("64000 bytes"));
        assert!(formatted.contains("blocked sends: 50 (5.00%)"));
        assert!(formatted.contains("kernel drops: 7"));
    }

    #[test]
    fn test_stats_accumulator_snapshot() {
        let acc = StatsAccumulator::new();

        acc.record_frame(100);
        acc.record_frame(200);
        acc.record_decode_error();
        acc.record_blocked_send();
        acc.set_kernel_drops(4);

        let snapshot = acc.snapshot();
        assert_eq!(snapshot.frames_received, 2);
        assert_eq!(snapshot.bytes_received, 300);
        assert_eq!(snapshot.decode_errors, 1);
        assert_eq!(snapshot.blocked_sends, 1);
        assert_eq!(snapshot.kernel_drops, 4);
    }

    #[test]
    fn test_stats_accumulator_thread_safety() {
        let acc = StatsAccumulator::new();
        let acc_clone = acc.clone();

        let handle = thread::spawn(move || {
            for _ in 0..100 {
                acc_clone.record_frame(64);
            }
        });

        for _ in 0..100 {
            acc.record_frame(64);
        }

        handle.join().unwrap();

        let snapshot = acc.snapshot();
        assert_eq!(snapshot.frames_received, 200);
        assert_eq!(snapshot.bytes_received, 12800);
    }
}
