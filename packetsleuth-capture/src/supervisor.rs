//! Capture supervisor
//!
//! The supervisor picks the interfaces to capture on and starts one OS
//! thread per interface. Each worker reads frames from its handle,
//! classifies them, and pushes the records into a single bounded fan-in
//! queue. A full queue blocks the worker, so backpressure reaches the
//! capture layer instead of records being dropped.
//!
//! Workers fail independently: an interface that cannot be opened, or whose
//! handle dies mid-capture, takes down only its own worker. Failed workers
//! are not restarted.

use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, Ordering};
use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, error, info, trace, warn};

use packetsleuth_core::{Error, Interface, Packet, Result};
use packetsleuth_packet::classify;

use crate::source::{CaptureHandle, CaptureSource};
use crate::stats::{CaptureStats, StatsAccumulator};

/// Thread body handed to the spawner
type WorkerBody = Box<dyn FnOnce() + Send + 'static>;

/// Default fan-in queue capacity
pub const DEFAULT_QUEUE_CAPACITY: usize = 100;

/// Configuration for the capture supervisor
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    /// Interfaces to capture on; empty means every capture-capable device
    pub interfaces: Vec<String>,
    /// Include loopback devices when capturing on every device
    pub include_loopback: bool,
    /// Fan-in queue capacity
    pub queue_capacity: usize,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            interfaces: Vec::new(),
            include_loopback: false,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

/// Lifecycle of one capture worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerState {
    /// Thread spawned, handle not yet open
    Starting,
    /// Reading frames
    Running,
    /// Stopped on request or because the stream consumer went away
    Stopped,
    /// Open failed or the handle reported a fatal error
    Failed(String),
}

impl WorkerState {
    pub fn is_active(&self) -> bool {
        matches!(self, WorkerState::Starting | WorkerState::Running)
    }
}

/// Shared state of one worker
struct Worker {
    interface: Interface,
    state: RwLock<WorkerState>,
    stop: AtomicBool,
    stats: StatsAccumulator,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl Worker {
    fn new(interface: Interface) -> Self {
        Self {
            interface,
            state: RwLock::new(WorkerState::Starting),
            stop: AtomicBool::new(false),
            stats: StatsAccumulator::new(),
            thread: Mutex::new(None),
        }
    }

    fn set_state(&self, state: WorkerState) {
        *self.state.write() = state;
    }

    fn should_stop(&self) -> bool {
        self.stop.load(Ordering::Relaxed)
    }
}

/// Starts capture workers and merges their output
pub struct CaptureSupervisor {
    source: Arc<dyn CaptureSource>,
    config: SupervisorConfig,
}

impl CaptureSupervisor {
    pub fn new(source: Arc<dyn CaptureSource>, config: SupervisorConfig) -> Self {
        Self { source, config }
    }

    /// Start one worker per selected interface
    ///
    /// # Errors
    ///
    /// Returns `Error::NoInterfaces` when no interface is selected, and
    /// `Error::Config` for a zero queue capacity. Per-interface open failures
    /// are not errors here; they show up in the worker state.
    pub fn start(self) -> Result<PacketStream> {
        self.start_with(spawn_capture_thread)
    }

    fn start_with<F>(self, mut spawn: F) -> Result<PacketStream>
    where
        F: FnMut(&str, WorkerBody) -> io::Result<JoinHandle<()>>,
    {
        if self.config.queue_capacity == 0 {
            return Err(Error::Config(
                "queue capacity must be greater than zero".to_string(),
            ));
        }

        let devices = self.source.list_devices()?;
        let selected = select_interfaces(devices, &self.config);
        if selected.is_empty() {
            return Err(Error::NoInterfaces);
        }

        let (tx, rx) = mpsc::channel(self.config.queue_capacity);
        let workers: Arc<DashMap<String, Arc<Worker>>> = Arc::new(DashMap::new());

        for interface in selected {
            let name = interface.name.clone();
            let worker = Arc::new(Worker::new(interface));

            let body: WorkerBody = {
                let source = Arc::clone(&self.source);
                let worker = Arc::clone(&worker);
                let tx = tx.clone();
                Box::new(move || run_worker(source.as_ref(), &worker, tx))
            };
            let thread = match spawn(&name, body) {
                Ok(thread) => thread,
                Err(e) => {
                    error!(interface = %name, error = %e, "Failed to spawn capture worker");
                    // Unblocks workers parked on a full queue
                    drop(rx);
                    SupervisorHandle { workers }.shutdown();
                    return Err(e.into());
                }
            };

            *worker.thread.lock() = Some(thread);
            workers.insert(name, worker);
        }

        info!(
            workers = workers.len(),
            queue_capacity = self.config.queue_capacity,
            "Capture supervisor started"
        );

        Ok(PacketStream {
            receiver: rx,
            handle: SupervisorHandle { workers },
        })
    }
}

fn spawn_capture_thread(name: &str, body: WorkerBody) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name(format!("capture-{}", name))
        .spawn(body)
}

/// Pick the interfaces to capture on
///
/// An explicit list is taken as given (loopback included) minus names the
/// source does not know. Otherwise every capture-capable device is used.
pub fn select_interfaces(devices: Vec<Interface>, config: &SupervisorConfig) -> Vec<Interface> {
    if config.interfaces.is_empty() {
        return devices
            .into_iter()
            .filter(|iface| iface.is_capture_capable(config.include_loopback))
            .collect();
    }

    let mut selected: Vec<Interface> = Vec::new();
    for name in &config.interfaces {
        if selected.iter().any(|iface| &iface.name == name) {
            continue;
        }
        match devices.iter().find(|iface| &iface.name == name) {
            Some(iface) => selected.push(iface.clone()),
            None => warn!(interface = %name, "Requested interface not found"),
        }
    }
    selected
}

fn run_worker(source: &dyn CaptureSource, worker: &Worker, tx: mpsc::Sender<Packet>) {
    let name = worker.interface.name.as_str();

    let mut handle = match source.open(&worker.interface) {
        Ok(handle) => handle,
        Err(e) => {
            error!(interface = %name, error = %e, "Failed to open interface");
            worker.set_state(WorkerState::Failed(e.to_string()));
            return;
        }
    };

    worker.set_state(WorkerState::Running);
    info!(interface = %name, "Capture worker running");

    let outcome = capture_loop(handle.as_mut(), worker, &tx);

    if let Some(drops) = handle.kernel_drops() {
        worker.stats.set_kernel_drops(drops);
    }
    handle.close();

    match outcome {
        Ok(()) => {
            info!(interface = %name, "Capture worker stopped");
            worker.set_state(WorkerState::Stopped);
        }
        Err(e) => {
            error!(interface = %name, error = %e, "Capture worker failed");
            worker.set_state(WorkerState::Failed(e.to_string()));
        }
    }
}

fn capture_loop(
    handle: &mut dyn CaptureHandle,
    worker: &Worker,
    tx: &mpsc::Sender<Packet>,
) -> Result<()> {
    while !worker.should_stop() {
        let Some(frame) = handle.next_frame()? else {
            continue;
        };
        worker.stats.record_frame(frame.len());

        let packet = match classify(&frame) {
            Ok(packet) => packet,
            Err(e) => {
                worker.stats.record_decode_error();
                trace!(interface = %frame.interface, error = %e, "Dropping frame");
                continue;
            }
        };

        if !forward(tx, packet, &worker.stats) {
            debug!(interface = %worker.interface.name, "Packet stream closed");
            break;
        }
    }
    Ok(())
}

/// Push a record into the fan-in queue, waiting for space if it is full
///
/// Returns false once the consumer is gone.
fn forward(tx: &mpsc::Sender<Packet>, packet: Packet, stats: &StatsAccumulator) -> bool {
    match tx.try_send(packet) {
        Ok(()) => true,
        Err(TrySendError::Full(packet)) => {
            stats.record_blocked_send();
            tx.blocking_send(packet).is_ok()
        }
        Err(TrySendError::Closed(_)) => false,
    }
}

/// Control and inspection of running workers
#[derive(Clone)]
pub struct SupervisorHandle {
    workers: Arc<DashMap<String, Arc<Worker>>>,
}

impl SupervisorHandle {
    /// Names of all supervised interfaces
    pub fn interfaces(&self) -> Vec<String> {
        let mut names: Vec<String> = self.workers.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    pub fn worker_state(&self, name: &str) -> Option<WorkerState> {
        self.workers.get(name).map(|w| w.state.read().clone())
    }

    pub fn stats(&self, name: &str) -> Option<CaptureStats> {
        self.workers.get(name).map(|w| w.stats.snapshot())
    }

    /// Number of workers still starting or running
    pub fn active_count(&self) -> usize {
        self.workers
            .iter()
            .filter(|e| e.value().state.read().is_active())
            .count()
    }

    /// Stop the worker bound to one interface
    ///
    /// Returns without waiting; the worker exits after its current read
    /// and closes its handle. Other workers are unaffected.
    pub fn close_interface(&self, name: &str) -> Result<()> {
        let worker = self
            .workers
            .get(name)
            .ok_or_else(|| Error::InterfaceNotFound(name.to_string()))?;

        info!(interface = %name, "Closing interface");
        worker.stop.store(true, Ordering::Relaxed);
        Ok(())
    }

    /// Stop every worker and wait for the threads to exit
    ///
    /// Blocks. Workers waiting on a full queue only exit once the consumer
    /// drains it, so keep reading the stream while this runs.
    pub fn shutdown(&self) {
        info!("Stopping all capture workers");

        let workers: Vec<Arc<Worker>> = self.workers.iter().map(|e| Arc::clone(e.value())).collect();
        for worker in &workers {
            worker.stop.store(true, Ordering::Relaxed);
        }

        for worker in workers {
            let thread = worker.thread.lock().take();
            if let Some(thread) = thread {
                if thread.join().is_err() {
                    error!(interface = %worker.interface.name, "Capture worker panicked");
                    worker.set_state(WorkerState::Failed("worker panicked".to_string()));
                }
            }
        }

        info!("All capture workers stopped");
    }
}

/// Consumer end of the fan-in queue
pub struct PacketStream {
    receiver: mpsc::Receiver<Packet>,
    handle: SupervisorHandle,
}

impl PacketStream {
    /// Next record from any interface; `None` once every worker has exited
    pub async fn recv(&mut self) -> Option<Packet> {
        self.receiver.recv().await
    }

    pub fn handle(&self) -> SupervisorHandle {
        self.handle.clone()
    }

    pub fn into_parts(self) -> (mpsc::Receiver<Packet>, SupervisorHandle) {
        (self.receiver, self.handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemorySource;
    use packetsleuth_core::{Frame, LinkHint};
    use packetsleuth_packet::{FrameBuilder, TcpFlags};
    use std::net::Ipv4Addr;
    use std::time::Duration;

    fn tcp_frame(interface: &str, src_port: u16) -> Frame {
        FrameBuilder::new()
            .ipv4(Ipv4Addr::new(10, 0, 0, 1), Ipv4Addr::new(10, 0, 0, 2))
            .tcp(src_port, 80, TcpFlags::ACK)
            .payload(vec![0; 10])
            .frame(interface)
            .unwrap()
    }

    fn config(queue_capacity: usize) -> SupervisorConfig {
        SupervisorConfig {
            queue_capacity,
            ..Default::default()
        }
    }

    async fn next(stream: &mut PacketStream) -> Option<Packet> {
        tokio::time::timeout(Duration::from_secs(5), stream.recv())
            .await
            .ok()
            .flatten()
    }

    async fn wait_for(cond: impl Fn() -> bool) -> bool {
        for _ in 0..500 {
            if cond() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        false
    }

    #[test]
    fn test_select_interfaces() {
        let mut lo = Interface::new("lo");
        lo.is_loopback = true;
        let mut down = Interface::new("eth1");
        down.is_up = false;
        let devices = vec![lo, Interface::new("eth0"), down];

        let all = select_interfaces(devices.clone(), &SupervisorConfig::default());
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].name, "eth0");

        let with_lo = SupervisorConfig {
            include_loopback: true,
            ..Default::default()
        };
        assert_eq!(select_interfaces(devices.clone(), &with_lo).len(), 2);

        let explicit = SupervisorConfig {
            interfaces: vec!["lo".into(), "missing0".into(), "lo".into()],
            ..Default::default()
        };
        let picked = select_interfaces(devices, &explicit);
        assert_eq!(picked.len(), 1);
        assert_eq!(picked[0].name, "lo");
    }

    #[test]
    fn test_start_errors() {
        let empty = CaptureSupervisor::new(Arc::new(MemorySource::new()), config(10));
        assert!(matches!(empty.start(), Err(Error::NoInterfaces)));

        let mut source = MemorySource::new();
        let _feed = source.add_interface(Interface::new("eth0"));
        let zero = CaptureSupervisor::new(Arc::new(source), config(0));
        assert!(matches!(zero.start(), Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn test_open_failure_is_isolated() {
        let mut source = MemorySource::new();
        source.add_unopenable(Interface::new("wlan0"), "permission denied");
        let feed = source.add_interface(Interface::new("eth0"));

        let mut stream = CaptureSupervisor::new(Arc::new(source), config(10))
            .start()
            .unwrap();
        let handle = stream.handle();

        feed.push(tcp_frame("eth0", 1000));
        let packet = next(&mut stream).await.unwrap();
        assert_eq!(packet.interface, "eth0");

        assert!(wait_for(|| !handle.worker_state("wlan0").unwrap().is_active()).await);
        match handle.worker_state("wlan0") {
            Some(WorkerState::Failed(reason)) => assert!(reason.contains("permission denied")),
            other => panic!("unexpected state {:?}", other),
        }
        assert_eq!(handle.worker_state("eth0"), Some(WorkerState::Running));
        assert_eq!(handle.active_count(), 1);
    }

    #[tokio::test]
    async fn test_close_interface_keeps_others_flowing() {
        let mut source = MemorySource::new();
        let feeds: Vec<_> = ["eth0", "eth1", "eth2"]
            .iter()
            .map(|name| source.add_interface(Interface::new(*name)))
            .collect();
        let source = Arc::new(source);

        let mut stream = CaptureSupervisor::new(source.clone(), config(10))
            .start()
            .unwrap();
        let handle = stream.handle();
        assert_eq!(handle.interfaces(), vec!["eth0", "eth1", "eth2"]);

        for feed in &feeds {
            feed.push(tcp_frame(feed.interface(), 1));
        }
        for _ in 0..3 {
            assert!(next(&mut stream).await.is_some());
        }

        handle.close_interface("eth1").unwrap();
        assert!(wait_for(|| handle.worker_state("eth1") == Some(WorkerState::Stopped)).await);
        assert_eq!(source.closed_handles(), vec!["eth1".to_string()]);

        for feed in &feeds {
            feed.push(tcp_frame(feed.interface(), 2));
        }

        let mut seen = vec![next(&mut stream).await.unwrap().interface];
        seen.push(next(&mut stream).await.unwrap().interface);
        seen.sort();
        assert_eq!(seen, vec!["eth0", "eth2"]);

        let extra = tokio::time::timeout(Duration::from_millis(200), stream.recv()).await;
        assert!(extra.is_err(), "closed interface must not deliver packets");
        assert_eq!(handle.active_count(), 2);
    }

    #[tokio::test]
    async fn test_dead_handle_fails_only_its_worker() {
        let mut source = MemorySource::new();
        let eth0 = source.add_interface(Interface::new("eth0"));
        let eth1 = source.add_interface(Interface::new("eth1"));

        let mut stream = CaptureSupervisor::new(Arc::new(source), config(10))
            .start()
            .unwrap();
        let handle = stream.handle();

        drop(eth1);
        assert!(wait_for(|| matches!(handle.worker_state("eth1"), Some(WorkerState::Failed(_)))).await);

        eth0.push(tcp_frame("eth0", 1));
        assert_eq!(next(&mut stream).await.unwrap().interface, "eth0");
    }

    #[tokio::test]
    async fn test_full_queue_blocks_without_loss() {
        let mut source = MemorySource::new();
        let feed = source.add_interface(Interface::new("eth0"));

        let mut stream = CaptureSupervisor::new(Arc::new(source), config(2))
            .start()
            .unwrap();
        let handle = stream.handle();

        for port in 1000..1010 {
            feed.push(tcp_frame("eth0", port));
        }

        // The worker fills the queue, then waits for space
        assert!(wait_for(|| handle.stats("eth0").unwrap().blocked_sends >= 1).await);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(handle.stats("eth0").unwrap().frames_received < 10);

        let mut ports = Vec::new();
        for _ in 0..10 {
            ports.push(next(&mut stream).await.unwrap().src_port);
        }
        assert_eq!(ports, (1000..1010).collect::<Vec<u16>>());

        let stats = handle.stats("eth0").unwrap();
        assert_eq!(stats.frames_received, 10);
        assert_eq!(stats.decode_errors, 0);
    }

    #[tokio::test]
    async fn test_decode_errors_are_counted_and_dropped() {
        let mut source = MemorySource::new();
        let feed = source.add_interface(Interface::new("eth0"));

        let mut stream = CaptureSupervisor::new(Arc::new(source), config(10))
            .start()
            .unwrap();
        let handle = stream.handle();

        feed.push(Frame::new("eth0", LinkHint::Ethernet, Vec::new()));
        feed.push(tcp_frame("eth0", 4242));

        assert_eq!(next(&mut stream).await.unwrap().src_port, 4242);
        let stats = handle.stats("eth0").unwrap();
        assert_eq!(stats.frames_received, 2);
        assert_eq!(stats.decode_errors, 1);
    }

    #[tokio::test]
    async fn test_shutdown_ends_stream() {
        let mut source = MemorySource::new();
        let _eth0 = source.add_interface(Interface::new("eth0"));
        let _eth1 = source.add_interface(Interface::new("eth1"));
        let source = Arc::new(source);

        let mut stream = CaptureSupervisor::new(source.clone(), config(10))
            .start()
            .unwrap();
        let handle = stream.handle();
        assert!(wait_for(|| handle.worker_state("eth0") == Some(WorkerState::Running)).await);

        let stopper = handle.clone();
        tokio::task::spawn_blocking(move || stopper.shutdown())
            .await
            .unwrap();

        assert!(next(&mut stream).await.is_none());
        assert_eq!(handle.active_count(), 0);
        assert_eq!(source.closed_handles(), vec!["eth0", "eth1"]);
        assert!(matches!(
            handle.close_interface("eth9"),
            Err(Error::InterfaceNotFound(_))
        ));
    }

    #[test]
    fn test_spawn_failure_stops_started_workers() {
        let mut source = MemorySource::with_poll_interval(Duration::from_millis(5));
        let _feeds: Vec<_> = ["eth0", "eth1", "eth2"]
            .into_iter()
            .map(|name| source.add_interface(Interface::new(name)))
            .collect();
        let source = Arc::new(source);

        let mut spawned = 0;
        let result = CaptureSupervisor::new(source.clone(), config(10)).start_with(
            |name: &str, body: WorkerBody| {
                spawned += 1;
                if spawned == 3 {
                    return Err(io::Error::other("out of threads"));
                }
                spawn_capture_thread(name, body)
            },
        );

        assert!(matches!(result, Err(Error::Io(_))));
        assert_eq!(source.closed_handles(), vec!["eth0", "eth1"]);
    }
}
