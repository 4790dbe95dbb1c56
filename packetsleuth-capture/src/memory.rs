//! In-memory capture source
//!
//! Frames are pushed through a [`FrameFeed`] per interface. Used to drive
//! the supervisor and the pipeline without privileges or real devices.

use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::time::Duration;

use packetsleuth_core::{Error, Frame, Interface, Result};

use crate::source::{CaptureHandle, CaptureSource};

/// Default wait per `next_frame` call
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Sending side for one in-memory interface
///
/// Dropping the feed ends the capture with a fatal error, as if the device
/// disappeared.
#[derive(Debug, Clone)]
pub struct FrameFeed {
    interface: String,
    tx: Sender<Frame>,
}

impl FrameFeed {
    /// Queue a frame, returning false once the handle is closed
    pub fn push(&self, frame: Frame) -> bool {
        self.tx.send(frame).is_ok()
    }

    pub fn interface(&self) -> &str {
        &self.interface
    }
}

/// Capture source backed by channels
pub struct MemorySource {
    devices: Vec<Interface>,
    feeds: Mutex<HashMap<String, Receiver<Frame>>>,
    unopenable: HashMap<String, String>,
    closed: Arc<Mutex<HashSet<String>>>,
    poll_interval: Duration,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::with_poll_interval(DEFAULT_POLL_INTERVAL)
    }

    pub fn with_poll_interval(poll_interval: Duration) -> Self {
        Self {
            devices: Vec::new(),
            feeds: Mutex::new(HashMap::new()),
            unopenable: HashMap::new(),
            closed: Arc::new(Mutex::new(HashSet::new())),
            poll_interval,
        }
    }

    /// Register an interface and return its feed
    pub fn add_interface(&mut self, interface: Interface) -> FrameFeed {
        let (tx, rx) = mpsc::channel();
        let name = interface.name.clone();
        self.feeds.lock().insert(name.clone(), rx);
        self.devices.push(interface);
        FrameFeed {
            interface: name,
            tx,
        }
    }

    /// Register an interface whose open always fails
    pub fn add_unopenable(&mut self, interface: Interface, reason: &str) {
        self.unopenable
            .insert(interface.name.clone(), reason.to_string());
        self.devices.push(interface);
    }

    /// Names of interfaces whose handle has been closed
    pub fn closed_handles(&self) -> Vec<String> {
        let mut names: Vec<String> = self.closed.lock().iter().cloned().collect();
        names.sort();
        names
    }
}

impl Default for MemorySource {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureSource for MemorySource {
    fn list_devices(&self) -> Result<Vec<Interface>> {
        Ok(self.devices.clone())
    }

    fn open(&self, interface: &Interface) -> Result<Box<dyn CaptureHandle>> {
        if let Some(reason) = self.unopenable.get(&interface.name) {
            return Err(Error::open(&interface.name, reason));
        }

        let rx = self
            .feeds
            .lock()
            .remove(&interface.name)
            .ok_or_else(|| Error::open(&interface.name, "no feed or already open"))?;

        Ok(Box::new(MemoryHandle {
            interface: interface.name.clone(),
            rx: Some(rx),
            closed: Arc::clone(&self.closed),
            poll_interval: self.poll_interval,
        }))
    }
}

struct MemoryHandle {
    interface: String,
    rx: Option<Receiver<Frame>>,
    closed: Arc<Mutex<HashSet<String>>>,
    poll_interval: Duration,
}

impl CaptureHandle for MemoryHandle {
    fn next_frame(&mut self) -> Result<Option<Frame>> {
        let rx = self
            .rx
            .as_ref()
            .ok_or_else(|| Error::Capture(format!("{}: handle closed", self.interface)))?;

        match rx.recv_timeout(self.poll_interval) {
            Ok(frame) => Ok(Some(frame)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => {
                Err(Error::Capture(format!("{}: feed closed", self.interface)))
            }
        }
    }

    fn close(&mut self) {
        if self.rx.take().is_some() {
            self.closed.lock().insert(self.interface.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use packetsleuth_core::LinkHint;

    #[test]
    fn test_feed_and_close() {
        let mut source = MemorySource::new();
        let feed = source.add_interface(Interface::new("eth0"));

        let mut handle = source.open(&Interface::new("eth0")).unwrap();
        assert!(handle.next_frame().unwrap().is_none());

        assert!(feed.push(Frame::new("eth0", LinkHint::Ethernet, vec![1, 2, 3])));
        assert_eq!(handle.next_frame().unwrap().unwrap().len(), 3);

        handle.close();
        handle.close();
        assert!(handle.next_frame().is_err());
        assert!(!feed.push(Frame::new("eth0", LinkHint::Ethernet, vec![1])));
        assert_eq!(source.closed_handles(), vec!["eth0".to_string()]);
    }

    #[test]
    fn test_open_failures() {
        let mut source = MemorySource::new();
        source.add_unopenable(Interface::new("wlan0"), "permission denied");
        let _feed = source.add_interface(Interface::new("eth0"));

        assert!(matches!(
            source.open(&Interface::new("wlan0")),
            Err(Error::Open { .. })
        ));
        assert!(source.open(&Interface::new("eth0")).is_ok());
        // A feed can only be opened once
        assert!(source.open(&Interface::new("eth0")).is_err());
        assert_eq!(source.list_devices().unwrap().len(), 2);
    }

    #[test]
    fn test_dropped_feed_is_fatal() {
        let mut source = MemorySource::new();
        let feed = source.add_interface(Interface::new("eth0"));
        let mut handle = source.open(&Interface::new("eth0")).unwrap();

        drop(feed);
        assert!(matches!(handle.next_frame(), Err(Error::Capture(_))));
    }
}
