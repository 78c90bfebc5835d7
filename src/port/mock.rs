//! Mock parallel port implementation for testing.
//!
//! Provides a `MockBackend` that hands out in-memory `MockParallelPort`s.
//! All ports opened from one backend share a journal, so a test can inspect
//! every open, claim, transfer, release and close after the fact, even once
//! the manager that drove them has been dropped.

use super::traits::{ParallelPort, PortBackend};
use std::collections::{HashMap, HashSet};
use std::io;
use std::sync::{Arc, Mutex, MutexGuard};

/// One recorded interaction with a mock device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockEvent {
    Opened(String),
    Claimed(String),
    Released(String),
    Closed(String),
    Wrote(String, u8),
    Read(String, u8),
}

/// Operations that can be made to fail on a given device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockFailure {
    Open,
    Claim,
    WriteData,
    ReadStatus,
    Release,
    Close,
}

/// Simulated electrical state of one device.
#[derive(Debug, Default)]
struct MockDevice {
    /// Value returned by status reads when not echoing.
    status: u8,
    /// When set, status reads return the last value written to the data lines.
    echo: bool,
    /// Last value driven onto the data lines.
    data: Option<u8>,
    /// Handle id currently holding the claim.
    claimed_by: Option<u64>,
}

#[derive(Debug, Default)]
struct MockState {
    devices: HashMap<String, MockDevice>,
    failures: HashSet<(String, MockFailure)>,
    journal: Vec<MockEvent>,
    next_handle: u64,
}

impl MockState {
    fn check(&self, path: &str, op: MockFailure) -> io::Result<()> {
        if self.failures.contains(&(path.to_string(), op)) {
            return Err(io::Error::new(
                io::ErrorKind::Other,
                format!("injected {op:?} failure"),
            ));
        }
        Ok(())
    }
}

/// Backend producing mock ports.
///
/// Cloning the backend shares its state, so a test keeps one clone for
/// inspection and hands the other to the manager.
///
/// # Example
/// ```
/// use parport_manager::port::{MockBackend, MockEvent, ParallelPort, PortBackend};
///
/// let backend = MockBackend::new();
/// backend.set_echo("/dev/parport1", true);
///
/// let mut port = backend.open("/dev/parport1").unwrap();
/// port.claim().unwrap();
/// port.write_data(200).unwrap();
/// assert_eq!(port.read_status().unwrap(), 200);
///
/// assert!(backend.events().contains(&MockEvent::Wrote("/dev/parport1".into(), 200)));
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockBackend {
    state: Arc<Mutex<MockState>>,
}

impl MockBackend {
    /// Create a backend with no devices configured. Any path can be opened.
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Set the baseline value returned by status reads on `path`.
    pub fn set_status(&self, path: &str, status: u8) {
        self.state().devices.entry(path.to_string()).or_default().status = status;
    }

    /// Make status reads on `path` return the last value written to it.
    pub fn set_echo(&self, path: &str, echo: bool) {
        self.state().devices.entry(path.to_string()).or_default().echo = echo;
    }

    /// Make `op` fail on `path` until cleared.
    pub fn fail(&self, path: &str, op: MockFailure) {
        self.state().failures.insert((path.to_string(), op));
    }

    /// Stop failing `op` on `path`.
    pub fn clear_failure(&self, path: &str, op: MockFailure) {
        self.state().failures.remove(&(path.to_string(), op));
    }

    /// Every interaction so far, in order.
    pub fn events(&self) -> Vec<MockEvent> {
        self.state().journal.clone()
    }

    /// Forget recorded interactions.
    pub fn clear_events(&self) {
        self.state().journal.clear();
    }

    /// Last value written to the data lines of `path`, if any.
    pub fn data_lines(&self, path: &str) -> Option<u8> {
        self.state().devices.get(path).and_then(|d| d.data)
    }

    /// Whether some handle currently holds the claim on `path`.
    pub fn is_claimed(&self, path: &str) -> bool {
        self.state()
            .devices
            .get(path)
            .is_some_and(|d| d.claimed_by.is_some())
    }

    /// Paths whose claim is currently held.
    pub fn claimed_paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self
            .state()
            .devices
            .iter()
            .filter(|(_, d)| d.claimed_by.is_some())
            .map(|(p, _)| p.clone())
            .collect();
        paths.sort();
        paths
    }

    /// Number of recorded events matching `pred`.
    pub fn count(&self, pred: impl Fn(&MockEvent) -> bool) -> usize {
        self.state().journal.iter().filter(|e| pred(e)).count()
    }

    /// Simulate another process holding the claim on `path`.
    pub fn claim_externally(&self, path: &str) {
        self.state()
            .devices
            .entry(path.to_string())
            .or_default()
            .claimed_by = Some(u64::MAX);
    }
}

impl PortBackend for MockBackend {
    fn open(&self, path: &str) -> io::Result<Box<dyn ParallelPort>> {
        let mut state = self.state();
        if state.failures.contains(&(path.to_string(), MockFailure::Open)) {
            return Err(io::Error::from(io::ErrorKind::PermissionDenied));
        }
        state.next_handle += 1;
        let handle = state.next_handle;
        state.devices.entry(path.to_string()).or_default();
        state.journal.push(MockEvent::Opened(path.to_string()));
        drop(state);

        Ok(Box::new(MockParallelPort {
            path: path.to_string(),
            handle,
            state: Arc::clone(&self.state),
        }))
    }
}

/// An opened mock device.
pub struct MockParallelPort {
    path: String,
    handle: u64,
    state: Arc<Mutex<MockState>>,
}

impl MockParallelPort {
    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl ParallelPort for MockParallelPort {
    fn path(&self) -> &str {
        &self.path
    }

    fn claim(&mut self) -> io::Result<()> {
        let mut state = self.state();
        state.check(&self.path, MockFailure::Claim)?;
        let device = state.devices.entry(self.path.clone()).or_default();
        if device.claimed_by.is_some_and(|h| h != self.handle) {
            // ppdev reports a claim held elsewhere as EBUSY.
            return Err(io::Error::from_raw_os_error(16));
        }
        device.claimed_by = Some(self.handle);
        state.journal.push(MockEvent::Claimed(self.path.clone()));
        Ok(())
    }

    fn release(&mut self) -> io::Result<()> {
        let mut state = self.state();
        state.check(&self.path, MockFailure::Release)?;
        let device = state.devices.entry(self.path.clone()).or_default();
        if device.claimed_by == Some(self.handle) {
            device.claimed_by = None;
        }
        state.journal.push(MockEvent::Released(self.path.clone()));
        Ok(())
    }

    fn write_data(&mut self, value: u8) -> io::Result<()> {
        let mut state = self.state();
        state.check(&self.path, MockFailure::WriteData)?;
        state.devices.entry(self.path.clone()).or_default().data = Some(value);
        state.journal.push(MockEvent::Wrote(self.path.clone(), value));
        Ok(())
    }

    fn read_status(&mut self) -> io::Result<u8> {
        let mut state = self.state();
        state.check(&self.path, MockFailure::ReadStatus)?;
        let device = state.devices.entry(self.path.clone()).or_default();
        let value = match (device.echo, device.data) {
            (true, Some(data)) => data,
            _ => device.status,
        };
        state.journal.push(MockEvent::Read(self.path.clone(), value));
        Ok(value)
    }

    fn close(self: Box<Self>) -> io::Result<()> {
        let mut state = self.state();
        state.check(&self.path, MockFailure::Close)?;
        // Closing the node drops any claim it still holds, as the kernel does.
        if let Some(device) = state.devices.get_mut(&self.path) {
            if device.claimed_by == Some(self.handle) {
                device.claimed_by = None;
            }
        }
        state.journal.push(MockEvent::Closed(self.path.clone()));
        Ok(())
    }
}

impl std::fmt::Debug for MockParallelPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockParallelPort")
            .field("path", &self.path)
            .field("handle", &self.handle)
            .finish()
    }
}
