//! Parallel port manager.
//!
//! Owns the three device slots and the addressing policy that decides which
//! of them Open, Read and Write act on. All port operations flow through
//! [`PortManager`]; adapters (the CLI, the stdio loop) only translate
//! commands into calls on it.
//!
//! # Addressing
//!
//! ```text
//! multi-port:  open -> slots 0,1,2 (default addresses)   read -> [s0, s1, s2]   write -> slot 1
//! single-port: open -> slot 0 (caller address)           read -> [s0]           write -> slot 0
//! ```
//!
//! # Threading
//!
//! The manager is a plain owned value with no internal locking. Calls must
//! be serialized by the owner; every operation blocks until the underlying
//! ioctl returns.
//!
//! # Teardown
//!
//! Dropping the manager closes every open slot, so no claim outlives the
//! owning scope, whether it ends through `close`, an early return, or an
//! unwinding panic.

use crate::error::{DeviceError, DeviceResult, ReleaseStage, TransferOp};
use crate::port::{ParallelPort, PortBackend, PpdevBackend};
use serde::Serialize;
use std::fmt;
use tracing::{debug, error, info, warn};

/// Number of device slots tracked by the manager.
pub const SLOT_COUNT: usize = 3;

/// Slot written to in multi-port mode.
pub const DEFAULT_WRITE_SLOT: usize = 1;

/// Default device addresses for slots 0, 1 and 2.
pub const DEFAULT_ADDRESSES: [&str; SLOT_COUNT] = ["/dev/parport0", "/dev/parport1", "/dev/parport4"];

/// Which slots Open and Read act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressingMode {
    /// All three slots at their default addresses.
    MultiPort,
    /// Slot 0 only, at a caller-supplied address.
    SinglePort,
}

impl fmt::Display for AddressingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MultiPort => write!(f, "multi-port"),
            Self::SinglePort => write!(f, "single-port"),
        }
    }
}

/// One device attachment point.
#[derive(Debug)]
struct Slot {
    /// Address the slot was last opened from, or its default.
    address: String,
    /// Open, claimed device. `None` means closed.
    port: Option<Box<dyn ParallelPort>>,
}

impl Slot {
    fn new(address: String) -> Self {
        Self { address, port: None }
    }

    fn is_open(&self) -> bool {
        self.port.is_some()
    }
}

/// Snapshot of one slot, for status reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlotStatus {
    pub index: usize,
    pub address: String,
    pub open: bool,
}

/// Snapshot of the manager state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManagerStatus {
    pub mode: AddressingMode,
    pub write_target: usize,
    pub slots: Vec<SlotStatus>,
}

/// Values sampled from the status lines by [`PortManager::read`], in slot order.
pub type ReadResult = Vec<u8>;

/// Manages claim, transfer and release of up to three parallel ports.
pub struct PortManager {
    backend: Box<dyn PortBackend>,
    defaults: [String; SLOT_COUNT],
    slots: [Slot; SLOT_COUNT],
    mode: AddressingMode,
    write_target: usize,
}

impl PortManager {
    /// Create a manager over `backend`, using `defaults` as the multi-port
    /// addresses of slots 0, 1 and 2. All slots start closed.
    ///
    /// # Errors
    ///
    /// - `DeviceError::InvalidArgument` if an address is empty or two slots
    ///   share one
    pub fn new(
        backend: Box<dyn PortBackend>,
        defaults: [String; SLOT_COUNT],
    ) -> DeviceResult<Self> {
        for (index, address) in defaults.iter().enumerate() {
            if address.trim().is_empty() {
                return Err(DeviceError::invalid_argument(format!(
                    "default address of slot {index} must not be empty"
                )));
            }
            if let Some(other) = defaults[..index].iter().position(|a| a == address) {
                return Err(DeviceError::invalid_argument(format!(
                    "slots {other} and {index} share the address {address}"
                )));
            }
        }
        Ok(Self::from_parts(backend, defaults))
    }

    /// Create a manager driving real ppdev devices at the built-in default addresses.
    pub fn with_ppdev() -> Self {
        Self::from_parts(
            Box::new(PpdevBackend::new()),
            DEFAULT_ADDRESSES.map(String::from),
        )
    }

    fn from_parts(backend: Box<dyn PortBackend>, defaults: [String; SLOT_COUNT]) -> Self {
        let slots = defaults.clone().map(Slot::new);
        Self {
            backend,
            defaults,
            slots,
            mode: AddressingMode::MultiPort,
            write_target: DEFAULT_WRITE_SLOT,
        }
    }

    /// Open devices and claim exclusive access.
    ///
    /// With no address, every default slot is (re)opened in order and
    /// multi-port mode is restored. With an address, the manager switches to
    /// single-port mode and (re)opens slot 0 at that address; slots 1 and 2
    /// are left as they are.
    ///
    /// A slot that is already open is released and closed before being
    /// opened again. The first failure aborts the call; slots opened earlier
    /// in the same call stay open.
    ///
    /// # Errors
    ///
    /// - `DeviceError::Open` if a device node cannot be opened
    /// - `DeviceError::Claim` if exclusive access cannot be claimed
    /// - `DeviceError::Release` if closing a previously open slot fails
    /// - `DeviceError::InvalidArgument` if `address` is empty or already held
    ///   by slot 1 or 2
    pub fn open(&mut self, address: Option<&str>) -> DeviceResult<()> {
        match address {
            None => {
                self.mode = AddressingMode::MultiPort;
                self.write_target = DEFAULT_WRITE_SLOT;
                for index in 0..SLOT_COUNT {
                    let path = self.defaults[index].clone();
                    self.reopen_slot(index, &path)?;
                }
            }
            Some(path) => {
                if path.trim().is_empty() {
                    return Err(DeviceError::invalid_argument("device address must not be empty"));
                }
                self.ensure_not_held(0, path)?;
                self.mode = AddressingMode::SinglePort;
                self.write_target = 0;
                self.reopen_slot(0, path)?;
            }
        }
        Ok(())
    }

    /// Write one byte to the data lines of the write-target slot.
    ///
    /// # Errors
    ///
    /// - `DeviceError::NotOpen` if the write-target slot is closed
    /// - `DeviceError::Transfer` if the transfer fails
    pub fn write(&mut self, value: u8) -> DeviceResult<()> {
        let index = self.write_target;
        let port = self.open_port(index)?;
        port.write_data(value).map_err(|source| DeviceError::Transfer {
            path: port.path().to_string(),
            op: TransferOp::WriteData,
            source,
        })?;
        debug!(slot = index, value, "wrote data lines");
        Ok(())
    }

    /// Read the status lines of every active slot, in slot order.
    ///
    /// Multi-port mode yields three values (slots 0, 1, 2); single-port mode
    /// yields one (slot 0). Any failure aborts the whole call; slots read
    /// before the failing one are not rolled back.
    ///
    /// # Errors
    ///
    /// - `DeviceError::NotOpen` if any active slot is closed
    /// - `DeviceError::Transfer` if a transfer fails
    pub fn read(&mut self) -> DeviceResult<ReadResult> {
        let count = match self.mode {
            AddressingMode::MultiPort => SLOT_COUNT,
            AddressingMode::SinglePort => 1,
        };

        let mut values = Vec::with_capacity(count);
        for index in 0..count {
            let port = self.open_port(index)?;
            let value = port.read_status().map_err(|source| DeviceError::Transfer {
                path: port.path().to_string(),
                op: TransferOp::ReadStatus,
                source,
            })?;
            debug!(slot = index, value, "read status lines");
            values.push(value);
        }
        Ok(values)
    }

    /// Release and close every open slot, then restore the default
    /// addressing mode and write target.
    ///
    /// Cleanup is best effort: a failure on one slot does not stop the
    /// others from being closed, and every slot ends up closed either way.
    /// Closing when nothing is open succeeds.
    ///
    /// # Errors
    ///
    /// - `DeviceError::Release` for the first slot that failed to release or
    ///   close; later failures are logged.
    pub fn close(&mut self) -> DeviceResult<()> {
        let mut failures = self.close_all().into_iter();
        let first_error = failures.next();
        for (index, e) in failures {
            warn!(slot = index, error = %e, "additional failure while closing");
        }

        match first_error {
            Some((_, e)) => Err(e),
            None => Ok(()),
        }
    }

    /// Close everything, reporting failures instead of returning them.
    ///
    /// Leaves the manager in the same state as [`close`](Self::close).
    /// Returns the number of slots that failed to close cleanly. Called on
    /// drop; safe to call any number of times.
    pub fn teardown(&mut self) -> usize {
        let failures = self.close_all();
        for (index, e) in &failures {
            error!(slot = index, error = %e, "failed to release parallel port during teardown");
        }
        failures.len()
    }

    /// Current addressing mode.
    pub fn mode(&self) -> AddressingMode {
        self.mode
    }

    /// Index of the slot `write` targets.
    pub fn write_target(&self) -> usize {
        self.write_target
    }

    /// Whether slot `index` holds an open, claimed device.
    pub fn is_open(&self, index: usize) -> bool {
        self.slots.get(index).is_some_and(Slot::is_open)
    }

    /// Number of slots currently open.
    pub fn open_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_open()).count()
    }

    /// Snapshot of mode, write target and slot table.
    pub fn status(&self) -> ManagerStatus {
        ManagerStatus {
            mode: self.mode,
            write_target: self.write_target,
            slots: self
                .slots
                .iter()
                .enumerate()
                .map(|(index, slot)| SlotStatus {
                    index,
                    address: slot.address.clone(),
                    open: slot.is_open(),
                })
                .collect(),
        }
    }

    // ========== Helper Methods ==========

    fn open_port(&mut self, index: usize) -> DeviceResult<&mut Box<dyn ParallelPort>> {
        let slot = &mut self.slots[index];
        match slot.port.as_mut() {
            Some(port) => Ok(port),
            None => Err(DeviceError::NotOpen {
                slot: index,
                path: slot.address.clone(),
            }),
        }
    }

    /// Close every slot and restore default mode, write target and addresses.
    /// Returns the failures in slot order.
    fn close_all(&mut self) -> Vec<(usize, DeviceError)> {
        let failures = (0..SLOT_COUNT)
            .filter_map(|index| self.close_slot(index).err().map(|e| (index, e)))
            .collect();

        self.mode = AddressingMode::MultiPort;
        self.write_target = DEFAULT_WRITE_SLOT;
        for (slot, default) in self.slots.iter_mut().zip(&self.defaults) {
            slot.address.clone_from(default);
        }
        failures
    }

    /// A second PPCLAIM on a device this process already holds blocks forever.
    fn ensure_not_held(&self, index: usize, path: &str) -> DeviceResult<()> {
        let holder = self
            .slots
            .iter()
            .enumerate()
            .position(|(other, slot)| other != index && slot.is_open() && slot.address == path);
        match holder {
            Some(other) => Err(DeviceError::invalid_argument(format!(
                "{path} is already claimed by slot {other}"
            ))),
            None => Ok(()),
        }
    }

    fn reopen_slot(&mut self, index: usize, path: &str) -> DeviceResult<()> {
        self.ensure_not_held(index, path)?;
        self.close_slot(index)?;
        self.slots[index].address = path.to_string();

        let mut port = self.backend.open(path).map_err(|source| DeviceError::Open {
            path: path.to_string(),
            source,
        })?;

        if let Err(source) = port.claim() {
            // The node is useless unclaimed; a close failure here would only
            // mask the claim error.
            if let Err(e) = port.close() {
                warn!(path, error = %e, "failed to close device after claim failure");
            }
            return Err(DeviceError::Claim {
                path: path.to_string(),
                source,
            });
        }

        info!(slot = index, path, "parallel port opened");
        self.slots[index].port = Some(port);
        Ok(())
    }

    fn close_slot(&mut self, index: usize) -> DeviceResult<()> {
        let Some(mut port) = self.slots[index].port.take() else {
            return Ok(());
        };
        let path = port.path().to_string();

        // The device node is closed even if the release fails; closing it
        // drops any claim the kernel still holds for us.
        let released = port.release().map_err(|source| DeviceError::Release {
            path: path.clone(),
            stage: ReleaseStage::Release,
            source,
        });
        let closed = port.close().map_err(|source| DeviceError::Release {
            path: path.clone(),
            stage: ReleaseStage::Close,
            source,
        });

        released?;
        closed?;
        info!(slot = index, path = %path, "parallel port closed");
        Ok(())
    }
}

impl Drop for PortManager {
    fn drop(&mut self) {
        if self.open_count() > 0 {
            let failures = self.teardown();
            if failures == 0 {
                debug!("released all parallel ports on teardown");
            }
        }
    }
}

impl fmt::Debug for PortManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PortManager")
            .field("backend", &self.backend)
            .field("mode", &self.mode)
            .field("write_target", &self.write_target)
            .field("slots", &self.slots)
            .finish()
    }
}

// ========== Tests ==========
