//! Core traits for parallel port abstraction.
//!
//! `PortBackend` opens device nodes and `ParallelPort` drives one opened
//! device, so the real ppdev driver and the in-memory mock can be used
//! interchangeably by the manager.

use std::io;

/// One opened parallel port device.
///
/// Opening and claiming are separate steps: a freshly opened device holds no
/// claim until [`ParallelPort::claim`] succeeds.
pub trait ParallelPort: Send + std::fmt::Debug {
    /// The device path this port was opened from.
    fn path(&self) -> &str;

    /// Claim exclusive access to the port (`PPCLAIM`).
    fn claim(&mut self) -> io::Result<()>;

    /// Release exclusive access (`PPRELEASE`).
    fn release(&mut self) -> io::Result<()>;

    /// Drive `value` onto the data lines (`PPWDATA`).
    fn write_data(&mut self, value: u8) -> io::Result<()>;

    /// Sample the status lines (`PPRSTATUS`).
    fn read_status(&mut self) -> io::Result<u8>;

    /// Close the underlying device node.
    ///
    /// Consumes the port so a closed handle can never be reused.
    fn close(self: Box<Self>) -> io::Result<()>;
}

/// Opens parallel port devices by path.
pub trait PortBackend: Send + std::fmt::Debug {
    /// Open the device at `path` for reading and writing, without claiming it.
    fn open(&self, path: &str) -> io::Result<Box<dyn ParallelPort>>;
}
