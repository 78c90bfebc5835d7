//! Parallel Port Manager Library
//!
//! This library claims, drives and releases up to three Linux parallel ports
//! through the ppdev interface: write a byte to a port's data lines, read a
//! byte from its status lines, and release every claim deterministically,
//! including when the owner goes away unexpectedly.
//!
//! # Modules
//!
//! - `manager`: Slot table, addressing policy and the Open/Write/Read/Close operations
//! - `port`: Device abstraction, the ppdev backend and a recording mock
//! - `error`: Device error types and their classification
//! - `command`: Text/JSON command parsing and response rendering
//! - `config`: Configuration management with TOML support
//! - `logging`: Tracing subscriber setup
//! - `stdio`: Line-oriented command loop
//!
//! # Example
//!
//! ```no_run
//! use parport_manager::PortManager;
//!
//! let mut manager = PortManager::with_ppdev();
//! manager.open(Some("/dev/parport1"))?;
//! manager.write(200)?;
//! let status = manager.read()?;
//! println!("status lines: {}", status[0]);
//! manager.close()?;
//! # Ok::<(), parport_manager::DeviceError>(())
//! ```

pub mod command;
pub mod config;
pub mod error;
pub mod logging;
pub mod manager;
pub mod port;
pub mod stdio;

// Re-export commonly used types for convenience
pub use command::{Command, Outcome};
pub use error::{DeviceError, DeviceResult, ErrorKind};
pub use manager::{AddressingMode, ManagerStatus, PortManager, SlotStatus, DEFAULT_ADDRESSES};
pub use port::{MockBackend, ParallelPort, PortBackend, PpdevBackend};

// Re-export config types
pub use config::{Config, ConfigError, ConfigLoader, ConfigResult};
