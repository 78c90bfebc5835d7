//! Port abstraction layer for parallel port devices.
//!
//! Provides the traits the manager is written against, the Linux ppdev
//! implementation, and a recording mock for tests.

pub mod mock;
pub mod ppdev;
pub mod traits;

pub use mock::{MockBackend, MockEvent, MockFailure, MockParallelPort};
pub use ppdev::PpdevBackend;
pub use traits::{ParallelPort, PortBackend};
