//! Shared test utilities for the parallel port manager tests.
//!
//! Provides a manager wired to a `MockBackend` at fixed mock addresses, so
//! every test can inspect exactly what the manager did to each device.

#![allow(dead_code)]

use parport_manager::port::MockBackend;
use parport_manager::PortManager;

/// Mock default addresses for slots 0, 1 and 2.
pub const SLOT_PATHS: [&str; 3] = ["/dev/mock-pp0", "/dev/mock-pp1", "/dev/mock-pp2"];

/// Create a manager over a fresh mock backend.
///
/// Returns the backend clone that shares state with the manager's.
pub fn create_test_manager() -> (PortManager, MockBackend) {
    let backend = MockBackend::new();
    let manager = PortManager::new(Box::new(backend.clone()), SLOT_PATHS.map(String::from))
        .expect("mock addresses are distinct");
    (manager, backend)
}

/// Create a manager whose write port (slot 1) echoes data to its status lines.
pub fn create_echo_manager() -> (PortManager, MockBackend) {
    let (manager, backend) = create_test_manager();
    backend.set_echo(SLOT_PATHS[1], true);
    (manager, backend)
}
