//! Device error types.
//!
//! Every failure of the port manager is a [`DeviceError`]. Each variant names
//! the device it concerns and, where the OS reported one, carries the
//! underlying `io::Error` so the message includes the OS error text and code.

use serde::Serialize;
use std::fmt;
use std::io;
use thiserror::Error;

/// A specialized `Result` type for port manager operations.
pub type DeviceResult<T> = Result<T, DeviceError>;

/// Errors raised by the port manager.
#[derive(Debug, Error)]
pub enum DeviceError {
    /// The device node could not be opened (missing, or no permission).
    #[error("Couldn't open parallel port {path} (does the user have permission on the device?): {source}")]
    Open {
        path: String,
        #[source]
        source: io::Error,
    },

    /// Exclusive access could not be claimed (e.g. held by another process).
    #[error("PPCLAIM failed on {path}: {source}")]
    Claim {
        path: String,
        #[source]
        source: io::Error,
    },

    /// A data or status transfer failed.
    #[error("{op} failed on {path}: {source}")]
    Transfer {
        path: String,
        op: TransferOp,
        #[source]
        source: io::Error,
    },

    /// A transfer was attempted on a slot that is not open.
    #[error("Parallel port {path} (slot {slot}) was not opened")]
    NotOpen { slot: usize, path: String },

    /// The caller supplied a malformed argument.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Releasing or closing a device failed.
    #[error("{stage} failed on {path}: {source}")]
    Release {
        path: String,
        stage: ReleaseStage,
        #[source]
        source: io::Error,
    },
}

/// The transfer that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferOp {
    /// Writing the data lines.
    WriteData,
    /// Reading the status lines.
    ReadStatus,
}

impl fmt::Display for TransferOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WriteData => write!(f, "PPWDATA"),
            Self::ReadStatus => write!(f, "PPRSTATUS"),
        }
    }
}

/// Which step of tearing down a device failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseStage {
    /// Dropping the exclusive claim.
    Release,
    /// Closing the device node.
    Close,
}

impl fmt::Display for ReleaseStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Release => write!(f, "PPRELEASE"),
            Self::Close => write!(f, "close"),
        }
    }
}

/// Coarse classification of a [`DeviceError`], as reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    DeviceOpenError,
    ClaimError,
    TransferError,
    UsageError,
    ReleaseError,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl DeviceError {
    /// Create an `InvalidArgument` error from a message.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Open { .. } => ErrorKind::DeviceOpenError,
            Self::Claim { .. } => ErrorKind::ClaimError,
            Self::Transfer { .. } => ErrorKind::TransferError,
            Self::NotOpen { .. } | Self::InvalidArgument(_) => ErrorKind::UsageError,
            Self::Release { .. } => ErrorKind::ReleaseError,
        }
    }

    /// Whether this is a usage error rather than a device failure.
    pub fn is_usage(&self) -> bool {
        self.kind() == ErrorKind::UsageError
    }
}
