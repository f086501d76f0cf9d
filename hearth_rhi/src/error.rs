//! Error types for the Hearth RHI
//!
//! Recoverable failures (driver object creation, shader compilation, incomplete
//! framebuffers) surface as [`Error`]. Contract violations (out-of-range slots,
//! ending a pass that was never begun) are debug assertions instead.

use std::fmt;

/// Result type for Hearth RHI operations
pub type Result<T> = std::result::Result<T, Error>;

/// Hearth RHI errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Driver-reported failure (object creation, link error, incomplete framebuffer)
    BackendError(String),

    /// The driver could not allocate storage for a resource
    OutOfMemory,

    /// Invalid resource description or handle
    InvalidResource(String),

    /// Device or context initialization failed
    InitializationFailed(String),

    /// The driver lacks a capability the request depends on
    Unsupported(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::OutOfMemory => write!(f, "Out of GPU memory"),
            Error::InvalidResource(msg) => write!(f, "Invalid resource: {}", msg),
            Error::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            Error::Unsupported(msg) => write!(f, "Unsupported: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
