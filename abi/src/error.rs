//! Error types reported across crate boundaries.

use core::fmt;

/// Interrupt dispatcher operation result type
pub type InterruptResult<T> = Result<T, InterruptError>;

/// Errors returned by the interrupt dispatcher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterruptError {
    /// Registration token no longer matches the slot it names
    StaleRegistration,
}

impl fmt::Display for InterruptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::StaleRegistration => "stale handler registration",
        })
    }
}
