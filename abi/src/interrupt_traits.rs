//! Interrupt handler trait interface - breaks the dependency between device
//! drivers and the dispatcher.
//!
//! Drivers depend on `abi` and implement [`InterruptHandler`]; `boot` owns the
//! dispatcher and calls through trait objects.

/// A receiver for one interrupt vector.
pub trait InterruptHandler: Send + Sync {
    /// Service the interrupt whose saved register frame starts at `esp`.
    ///
    /// Returns the stack pointer to resume from. Returning `esp` unchanged
    /// resumes the interrupted context.
    fn handle_interrupt(&self, esp: u32) -> u32;
}
