//! Architecture-specific constants and records for 32-bit x86.
//!
//! Canonical definitions for segment descriptors, interrupt gates, vector
//! numbers and I/O ports used across kernel subsystems.

pub mod x86;

pub use x86::*;

// Re-export the vector layout at the arch level, it is consulted by every
// crate that touches interrupts.
pub use x86::idt::{
    DEFAULT_HARDWARE_OFFSET, EXCEPTION_VECTOR_COUNT, IDT_ENTRIES, IRQ_LINES, PIC_LINES,
};
