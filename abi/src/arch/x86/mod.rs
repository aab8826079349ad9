//! 32-bit x86 protected-mode definitions.
//!
//! Raw integer constants are wrapped in newtypes to prevent misuse:
//! - `SegmentSelector(u16)` for descriptor table selectors
//! - `Port(u16)` for I/O port addresses
//! - `SegmentAccess` / `SegmentFlags` bitflags for descriptor bytes
//!
//! The descriptor records mirror the processor's byte layout exactly so they
//! can be handed to `lgdt` / `lidt` without conversion.

pub mod gdt;
pub mod idt;
pub mod ports;

pub use gdt::{SegmentAccess, SegmentDescriptor, SegmentFlags, SegmentSelector};
pub use idt::{GateDescriptor, GateType, TablePointer};
pub use ports::Port;
