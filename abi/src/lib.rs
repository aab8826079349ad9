//! ringzero hardware ABI types
//!
//! This crate provides the canonical definitions for every binary record the
//! processor consumes directly (segment descriptors, interrupt gates, table
//! pointers), the fixed vector and port numbers, and the capability traits
//! that let device crates plug into the dispatcher without depending on it.
//!
//! All hardware records are `#[repr(C, packed)]` and checked for size at
//! compile time.

#![cfg_attr(not(test), no_std)]
#![forbid(unsafe_code)]

pub mod arch;
pub mod console_traits;
pub mod error;
pub mod interrupt_traits;

pub use console_traits::*;
pub use error::*;
pub use interrupt_traits::*;
