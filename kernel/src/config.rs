//! Boot-time constants.

use ringzero_abi::arch::DEFAULT_HARDWARE_OFFSET;
use ringzero_lib::KlogLevel;

/// First vector of the remapped PIC lines.
pub const HARDWARE_OFFSET: u8 = DEFAULT_HARDWARE_OFFSET;

/// PS/2 keyboard is IRQ line 1.
pub const KEYBOARD_VECTOR: u8 = HARDWARE_OFFSET + 1;

#[cfg(feature = "verbose-boot")]
pub const BOOT_LOG_LEVEL: KlogLevel = KlogLevel::Debug;
#[cfg(not(feature = "verbose-boot"))]
pub const BOOT_LOG_LEVEL: KlogLevel = KlogLevel::Info;

pub const BANNER: &[u8] = b"Hello World!\n";
