//! One-shot initialization flag.
//!
//! ```ignore
//! static SERIAL_INIT: InitFlag = InitFlag::new();
//!
//! pub fn init() {
//!     if !SERIAL_INIT.init_once() {
//!         return;
//!     }
//!     // program the device
//! }
//! ```

use core::sync::atomic::{AtomicBool, Ordering};

#[repr(transparent)]
pub struct InitFlag {
    flag: AtomicBool,
}

impl InitFlag {
    #[inline]
    pub const fn new() -> Self {
        Self {
            flag: AtomicBool::new(false),
        }
    }

    /// Returns `true` for the caller that flipped the flag, `false` for
    /// everyone after.
    #[inline]
    pub fn init_once(&self) -> bool {
        !self.flag.swap(true, Ordering::SeqCst)
    }

    #[inline]
    pub fn is_set(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

impl Default for InitFlag {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_once_fires_once() {
        let flag = InitFlag::new();
        assert!(!flag.is_set());
        assert!(flag.init_once());
        assert!(!flag.init_once());
        assert!(flag.is_set());
    }
}
