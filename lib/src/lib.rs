#![cfg_attr(not(test), no_std)]

#[cfg(all(feature = "testing", not(test)))]
extern crate std;

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
pub mod cpu {
    use core::arch::asm;

    #[inline(always)]
    pub fn hlt() {
        unsafe {
            asm!("hlt", options(nomem, nostack, preserves_flags));
        }
    }

    #[inline(always)]
    pub fn halt_loop() -> ! {
        loop {
            hlt();
        }
    }

    /// Mask interrupts and stop the processor for good.
    #[inline(always)]
    pub fn halt_forever() -> ! {
        unsafe {
            asm!("cli", options(nomem, nostack));
        }
        halt_loop()
    }
}

pub mod hw;
pub mod init_flag;
pub mod io;
pub mod klog;
pub mod numfmt;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
pub use hw::Cpu;
pub use hw::{Hardware, Port, SlowPort};
pub use init_flag::InitFlag;
pub use klog::{klog_attach, klog_get_level, klog_is_attached, klog_set_level, KlogLevel};
pub use numfmt::hex_byte;
