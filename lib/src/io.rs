//! Raw x86 port and descriptor-register instructions.
//!
//! Everything here executes a privileged instruction directly. Kernel code
//! goes through [`crate::hw::Hardware`] instead so the same logic can run
//! against a recording double on the host.

#![cfg(any(target_arch = "x86", target_arch = "x86_64"))]

use core::arch::asm;

use ringzero_abi::arch::TablePointer;

/// # Safety
/// Port I/O can have arbitrary side effects on hardware state.
#[inline(always)]
pub unsafe fn inb(port: u16) -> u8 {
    let value: u8;
    unsafe {
        asm!(
            "in al, dx",
            out("al") value,
            in("dx") port,
            options(nomem, nostack, preserves_flags)
        );
    }
    value
}

/// # Safety
/// Port I/O can have arbitrary side effects on hardware state.
#[inline(always)]
pub unsafe fn outb(port: u16, value: u8) {
    unsafe {
        asm!(
            "out dx, al",
            in("dx") port,
            in("al") value,
            options(nomem, nostack, preserves_flags)
        );
    }
}

/// Write followed by two short jumps, giving slow devices such as the 8259
/// time to settle before the next access.
///
/// # Safety
/// Port I/O can have arbitrary side effects on hardware state.
#[inline(always)]
pub unsafe fn outb_slow(port: u16, value: u8) {
    unsafe {
        asm!(
            "out dx, al",
            "jmp 2f",
            "2:",
            "jmp 3f",
            "3:",
            in("dx") port,
            in("al") value,
            options(nomem, nostack, preserves_flags)
        );
    }
}

/// # Safety
/// `pointer` must describe a valid descriptor table that outlives its use by
/// the processor.
#[inline(always)]
pub unsafe fn lgdt(pointer: &TablePointer) {
    unsafe {
        asm!("lgdt [{}]", in(reg) pointer, options(readonly, nostack, preserves_flags));
    }
}

/// # Safety
/// `pointer` must describe a valid gate table that outlives its use by the
/// processor.
#[inline(always)]
pub unsafe fn lidt(pointer: &TablePointer) {
    unsafe {
        asm!("lidt [{}]", in(reg) pointer, options(readonly, nostack, preserves_flags));
    }
}

/// # Safety
/// Handlers for every vector must be installed before delivery is enabled.
#[inline(always)]
pub unsafe fn sti() {
    unsafe {
        asm!("sti", options(nomem, nostack));
    }
}

#[inline(always)]
pub fn cli() {
    unsafe {
        asm!("cli", options(nomem, nostack));
    }
}

const EFLAGS_IF: usize = 1 << 9;

/// Whether the interrupt flag is currently set.
#[inline(always)]
pub fn interrupts_enabled() -> bool {
    let flags: usize;
    unsafe {
        #[cfg(target_arch = "x86")]
        asm!("pushfd", "pop {}", out(reg) flags, options(nomem, preserves_flags));
        #[cfg(target_arch = "x86_64")]
        asm!("pushfq", "pop {}", out(reg) flags, options(nomem, preserves_flags));
    }
    flags & EFLAGS_IF != 0
}
