//! Privileged hardware access.
//!
//! Every port access, table load and interrupt-flag change in the kernel goes
//! through [`Hardware`]. [`Cpu`] executes the real instructions; tests use
//! `testing::RecordingHardware`.

use core::fmt;

use ringzero_abi::arch::{self, TablePointer};

pub trait Hardware: Sync {
    fn read_port(&self, port: arch::Port) -> u8;
    fn write_port(&self, port: arch::Port, value: u8);
    /// Write, then stall long enough for a slow device to latch the value.
    fn write_port_slow(&self, port: arch::Port, value: u8);
    /// Install `pointer` into GDTR. The table it names must be `'static`.
    fn load_gdt(&self, pointer: &TablePointer);
    /// Install `pointer` into IDTR. The table it names must be `'static`.
    fn load_idt(&self, pointer: &TablePointer);
    fn enable_interrupts(&self);
    fn disable_interrupts(&self);
    fn interrupts_enabled(&self) -> bool;

    /// Disable delivery and report whether it was enabled before.
    fn save_and_disable_interrupts(&self) -> bool {
        let enabled = self.interrupts_enabled();
        self.disable_interrupts();
        enabled
    }

    /// Undo [`Self::save_and_disable_interrupts`].
    fn restore_interrupts(&self, enabled: bool) {
        if enabled {
            self.enable_interrupts();
        }
    }
}

/// The processor this code runs on, in ring 0.
#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
pub struct Cpu {
    _private: (),
}

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
impl Cpu {
    /// # Safety
    /// The caller must be running at privilege level 0 with no other code
    /// programming the same devices.
    pub const unsafe fn new() -> Self {
        Self { _private: () }
    }
}

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
impl Hardware for Cpu {
    fn read_port(&self, port: arch::Port) -> u8 {
        // SAFETY: `Cpu` only exists in ring 0.
        unsafe { crate::io::inb(port.number()) }
    }

    fn write_port(&self, port: arch::Port, value: u8) {
        // SAFETY: `Cpu` only exists in ring 0.
        unsafe { crate::io::outb(port.number(), value) }
    }

    fn write_port_slow(&self, port: arch::Port, value: u8) {
        // SAFETY: `Cpu` only exists in ring 0.
        unsafe { crate::io::outb_slow(port.number(), value) }
    }

    fn load_gdt(&self, pointer: &TablePointer) {
        // SAFETY: callers hand in pointers to `'static` tables.
        unsafe { crate::io::lgdt(pointer) }
    }

    fn load_idt(&self, pointer: &TablePointer) {
        // SAFETY: callers hand in pointers to `'static` tables.
        unsafe { crate::io::lidt(pointer) }
    }

    fn enable_interrupts(&self) {
        // SAFETY: the dispatcher only enables delivery once the IDT is loaded.
        unsafe { crate::io::sti() }
    }

    fn disable_interrupts(&self) {
        crate::io::cli()
    }

    fn interrupts_enabled(&self) -> bool {
        crate::io::interrupts_enabled()
    }
}

/// One I/O port bound to the hardware it lives on.
#[derive(Clone, Copy)]
pub struct Port<'h> {
    hw: &'h dyn Hardware,
    number: arch::Port,
}

impl<'h> Port<'h> {
    #[inline]
    pub const fn new(hw: &'h dyn Hardware, number: arch::Port) -> Self {
        Self { hw, number }
    }

    #[inline]
    pub const fn number(&self) -> arch::Port {
        self.number
    }

    #[inline]
    pub fn read(&self) -> u8 {
        self.hw.read_port(self.number)
    }

    #[inline]
    pub fn write(&self, value: u8) {
        self.hw.write_port(self.number, value)
    }
}

impl fmt::Debug for Port<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Port")
            .field("address", &format_args!("0x{:04x}", self.number.number()))
            .finish()
    }
}

/// A port whose writes are followed by a settle delay.
#[derive(Clone, Copy)]
pub struct SlowPort<'h> {
    port: Port<'h>,
}

impl<'h> SlowPort<'h> {
    #[inline]
    pub const fn new(hw: &'h dyn Hardware, number: arch::Port) -> Self {
        Self {
            port: Port::new(hw, number),
        }
    }

    #[inline]
    pub const fn number(&self) -> arch::Port {
        self.port.number
    }

    #[inline]
    pub fn read(&self) -> u8 {
        self.port.read()
    }

    #[inline]
    pub fn write(&self, value: u8) {
        self.port.hw.write_port_slow(self.port.number, value)
    }
}

impl fmt::Debug for SlowPort<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlowPort")
            .field("address", &format_args!("0x{:04x}", self.port.number.number()))
            .finish()
    }
}
