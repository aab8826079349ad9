//! x86 I/O port addresses and the command bytes written to them.
//!
//! This module provides a type-safe `Port` newtype for every port the kernel
//! touches, preventing accidentally using other u16 values as port numbers.

/// x86 I/O port address.
///
/// Ports are accessed via IN/OUT instructions. This newtype groups all
/// known port addresses and prevents accidentally using other u16 values.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct Port(pub u16);

impl Port {
    // =========================================================================
    // Serial (8250/16550 UART)
    // =========================================================================

    /// COM1 serial port base address.
    pub const COM1: Self = Self(0x3F8);

    // =========================================================================
    // PS/2 Controller (8042)
    // =========================================================================

    /// PS/2 data port - read keyboard data, write commands to the device.
    pub const PS2_DATA: Self = Self(0x60);

    /// PS/2 status port (read) / command port (write).
    pub const PS2_STATUS: Self = Self(0x64);

    /// PS/2 command port (alias for writes to status port).
    pub const PS2_COMMAND: Self = Self(0x64);

    // =========================================================================
    // Legacy PIC (8259)
    // =========================================================================

    /// Primary PIC command port.
    pub const PIC1_COMMAND: Self = Self(0x20);

    /// Primary PIC data port.
    pub const PIC1_DATA: Self = Self(0x21);

    /// Secondary PIC command port.
    pub const PIC2_COMMAND: Self = Self(0xA0);

    /// Secondary PIC data port.
    pub const PIC2_DATA: Self = Self(0xA1);

    /// Get the raw port number for IN/OUT instructions.
    #[inline]
    pub const fn number(self) -> u16 {
        self.0
    }

    /// Create an offset port (e.g., COM1 + register offset).
    #[inline]
    pub const fn offset(self, off: u16) -> Self {
        Self(self.0 + off)
    }
}

// =============================================================================
// PIC command bytes
// =============================================================================

/// ICW1: edge triggered, cascade mode, ICW4 follows.
pub const PIC_ICW1_INIT: u8 = 0x11;
/// ICW3 for the primary: secondary sits on line 2.
pub const PIC_ICW3_PRIMARY: u8 = 0x04;
/// ICW3 for the secondary: cascade identity 2.
pub const PIC_ICW3_SECONDARY: u8 = 0x02;
/// ICW4: 8086 mode.
pub const PIC_ICW4_8086: u8 = 0x01;
/// OCW1 with no line masked.
pub const PIC_UNMASK_ALL: u8 = 0x00;
/// End of Interrupt command.
pub const PIC_EOI: u8 = 0x20;

// =============================================================================
// PS/2 controller bytes
// =============================================================================

/// Output buffer full (status register).
pub const PS2_STATUS_OUTPUT_FULL: u8 = 0x01;
/// Enable the first PS/2 port (controller command).
pub const PS2_CMD_ENABLE_FIRST_PORT: u8 = 0xAE;
/// Read controller configuration byte (controller command).
pub const PS2_CMD_READ_CONFIG: u8 = 0x20;
/// Write controller configuration byte (controller command).
pub const PS2_CMD_WRITE_CONFIG: u8 = 0x60;
/// First port interrupt enable (configuration byte).
pub const PS2_CONFIG_FIRST_IRQ: u8 = 0x01;
/// First port clock disabled (configuration byte).
pub const PS2_CONFIG_FIRST_CLOCK_DISABLED: u8 = 0x10;
/// Enable scanning (device command).
pub const PS2_DEV_ENABLE_SCANNING: u8 = 0xF4;
/// Scancodes at or above this value are key releases.
pub const PS2_BREAK_CODE_MIN: u8 = 0x80;

// =============================================================================
// UART Register Offsets (relative to COMx base)
// =============================================================================

/// Transmitter Holding Register (write).
pub const UART_REG_THR: u16 = 0;
/// Interrupt Enable Register.
pub const UART_REG_IER: u16 = 1;
/// FIFO Control Register (write).
pub const UART_REG_FCR: u16 = 2;
/// Line Control Register.
pub const UART_REG_LCR: u16 = 3;
/// Modem Control Register.
pub const UART_REG_MCR: u16 = 4;
/// Line Status Register.
pub const UART_REG_LSR: u16 = 5;

/// Divisor Latch Access Bit (LCR).
pub const UART_LCR_DLAB: u8 = 0x80;
/// 8 data bits, no parity, one stop bit (LCR).
pub const UART_LCR_8N1: u8 = 0x03;
/// Enable and clear both FIFOs with a 14-byte threshold (FCR).
pub const UART_FCR_ENABLE_CLEAR_14: u8 = 0xC7;
/// DTR, RTS and OUT2 (MCR).
pub const UART_MCR_DTR_RTS_OUT2: u8 = 0x0B;
/// Transmitter holding register empty (LSR).
pub const UART_LSR_TX_EMPTY: u8 = 0x20;
/// Divisor for 38400 baud.
pub const UART_DIVISOR_38400: u16 = 3;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offsets_from_base() {
        assert_eq!(Port::COM1.offset(UART_REG_LSR).number(), 0x3FD);
        assert_eq!(Port::PS2_STATUS, Port::PS2_COMMAND);
    }
}
