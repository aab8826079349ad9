//! 16550 UART on COM1, used as the `klog` sink.

use ringzero_abi::Console;
use ringzero_abi::arch::Port as PortNumber;
use ringzero_abi::arch::ports::{
    UART_DIVISOR_38400, UART_FCR_ENABLE_CLEAR_14, UART_LCR_8N1, UART_LCR_DLAB,
    UART_LSR_TX_EMPTY, UART_MCR_DTR_RTS_OUT2, UART_REG_FCR, UART_REG_IER, UART_REG_LCR,
    UART_REG_LSR, UART_REG_MCR, UART_REG_THR,
};
use ringzero_lib::{Hardware, InitFlag, Port};

/// Line-status polls before a byte is written regardless.
const TX_SPIN_LIMIT: usize = 10_000;

pub struct SerialConsole<'h> {
    hw: &'h dyn Hardware,
    base: PortNumber,
    ready: InitFlag,
}

impl<'h> SerialConsole<'h> {
    pub const fn new(hw: &'h dyn Hardware, base: PortNumber) -> Self {
        Self {
            hw,
            base,
            ready: InitFlag::new(),
        }
    }

    pub const fn com1(hw: &'h dyn Hardware) -> Self {
        Self::new(hw, PortNumber::COM1)
    }

    #[inline]
    fn reg(&self, offset: u16) -> Port<'h> {
        Port::new(self.hw, self.base.offset(offset))
    }

    /// 38400 baud, 8N1, FIFOs on, receive interrupts off. Only the first call
    /// programs the UART.
    pub fn init(&self) {
        if !self.ready.init_once() {
            return;
        }
        let [divisor_lo, divisor_hi] = UART_DIVISOR_38400.to_le_bytes();

        self.reg(UART_REG_IER).write(0x00);
        self.reg(UART_REG_LCR).write(UART_LCR_DLAB);
        self.reg(UART_REG_THR).write(divisor_lo);
        self.reg(UART_REG_IER).write(divisor_hi);
        self.reg(UART_REG_LCR).write(UART_LCR_8N1);
        self.reg(UART_REG_FCR).write(UART_FCR_ENABLE_CLEAR_14);
        self.reg(UART_REG_MCR).write(UART_MCR_DTR_RTS_OUT2);
    }

    pub fn is_ready(&self) -> bool {
        self.ready.is_set()
    }

    fn putc(&self, byte: u8) {
        let lsr = self.reg(UART_REG_LSR);
        for _ in 0..TX_SPIN_LIMIT {
            if lsr.read() & UART_LSR_TX_EMPTY != 0 {
                break;
            }
            core::hint::spin_loop();
        }
        self.reg(UART_REG_THR).write(byte);
    }
}

impl Console for SerialConsole<'_> {
    /// Dropped until [`SerialConsole::init`] has run. `\n` goes out as `\r\n`.
    fn print(&self, text: &[u8]) {
        if !self.is_ready() {
            return;
        }
        for &byte in text {
            if byte == b'\n' {
                self.putc(b'\r');
            }
            self.putc(byte);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ringzero_lib::testing::RecordingHardware;

    const LSR: PortNumber = PortNumber(0x3FD);

    #[test]
    fn init_programs_uart_once() {
        let hw = RecordingHardware::new();
        let serial = SerialConsole::com1(&hw);
        serial.init();
        serial.init();

        assert_eq!(
            hw.writes(),
            [
                (PortNumber(0x3F9), 0x00, false),
                (PortNumber(0x3FB), 0x80, false),
                (PortNumber(0x3F8), 0x03, false),
                (PortNumber(0x3F9), 0x00, false),
                (PortNumber(0x3FB), 0x03, false),
                (PortNumber(0x3FA), 0xC7, false),
                (PortNumber(0x3FC), 0x0B, false),
            ]
        );
    }

    #[test]
    fn output_before_init_is_dropped() {
        let hw = RecordingHardware::new();
        SerialConsole::com1(&hw).print(b"lost");
        assert!(hw.events().is_empty());
    }

    #[test]
    fn newline_is_expanded() {
        let hw = RecordingHardware::new();
        let serial = SerialConsole::com1(&hw);
        serial.init();
        hw.clear();
        hw.script_reads(LSR, &[0x20; 3]);

        serial.print(b"k\n");
        let bytes: Vec<u8> = hw
            .writes()
            .into_iter()
            .filter(|(port, _, _)| *port == PortNumber::COM1)
            .map(|(_, value, _)| value)
            .collect();
        assert_eq!(bytes, b"k\r\n");
    }
}
