//! PS/2 keyboard on the first controller port, echoing key presses to a
//! console.

use ringzero_abi::arch::Port as PortNumber;
use ringzero_abi::arch::ports::{
    PS2_BREAK_CODE_MIN, PS2_CMD_ENABLE_FIRST_PORT, PS2_CMD_READ_CONFIG, PS2_CMD_WRITE_CONFIG,
    PS2_CONFIG_FIRST_CLOCK_DISABLED, PS2_CONFIG_FIRST_IRQ, PS2_DEV_ENABLE_SCANNING,
    PS2_STATUS_OUTPUT_FULL,
};
use ringzero_abi::{Console, InterruptHandler};
use ringzero_lib::numfmt::patch_hex_byte;
use ringzero_lib::{Hardware, Port, klog_debug};

const UNKNOWN_KEY: &[u8; 14] = b"KEYBOARD 0x00 ";
const UNKNOWN_KEY_DIGITS: usize = 11;

#[inline(always)]
fn is_break_code(scancode: u8) -> bool {
    scancode >= PS2_BREAK_CODE_MIN
}

/// Set-1 make code to character, German (QWERTZ) layout.
fn translate(scancode: u8) -> Option<u8> {
    const DIGITS: &[u8; 10] = b"1234567890";
    const TOP_ROW: &[u8; 10] = b"qwertzuiop";
    const HOME_ROW: &[u8; 9] = b"asdfghjkl";
    const BOTTOM_ROW: &[u8; 7] = b"yxcvbnm";

    let c = match scancode {
        0x02..=0x0B => DIGITS[(scancode - 0x02) as usize],
        0x10..=0x19 => TOP_ROW[(scancode - 0x10) as usize],
        0x1E..=0x26 => HOME_ROW[(scancode - 0x1E) as usize],
        0x2C..=0x32 => BOTTOM_ROW[(scancode - 0x2C) as usize],
        0x33 => b',',
        0x34 => b'.',
        0x35 => b'-',
        0x1C => b'\n',
        0x39 => b' ',
        _ => return None,
    };
    Some(c)
}

pub struct KeyboardDriver<'a> {
    data: Port<'a>,
    command: Port<'a>,
    console: &'a dyn Console,
}

impl<'a> KeyboardDriver<'a> {
    pub const fn new(hw: &'a dyn Hardware, console: &'a dyn Console) -> Self {
        Self {
            data: Port::new(hw, PortNumber::PS2_DATA),
            command: Port::new(hw, PortNumber::PS2_COMMAND),
            console,
        }
    }

    /// Flush stale output, enable the first port with its interrupt line,
    /// and turn on scanning.
    pub fn init(&self) {
        while self.command.read() & PS2_STATUS_OUTPUT_FULL != 0 {
            self.data.read();
        }

        self.command.write(PS2_CMD_ENABLE_FIRST_PORT);
        self.command.write(PS2_CMD_READ_CONFIG);
        let config =
            (self.data.read() | PS2_CONFIG_FIRST_IRQ) & !PS2_CONFIG_FIRST_CLOCK_DISABLED;
        self.command.write(PS2_CMD_WRITE_CONFIG);
        self.data.write(config);

        self.data.write(PS2_DEV_ENABLE_SCANNING);
        klog_debug!("PS/2: keyboard enabled, config {:#04x}", config);
    }

    /// Echo one scan code. Releases are dropped.
    pub fn handle_scancode(&self, scancode: u8) {
        if is_break_code(scancode) {
            return;
        }
        match translate(scancode) {
            Some(c) => self.console.print(&[c]),
            None => self
                .console
                .print(&patch_hex_byte(UNKNOWN_KEY, UNKNOWN_KEY_DIGITS, scancode)),
        }
    }
}

impl InterruptHandler for KeyboardDriver<'_> {
    fn handle_interrupt(&self, esp: u32) -> u32 {
        let scancode = self.data.read();
        self.handle_scancode(scancode);
        esp
    }
}
