//! 80x25 VGA text-mode console.

use core::ptr;

use ringzero_abi::Console;
use ringzero_lib::Hardware;
use spin::Mutex;

pub const VGA_TEXT_BUFFER: usize = 0xB8000;
pub const VGA_COLUMNS: usize = 80;
pub const VGA_ROWS: usize = 25;

const ATTRIBUTE_MASK: u16 = 0xFF00;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Cursor {
    column: usize,
    row: usize,
}

/// Character writer over a text buffer. The attribute byte of every cell is
/// left as the firmware set it.
///
/// Interrupt handlers print here too, so the cursor lock is only taken with
/// delivery disabled.
pub struct VgaText<'h> {
    hw: &'h dyn Hardware,
    base: usize,
    cursor: Mutex<Cursor>,
}

impl<'h> VgaText<'h> {
    /// # Safety
    /// `base` must address `VGA_COLUMNS * VGA_ROWS` writable `u16` cells that
    /// nothing else writes to.
    pub const unsafe fn new(hw: &'h dyn Hardware, base: usize) -> Self {
        Self {
            hw,
            base,
            cursor: Mutex::new(Cursor { column: 0, row: 0 }),
        }
    }

    /// The console at the standard text-mode address.
    ///
    /// # Safety
    /// The display must be in text mode with the buffer identity mapped.
    pub const unsafe fn standard(hw: &'h dyn Hardware) -> Self {
        unsafe { Self::new(hw, VGA_TEXT_BUFFER) }
    }

    fn put(&self, index: usize, byte: u8) {
        let cell = (self.base as *mut u16).wrapping_add(index);
        // SAFETY: index < VGA_COLUMNS * VGA_ROWS, guaranteed by callers; the
        // buffer is valid per `new`.
        unsafe {
            let old = ptr::read_volatile(cell);
            ptr::write_volatile(cell, (old & ATTRIBUTE_MASK) | byte as u16);
        }
    }

    fn clear(&self) {
        for index in 0..VGA_COLUMNS * VGA_ROWS {
            self.put(index, b' ');
        }
    }

    fn write_byte(&self, cursor: &mut Cursor, byte: u8) {
        match byte {
            b'\n' => {
                cursor.column = 0;
                cursor.row += 1;
            }
            _ => {
                self.put(cursor.row * VGA_COLUMNS + cursor.column, byte);
                cursor.column += 1;
            }
        }

        if cursor.column >= VGA_COLUMNS {
            cursor.column = 0;
            cursor.row += 1;
        }
        if cursor.row >= VGA_ROWS {
            self.clear();
            *cursor = Cursor { column: 0, row: 0 };
        }
    }
}

impl Console for VgaText<'_> {
    fn print(&self, text: &[u8]) {
        let enabled = self.hw.save_and_disable_interrupts();
        {
            let mut cursor = self.cursor.lock();
            for &byte in text {
                self.write_byte(&mut cursor, byte);
            }
        }
        self.hw.restore_interrupts(enabled);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ringzero_lib::testing::{HwEvent, RecordingHardware};

    const CELLS: usize = VGA_COLUMNS * VGA_ROWS;

    fn screen_on(hw: &'static RecordingHardware) -> (Box<[u16; CELLS]>, VgaText<'static>) {
        let mut cells = Box::new([0x0700u16; CELLS]);
        cells[1] = 0x1F00;
        let vga = unsafe { VgaText::new(hw, cells.as_mut_ptr() as usize) };
        (cells, vga)
    }

    fn screen() -> (Box<[u16; CELLS]>, VgaText<'static>) {
        screen_on(RecordingHardware::leaked())
    }

    #[test]
    fn printing_masks_delivery_and_restores_it() {
        let hw = RecordingHardware::leaked();
        let (_cells, vga) = screen_on(hw);

        hw.enable_interrupts();
        hw.clear();
        vga.print(b"ok");
        assert_eq!(hw.events(), [HwEvent::DisableInterrupts, HwEvent::EnableInterrupts]);

        hw.disable_interrupts();
        hw.clear();
        vga.print(b"ok");
        assert_eq!(hw.events(), [HwEvent::DisableInterrupts]);
        assert!(!hw.interrupts_enabled());
    }

    #[test]
    fn writes_keep_attribute() {
        let (cells, vga) = screen();
        vga.print(b"Hi");
        assert_eq!(cells[0], 0x0700 | b'H' as u16);
        assert_eq!(cells[1], 0x1F00 | b'i' as u16);
    }

    #[test]
    fn newline_moves_to_next_row() {
        let (cells, vga) = screen();
        vga.print(b"a\nb");
        assert_eq!(cells[VGA_COLUMNS] & 0xFF, b'b' as u16);
    }

    #[test]
    fn long_line_wraps() {
        let (cells, vga) = screen();
        vga.print(&[b'x'; VGA_COLUMNS + 1]);
        assert_eq!(cells[VGA_COLUMNS] & 0xFF, b'x' as u16);
        assert_eq!(*vga.cursor.lock(), Cursor { column: 1, row: 1 });
    }

    #[test]
    fn last_row_clears_screen() {
        let (cells, vga) = screen();
        vga.print(b"top");
        vga.print(&[b'\n'; VGA_ROWS]);
        assert_eq!(cells[0], 0x0700 | b' ' as u16);
        assert_eq!(*vga.cursor.lock(), Cursor { column: 0, row: 0 });
        vga.print(b"z");
        assert_eq!(cells[0] & 0xFF, b'z' as u16);
    }
}
