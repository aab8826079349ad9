//! Legacy 8259 PIC pair in cascade mode.

use ringzero_abi::arch::ports::{
    PIC_EOI, PIC_ICW1_INIT, PIC_ICW3_PRIMARY, PIC_ICW3_SECONDARY, PIC_ICW4_8086, PIC_UNMASK_ALL,
};
use ringzero_abi::arch::{DEFAULT_HARDWARE_OFFSET, IRQ_LINES, PIC_LINES, Port};
use ringzero_lib::{Hardware, SlowPort, klog_debug};

struct Pic<'h> {
    command: SlowPort<'h>,
    data: SlowPort<'h>,
}

pub struct ChainedPics<'h> {
    primary: Pic<'h>,
    secondary: Pic<'h>,
    offset: u8,
}

impl<'h> ChainedPics<'h> {
    /// Handles for both controllers. Nothing is written until [`Self::remap`].
    pub const fn new(hw: &'h dyn Hardware) -> Self {
        Self {
            primary: Pic {
                command: SlowPort::new(hw, Port::PIC1_COMMAND),
                data: SlowPort::new(hw, Port::PIC1_DATA),
            },
            secondary: Pic {
                command: SlowPort::new(hw, Port::PIC2_COMMAND),
                data: SlowPort::new(hw, Port::PIC2_DATA),
            },
            offset: DEFAULT_HARDWARE_OFFSET,
        }
    }

    /// Move IRQ 0-7 to `offset..offset + 8` and IRQ 8-15 to the eight vectors
    /// after that, then unmask every line.
    pub fn remap(&mut self, offset: u8) {
        self.offset = offset;
        let secondary_offset = offset.wrapping_add(PIC_LINES);

        self.primary.command.write(PIC_ICW1_INIT);
        self.secondary.command.write(PIC_ICW1_INIT);

        self.primary.data.write(offset);
        self.secondary.data.write(secondary_offset);

        self.primary.data.write(PIC_ICW3_PRIMARY);
        self.secondary.data.write(PIC_ICW3_SECONDARY);

        self.primary.data.write(PIC_ICW4_8086);
        self.secondary.data.write(PIC_ICW4_8086);

        self.primary.data.write(PIC_UNMASK_ALL);
        self.secondary.data.write(PIC_UNMASK_ALL);

        klog_debug!(
            "PIC: remapped to vectors {:#04x} and {:#04x}",
            offset,
            secondary_offset
        );
    }

    #[inline]
    pub const fn offset(&self) -> u8 {
        self.offset
    }

    /// Whether `vector` is one of the sixteen remapped lines.
    #[inline]
    pub const fn handles(&self, vector: u8) -> bool {
        let v = vector as u16;
        let base = self.offset as u16;
        v >= base && v < base + IRQ_LINES as u16
    }

    #[inline]
    const fn is_secondary(&self, vector: u8) -> bool {
        let v = vector as u16;
        let base = self.offset as u16 + PIC_LINES as u16;
        v >= base && v < base + PIC_LINES as u16
    }

    /// Send end-of-interrupt for `vector`. The secondary is acknowledged
    /// first when the line is cascaded; vectors outside the IRQ block are
    /// ignored.
    pub fn acknowledge(&self, vector: u8) {
        if !self.handles(vector) {
            return;
        }
        if self.is_secondary(vector) {
            self.secondary.command.write(PIC_EOI);
        }
        self.primary.command.write(PIC_EOI);
    }
}
