use core::mem::size_of;

use ringzero_abi::arch::{GateDescriptor, GateType, IDT_ENTRIES, SegmentSelector, TablePointer};
use spin::Mutex;

#[repr(C, align(8))]
pub struct InterruptDescriptorTable {
    gates: [GateDescriptor; IDT_ENTRIES],
}

const _: () = assert!(size_of::<InterruptDescriptorTable>() == IDT_ENTRIES * 8);

/// The table the processor's IDTR points at.
pub static IDT: Mutex<InterruptDescriptorTable> = Mutex::new(InterruptDescriptorTable::new());

impl InterruptDescriptorTable {
    /// A table of not-present gates.
    pub const fn new() -> Self {
        Self {
            gates: [GateDescriptor::missing(); IDT_ENTRIES],
        }
    }

    /// Point `vector` at `handler` through a 32-bit interrupt gate.
    pub fn set_gate(&mut self, vector: u8, handler: u32, selector: SegmentSelector, dpl: u8) {
        self.gates[vector as usize] =
            GateDescriptor::new(handler, selector, dpl, GateType::Interrupt32);
    }

    #[inline]
    pub fn gate(&self, vector: u8) -> GateDescriptor {
        self.gates[vector as usize]
    }

    pub fn gates(&self) -> &[GateDescriptor; IDT_ENTRIES] {
        &self.gates
    }

    pub fn pointer(&self) -> TablePointer {
        TablePointer::for_table(self as *const Self as usize as u32, size_of::<Self>())
    }
}

impl Default for InterruptDescriptorTable {
    fn default() -> Self {
        Self::new()
    }
}
