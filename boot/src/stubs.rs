//! Assembly entry points the gate table points at.

use ringzero_abi::arch::{EXCEPTION_VECTOR_COUNT, IRQ_LINES};

/// Set in the event code of every IRQ stub; the low byte is the PIC line.
pub const IRQ_EVENT_FLAG: u32 = 0x100;

#[cfg(target_arch = "x86")]
core::arch::global_asm!(
    include_str!("stubs.s"),
    irq_event = const IRQ_EVENT_FLAG,
    data_selector = const crate::gdt::GlobalDescriptorTable::DATA_SEGMENT_OFFSET,
    options(att_syntax)
);

/// Event code describing where an interrupt came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InterruptEvent {
    /// A vector delivered straight from the gate table.
    Vector(u8),
    /// A PIC line, relative to the dispatcher's hardware offset.
    IrqLine(u8),
}

impl InterruptEvent {
    pub const fn decode(code: u32) -> Self {
        if code & IRQ_EVENT_FLAG != 0 {
            Self::IrqLine((code & 0xFF) as u8)
        } else {
            Self::Vector((code & 0xFF) as u8)
        }
    }
}

/// Addresses of every entry stub.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EntryStubs {
    /// Returns immediately; installed for every vector with no stub of its own.
    pub ignore: u32,
    pub exceptions: [u32; EXCEPTION_VECTOR_COUNT],
    pub irqs: [u32; IRQ_LINES],
}

#[cfg(target_arch = "x86")]
macro_rules! stub_addresses {
    ($prefix:ident: $($n:literal)*) => {
        paste::paste! {{
            unsafe extern "C" {
                $( fn [<$prefix $n>](); )*
            }
            [ $( [<$prefix $n>] as *const () as usize as u32 ),* ]
        }}
    };
}

impl EntryStubs {
    /// The stubs assembled into this image.
    #[cfg(target_arch = "x86")]
    pub fn resolve() -> Self {
        unsafe extern "C" {
            fn ringzero_interrupt_ignore();
        }
        Self {
            ignore: ringzero_interrupt_ignore as *const () as usize as u32,
            exceptions: stub_addresses!(ringzero_exception_:
                0 1 2 3 4 5 6 7 8 9 10 11 12 13 14 15 16 17 18 19),
            irqs: stub_addresses!(ringzero_irq_:
                0 1 2 3 4 5 6 7 8 9 10 11 12 13 14 15),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_codes_decode() {
        assert_eq!(InterruptEvent::decode(0x0E), InterruptEvent::Vector(0x0E));
        assert_eq!(InterruptEvent::decode(0x101), InterruptEvent::IrqLine(1));
        assert_eq!(InterruptEvent::decode(0x10F), InterruptEvent::IrqLine(15));
    }
}
