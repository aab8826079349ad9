//! Interrupt Descriptor Table (IDT) definitions.
//!
//! Vector layout:
//! - 0x00-0x13: processor exceptions wired by the dispatcher
//! - `offset`..`offset + 16`: remapped 8259 PIC lines (default offset 0x20)
//! - everything else: routed to the ignore stub

use super::gdt::SegmentSelector;

/// Number of gates in the table.
pub const IDT_ENTRIES: usize = 256;

/// Exceptions 0x00..0x13 get their own entry stub.
pub const EXCEPTION_VECTOR_COUNT: usize = 0x14;

/// Hardware interrupt lines across both PICs.
pub const IRQ_LINES: usize = 16;

/// Lines per PIC.
pub const PIC_LINES: u8 = 8;

/// First vector of the remapped primary PIC.
pub const DEFAULT_HARDWARE_OFFSET: u8 = 0x20;

// CPU exception vectors.
pub const EXCEPTION_DIVIDE_ERROR: u8 = 0;
pub const EXCEPTION_DEBUG: u8 = 1;
pub const EXCEPTION_NMI: u8 = 2;
pub const EXCEPTION_BREAKPOINT: u8 = 3;
pub const EXCEPTION_OVERFLOW: u8 = 4;
pub const EXCEPTION_BOUND_RANGE: u8 = 5;
pub const EXCEPTION_INVALID_OPCODE: u8 = 6;
pub const EXCEPTION_DEVICE_NOT_AVAIL: u8 = 7;
pub const EXCEPTION_DOUBLE_FAULT: u8 = 8;
pub const EXCEPTION_COPROCESSOR_OVERRUN: u8 = 9;
pub const EXCEPTION_INVALID_TSS: u8 = 10;
pub const EXCEPTION_SEGMENT_NOT_PRES: u8 = 11;
pub const EXCEPTION_STACK_FAULT: u8 = 12;
pub const EXCEPTION_GENERAL_PROTECTION: u8 = 13;
pub const EXCEPTION_PAGE_FAULT: u8 = 14;
pub const EXCEPTION_FPU_ERROR: u8 = 16;
pub const EXCEPTION_ALIGNMENT_CHECK: u8 = 17;
pub const EXCEPTION_MACHINE_CHECK: u8 = 18;
pub const EXCEPTION_SIMD_FP: u8 = 19;

/// Present bit in the gate access byte.
pub const IDT_GATE_PRESENT: u8 = 0x80;

const DPL_SHIFT: u8 = 5;
const DPL_MASK: u8 = 0x3;
const GATE_TYPE_MASK: u8 = 0x0F;

/// System descriptor types usable in the IDT.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GateType {
    Task = 0x5,
    Interrupt16 = 0x6,
    Trap16 = 0x7,
    Interrupt32 = 0xE,
    Trap32 = 0xF,
}

impl GateType {
    pub const fn from_bits(bits: u8) -> Option<Self> {
        match bits & GATE_TYPE_MASK {
            0x5 => Some(Self::Task),
            0x6 => Some(Self::Interrupt16),
            0x7 => Some(Self::Trap16),
            0xE => Some(Self::Interrupt32),
            0xF => Some(Self::Trap32),
            _ => None,
        }
    }
}

/// One 8-byte interrupt gate.
#[repr(C, packed)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GateDescriptor {
    handler_lo: u16,
    selector: u16,
    reserved: u8,
    access: u8,
    handler_hi: u16,
}

const _: () = assert!(core::mem::size_of::<GateDescriptor>() == 8);

impl GateDescriptor {
    /// A gate with every byte zero (not present).
    pub const fn missing() -> Self {
        Self {
            handler_lo: 0,
            selector: 0,
            reserved: 0,
            access: 0,
            handler_hi: 0,
        }
    }

    /// Present gate to `handler` in the segment named by `selector`.
    ///
    /// Only the low two bits of `dpl` are used.
    pub const fn new(handler: u32, selector: SegmentSelector, dpl: u8, gate_type: GateType) -> Self {
        Self {
            handler_lo: (handler & 0xFFFF) as u16,
            selector: selector.bits(),
            reserved: 0,
            access: IDT_GATE_PRESENT | ((dpl & DPL_MASK) << DPL_SHIFT) | gate_type as u8,
            handler_hi: (handler >> 16) as u16,
        }
    }

    #[inline]
    pub const fn handler(&self) -> u32 {
        ((self.handler_hi as u32) << 16) | self.handler_lo as u32
    }

    #[inline]
    pub const fn selector(&self) -> SegmentSelector {
        SegmentSelector(self.selector)
    }

    #[inline]
    pub const fn access(&self) -> u8 {
        self.access
    }

    #[inline]
    pub const fn dpl(&self) -> u8 {
        (self.access >> DPL_SHIFT) & DPL_MASK
    }

    #[inline]
    pub const fn gate_type(&self) -> Option<GateType> {
        GateType::from_bits(self.access)
    }

    #[inline]
    pub const fn is_present(&self) -> bool {
        self.access & IDT_GATE_PRESENT != 0
    }

    pub const fn to_bytes(&self) -> [u8; 8] {
        let lo = self.handler_lo;
        let sel = self.selector;
        let hi = self.handler_hi;
        [
            lo as u8,
            (lo >> 8) as u8,
            sel as u8,
            (sel >> 8) as u8,
            self.reserved,
            self.access,
            hi as u8,
            (hi >> 8) as u8,
        ]
    }
}

/// Operand of `lgdt` / `lidt`: 16-bit limit followed by a 32-bit base.
#[repr(C, packed)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TablePointer {
    limit: u16,
    base: u32,
}

const _: () = assert!(core::mem::size_of::<TablePointer>() == 6);

impl TablePointer {
    /// Pointer for a table of `byte_len` bytes at `base`; the limit is the
    /// offset of the last valid byte.
    pub const fn for_table(base: u32, byte_len: usize) -> Self {
        Self {
            limit: (byte_len - 1) as u16,
            base,
        }
    }

    #[inline]
    pub const fn limit(&self) -> u16 {
        self.limit
    }

    #[inline]
    pub const fn base(&self) -> u32 {
        self.base
    }
}

/// Get human-readable name for exception vector.
pub fn exception_name(vector: u8) -> &'static str {
    match vector {
        EXCEPTION_DIVIDE_ERROR => "Divide Error",
        EXCEPTION_DEBUG => "Debug",
        EXCEPTION_NMI => "Non-Maskable Interrupt",
        EXCEPTION_BREAKPOINT => "Breakpoint",
        EXCEPTION_OVERFLOW => "Overflow",
        EXCEPTION_BOUND_RANGE => "Bound Range Exceeded",
        EXCEPTION_INVALID_OPCODE => "Invalid Opcode",
        EXCEPTION_DEVICE_NOT_AVAIL => "Device Not Available",
        EXCEPTION_DOUBLE_FAULT => "Double Fault",
        EXCEPTION_COPROCESSOR_OVERRUN => "Coprocessor Segment Overrun",
        EXCEPTION_INVALID_TSS => "Invalid TSS",
        EXCEPTION_SEGMENT_NOT_PRES => "Segment Not Present",
        EXCEPTION_STACK_FAULT => "Stack Segment Fault",
        EXCEPTION_GENERAL_PROTECTION => "General Protection Fault",
        EXCEPTION_PAGE_FAULT => "Page Fault",
        EXCEPTION_FPU_ERROR => "x87 FPU Error",
        EXCEPTION_ALIGNMENT_CHECK => "Alignment Check",
        EXCEPTION_MACHINE_CHECK => "Machine Check",
        EXCEPTION_SIMD_FP => "SIMD Floating-Point Exception",
        _ => "Unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gate_layout() {
        let gate = GateDescriptor::new(
            0x1234_5678,
            SegmentSelector::KERNEL_CODE,
            0,
            GateType::Interrupt32,
        );
        assert_eq!(gate.to_bytes(), [0x78, 0x56, 0x10, 0x00, 0x00, 0x8E, 0x34, 0x12]);
        assert_eq!(gate.handler(), 0x1234_5678);
        assert_eq!(gate.selector(), SegmentSelector::KERNEL_CODE);
        assert_eq!(gate.gate_type(), Some(GateType::Interrupt32));
        assert!(gate.is_present());
    }

    #[test]
    fn gate_dpl_is_masked() {
        let gate = GateDescriptor::new(0, SegmentSelector::KERNEL_CODE, 0xFF, GateType::Trap32);
        assert_eq!(gate.dpl(), 3);
        assert_eq!(gate.access(), 0x80 | 0x60 | 0xF);
    }

    #[test]
    fn missing_gate_is_zero() {
        let gate = GateDescriptor::missing();
        assert_eq!(gate.to_bytes(), [0; 8]);
        assert!(!gate.is_present());
        assert_eq!(gate.gate_type(), None);
    }

    #[test]
    fn table_pointer_limit_is_last_byte() {
        let ptr = TablePointer::for_table(0x0010_0000, IDT_ENTRIES * 8);
        assert_eq!(ptr.limit(), 0x7FF);
        assert_eq!(ptr.base(), 0x0010_0000);
        let gdt = TablePointer::for_table(0x2000, 4 * 8);
        assert_eq!(gdt.limit(), 31);
    }

    #[test]
    fn exception_names() {
        assert_eq!(exception_name(EXCEPTION_PAGE_FAULT), "Page Fault");
        assert_eq!(exception_name(15), "Unknown");
        assert_eq!(exception_name(0x80), "Unknown");
    }
}
