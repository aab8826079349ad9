use core::mem::{offset_of, size_of};

use ringzero_abi::arch::{SegmentAccess, SegmentDescriptor, SegmentSelector, TablePointer};
use ringzero_lib::{Hardware, klog_debug};

/// Flat segments cover the first 64 MiB.
pub const FLAT_SEGMENT_LIMIT: u32 = 64 * 1024 * 1024;

/// Flat protected-mode table: null, an unused slot, kernel code, kernel data.
#[repr(C, align(8))]
#[derive(Clone, Copy, Debug)]
pub struct GlobalDescriptorTable {
    null: SegmentDescriptor,
    unused: SegmentDescriptor,
    code: SegmentDescriptor,
    data: SegmentDescriptor,
}

impl GlobalDescriptorTable {
    pub const CODE_SEGMENT_OFFSET: u16 = offset_of!(GlobalDescriptorTable, code) as u16;
    pub const DATA_SEGMENT_OFFSET: u16 = offset_of!(GlobalDescriptorTable, data) as u16;

    pub const fn flat() -> Self {
        Self {
            null: SegmentDescriptor::null(),
            unused: SegmentDescriptor::null(),
            code: SegmentDescriptor::new(0, FLAT_SEGMENT_LIMIT, SegmentAccess::KERNEL_CODE),
            data: SegmentDescriptor::new(0, FLAT_SEGMENT_LIMIT, SegmentAccess::KERNEL_DATA),
        }
    }

    #[inline]
    pub const fn code_segment_offset(&self) -> u16 {
        Self::CODE_SEGMENT_OFFSET
    }

    #[inline]
    pub const fn data_segment_offset(&self) -> u16 {
        Self::DATA_SEGMENT_OFFSET
    }

    #[inline]
    pub const fn code_selector(&self) -> SegmentSelector {
        SegmentSelector::from_offset(Self::CODE_SEGMENT_OFFSET)
    }

    #[inline]
    pub const fn data_selector(&self) -> SegmentSelector {
        SegmentSelector::from_offset(Self::DATA_SEGMENT_OFFSET)
    }

    pub const fn code(&self) -> SegmentDescriptor {
        self.code
    }

    pub const fn data(&self) -> SegmentDescriptor {
        self.data
    }

    pub fn pointer(&self) -> TablePointer {
        TablePointer::for_table(self as *const Self as usize as u32, size_of::<Self>())
    }

    /// Install the table into GDTR.
    pub fn load(&'static self, hw: &dyn Hardware) {
        let pointer = self.pointer();
        hw.load_gdt(&pointer);
        klog_debug!(
            "GDT: loaded at {:#010x}, limit {:#x}",
            pointer.base(),
            pointer.limit()
        );
    }
}

const _: () = assert!(size_of::<GlobalDescriptorTable>() == 32);
const _: () = assert!(GlobalDescriptorTable::CODE_SEGMENT_OFFSET == 0x10);
const _: () = assert!(GlobalDescriptorTable::DATA_SEGMENT_OFFSET == 0x18);

/// Reload CS with a far jump and every data segment register, so the
/// processor stops using descriptors cached from the boot loader's table.
///
/// # Safety
/// The flat table must already be loaded into GDTR.
#[cfg(target_arch = "x86")]
pub unsafe fn reload_segment_registers() {
    unsafe {
        core::arch::asm!(
            "ljmp ${code}, $2f",
            "2:",
            "movw ${data}, %ax",
            "movw %ax, %ds",
            "movw %ax, %es",
            "movw %ax, %fs",
            "movw %ax, %gs",
            "movw %ax, %ss",
            code = const GlobalDescriptorTable::CODE_SEGMENT_OFFSET,
            data = const GlobalDescriptorTable::DATA_SEGMENT_OFFSET,
            out("eax") _,
            options(att_syntax, nostack)
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ringzero_lib::testing::{HwEvent, RecordingHardware};

    #[test]
    fn flat_table_layout() {
        let gdt = GlobalDescriptorTable::flat();
        assert_eq!(gdt.code_segment_offset(), 0x10);
        assert_eq!(gdt.data_segment_offset(), 0x18);
        assert_eq!(gdt.code().access().bits(), 0x9A);
        assert_eq!(gdt.data().access().bits(), 0x92);
        assert_eq!(gdt.code().base(), 0);
        assert_eq!(gdt.code().limit(), FLAT_SEGMENT_LIMIT - 1);
        assert_eq!(gdt.code_selector(), SegmentSelector::KERNEL_CODE);
        assert_eq!(gdt.data_selector(), SegmentSelector::KERNEL_DATA);
    }

    #[test]
    fn load_uses_size_minus_one() {
        let gdt: &'static GlobalDescriptorTable = Box::leak(Box::new(GlobalDescriptorTable::flat()));
        let hw = RecordingHardware::new();
        gdt.load(&hw);
        assert_eq!(
            hw.events(),
            [HwEvent::LoadGdt {
                base: gdt as *const GlobalDescriptorTable as usize as u32,
                limit: 31,
            }]
        );
    }
}
