//! Global Descriptor Table (GDT) definitions.
//!
//! This module provides the byte-exact segment descriptor record, the access
//! and flag bits that go into it, and type-safe segment selectors.
//!
//! Descriptor layout (8 bytes, no padding):
//!
//! | Byte | Field                                   |
//! |------|-----------------------------------------|
//! | 0-1  | limit bits 0-15                         |
//! | 2-3  | base bits 0-15                          |
//! | 4    | base bits 16-23                         |
//! | 5    | access byte                             |
//! | 6    | flags (high nibble), limit bits 16-19   |
//! | 7    | base bits 24-31                         |

use core::fmt;

/// Largest limit that is still stored byte-granular.
pub const BYTE_GRANULAR_LIMIT_MAX: u32 = 65536;

/// Shift between a byte limit and a 4 KiB page count.
pub const PAGE_GRANULARITY_SHIFT: u32 = 12;

const PAGE_OFFSET_MASK: u32 = (1 << PAGE_GRANULARITY_SHIFT) - 1;
const LIMIT_HIGH_MASK: u8 = 0x0F;
const FLAGS_MASK: u8 = 0xF0;

bitflags::bitflags! {
    /// Access byte of a code or data segment descriptor (byte 5).
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct SegmentAccess: u8 {
        /// Set by the CPU on first use.
        const ACCESSED = 1 << 0;
        /// Readable (code) or writable (data).
        const READ_WRITE = 1 << 1;
        /// Conforming (code) or expand-down (data).
        const CONFORMING = 1 << 2;
        /// Executable segment.
        const EXECUTABLE = 1 << 3;
        /// Code/data segment rather than a system segment.
        const SEGMENT = 1 << 4;
        /// DPL = 3 (Ring 3 / User), bits 5-6.
        const DPL_USER = 3 << 5;
        /// Present bit.
        const PRESENT = 1 << 7;
    }
}

impl SegmentAccess {
    /// Ring 0 code segment: present, executable, readable = 0x9A.
    pub const KERNEL_CODE: Self = Self::PRESENT
        .union(Self::SEGMENT)
        .union(Self::EXECUTABLE)
        .union(Self::READ_WRITE);

    /// Ring 0 data segment: present, writable = 0x92.
    pub const KERNEL_DATA: Self = Self::PRESENT
        .union(Self::SEGMENT)
        .union(Self::READ_WRITE);
}

bitflags::bitflags! {
    /// Flag nibble of a segment descriptor, kept in its byte-6 position.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct SegmentFlags: u8 {
        /// Available for system software.
        const AVAILABLE = 1 << 4;
        /// 64-bit code segment (unused in protected mode).
        const LONG_MODE = 1 << 5;
        /// 32-bit default operand size.
        const SIZE_32 = 1 << 6;
        /// Limit counts 4 KiB pages instead of bytes.
        const GRANULARITY_4K = 1 << 7;
    }
}

impl SegmentFlags {
    /// Flags of a page-granular 32-bit segment (0xC0).
    pub const PAGE_GRANULAR_32: Self = Self::SIZE_32.union(Self::GRANULARITY_4K);
}

/// One 8-byte segment descriptor.
#[repr(C, packed)]
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct SegmentDescriptor {
    limit_lo: u16,
    base_lo: u16,
    base_hi: u8,
    access: u8,
    flags_limit_hi: u8,
    base_vhi: u8,
}

const _: () = assert!(core::mem::size_of::<SegmentDescriptor>() == 8);

impl SegmentDescriptor {
    /// Encode a descriptor.
    ///
    /// Limits up to [`BYTE_GRANULAR_LIMIT_MAX`] are stored as-is. Larger limits
    /// are stored as a page count with the granularity flag set; an exact
    /// multiple of 4096 encodes one page lower than its shifted value, so the
    /// stored limit addresses the last byte of the region rather than one
    /// past it. Values are never validated.
    ///
    /// This inverts the classic rule, which drops a page when the low 12 bits
    /// are nonzero: a flat 64 MiB segment is stored as `0x3FFF` pages here,
    /// not `0x4000`. Re-encoding a decoded limit gives the same descriptor, and
    /// an exact multiple of 4096 decodes to `limit - 1`.
    pub const fn new(base: u32, limit: u32, access: SegmentAccess) -> Self {
        let (encoded, flags) = if limit <= BYTE_GRANULAR_LIMIT_MAX {
            (limit, SegmentFlags::SIZE_32)
        } else if limit & PAGE_OFFSET_MASK == 0 {
            (
                (limit >> PAGE_GRANULARITY_SHIFT) - 1,
                SegmentFlags::PAGE_GRANULAR_32,
            )
        } else {
            (limit >> PAGE_GRANULARITY_SHIFT, SegmentFlags::PAGE_GRANULAR_32)
        };

        Self {
            limit_lo: (encoded & 0xFFFF) as u16,
            base_lo: (base & 0xFFFF) as u16,
            base_hi: ((base >> 16) & 0xFF) as u8,
            access: access.bits(),
            flags_limit_hi: flags.bits() | ((encoded >> 16) as u8 & LIMIT_HIGH_MASK),
            base_vhi: ((base >> 24) & 0xFF) as u8,
        }
    }

    /// Descriptor with base, limit and access all zero.
    pub const fn null() -> Self {
        Self::new(0, 0, SegmentAccess::empty())
    }

    /// 32-bit base address.
    #[inline]
    pub const fn base(&self) -> u32 {
        ((self.base_vhi as u32) << 24) | ((self.base_hi as u32) << 16) | self.base_lo as u32
    }

    /// Observable limit in bytes.
    ///
    /// A page-granular limit is re-expanded with the low 12 bits set, which
    /// is the last addressable byte of the final page.
    #[inline]
    pub const fn limit(&self) -> u32 {
        let raw = ((self.flags_limit_hi & LIMIT_HIGH_MASK) as u32) << 16 | self.limit_lo as u32;
        if self.is_page_granular() {
            (raw << PAGE_GRANULARITY_SHIFT) | PAGE_OFFSET_MASK
        } else {
            raw
        }
    }

    #[inline]
    pub const fn access(&self) -> SegmentAccess {
        SegmentAccess::from_bits_retain(self.access)
    }

    #[inline]
    pub const fn flags(&self) -> SegmentFlags {
        SegmentFlags::from_bits_retain(self.flags_limit_hi & FLAGS_MASK)
    }

    #[inline]
    pub const fn is_page_granular(&self) -> bool {
        self.flags_limit_hi & SegmentFlags::PAGE_GRANULAR_32.bits()
            == SegmentFlags::PAGE_GRANULAR_32.bits()
    }

    /// The descriptor exactly as the processor reads it.
    pub const fn to_bytes(&self) -> [u8; 8] {
        let limit_lo = self.limit_lo;
        let base_lo = self.base_lo;
        [
            limit_lo as u8,
            (limit_lo >> 8) as u8,
            base_lo as u8,
            (base_lo >> 8) as u8,
            self.base_hi,
            self.access,
            self.flags_limit_hi,
            self.base_vhi,
        ]
    }
}

impl fmt::Debug for SegmentDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SegmentDescriptor")
            .field("base", &format_args!("{:#010x}", self.base()))
            .field("limit", &format_args!("{:#x}", self.limit()))
            .field("access", &self.access())
            .field("page_granular", &self.is_page_granular())
            .finish()
    }
}

/// x86 segment selector.
///
/// Layout (16 bits):
/// - Bits 0-1: Requested Privilege Level (RPL)
/// - Bit 2: Table Indicator (0 = GDT, 1 = LDT)
/// - Bits 3-15: Descriptor index
///
/// For a GDT selector with RPL 0 the raw value equals the descriptor's byte
/// offset from the start of the table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct SegmentSelector(pub u16);

impl SegmentSelector {
    /// Null selector (index 0, GDT, RPL 0).
    pub const NULL: Self = Self(0);

    /// Kernel code segment (GDT index 2, RPL 0) = 0x10.
    pub const KERNEL_CODE: Self = Self::new(2, false, 0);

    /// Kernel data segment (GDT index 3, RPL 0) = 0x18.
    pub const KERNEL_DATA: Self = Self::new(3, false, 0);

    /// Create a new segment selector.
    ///
    /// # Arguments
    /// * `index` - Descriptor table index (0-8191)
    /// * `ldt` - Use LDT instead of GDT
    /// * `rpl` - Requested privilege level (0-3)
    #[inline]
    pub const fn new(index: u16, ldt: bool, rpl: u8) -> Self {
        let ti = if ldt { 1 << 2 } else { 0 };
        Self((index << 3) | ti | (rpl as u16 & 0x3))
    }

    /// Ring 0 GDT selector for the descriptor at `offset` bytes into the table.
    #[inline]
    pub const fn from_offset(offset: u16) -> Self {
        Self(offset & !0x7)
    }

    /// Get the descriptor table index.
    #[inline]
    pub const fn index(self) -> u16 {
        self.0 >> 3
    }

    /// Check if this selector references the LDT.
    #[inline]
    pub const fn is_ldt(self) -> bool {
        self.0 & (1 << 2) != 0
    }

    /// Get the requested privilege level (0-3).
    #[inline]
    pub const fn rpl(self) -> u8 {
        (self.0 & 0x3) as u8
    }

    /// Get the raw selector value for loading into segment register.
    #[inline]
    pub const fn bits(self) -> u16 {
        self.0
    }
}
