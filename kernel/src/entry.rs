//! Multiboot entry and the bootstrap sequence.

use core::panic::PanicInfo;

use ringzero_abi::Console;
use ringzero_boot::gdt::reload_segment_registers;
use ringzero_boot::{ACTIVE_DISPATCHER, EntryStubs, GlobalDescriptorTable, IDT, InterruptManager};
use ringzero_drivers::{KeyboardDriver, SerialConsole, VgaText};
use ringzero_lib::{
    Cpu, cpu, klog_attach, klog_error, klog_info, klog_set_level, klog_warn,
};
use spin::Once;

use crate::config;

const MULTIBOOT_HEADER_MAGIC: u32 = 0x1BAD_B002;
/// Page-align modules, provide the memory map.
const MULTIBOOT_HEADER_FLAGS: u32 = 0x0000_0003;
const MULTIBOOT_BOOTLOADER_MAGIC: u32 = 0x2BAD_B002;
const BOOT_STACK_SIZE: usize = 2 * 1024 * 1024;

core::arch::global_asm!(
    ".section .multiboot, \"a\"",
    ".align 4",
    ".long {magic}",
    ".long {flags}",
    ".long {checksum}",
    "",
    ".section .bss",
    ".align 16",
    "ringzero_stack_bottom:",
    ".skip {stack_size}",
    "ringzero_stack_top:",
    "",
    ".section .text",
    ".global _start",
    "_start:",
    "    movl $ringzero_stack_top, %esp",
    "    pushl %ebx",
    "    pushl %eax",
    "    call kernel_main",
    "2:  cli",
    "    hlt",
    "    jmp 2b",
    magic = const MULTIBOOT_HEADER_MAGIC,
    flags = const MULTIBOOT_HEADER_FLAGS,
    checksum = const 0u32.wrapping_sub(MULTIBOOT_HEADER_MAGIC.wrapping_add(MULTIBOOT_HEADER_FLAGS)),
    stack_size = const BOOT_STACK_SIZE,
    options(att_syntax)
);

// SAFETY: the kernel runs alone in ring 0.
static CPU: Cpu = unsafe { Cpu::new() };
// SAFETY: Multiboot leaves the display in 80x25 text mode; nothing else
// writes the buffer.
static VGA: VgaText<'static> = unsafe { VgaText::standard(&CPU) };
static SERIAL: SerialConsole<'static> = SerialConsole::com1(&CPU);
static GDT: GlobalDescriptorTable = GlobalDescriptorTable::flat();
static KEYBOARD: KeyboardDriver<'static> = KeyboardDriver::new(&CPU, &VGA);
static INTERRUPTS: Once<InterruptManager> = Once::new();

#[unsafe(no_mangle)]
pub extern "C" fn kernel_main(magic: u32, _multiboot_info: u32) -> ! {
    VGA.print(config::BANNER);

    SERIAL.init();
    klog_attach(&SERIAL);
    klog_set_level(config::BOOT_LOG_LEVEL);
    if magic != MULTIBOOT_BOOTLOADER_MAGIC {
        klog_warn!("boot: unexpected loader magic {:#010x}", magic);
    }

    GDT.load(&CPU);
    // SAFETY: the flat table was just loaded.
    unsafe { reload_segment_registers() };

    let interrupts = INTERRUPTS.call_once(|| {
        InterruptManager::new(
            config::HARDWARE_OFFSET,
            &GDT,
            &IDT,
            &EntryStubs::resolve(),
            &CPU,
            &VGA,
            &ACTIVE_DISPATCHER,
        )
    });

    KEYBOARD.init();
    let _keyboard = interrupts.register(config::KEYBOARD_VECTOR, &KEYBOARD);

    interrupts.activate();
    klog_info!("boot: interrupts live, waiting for keys");

    cpu::halt_loop()
}

#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    klog_error!("kernel panic: {}", info);
    cpu::halt_forever()
}
