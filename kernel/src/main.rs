#![cfg_attr(target_os = "none", no_std)]
#![cfg_attr(target_os = "none", no_main)]
#![forbid(unsafe_op_in_unsafe_fn)]

#[cfg_attr(not(target_os = "none"), allow(dead_code))]
mod config;

#[cfg(all(target_os = "none", target_arch = "x86"))]
mod entry;

#[cfg(not(target_os = "none"))]
fn main() {
    eprintln!(
        "ringzero kernel: build with --target kernel/i686-ringzero.json and boot the image \
         with a Multiboot loader (banner {:?}, PIC offset {:#04x})",
        core::str::from_utf8(config::BANNER).unwrap_or_default().trim_end(),
        config::HARDWARE_OFFSET
    );
}
