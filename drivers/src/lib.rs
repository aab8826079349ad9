#![cfg_attr(not(test), no_std)]
#![forbid(unsafe_op_in_unsafe_fn)]

pub mod keyboard;
pub mod pic;
pub mod serial;
pub mod vga_text;

pub use keyboard::KeyboardDriver;
pub use pic::ChainedPics;
pub use serial::SerialConsole;
pub use vga_text::VgaText;
