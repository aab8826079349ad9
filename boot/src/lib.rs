#![cfg_attr(not(test), no_std)]

pub mod gdt;
pub mod idt;
pub mod interrupts;
pub mod stubs;

pub use gdt::GlobalDescriptorTable;
pub use idt::{IDT, InterruptDescriptorTable};
pub use interrupts::{
    ACTIVE_DISPATCHER, ActiveDispatcher, HandlerRegistry, InterruptManager, Registration,
    RegistrationToken,
};
pub use stubs::EntryStubs;
