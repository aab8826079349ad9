//! Host-side doubles for [`Hardware`] and [`Console`].
//!
//! Enabled for this crate's own tests and, through the `testing` feature, as a
//! dev-dependency of the driver and boot crates.

use core::sync::atomic::{AtomicBool, Ordering};
use std::boxed::Box;
use std::collections::{BTreeMap, VecDeque};
use std::string::String;
use std::vec::Vec;

use ringzero_abi::Console;
use ringzero_abi::arch::{Port, TablePointer};
use spin::Mutex;

use crate::hw::Hardware;

/// One observable hardware side effect.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HwEvent {
    PortRead { port: Port, value: u8 },
    PortWrite { port: Port, value: u8, slow: bool },
    LoadGdt { base: u32, limit: u16 },
    LoadIdt { base: u32, limit: u16 },
    EnableInterrupts,
    DisableInterrupts,
}

/// Records every call in order. Port reads are answered from per-port
/// scripts and return 0 once a script runs dry. The interrupt flag starts
/// clear and survives [`RecordingHardware::clear`].
#[derive(Default)]
pub struct RecordingHardware {
    events: Mutex<Vec<HwEvent>>,
    reads: Mutex<BTreeMap<u16, VecDeque<u8>>>,
    interrupt_flag: AtomicBool,
}

impl RecordingHardware {
    pub fn new() -> Self {
        Self::default()
    }

    /// A fresh instance that lives for the rest of the test process.
    pub fn leaked() -> &'static Self {
        Box::leak(Box::new(Self::new()))
    }

    pub fn script_reads(&self, port: Port, values: &[u8]) {
        self.reads
            .lock()
            .entry(port.number())
            .or_default()
            .extend(values.iter().copied());
    }

    pub fn events(&self) -> Vec<HwEvent> {
        self.events.lock().clone()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }

    /// Port writes only, as `(port, value, slow)`.
    pub fn writes(&self) -> Vec<(Port, u8, bool)> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match *event {
                HwEvent::PortWrite { port, value, slow } => Some((port, value, slow)),
                _ => None,
            })
            .collect()
    }

    fn record(&self, event: HwEvent) {
        self.events.lock().push(event);
    }
}

impl Hardware for RecordingHardware {
    fn read_port(&self, port: Port) -> u8 {
        let value = self
            .reads
            .lock()
            .get_mut(&port.number())
            .and_then(VecDeque::pop_front)
            .unwrap_or(0);
        self.record(HwEvent::PortRead { port, value });
        value
    }

    fn write_port(&self, port: Port, value: u8) {
        self.record(HwEvent::PortWrite { port, value, slow: false });
    }

    fn write_port_slow(&self, port: Port, value: u8) {
        self.record(HwEvent::PortWrite { port, value, slow: true });
    }

    fn load_gdt(&self, pointer: &TablePointer) {
        self.record(HwEvent::LoadGdt {
            base: pointer.base(),
            limit: pointer.limit(),
        });
    }

    fn load_idt(&self, pointer: &TablePointer) {
        self.record(HwEvent::LoadIdt {
            base: pointer.base(),
            limit: pointer.limit(),
        });
    }

    fn enable_interrupts(&self) {
        self.interrupt_flag.store(true, Ordering::SeqCst);
        self.record(HwEvent::EnableInterrupts);
    }

    fn disable_interrupts(&self) {
        self.interrupt_flag.store(false, Ordering::SeqCst);
        self.record(HwEvent::DisableInterrupts);
    }

    fn interrupts_enabled(&self) -> bool {
        self.interrupt_flag.load(Ordering::SeqCst)
    }
}

/// Collects printed bytes.
#[derive(Default)]
pub struct RecordingConsole {
    output: Mutex<Vec<u8>>,
}

impl RecordingConsole {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn leaked() -> &'static Self {
        Box::leak(Box::new(Self::new()))
    }

    pub fn output(&self) -> String {
        String::from_utf8_lossy(&self.output.lock()).into_owned()
    }

    pub fn clear(&self) {
        self.output.lock().clear();
    }
}

impl Console for RecordingConsole {
    fn print(&self, text: &[u8]) {
        self.output.lock().extend_from_slice(text);
    }
}
