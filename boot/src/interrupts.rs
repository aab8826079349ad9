//! Interrupt dispatcher.
//!
//! An [`InterruptManager`] owns the gate table contents, the PIC programming
//! and a registry of non-owning handler references. At most one manager per
//! [`ActiveDispatcher`] receives events; the CPU entry stubs feed the
//! process-wide [`ACTIVE_DISPATCHER`].

use core::ptr;
use core::sync::atomic::{AtomicPtr, AtomicU32, Ordering};

use ringzero_abi::arch::idt::exception_name;
use ringzero_abi::arch::{EXCEPTION_VECTOR_COUNT, IDT_ENTRIES, SegmentSelector};
use ringzero_abi::{Console, InterruptError, InterruptHandler, InterruptResult};
use ringzero_drivers::ChainedPics;
use ringzero_lib::numfmt::patch_hex_byte;
use ringzero_lib::{Hardware, klog_debug, klog_info, klog_warn};
use spin::Mutex;

use crate::gdt::GlobalDescriptorTable;
use crate::idt::InterruptDescriptorTable;
use crate::stubs::{EntryStubs, InterruptEvent};

const UNHANDLED: &[u8; 24] = b"UNHANDLED INTERRUPT 0x00";
const UNHANDLED_DIGITS: usize = 22;

/// Names one registration: the vector and the generation it was issued at.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RegistrationToken {
    vector: u8,
    generation: u32,
}

impl RegistrationToken {
    #[inline]
    pub const fn vector(&self) -> u8 {
        self.vector
    }
}

#[derive(Clone, Copy)]
struct Slot {
    handler: &'static dyn InterruptHandler,
    generation: u32,
}

/// One slot per vector. Registering over an occupied slot replaces it and
/// leaves the displaced token stale.
pub struct HandlerRegistry {
    slots: [Option<Slot>; IDT_ENTRIES],
    next_generation: u32,
}

impl HandlerRegistry {
    pub const fn new() -> Self {
        Self {
            slots: [None; IDT_ENTRIES],
            next_generation: 1,
        }
    }

    pub fn insert(&mut self, vector: u8, handler: &'static dyn InterruptHandler) -> RegistrationToken {
        let generation = self.next_generation;
        self.next_generation = self.next_generation.wrapping_add(1).max(1);
        self.slots[vector as usize] = Some(Slot { handler, generation });
        RegistrationToken { vector, generation }
    }

    /// Clear the slot `token` names if it still owns it.
    pub fn remove(&mut self, token: RegistrationToken) -> InterruptResult<()> {
        let slot = &mut self.slots[token.vector as usize];
        if slot.is_some_and(|current| current.generation == token.generation) {
            *slot = None;
            Ok(())
        } else {
            Err(InterruptError::StaleRegistration)
        }
    }

    #[inline]
    pub fn handler(&self, vector: u8) -> Option<&'static dyn InterruptHandler> {
        self.slots[vector as usize].map(|slot| slot.handler)
    }

    pub fn registered_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Keeps a handler registered until dropped or released.
#[must_use = "dropping a Registration unregisters the handler"]
pub struct Registration<'m> {
    manager: &'m InterruptManager,
    token: RegistrationToken,
}

impl Registration<'_> {
    #[inline]
    pub fn token(&self) -> RegistrationToken {
        self.token
    }

    /// Unregister now and report whether the slot was still ours.
    pub fn release(self) -> InterruptResult<()> {
        let manager = self.manager;
        let token = self.token;
        core::mem::forget(self);
        manager.release(token)
    }
}

impl Drop for Registration<'_> {
    fn drop(&mut self) {
        let _ = self.manager.release(self.token);
    }
}

/// Routes CPU events to whichever manager is currently active.
pub struct ActiveDispatcher {
    current: AtomicPtr<InterruptManager>,
}

/// The dispatcher the assembly entry stubs call into.
pub static ACTIVE_DISPATCHER: ActiveDispatcher = ActiveDispatcher::new();

impl ActiveDispatcher {
    pub const fn new() -> Self {
        Self {
            current: AtomicPtr::new(ptr::null_mut()),
        }
    }

    pub fn current(&self) -> Option<&'static InterruptManager> {
        // SAFETY: only `&'static InterruptManager` values are ever stored.
        unsafe { self.current.load(Ordering::Acquire).as_ref() }
    }

    #[inline]
    fn is_current(&self, manager: &InterruptManager) -> bool {
        ptr::eq(self.current.load(Ordering::Acquire), manager)
    }

    fn activate(&self, manager: &'static InterruptManager) {
        if let Some(previous) = self.current() {
            previous.deactivate();
        }
        self.current.store(
            manager as *const InterruptManager as *mut InterruptManager,
            Ordering::Release,
        );
        manager.hw.enable_interrupts();
        klog_info!(
            "interrupts: manager for offset {:#04x} active",
            manager.hardware_offset
        );
    }

    /// Deliver `vector`; without an active manager `esp` comes straight back.
    pub fn dispatch(&self, vector: u8, esp: u32) -> u32 {
        match self.current() {
            Some(manager) => manager.handle(vector, esp),
            None => esp,
        }
    }

    /// Deliver PIC line `line`, translated through the active manager's
    /// hardware offset.
    pub fn dispatch_irq_line(&self, line: u8, esp: u32) -> u32 {
        match self.current() {
            Some(manager) => manager.handle(manager.hardware_offset.wrapping_add(line), esp),
            None => esp,
        }
    }

    /// Deliver an event code as pushed by the entry stubs.
    pub fn dispatch_event(&self, code: u32, esp: u32) -> u32 {
        match InterruptEvent::decode(code) {
            InterruptEvent::Vector(vector) => self.dispatch(vector, esp),
            InterruptEvent::IrqLine(line) => self.dispatch_irq_line(line, esp),
        }
    }
}

impl Default for ActiveDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

/// Called by the common entry stub with delivery disabled. The returned
/// stack pointer is the frame that gets restored.
#[unsafe(no_mangle)]
pub extern "C" fn ringzero_interrupt_entry(code: u32, esp: u32) -> u32 {
    ACTIVE_DISPATCHER.dispatch_event(code, esp)
}

pub struct InterruptManager {
    hardware_offset: u8,
    hw: &'static dyn Hardware,
    console: &'static dyn Console,
    pics: ChainedPics<'static>,
    registry: Mutex<HandlerRegistry>,
    active: &'static ActiveDispatcher,
    dispatch_depth: AtomicU32,
}

impl InterruptManager {
    /// Fill every gate, remap the PICs to `hardware_offset` and load IDTR.
    ///
    /// Delivery is disabled on return and stays so until [`Self::activate`].
    pub fn new(
        hardware_offset: u8,
        gdt: &GlobalDescriptorTable,
        idt: &'static Mutex<InterruptDescriptorTable>,
        stubs: &EntryStubs,
        hw: &'static dyn Hardware,
        console: &'static dyn Console,
        active: &'static ActiveDispatcher,
    ) -> Self {
        hw.disable_interrupts();

        let selector = SegmentSelector::from_offset(gdt.code_segment_offset());
        {
            let mut table = idt.lock();
            for vector in 0..IDT_ENTRIES {
                table.set_gate(vector as u8, stubs.ignore, selector, 0);
            }
            for (vector, &stub) in stubs.exceptions.iter().enumerate() {
                table.set_gate(vector as u8, stub, selector, 0);
            }
            for (line, &stub) in stubs.irqs.iter().enumerate() {
                if let Some(vector) = hardware_offset.checked_add(line as u8) {
                    table.set_gate(vector, stub, selector, 0);
                }
            }
        }

        let mut pics = ChainedPics::new(hw);
        pics.remap(hardware_offset);

        let pointer = idt.lock().pointer();
        hw.load_idt(&pointer);
        klog_debug!(
            "IDT: loaded at {:#010x}, limit {:#x}",
            pointer.base(),
            pointer.limit()
        );

        Self {
            hardware_offset,
            hw,
            console,
            pics,
            registry: Mutex::new(HandlerRegistry::new()),
            active,
            dispatch_depth: AtomicU32::new(0),
        }
    }

    #[inline]
    pub fn hardware_interrupt_offset(&self) -> u8 {
        self.hardware_offset
    }

    pub fn is_active(&self) -> bool {
        self.active.is_current(self)
    }

    /// Make this manager the receiver of all events and enable delivery.
    /// Whichever manager was active before is deactivated first.
    pub fn activate(&'static self) {
        self.active.activate(self);
    }

    /// Disable delivery and stop receiving events. No-op unless active.
    pub fn deactivate(&self) {
        if !self.is_active() {
            return;
        }
        self.hw.disable_interrupts();
        let me = self as *const Self as *mut Self;
        let _ = self.active.current.compare_exchange(
            me,
            ptr::null_mut(),
            Ordering::AcqRel,
            Ordering::Acquire,
        );
        klog_info!(
            "interrupts: manager for offset {:#04x} inactive",
            self.hardware_offset
        );
    }

    /// Route `vector` to `handler` until the returned guard goes away.
    pub fn register(&self, vector: u8, handler: &'static dyn InterruptHandler) -> Registration<'_> {
        let token = self.with_registry(|registry| registry.insert(vector, handler));
        klog_debug!("interrupts: handler registered for vector {:#04x}", vector);
        Registration {
            manager: self,
            token,
        }
    }

    /// Unregister by token. Fails without touching the slot when a later
    /// registration has replaced the handler.
    pub fn release(&self, token: RegistrationToken) -> InterruptResult<()> {
        self.with_registry(|registry| registry.remove(token))
    }

    pub fn is_registered(&self, vector: u8) -> bool {
        self.with_registry(|registry| registry.handler(vector).is_some())
    }

    /// Handle one interrupt and acknowledge it at the PIC.
    pub fn handle(&self, vector: u8, esp: u32) -> u32 {
        self.dispatch_depth.fetch_add(1, Ordering::AcqRel);
        let handler = self.registry.lock().handler(vector);

        let esp = match handler {
            Some(handler) => handler.handle_interrupt(esp),
            None => {
                // Timer line: acknowledged without a diagnostic.
                if vector != self.hardware_offset {
                    self.console
                        .print(&patch_hex_byte(UNHANDLED, UNHANDLED_DIGITS, vector));
                }
                if (vector as usize) < EXCEPTION_VECTOR_COUNT {
                    klog_warn!(
                        "interrupts: unhandled exception {:#04x} ({})",
                        vector,
                        exception_name(vector)
                    );
                }
                esp
            }
        };

        self.pics.acknowledge(vector);
        self.dispatch_depth.fetch_sub(1, Ordering::AcqRel);
        esp
    }

    /// Run `f` on the registry. Outside of dispatch, delivery is held off
    /// while the lock is taken so an interrupt cannot spin on it; the
    /// caller's interrupt flag is restored afterwards.
    fn with_registry<R>(&self, f: impl FnOnce(&mut HandlerRegistry) -> R) -> R {
        let saved = (self.is_active() && self.dispatch_depth.load(Ordering::Acquire) == 0)
            .then(|| self.hw.save_and_disable_interrupts());
        let result = f(&mut *self.registry.lock());
        if let Some(enabled) = saved {
            self.hw.restore_interrupts(enabled);
        }
        result
    }
}

impl Drop for InterruptManager {
    fn drop(&mut self) {
        self.deactivate();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ringzero_abi::arch::{IRQ_LINES, Port};
    use ringzero_lib::testing::{HwEvent, RecordingConsole, RecordingHardware};
    use std::sync::atomic::AtomicUsize;

    struct CountingHandler {
        calls: AtomicUsize,
        last_esp: AtomicU32,
        returns: Option<u32>,
    }

    impl CountingHandler {
        fn leaked() -> &'static Self {
            Self::leaked_returning(None)
        }

        fn leaked_returning(returns: Option<u32>) -> &'static Self {
            Box::leak(Box::new(Self {
                calls: AtomicUsize::new(0),
                last_esp: AtomicU32::new(0),
                returns,
            }))
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl InterruptHandler for CountingHandler {
        fn handle_interrupt(&self, esp: u32) -> u32 {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.last_esp.store(esp, Ordering::SeqCst);
            self.returns.unwrap_or(esp)
        }
    }

    fn fake_stubs() -> EntryStubs {
        let mut exceptions = [0; EXCEPTION_VECTOR_COUNT];
        for (i, stub) in exceptions.iter_mut().enumerate() {
            *stub = 0x0010_1000 + i as u32 * 0x10;
        }
        let mut irqs = [0; IRQ_LINES];
        for (i, stub) in irqs.iter_mut().enumerate() {
            *stub = 0x0010_2000 + i as u32 * 0x10;
        }
        EntryStubs {
            ignore: 0x0010_0000,
            exceptions,
            irqs,
        }
    }

    struct Fixture {
        hw: &'static RecordingHardware,
        console: &'static RecordingConsole,
        idt: &'static Mutex<InterruptDescriptorTable>,
        active: &'static ActiveDispatcher,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                hw: RecordingHardware::leaked(),
                console: RecordingConsole::leaked(),
                idt: Box::leak(Box::new(Mutex::new(InterruptDescriptorTable::new()))),
                active: Box::leak(Box::new(ActiveDispatcher::new())),
            }
        }

        fn manager(&self, offset: u8) -> &'static InterruptManager {
            Box::leak(Box::new(InterruptManager::new(
                offset,
                &GlobalDescriptorTable::flat(),
                self.idt,
                &fake_stubs(),
                self.hw,
                self.console,
                self.active,
            )))
        }
    }

    #[test]
    fn construction_fills_every_gate() {
        let fx = Fixture::new();
        let manager = fx.manager(0x20);
        let stubs = fake_stubs();
        let table = fx.idt.lock();

        assert_eq!(table.gates().len(), 256);
        for (vector, gate) in table.gates().iter().enumerate() {
            assert!(gate.is_present(), "vector {vector:#x}");
            assert_eq!(gate.selector().bits(), 0x10);
            assert_eq!(gate.access(), 0x8E);
            let expected = match vector {
                0x00..=0x13 => stubs.exceptions[vector],
                0x20..=0x2F => stubs.irqs[vector - 0x20],
                _ => stubs.ignore,
            };
            assert_eq!(gate.handler(), expected, "vector {vector:#x}");
        }
        assert_eq!(manager.hardware_interrupt_offset(), 0x20);
        assert!(!manager.is_active());
        assert_eq!(manager.registry.lock().registered_count(), 0);
    }

    #[test]
    fn construction_programs_hardware_in_order() {
        let fx = Fixture::new();
        let _manager = fx.manager(0x20);
        let events = fx.hw.events();

        assert_eq!(events.first(), Some(&HwEvent::DisableInterrupts));
        assert_eq!(
            events[1],
            HwEvent::PortWrite { port: Port::PIC1_COMMAND, value: 0x11, slow: true }
        );
        assert_eq!(
            events.last(),
            Some(&HwEvent::LoadIdt {
                base: fx.idt.lock().pointer().base(),
                limit: 0x7FF,
            })
        );
        assert_eq!(fx.hw.writes().len(), 10);
        assert!(!fx.hw.interrupts_enabled());
    }

    #[test]
    fn custom_offset_moves_irq_block() {
        let fx = Fixture::new();
        let _manager = fx.manager(0x40);
        let stubs = fake_stubs();
        let table = fx.idt.lock();
        assert_eq!(table.gate(0x40).handler(), stubs.irqs[0]);
        assert_eq!(table.gate(0x4F).handler(), stubs.irqs[15]);
        assert_eq!(table.gate(0x20).handler(), stubs.ignore);
    }

    #[test]
    fn registered_handler_receives_vector() {
        let fx = Fixture::new();
        let manager = fx.manager(0x20);
        let handler = CountingHandler::leaked();
        let _reg = manager.register(0x21, handler);
        manager.activate();
        fx.hw.clear();

        assert_eq!(fx.active.dispatch(0x21, 0x9000), 0x9000);
        assert_eq!(handler.calls(), 1);
        assert_eq!(handler.last_esp.load(Ordering::SeqCst), 0x9000);
        assert_eq!(fx.hw.writes(), [(Port::PIC1_COMMAND, 0x20, true)]);
        assert_eq!(fx.console.output(), "");
    }

    #[test]
    fn handler_return_value_becomes_stack_pointer() {
        let fx = Fixture::new();
        let manager = fx.manager(0x20);
        let handler = CountingHandler::leaked_returning(Some(0x7000));
        let _reg = manager.register(0x80, handler);
        manager.activate();
        assert_eq!(fx.active.dispatch(0x80, 0x9000), 0x7000);
    }

    #[test]
    fn unhandled_vector_prints_diagnostic() {
        let fx = Fixture::new();
        let manager = fx.manager(0x20);
        manager.activate();
        fx.hw.clear();

        assert_eq!(fx.active.dispatch(0x05, 0x1234), 0x1234);
        assert_eq!(fx.console.output(), "UNHANDLED INTERRUPT 0x05");
        assert!(fx.hw.writes().is_empty());
    }

    #[test]
    fn unhandled_timer_line_is_silent_but_acknowledged() {
        let fx = Fixture::new();
        let manager = fx.manager(0x20);
        manager.activate();
        fx.hw.clear();

        fx.active.dispatch(0x20, 0x1000);
        assert_eq!(fx.console.output(), "");
        assert_eq!(fx.hw.writes(), [(Port::PIC1_COMMAND, 0x20, true)]);
    }

    #[test]
    fn cascaded_line_acknowledges_both_controllers() {
        let fx = Fixture::new();
        let manager = fx.manager(0x20);
        let handler = CountingHandler::leaked();
        let _reg = manager.register(0x2C, handler);
        manager.activate();
        fx.hw.clear();

        fx.active.dispatch(0x2C, 0x1000);
        assert_eq!(
            fx.hw.writes(),
            [
                (Port::PIC2_COMMAND, 0x20, true),
                (Port::PIC1_COMMAND, 0x20, true),
            ]
        );
    }

    #[test]
    fn released_handler_falls_back_to_diagnostic() {
        let fx = Fixture::new();
        let manager = fx.manager(0x20);
        let handler = CountingHandler::leaked();
        let reg = manager.register(0x30, handler);
        assert_eq!(reg.release(), Ok(()));
        manager.activate();

        fx.active.dispatch(0x30, 0x1000);
        assert_eq!(handler.calls(), 0);
        assert!(fx.console.output().contains("0x30"));
    }

    #[test]
    fn dropping_registration_unregisters() {
        let fx = Fixture::new();
        let manager = fx.manager(0x20);
        {
            let _reg = manager.register(0x22, CountingHandler::leaked());
            assert!(manager.is_registered(0x22));
        }
        assert!(!manager.is_registered(0x22));
    }

    #[test]
    fn last_registration_wins_and_stale_release_is_harmless() {
        let fx = Fixture::new();
        let manager = fx.manager(0x20);
        let a = CountingHandler::leaked();
        let b = CountingHandler::leaked();

        let reg_a = manager.register(0x21, a);
        let reg_b = manager.register(0x21, b);
        assert_eq!(reg_a.release(), Err(InterruptError::StaleRegistration));
        assert!(manager.is_registered(0x21));

        manager.activate();
        fx.active.dispatch(0x21, 0x1000);
        assert_eq!(a.calls(), 0);
        assert_eq!(b.calls(), 1);
        drop(reg_b);
        assert!(!manager.is_registered(0x21));
    }

    #[test]
    fn activating_second_manager_deactivates_first() {
        let fx = Fixture::new();
        let first = fx.manager(0x20);
        let second = fx.manager(0x20);
        let a = CountingHandler::leaked();
        let b = CountingHandler::leaked();
        let _reg_a = first.register(0x21, a);
        let _reg_b = second.register(0x21, b);

        first.activate();
        assert!(first.is_active());
        second.activate();
        assert!(!first.is_active());
        assert!(second.is_active());

        fx.active.dispatch(0x21, 0x1000);
        assert_eq!(a.calls(), 0);
        assert_eq!(b.calls(), 1);
    }

    #[test]
    fn deactivate_disables_delivery_and_detaches() {
        let fx = Fixture::new();
        let manager = fx.manager(0x20);
        let handler = CountingHandler::leaked();
        let _reg = manager.register(0x21, handler);

        manager.activate();
        assert!(fx.hw.interrupts_enabled());
        manager.deactivate();
        assert!(!fx.hw.interrupts_enabled());
        assert!(fx.active.current().is_none());

        assert_eq!(fx.active.dispatch(0x21, 0x4242), 0x4242);
        assert_eq!(handler.calls(), 0);
    }

    #[test]
    fn deactivating_inactive_manager_is_noop() {
        let fx = Fixture::new();
        let first = fx.manager(0x20);
        let second = fx.manager(0x20);
        first.activate();
        fx.hw.clear();

        second.deactivate();
        assert!(fx.hw.events().is_empty());
        assert!(first.is_active());
    }

    #[test]
    fn dispatch_without_active_manager_returns_stack() {
        let active = ActiveDispatcher::new();
        assert_eq!(active.dispatch(0x0E, 0xABCD), 0xABCD);
        assert_eq!(active.dispatch_event(0x101, 0xABCD), 0xABCD);
    }

    #[test]
    fn irq_events_are_offset_by_active_manager() {
        let fx = Fixture::new();
        let manager = fx.manager(0x40);
        let handler = CountingHandler::leaked();
        let _reg = manager.register(0x41, handler);
        manager.activate();

        fx.active.dispatch_event(0x101, 0x1000);
        assert_eq!(handler.calls(), 1);
        fx.active.dispatch_event(0x0D, 0x1000);
        assert!(fx.console.output().contains("0x0D"));
    }

    #[test]
    fn registration_while_active_holds_off_delivery() {
        let fx = Fixture::new();
        let manager = fx.manager(0x20);
        manager.activate();
        fx.hw.clear();

        let _reg = manager.register(0x21, CountingHandler::leaked());
        assert_eq!(
            fx.hw.events(),
            [HwEvent::DisableInterrupts, HwEvent::EnableInterrupts]
        );
    }

    struct SelfReleasing {
        manager: &'static InterruptManager,
        token: Mutex<Option<RegistrationToken>>,
    }

    impl InterruptHandler for SelfReleasing {
        fn handle_interrupt(&self, esp: u32) -> u32 {
            if let Some(token) = self.token.lock().take() {
                let _ = self.manager.release(token);
            }
            esp
        }
    }

    #[test]
    fn handler_may_release_itself_during_dispatch() {
        let fx = Fixture::new();
        let manager = fx.manager(0x20);
        let handler: &'static SelfReleasing = Box::leak(Box::new(SelfReleasing {
            manager,
            token: Mutex::new(None),
        }));
        let reg = manager.register(0x23, handler);
        *handler.token.lock() = Some(reg.token());
        core::mem::forget(reg);
        manager.activate();
        fx.hw.clear();

        fx.active.dispatch(0x23, 0x1000);
        let events = fx.hw.events();
        // Released from inside dispatch: no extra masking around the lock.
        assert_eq!(
            events,
            [HwEvent::PortWrite { port: Port::PIC1_COMMAND, value: 0x20, slow: true }]
        );
        assert!(!manager.is_registered(0x23));
    }

    #[test]
    fn registry_access_keeps_callers_masked_section() {
        let fx = Fixture::new();
        let manager = fx.manager(0x20);
        manager.activate();
        fx.hw.disable_interrupts();
        fx.hw.clear();

        let reg = manager.register(0x22, CountingHandler::leaked());
        assert!(!fx.hw.interrupts_enabled());
        assert!(manager.is_registered(0x22));
        assert!(!fx.hw.interrupts_enabled());
        drop(reg);
        assert!(!fx.hw.interrupts_enabled());
        assert!(!fx.hw.events().contains(&HwEvent::EnableInterrupts));
    }
}
