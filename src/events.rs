//! Interrupt-safe mailbox between producers and the application task.
//!
//! Events are produced by:
//! - the sample timer callback (periodic sample due)
//! - the BLE stack (opaque stack messages, connection-event-end notices)
//! - profile and GAP role callbacks (characteristic changed, state changed)
//!
//! and consumed by the [`EventLoop`](crate::app::event_loop::EventLoop),
//! which blocks on the semaphore and then drains everything that is
//! pending in a fixed order.
//!
//! ```text
//! ┌─────────────┐     ┌────────────────────┐     ┌──────────────┐
//! │ Timer cb    │─bit▶│  EventMask         │     │              │
//! │ Stack task  │─msg▶│  stack channel     │────▶│  Event loop  │
//! │ Profile cb  │─msg▶│  app channel       │     │  (consumer)  │
//! │ GAP role cb │─msg▶│  + semaphore post  │     │              │
//! └─────────────┘     └────────────────────┘     └──────────────┘
//! ```
//!
//! Producers never block and never take a lock the consumer holds.  Every
//! successful post adds one semaphore permit, so a burst of events between
//! two wakeups is never lost; mask bits simply accumulate.

use core::sync::atomic::{AtomicU16, AtomicU32, Ordering};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;

use crate::app::messages::{AppMessage, StackMessage};

/// Depth of the stack-message queue.
pub const STACK_QUEUE_DEPTH: usize = 8;

/// Depth of the application-message queue.
pub const APP_QUEUE_DEPTH: usize = 8;

/// Internal events carried as bits in the [`EventMask`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum EventFlag {
    /// The one-shot sample timer expired.
    PeriodicSample = 1 << 0,
    /// The connection event we subscribed to has ended.
    ConnectionEventEnd = 1 << 1,
}

impl EventFlag {
    pub const fn bit(self) -> u16 {
        self as u16
    }
}

/// Snapshot of pending internal events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EventMask(u16);

impl EventMask {
    pub const fn contains(self, flag: EventFlag) -> bool {
        self.0 & flag.bit() != 0
    }
}

/// Counting semaphore + event mask + two bounded message queues.
///
/// `new` is `const` so the mailbox can live in a `static` that timer
/// callbacks reach without a handle.
pub struct Mailbox {
    permits: AtomicU32,
    wake: Signal<CriticalSectionRawMutex, ()>,
    mask: AtomicU16,
    stack: Channel<CriticalSectionRawMutex, StackMessage, STACK_QUEUE_DEPTH>,
    app: Channel<CriticalSectionRawMutex, AppMessage, APP_QUEUE_DEPTH>,
}

impl Default for Mailbox {
    fn default() -> Self {
        Self::new()
    }
}

impl Mailbox {
    pub const fn new() -> Self {
        Self {
            permits: AtomicU32::new(0),
            wake: Signal::new(),
            mask: AtomicU16::new(0),
            stack: Channel::new(),
            app: Channel::new(),
        }
    }

    // ── Producer side (any context) ───────────────────────────

    /// Set `flag` in the mask and wake the task.
    pub fn raise(&self, flag: EventFlag) {
        self.mask.fetch_or(flag.bit(), Ordering::AcqRel);
        self.post();
    }

    /// Queue a stack message.  Hands the message back if the queue is full.
    pub fn post_stack(&self, msg: StackMessage) -> Result<(), StackMessage> {
        match self.stack.try_send(msg) {
            Ok(()) => {
                self.post();
                Ok(())
            }
            Err(embassy_sync::channel::TrySendError::Full(msg)) => Err(msg),
        }
    }

    /// Queue an application message.  Hands the message back if the queue
    /// is full.
    pub fn post_app(&self, msg: AppMessage) -> Result<(), AppMessage> {
        match self.app.try_send(msg) {
            Ok(()) => {
                self.post();
                Ok(())
            }
            Err(embassy_sync::channel::TrySendError::Full(msg)) => Err(msg),
        }
    }

    fn post(&self) {
        self.permits.fetch_add(1, Ordering::Release);
        self.wake.signal(());
    }

    // ── Consumer side (application task only) ─────────────────

    /// Take one permit without waiting.
    pub fn try_acquire(&self) -> bool {
        self.permits
            .fetch_update(Ordering::Acquire, Ordering::Relaxed, |n| n.checked_sub(1))
            .is_ok()
    }

    /// Wait until a permit is available and take it.
    pub async fn acquire(&self) {
        loop {
            if self.try_acquire() {
                return;
            }
            self.wake.wait().await;
        }
    }

    /// Permits currently available.
    pub fn permits(&self) -> u32 {
        self.permits.load(Ordering::Acquire)
    }

    /// Clear `flag`, returning whether it was set.
    pub fn take(&self, flag: EventFlag) -> bool {
        self.mask.fetch_and(!flag.bit(), Ordering::AcqRel) & flag.bit() != 0
    }

    /// Pending flags, without clearing them.
    pub fn pending(&self) -> EventMask {
        EventMask(self.mask.load(Ordering::Acquire))
    }

    pub fn take_stack(&self) -> Option<StackMessage> {
        self.stack.try_receive().ok()
    }

    pub fn take_app(&self) -> Option<AppMessage> {
        self.app.try_receive().ok()
    }
}
