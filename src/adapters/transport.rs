//! Link-layer transport model.
//!
//! [`LinkState`] holds what the controller knows about the current link:
//! which connection is up and how many HCI transmit buffers are free.  It
//! is shared (by `&'static`) between the stack side, which frees buffers
//! and opens/closes the link, and [`LinkTransport`], which implements
//! [`TransportPort`] for the application task.
//!
//! When the controller runs out of buffers a transmit comes back
//! [`TxStatus::Backpressured`], the same condition the real stack reports
//! as "no HCI buffer".

use core::sync::atomic::{AtomicBool, AtomicU16, AtomicU32, Ordering};

use log::debug;

use crate::app::messages::{AttResponse, ConnHandle, TxFailure, TxStatus};
use crate::app::ports::TransportPort;
use crate::error::TransportError;

/// Controller-side link state, safe to touch from any context.
pub struct LinkState {
    connected: AtomicBool,
    conn: AtomicU16,
    credits: AtomicU32,
    /// Connection handle subscribed to window-end notices, or `NO_NOTICE`.
    notice: AtomicU32,
    sent: AtomicU32,
}

const NO_NOTICE: u32 = u32::MAX;

impl Default for LinkState {
    fn default() -> Self {
        Self::new()
    }
}

impl LinkState {
    pub const fn new() -> Self {
        Self {
            connected: AtomicBool::new(false),
            conn: AtomicU16::new(0),
            credits: AtomicU32::new(0),
            notice: AtomicU32::new(NO_NOTICE),
            sent: AtomicU32::new(0),
        }
    }

    pub fn connect(&self, conn: ConnHandle, credits: u32) {
        self.conn.store(conn, Ordering::Release);
        self.credits.store(credits, Ordering::Release);
        self.connected.store(true, Ordering::Release);
    }

    pub fn disconnect(&self) {
        self.connected.store(false, Ordering::Release);
        self.notice.store(NO_NOTICE, Ordering::Release);
    }

    /// The controller finished sending `n` PDUs.
    pub fn release_credits(&self, n: u32) {
        self.credits.fetch_add(n, Ordering::AcqRel);
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Whether window-end notices are currently requested for `conn`.
    pub fn notice_requested(&self, conn: ConnHandle) -> bool {
        self.notice.load(Ordering::Acquire) == u32::from(conn)
    }

    /// PDUs accepted since boot.
    pub fn sent(&self) -> u32 {
        self.sent.load(Ordering::Acquire)
    }

    fn take_credit(&self) -> bool {
        self.credits
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
            .is_ok()
    }
}

/// [`TransportPort`] over a shared [`LinkState`].
pub struct LinkTransport<'l> {
    link: &'l LinkState,
}

impl<'l> LinkTransport<'l> {
    pub fn new(link: &'l LinkState) -> Self {
        Self { link }
    }
}

impl TransportPort for LinkTransport<'_> {
    fn transmit(&mut self, response: &AttResponse) -> TxStatus {
        if !self.link.is_connected() || self.link.conn.load(Ordering::Acquire) != response.conn {
            return TxStatus::Failed(TxFailure::NotConnected);
        }
        if !self.link.take_credit() {
            return TxStatus::Backpressured;
        }
        self.link.sent.fetch_add(1, Ordering::AcqRel);
        debug!(
            "transport: sent opcode {:#04x} ({} bytes) on conn {}",
            response.opcode,
            response.payload.len(),
            response.conn
        );
        TxStatus::Accepted
    }

    fn request_window_notice(&mut self, conn: ConnHandle) -> Result<(), TransportError> {
        if !self.link.is_connected() {
            return Err(TransportError::NotConnected);
        }
        self.link.notice.store(u32::from(conn), Ordering::Release);
        Ok(())
    }

    fn cancel_window_notice(&mut self, conn: ConnHandle) {
        let _ = self.link.notice.compare_exchange(
            u32::from(conn),
            NO_NOTICE,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }
}
