//! Single-slot ATT response retransmission.
//!
//! When the GATT server cannot hand a response to the controller (no HCI
//! buffer), the stack gives the response back to the application.  We hold
//! on to it, subscribe to connection-event-end notices for that link, and
//! retry after every connection event until the controller accepts it or
//! the link goes away.
//!
//! ```text
//!            backpressure(rsp)                  window ended: Accepted
//!   Empty ─────────────────────▶ Pending ──────────────────────────────▶ Empty
//!                                │  ▲   window ended: Failed / link lost
//!         backpressure(rsp2)     │  │   ─────────────────────────────────▶ Empty
//!         (rsp evicted)          └──┘
//!                                window ended: Backpressured (retries += 1)
//! ```
//!
//! ## Policy
//!
//! - The slot is last-writer-wins: a second backpressured response evicts
//!   the first, which is released as failed.  It is not a queue.
//! - There is no retry limit.  The peer's ATT transaction timeout (30 s)
//!   drops the link, and the link-lost path empties the slot.

use log::{debug, info, warn};

use crate::app::messages::{AttResponse, ConnHandle, TxFailure, TxStatus};
use crate::app::ports::TransportPort;
use crate::error::TransportError;

/// How a held response left the slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseOutcome {
    /// Retransmission succeeded.
    Sent,
    /// Replaced by a newer backpressured response.
    Evicted,
    /// The link dropped while the response was pending.
    LinkLost,
    /// The transport reported a hard failure on retry.
    Rejected(TxFailure),
}

impl ReleaseOutcome {
    pub const fn is_failure(self) -> bool {
        !matches!(self, Self::Sent)
    }
}

/// A response leaving the slot, handed back so the caller can report it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Released {
    pub response: AttResponse,
    pub outcome: ReleaseOutcome,
    /// Retransmit attempts made while the response was held.
    pub retries: u32,
}

/// What a connection-event-end notice did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryAttempt {
    /// Nothing was pending.
    Idle,
    /// Still backpressured; the response stays in the slot.
    StillPending { retries: u32 },
    /// The response left the slot.
    Done(Released),
}

#[derive(Debug)]
struct PendingResponse {
    response: AttResponse,
    retries: u32,
}

impl PendingResponse {
    fn release(self, outcome: ReleaseOutcome) -> Released {
        Released {
            response: self.response,
            outcome,
            retries: self.retries,
        }
    }
}

/// Holds at most one response awaiting retransmission.
#[derive(Debug, Default)]
pub struct ResponseRetryBuffer {
    slot: Option<PendingResponse>,
}

impl ResponseRetryBuffer {
    pub const fn new() -> Self {
        Self { slot: None }
    }

    pub fn is_pending(&self) -> bool {
        self.slot.is_some()
    }

    /// Retry counter of the held response, if any.
    pub fn retries(&self) -> Option<u32> {
        self.slot.as_ref().map(|p| p.retries)
    }

    /// Connection the held response belongs to, if any.
    pub fn pending_conn(&self) -> Option<ConnHandle> {
        self.slot.as_ref().map(|p| p.response.conn)
    }

    /// The stack could not transmit `response`; hold it for retry.
    ///
    /// The window-end subscription is requested first.  If the stack
    /// refuses it, `response` is dropped and the slot is left as it was.
    /// Otherwise any response already held is evicted and returned.
    pub fn on_transmit_backpressure(
        &mut self,
        response: AttResponse,
        transport: &mut impl TransportPort,
    ) -> Result<Option<Released>, TransportError> {
        if let Err(e) = transport.request_window_notice(response.conn) {
            warn!(
                "retry: notice subscription on conn {} refused ({}), dropping response",
                response.conn, e
            );
            return Err(e);
        }

        let evicted = self
            .slot
            .take()
            .map(|old| old.release(ReleaseOutcome::Evicted));
        if let Some(old) = &evicted {
            warn!(
                "retry: evicting pending response on conn {} after {} retries",
                old.response.conn, old.retries
            );
        }

        debug!("retry: holding response on conn {}", response.conn);
        self.slot = Some(PendingResponse {
            response,
            retries: 0,
        });
        Ok(evicted)
    }

    /// A connection event ended; try the held response again.
    pub fn on_connection_window_ended(
        &mut self,
        transport: &mut impl TransportPort,
    ) -> RetryAttempt {
        let Some(pending) = self.slot.as_mut() else {
            return RetryAttempt::Idle;
        };

        pending.retries = pending.retries.saturating_add(1);
        let status = transport.transmit(&pending.response);

        let outcome = match status {
            TxStatus::Backpressured => {
                debug!("retry: response send retry {}", pending.retries);
                return RetryAttempt::StillPending {
                    retries: pending.retries,
                };
            }
            TxStatus::Accepted => ReleaseOutcome::Sent,
            TxStatus::Failed(reason) => ReleaseOutcome::Rejected(reason),
        };

        let conn = pending.response.conn;
        transport.cancel_window_notice(conn);

        let Some(done) = self.slot.take() else {
            return RetryAttempt::Idle;
        };
        let released = done.release(outcome);
        match outcome {
            ReleaseOutcome::Sent => info!("retry: response sent after {} retries", released.retries),
            _ => warn!("retry: response failed after {} retries", released.retries),
        }
        RetryAttempt::Done(released)
    }

    /// The link is gone.  Release whatever is held as failed.
    pub fn on_link_lost(&mut self) -> Option<Released> {
        let released = self
            .slot
            .take()
            .map(|p| p.release(ReleaseOutcome::LinkLost));
        if let Some(r) = &released {
            warn!("retry: link lost with response pending ({} retries)", r.retries);
        }
        released
    }
}
