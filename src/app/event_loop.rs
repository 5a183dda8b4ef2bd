//! The single dispatch point of the application task.
//!
//! Each wakeup services, in this order:
//!
//! 1. at most one stack message, then a pending connection-event-end bit;
//! 2. every queued application message (FIFO);
//! 3. the periodic-sample bit.
//!
//! Step 2 always finishes before step 3, so a mode change queued in the
//! same wakeup takes effect before the next sample is taken.

use core::convert::Infallible;

use log::{error, info};

use crate::config::{MeterConfig, SAMPLES_PER_CYCLE};
use crate::error::Error;
use crate::events::{EventFlag, Mailbox};

use super::ports::{AdcPort, EventSink, FrontEndPort, ProfilePort, TimerPort, TransportPort};
use super::service::AppCore;

/// Owns the core and every adapter; borrows the mailbox producers post to.
pub struct EventLoop<'m, H, P, T, S, const N: usize = SAMPLES_PER_CYCLE> {
    mailbox: &'m Mailbox,
    core: AppCore<N>,
    hw: H,
    profile: P,
    transport: T,
    sink: S,
}

impl<'m, H, P, T, S, const N: usize> EventLoop<'m, H, P, T, S, N>
where
    H: AdcPort + FrontEndPort + TimerPort,
    P: ProfilePort,
    T: TransportPort,
    S: EventSink,
{
    pub fn new(
        mailbox: &'m Mailbox,
        config: &MeterConfig,
        hw: H,
        profile: P,
        transport: T,
        sink: S,
    ) -> Self {
        Self {
            mailbox,
            core: AppCore::new(config),
            hw,
            profile,
            transport,
            sink,
        }
    }

    /// Initialise the profile and front end.  Call once before [`run`](Self::run).
    pub fn start(&mut self) {
        self.core
            .start(&mut self.hw, &mut self.profile, &mut self.sink);
    }

    /// Block on the semaphore and dispatch forever.  Returns only on a
    /// fatal error.
    pub fn run(&mut self) -> Result<Infallible, Error> {
        info!("event loop running");
        loop {
            futures_lite::future::block_on(self.mailbox.acquire());
            self.dispatch()?;
        }
    }

    /// Dispatch once if a permit is available.  Returns whether it did.
    pub fn run_once(&mut self) -> Result<bool, Error> {
        if !self.mailbox.try_acquire() {
            return Ok(false);
        }
        self.dispatch()?;
        Ok(true)
    }

    /// Service everything currently pending, in the fixed order.
    pub fn dispatch(&mut self) -> Result<(), Error> {
        if let Some(msg) = self.mailbox.take_stack() {
            self.core
                .handle_stack_message(msg, &mut self.transport, &mut self.sink);
        }
        if self.mailbox.take(EventFlag::ConnectionEventEnd) {
            self.core
                .on_connection_event_end(&mut self.transport, &mut self.sink);
        }

        while let Some(msg) = self.mailbox.take_app() {
            if let Err(e) =
                self.core
                    .handle_app_message(msg, &mut self.hw, &mut self.profile, &mut self.sink)
            {
                error!("event loop halted: {e}");
                return Err(e.into());
            }
        }

        if self.mailbox.take(EventFlag::PeriodicSample) {
            self.core
                .on_sample_tick(&mut self.hw, &mut self.profile, &mut self.sink);
        }
        Ok(())
    }

    // ── Accessors ─────────────────────────────────────────────

    pub fn core(&self) -> &AppCore<N> {
        &self.core
    }

    pub fn hardware(&self) -> &H {
        &self.hw
    }

    pub fn hardware_mut(&mut self) -> &mut H {
        &mut self.hw
    }

    pub fn profile(&self) -> &P {
        &self.profile
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }
}
