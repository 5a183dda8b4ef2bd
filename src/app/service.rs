//! Application core: the hexagonal center.
//!
//! [`AppCore`] owns the acquisition pipeline, the mode controller and the
//! response retry slot.  It exposes a hardware-agnostic API; all I/O flows
//! through port traits injected at call sites, making the whole core
//! testable with mock adapters.
//!
//! ```text
//!  AdcPort / FrontEndPort ◀──┌───────────────────────────┐──▶ EventSink
//!  TimerPort                 │          AppCore          │
//!  ProfilePort ◀────────────▶│  Pipeline · Modes · Retry │
//!  TransportPort ◀───────────└───────────────────────────┘
//! ```

use log::{debug, error, info, warn};

use crate::acquisition::{AcquisitionPipeline, ZERO_MEASUREMENT};
use crate::config::{MeterConfig, SAMPLES_PER_CYCLE};
use crate::error::HardwareError;
use crate::fsm::mode::Mode;
use crate::fsm::{ModeController, ModeTransition};
use crate::retry::{Released, ResponseRetryBuffer, RetryAttempt};

use super::events::AppEvent;
use super::messages::{
    AppMessage, AttResponse, BdAddr, GapRoleState, GattEvent, ParamId, StackMessage,
};
use super::ports::{
    AdcPort, EventSink, FrontEndPort, ProfilePort, TimerPort, TransportPort, SYSTEM_ID_LEN,
};

/// Device Information system ID derived from our own address: the low
/// three address bytes, two zero bytes, then the high three.
pub fn system_id(address: &BdAddr) -> [u8; SYSTEM_ID_LEN] {
    let a = address.0;
    [a[0], a[1], a[2], 0x00, 0x00, a[3], a[4], a[5]]
}

// ───────────────────────────────────────────────────────────────
// AppCore
// ───────────────────────────────────────────────────────────────

/// The three state machines and the link state they share.
pub struct AppCore<const N: usize = SAMPLES_PER_CYCLE> {
    pipeline: AcquisitionPipeline<N>,
    modes: ModeController,
    retry: ResponseRetryBuffer,
    peer: Option<BdAddr>,
}

impl<const N: usize> AppCore<N> {
    pub fn new(config: &MeterConfig) -> Self {
        Self {
            pipeline: AcquisitionPipeline::new(config),
            modes: ModeController::new(),
            retry: ResponseRetryBuffer::new(),
            peer: None,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Put the profile and front end into their power-on state.
    pub fn start(
        &mut self,
        hw: &mut impl FrontEndPort,
        profile: &mut impl ProfilePort,
        sink: &mut impl EventSink,
    ) {
        profile.set_mode(Mode::Off);
        profile.publish_measurement(ZERO_MEASUREMENT);
        self.modes.reset_lines(hw);
        sink.emit(&AppEvent::Started);
        info!("AppCore started ({} samples per cycle)", N);
    }

    // ── Stack messages ────────────────────────────────────────

    /// Route one message from the protocol stack.  Anything the
    /// application does not act on is released here.
    pub fn handle_stack_message(
        &mut self,
        msg: StackMessage,
        transport: &mut impl TransportPort,
        sink: &mut impl EventSink,
    ) {
        match msg {
            StackMessage::ConnectionEventEnd => self.on_connection_event_end(transport, sink),
            StackMessage::Gatt(GattEvent::ResponsePending(rsp)) => {
                self.on_response_pending(rsp, transport, sink);
            }
            StackMessage::Gatt(GattEvent::FlowControlViolated { opcode }) => {
                warn!("ATT flow control violated (opcode {opcode:#04x}); peer requests will be dropped");
                sink.emit(&AppEvent::FlowControlViolated { opcode });
            }
            StackMessage::Gatt(GattEvent::MtuUpdated { mtu }) => {
                sink.emit(&AppEvent::MtuUpdated { mtu });
            }
            other => debug!("stack message released: {:?}", other),
        }
    }

    /// A connection event ended; retry the held response, if any.
    pub fn on_connection_event_end(
        &mut self,
        transport: &mut impl TransportPort,
        sink: &mut impl EventSink,
    ) {
        match self.retry.on_connection_window_ended(transport) {
            RetryAttempt::Idle => debug!("window-end notice with nothing pending"),
            RetryAttempt::StillPending { retries } => {
                sink.emit(&AppEvent::ResponseRetry { retries });
            }
            RetryAttempt::Done(released) => report_release(&released, sink),
        }
    }

    fn on_response_pending(
        &mut self,
        rsp: AttResponse,
        transport: &mut impl TransportPort,
        sink: &mut impl EventSink,
    ) {
        match self.retry.on_transmit_backpressure(rsp, transport) {
            Ok(Some(evicted)) => report_release(&evicted, sink),
            Ok(None) => {}
            Err(_) => sink.emit(&AppEvent::NoticeRejected),
        }
    }

    // ── Application messages ──────────────────────────────────

    /// Route one message queued by a profile or role callback.
    ///
    /// Only a front-end open failure is returned; it is fatal.
    pub fn handle_app_message(
        &mut self,
        msg: AppMessage,
        hw: &mut (impl AdcPort + FrontEndPort + TimerPort),
        profile: &mut impl ProfilePort,
        sink: &mut impl EventSink,
    ) -> Result<(), HardwareError> {
        match msg {
            AppMessage::StateChange(state) => {
                self.on_state_change(state, hw, profile, sink);
                Ok(())
            }
            AppMessage::CharacteristicChanged(ParamId::Mode) => {
                self.on_mode_characteristic(hw, profile, sink)
            }
            AppMessage::CharacteristicChanged(ParamId::Measurement) => {
                debug!("measurement characteristic changed; nothing to do");
                Ok(())
            }
        }
    }

    fn on_mode_characteristic(
        &mut self,
        hw: &mut (impl AdcPort + FrontEndPort + TimerPort),
        profile: &mut impl ProfilePort,
        sink: &mut impl EventSink,
    ) -> Result<(), HardwareError> {
        let raw = profile.mode_raw();
        sink.emit(&AppEvent::ModeSelected { raw });

        let transition = self
            .modes
            .on_mode_written(raw, &mut self.pipeline, hw, profile)
            .inspect_err(|e| error!("front end unavailable: {e}"))?;
        match transition {
            ModeTransition::Started(mode) => sink.emit(&AppEvent::AcquisitionStarted(mode)),
            ModeTransition::Stopped => sink.emit(&AppEvent::AcquisitionStopped),
            ModeTransition::Reconfigured(_) | ModeTransition::Unchanged => {}
        }
        Ok(())
    }

    fn on_state_change(
        &mut self,
        state: GapRoleState,
        hw: &mut (impl AdcPort + FrontEndPort + TimerPort),
        profile: &mut impl ProfilePort,
        sink: &mut impl EventSink,
    ) {
        if state.is_link_lost() {
            self.on_link_lost(hw, profile, sink);
        }
        match state {
            GapRoleState::Init => {}
            GapRoleState::Started { address } => {
                profile.set_system_id(system_id(&address));
                info!("BLE started, address {address}");
                sink.emit(&AppEvent::Initialized { address });
            }
            GapRoleState::Advertising => sink.emit(&AppEvent::Advertising),
            GapRoleState::AdvertisingNonConnectable => {
                if let Some(released) = self.retry.on_link_lost() {
                    report_release(&released, sink);
                }
            }
            GapRoleState::Connected { peer } => {
                self.peer = Some(peer);
                info!("connected to {peer}");
                sink.emit(&AppEvent::Connected { peer });
            }
            GapRoleState::ConnectedAdvertising => sink.emit(&AppEvent::ConnectedAdvertising),
            GapRoleState::Waiting => sink.emit(&AppEvent::Disconnected),
            GapRoleState::WaitingAfterTimeout => sink.emit(&AppEvent::TimedOut),
            GapRoleState::Error => {
                error!("GAP role reported an error");
                sink.emit(&AppEvent::StackError);
            }
        }
    }

    /// Shut the front end down and fail any held response.
    fn on_link_lost(
        &mut self,
        hw: &mut (impl AdcPort + FrontEndPort + TimerPort),
        profile: &mut impl ProfilePort,
        sink: &mut impl EventSink,
    ) {
        if let Some(peer) = self.peer.take() {
            info!("link to {peer} lost");
        }
        if self.modes.on_link_lost(&mut self.pipeline, hw, profile) == ModeTransition::Stopped {
            sink.emit(&AppEvent::AcquisitionStopped);
        }
        if let Some(released) = self.retry.on_link_lost() {
            report_release(&released, sink);
        }
    }

    // ── Periodic sampling ─────────────────────────────────────

    /// The sample timer expired.
    pub fn on_sample_tick(
        &mut self,
        hw: &mut (impl AdcPort + TimerPort),
        profile: &mut impl ProfilePort,
        sink: &mut impl EventSink,
    ) {
        let mode = self.modes.mode();
        match self.pipeline.on_tick(mode, hw, profile) {
            None => {}
            Some(Ok(value)) => sink.emit(&AppEvent::Measurement { value, mode }),
            Some(Err(e)) => sink.emit(&AppEvent::CycleFailed(e)),
        }
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn mode(&self) -> Mode {
        self.modes.mode()
    }

    pub fn pipeline(&self) -> &AcquisitionPipeline<N> {
        &self.pipeline
    }

    pub fn modes(&self) -> &ModeController {
        &self.modes
    }

    pub fn retry(&self) -> &ResponseRetryBuffer {
        &self.retry
    }

    /// Address of the connected peer, if any.
    pub fn peer(&self) -> Option<BdAddr> {
        self.peer
    }
}

fn report_release(released: &Released, sink: &mut impl EventSink) {
    sink.emit(&AppEvent::ResponseReleased {
        outcome: released.outcome,
        retries: released.retries,
    });
}
