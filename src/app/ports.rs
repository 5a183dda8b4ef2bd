//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ AppCore (domain)
//! ```
//!
//! Driven adapters (ADC, switch lines, sample timer, characteristic store,
//! transport, status sink) implement these traits.  [`AppCore`](super::service::AppCore)
//! consumes them via generics, so the domain core never touches hardware
//! or the BLE stack directly.
//!
//! Every call here is bounded-latency and non-blocking from the event
//! loop's point of view.

use crate::error::{AcquisitionError, HardwareError, TransportError};
use crate::fsm::mode::{FrontEndLines, Mode};

use super::events::AppEvent;
use super::messages::{AttResponse, ConnHandle, TxStatus};

/// Size of the measurement characteristic (big-endian `u32`).
pub const MEASUREMENT_LEN: usize = 4;

/// Size of the Device Information system ID.
pub const SYSTEM_ID_LEN: usize = 8;

// ───────────────────────────────────────────────────────────────
// ADC port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Analog front end sampling.
pub trait AdcPort {
    /// Power up the converter and its calibration.
    fn open(&mut self) -> Result<(), HardwareError>;

    /// Power the converter down.  No-op if already closed.
    fn close(&mut self);

    /// Abort an in-flight conversion before returning.
    fn cancel(&mut self);

    /// Capture one batch, one raw code per slot of `raw`.
    fn convert(&mut self, raw: &mut [u16]) -> Result<(), AcquisitionError>;

    /// Convert a captured batch to calibrated microvolts.
    fn to_microvolts(
        &mut self,
        raw: &[u16],
        microvolts: &mut [u32],
    ) -> Result<(), AcquisitionError>;
}

// ───────────────────────────────────────────────────────────────
// Front-end port (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// Drives the two GPIO lines that select attenuator / shunt.
pub trait FrontEndPort {
    fn set_front_end(&mut self, lines: FrontEndLines);
}

// ───────────────────────────────────────────────────────────────
// Timer port
// ───────────────────────────────────────────────────────────────

/// One-shot sample timer.  On expiry the adapter raises
/// [`EventFlag::PeriodicSample`](crate::events::EventFlag::PeriodicSample)
/// on the mailbox.
pub trait TimerPort {
    /// (Re)start the one-shot timer.
    fn arm(&mut self, period_ms: u32);

    /// Stop the timer if it is running.
    fn disarm(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Profile port (domain ↔ GATT characteristic store)
// ───────────────────────────────────────────────────────────────

/// The multimeter GATT profile's characteristic values.
pub trait ProfilePort {
    /// Current raw value of the mode characteristic.
    fn mode_raw(&self) -> u8;

    /// Overwrite the mode characteristic (e.g. back to Off on disconnect).
    fn set_mode(&mut self, mode: Mode);

    /// Store a new measurement value.
    fn publish_measurement(&mut self, value: [u8; MEASUREMENT_LEN]);

    /// Store the Device Information system ID.
    fn set_system_id(&mut self, id: [u8; SYSTEM_ID_LEN]);
}

// ───────────────────────────────────────────────────────────────
// Transport port (domain → BLE stack)
// ───────────────────────────────────────────────────────────────

/// The parts of the BLE stack the retry logic needs.
pub trait TransportPort {
    /// Try to send an ATT response.
    fn transmit(&mut self, response: &AttResponse) -> TxStatus;

    /// Ask for a [`StackMessage::ConnectionEventEnd`](super::messages::StackMessage)
    /// after each connection event on `conn`.
    fn request_window_notice(&mut self, conn: ConnHandle) -> Result<(), TransportError>;

    /// Drop the subscription made by [`request_window_notice`](Self::request_window_notice).
    fn cancel_window_notice(&mut self, conn: ConnHandle);
}

// ───────────────────────────────────────────────────────────────
// Event sink port (domain → display / logging)
// ───────────────────────────────────────────────────────────────

/// Fire-and-forget status output.  Adapters decide where the events go
/// (serial log, LCD, test journal).
pub trait EventSink {
    fn emit(&mut self, event: &AppEvent);
}
