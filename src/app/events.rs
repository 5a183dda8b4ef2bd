//! Outbound status events.
//!
//! [`AppCore`](super::service::AppCore) emits these through the
//! [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them: log to serial, draw on a display,
//! or journal them in a test.

use crate::error::AcquisitionError;
use crate::fsm::mode::Mode;
use crate::retry::ReleaseOutcome;

use super::messages::BdAddr;

/// Structured events emitted by the application core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEvent {
    /// The core has initialised the profile and is waiting for the stack.
    Started,

    /// The stack is up; carries our own address.
    Initialized { address: BdAddr },
    Advertising,
    Connected { peer: BdAddr },
    ConnectedAdvertising,
    /// Peer went away and we are not advertising.
    Disconnected,
    /// Link dropped on supervision timeout.
    TimedOut,
    /// GAP role reported an error state.
    StackError,

    /// The peer wrote the mode characteristic.
    ModeSelected { raw: u8 },
    AcquisitionStarted(Mode),
    AcquisitionStopped,

    /// A measurement was published (`u32::MAX` on overflow).
    Measurement { value: u32, mode: Mode },
    /// A sample cycle was abandoned; the next tick retries.
    CycleFailed(AcquisitionError),

    /// A held response is still backpressured.
    ResponseRetry { retries: u32 },
    /// A held response left the retry slot.
    ResponseReleased { outcome: ReleaseOutcome, retries: u32 },
    /// The stack refused a window-end subscription; the response was dropped.
    NoticeRejected,

    FlowControlViolated { opcode: u8 },
    MtuUpdated { mtu: u16 },
}
