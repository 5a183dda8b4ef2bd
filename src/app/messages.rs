//! Inbound messages delivered to the event loop.
//!
//! Two sources feed the loop:
//!
//! - the **protocol stack**, whose messages are opaque to the application
//!   apart from a handful it has to react to ([`StackMessage`]);
//! - the **application profile and role callbacks**, which run in stack
//!   context and therefore only enqueue an [`AppMessage`] describing what
//!   changed.

use core::fmt;

/// Link-layer connection handle assigned by the stack.
pub type ConnHandle = u16;

/// Largest ATT response payload the retry slot will hold.
pub const ATT_MAX_PAYLOAD: usize = 64;

/// 48-bit Bluetooth device address, least-significant byte first as the
/// stack reports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BdAddr(pub [u8; 6]);

impl fmt::Display for BdAddr {
    /// Most-significant byte first, `0x`-prefixed.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x")?;
        for byte in self.0.iter().rev() {
            write!(f, "{byte:02X}")?;
        }
        Ok(())
    }
}

/// An ATT response the GATT server could not hand to the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttResponse {
    pub conn: ConnHandle,
    /// ATT method (opcode) of the response.
    pub opcode: u8,
    pub payload: heapless::Vec<u8, ATT_MAX_PAYLOAD>,
}

/// Result of one transmit attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxStatus {
    /// The controller took the PDU.
    Accepted,
    /// No HCI buffer free right now; try again on a later connection event.
    Backpressured,
    /// Hard failure.  Retrying will not help.
    Failed(TxFailure),
}

/// Why a transmit attempt failed for good.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxFailure {
    NotConnected,
    /// Any other stack status code.
    Status(u8),
}

/// GAP peripheral role state as reported by the role callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GapRoleState {
    Init,
    /// Stack is up; carries our own device address.
    Started { address: BdAddr },
    Advertising,
    /// Non-connectable advertising after a drop while connected-advertising.
    AdvertisingNonConnectable,
    Connected { peer: BdAddr },
    ConnectedAdvertising,
    /// Disconnected, not advertising.
    Waiting,
    /// Disconnected because the supervision timeout expired.
    WaitingAfterTimeout,
    Error,
}

impl GapRoleState {
    /// States in which no peer is connected any more.
    pub const fn is_link_lost(self) -> bool {
        matches!(self, Self::Waiting | Self::WaitingAfterTimeout)
    }
}

/// Profile parameter identifiers used by the characteristic-change callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ParamId {
    /// Mode characteristic (0xFFF1).
    Mode = 0,
    /// Measurement characteristic (0xFFF4).
    Measurement = 3,
}

/// Message queued by profile / role callbacks for the application task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppMessage {
    StateChange(GapRoleState),
    CharacteristicChanged(ParamId),
}

/// GATT server events the application cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GattEvent {
    /// The server could not transmit this response (no HCI buffer).
    ResponsePending(AttResponse),
    /// The peer broke ATT request/response flow control; further requests
    /// on this link will be dropped by the stack.
    FlowControlViolated { opcode: u8 },
    MtuUpdated { mtu: u16 },
    Other,
}

/// Message delivered by the protocol stack to the application task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StackMessage {
    /// The connection event we subscribed to has ended.
    ConnectionEventEnd,
    Gatt(GattEvent),
    HciCommandComplete,
    Other,
}
