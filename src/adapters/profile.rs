//! Multimeter GATT profile: characteristic value store.
//!
//! | Characteristic | UUID   | Param | Len | Perms        |
//! |----------------|--------|-------|-----|--------------|
//! | Mode           | 0xFFF1 | 0     | 1   | Read+Write   |
//! | Measurement    | 0xFFF4 | 3     | 4   | Read+Notify  |
//!
//! The stack reads and writes the values from its own task; the
//! application task reads and writes them through [`ProfilePort`].  A
//! critical-section mutex guards the store, and a peer write only posts
//! [`AppMessage::CharacteristicChanged`] to the mailbox so the reaction
//! runs on the application task.

use core::cell::RefCell;
use core::fmt;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use log::warn;

use crate::app::messages::{AppMessage, ParamId};
use crate::app::ports::{ProfilePort, MEASUREMENT_LEN, SYSTEM_ID_LEN};
use crate::events::Mailbox;
use crate::fsm::mode::Mode;

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Why a peer write was refused.  Maps onto ATT error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileWriteError {
    /// Value length does not match the characteristic.
    InvalidLength,
    /// The characteristic is not writable by the peer.
    WriteNotPermitted,
    /// The application queue is full; the value was not stored.
    Busy,
}

impl ProfileWriteError {
    /// ATT error code to return to the peer.
    pub const fn att_code(self) -> u8 {
        match self {
            Self::InvalidLength => 0x0D,
            Self::WriteNotPermitted => 0x03,
            Self::Busy => 0x11,
        }
    }
}

impl fmt::Display for ProfileWriteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidLength => write!(f, "invalid attribute value length"),
            Self::WriteNotPermitted => write!(f, "write not permitted"),
            Self::Busy => write!(f, "application queue full"),
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Store
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ProfileStore {
    mode: u8,
    measurement: [u8; MEASUREMENT_LEN],
    system_id: [u8; SYSTEM_ID_LEN],
}

impl ProfileStore {
    const INIT: Self = Self {
        mode: Mode::Off.as_raw(),
        measurement: [0; MEASUREMENT_LEN],
        system_id: [0; SYSTEM_ID_LEN],
    };
}

pub struct GattProfile<'m> {
    store: Mutex<CriticalSectionRawMutex, RefCell<ProfileStore>>,
    mailbox: &'m Mailbox,
}

impl<'m> GattProfile<'m> {
    pub const fn new(mailbox: &'m Mailbox) -> Self {
        Self {
            store: Mutex::new(RefCell::new(ProfileStore::INIT)),
            mailbox,
        }
    }

    fn with<R>(&self, f: impl FnOnce(&mut ProfileStore) -> R) -> R {
        self.store.lock(|cell| f(&mut cell.borrow_mut()))
    }

    // ── Stack side ────────────────────────────────────────────

    /// A peer wrote `value` to the characteristic identified by `param`.
    pub fn on_peer_write(&self, param: ParamId, value: &[u8]) -> Result<(), ProfileWriteError> {
        match param {
            ParamId::Mode => {
                let &[raw] = value else {
                    return Err(ProfileWriteError::InvalidLength);
                };
                let previous = self.with(|s| core::mem::replace(&mut s.mode, raw));
                if self
                    .mailbox
                    .post_app(AppMessage::CharacteristicChanged(ParamId::Mode))
                    .is_err()
                {
                    warn!("profile: app queue full, mode write refused");
                    self.with(|s| s.mode = previous);
                    return Err(ProfileWriteError::Busy);
                }
                Ok(())
            }
            ParamId::Measurement => Err(ProfileWriteError::WriteNotPermitted),
        }
    }

    /// Value a peer read of `param` returns.
    pub fn read(&self, param: ParamId) -> heapless::Vec<u8, MEASUREMENT_LEN> {
        let mut out = heapless::Vec::new();
        self.with(|s| {
            let bytes: &[u8] = match param {
                ParamId::Mode => core::slice::from_ref(&s.mode),
                ParamId::Measurement => &s.measurement,
            };
            // Both values fit MEASUREMENT_LEN.
            let _ = out.extend_from_slice(bytes);
        });
        out
    }

    // ── Inspection ────────────────────────────────────────────

    pub fn mode_byte(&self) -> u8 {
        self.with(|s| s.mode)
    }

    pub fn measurement(&self) -> [u8; MEASUREMENT_LEN] {
        self.with(|s| s.measurement)
    }

    /// Published measurement as a host integer.
    pub fn measurement_value(&self) -> u32 {
        u32::from_be_bytes(self.measurement())
    }

    pub fn system_id(&self) -> [u8; SYSTEM_ID_LEN] {
        self.with(|s| s.system_id)
    }
}

// ── ProfilePort implementation ────────────────────────────────

impl ProfilePort for &GattProfile<'_> {
    fn mode_raw(&self) -> u8 {
        self.mode_byte()
    }

    fn set_mode(&mut self, mode: Mode) {
        self.with(|s| s.mode = mode.as_raw());
    }

    fn publish_measurement(&mut self, value: [u8; MEASUREMENT_LEN]) {
        self.with(|s| s.measurement = value);
    }

    fn set_system_id(&mut self, id: [u8; SYSTEM_ID_LEN]) {
        self.with(|s| s.system_id = id);
    }
}
