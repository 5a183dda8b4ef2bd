//! Unified error types for the multimeter firmware.
//!
//! A single `Error` enum that every subsystem converts into, so the event
//! loop can tell a fatal hardware fault from a transient one with a single
//! match.  All variants are `Copy` so they can be passed through the state
//! machines and status events without allocation.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Front-end hardware could not be brought up. Fatal.
    Hardware(HardwareError),
    /// One conversion cycle failed. The next tick retries.
    Acquisition(AcquisitionError),
    /// The transport refused a request.
    Transport(TransportError),
    /// Configuration is invalid or could not be parsed.
    Config(ConfigError),
}

impl Error {
    /// Fatal errors stop the event loop; everything else is logged and absorbed.
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Hardware(_))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hardware(e) => write!(f, "hardware: {e}"),
            Self::Acquisition(e) => write!(f, "acquisition: {e}"),
            Self::Transport(e) => write!(f, "transport: {e}"),
            Self::Config(e) => write!(f, "config: {e}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Hardware errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HardwareError {
    /// The ADC unit or its calibration scheme could not be opened.
    AdcOpenFailed,
    /// A front-end switch line could not be configured.
    GpioInitFailed,
    /// The sample timer could not be created.
    TimerUnavailable,
}

impl fmt::Display for HardwareError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AdcOpenFailed => write!(f, "ADC open failed"),
            Self::GpioInitFailed => write!(f, "GPIO init failed"),
            Self::TimerUnavailable => write!(f, "sample timer unavailable"),
        }
    }
}

impl From<HardwareError> for Error {
    fn from(e: HardwareError) -> Self {
        Self::Hardware(e)
    }
}

// ---------------------------------------------------------------------------
// Acquisition errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquisitionError {
    /// A cycle was requested while the front end is closed.
    NotRunning,
    /// The batch conversion did not complete.
    ConversionFailed,
    /// Raw codes could not be converted to microvolts.
    CalibrationFailed,
}

impl fmt::Display for AcquisitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotRunning => write!(f, "acquisition not running"),
            Self::ConversionFailed => write!(f, "ADC conversion failed"),
            Self::CalibrationFailed => write!(f, "microvolt conversion failed"),
        }
    }
}

impl From<AcquisitionError> for Error {
    fn from(e: AcquisitionError) -> Self {
        Self::Acquisition(e)
    }
}

// ---------------------------------------------------------------------------
// Transport errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportError {
    /// The stack refused a connection-event-end subscription.
    NoticeRejected,
    /// No peer is connected on the given handle.
    NotConnected,
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoticeRejected => write!(f, "connection event notice rejected"),
            Self::NotConnected => write!(f, "not connected"),
        }
    }
}

impl From<TransportError> for Error {
    fn from(e: TransportError) -> Self {
        Self::Transport(e)
    }
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// The override blob is not valid JSON for [`MeterConfig`](crate::config::MeterConfig).
    Malformed,
    /// A field failed range validation.  The string names the field.
    ValidationFailed(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed => write!(f, "malformed config"),
            Self::ValidationFailed(field) => write!(f, "validation failed: {field}"),
        }
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl std::error::Error for Error {}
impl std::error::Error for HardwareError {}
impl std::error::Error for AcquisitionError {}
impl std::error::Error for TransportError {}
impl std::error::Error for ConfigError {}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
