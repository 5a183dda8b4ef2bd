//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing one status line per application
//! event to the logger (UART / USB-CDC on target, stderr on the host).
//! A display adapter would implement the same trait.

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;
use crate::retry::ReleaseOutcome;

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started => info!("START | profile initialised"),
            AppEvent::Initialized { address } => info!("GAP   | {} initialized", address),
            AppEvent::Advertising => info!("GAP   | advertising"),
            AppEvent::Connected { peer } => info!("GAP   | connected {}", peer),
            AppEvent::ConnectedAdvertising => info!("GAP   | connected advertising"),
            AppEvent::Disconnected => info!("GAP   | disconnected"),
            AppEvent::TimedOut => warn!("GAP   | timed out"),
            AppEvent::StackError => warn!("GAP   | error"),
            AppEvent::ModeSelected { raw } => info!("MODE  | char 1: {}", raw),
            AppEvent::AcquisitionStarted(mode) => info!("MODE  | acquisition on ({:?})", mode),
            AppEvent::AcquisitionStopped => info!("MODE  | acquisition off"),
            AppEvent::Measurement { value, mode } if *value == u32::MAX => {
                info!("MEAS  | {:?} overflow", mode);
            }
            AppEvent::Measurement { value, mode } => info!("MEAS  | {:?} {}", mode, value),
            AppEvent::CycleFailed(e) => warn!("MEAS  | {}", e),
            AppEvent::ResponseRetry { retries } => info!("ATT   | rsp retry {}", retries),
            AppEvent::ResponseReleased {
                outcome: ReleaseOutcome::Sent,
                retries,
            } => info!("ATT   | rsp sent after {} retries", retries),
            AppEvent::ResponseReleased { outcome, retries } => {
                warn!("ATT   | rsp dropped ({:?}) after {} retries", outcome, retries);
            }
            AppEvent::NoticeRejected => warn!("ATT   | window notice refused, rsp dropped"),
            AppEvent::FlowControlViolated { opcode } => {
                warn!("ATT   | flow control violated (opcode {:#04x})", opcode);
            }
            AppEvent::MtuUpdated { mtu } => info!("ATT   | MTU {}", mtu),
        }
    }
}
