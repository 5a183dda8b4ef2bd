//! Front-end switch lines.
//!
//! Two push-pull outputs select the attenuator / shunt path.  The driver is
//! generic over `embedded-hal` output pins so the same code drives
//! `esp-idf-hal` `PinDriver`s on target and [`SimPin`]s on the host.

use core::convert::Infallible;

use embedded_hal::digital::{ErrorType, OutputPin, PinState};

use crate::fsm::mode::FrontEndLines;

pub struct FrontEndSwitch<A, B> {
    line_a: A,
    line_b: B,
    current: FrontEndLines,
}

impl<A: OutputPin, B: OutputPin> FrontEndSwitch<A, B> {
    pub fn new(line_a: A, line_b: B) -> Self {
        Self {
            line_a,
            line_b,
            current: FrontEndLines::LOW,
        }
    }

    /// Drive both lines.  A pin error is logged and the cached level left
    /// unchanged for that line.
    pub fn apply(&mut self, lines: FrontEndLines) {
        if self.line_a.set_state(PinState::from(lines.line_a)).is_ok() {
            self.current.line_a = lines.line_a;
        } else {
            log::warn!("front_end: line A write failed");
        }
        if self.line_b.set_state(PinState::from(lines.line_b)).is_ok() {
            self.current.line_b = lines.line_b;
        } else {
            log::warn!("front_end: line B write failed");
        }
    }

    /// Levels last written successfully.
    pub fn current(&self) -> FrontEndLines {
        self.current
    }
}

/// In-memory output pin for host builds.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SimPin {
    high: bool,
}

impl SimPin {
    pub fn is_high(&self) -> bool {
        self.high
    }
}

impl ErrorType for SimPin {
    type Error = Infallible;
}

impl OutputPin for SimPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.high = false;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.high = true;
        Ok(())
    }
}
