//! Hardware adapter: bridges real peripherals to domain port traits.
//!
//! Owns the measurement ADC, the front-end switch lines and the sample
//! timer, exposing them through [`AdcPort`], [`FrontEndPort`] and
//! [`TimerPort`].  This is the only module in the system that touches
//! the analog hardware.  On non-espidf targets the underlying drivers use
//! cfg-gated simulation.

use embedded_hal::digital::OutputPin;

use crate::app::ports::{AdcPort, FrontEndPort, TimerPort};
use crate::drivers::adc::AdcDriver;
use crate::drivers::front_end::FrontEndSwitch;
use crate::drivers::hw_timer::SampleTimer;
use crate::error::{AcquisitionError, HardwareError};
use crate::fsm::mode::FrontEndLines;

/// Concrete adapter that combines all measurement hardware behind port traits.
pub struct HardwareAdapter<A, B> {
    adc: AdcDriver,
    front_end: FrontEndSwitch<A, B>,
    timer: SampleTimer,
}

impl<A: OutputPin, B: OutputPin> HardwareAdapter<A, B> {
    pub fn new(adc: AdcDriver, front_end: FrontEndSwitch<A, B>, timer: SampleTimer) -> Self {
        Self {
            adc,
            front_end,
            timer,
        }
    }
}

// ── AdcPort implementation ────────────────────────────────────

impl<A: OutputPin, B: OutputPin> AdcPort for HardwareAdapter<A, B> {
    fn open(&mut self) -> Result<(), HardwareError> {
        self.adc.open()
    }

    fn close(&mut self) {
        self.adc.close();
    }

    fn cancel(&mut self) {
        self.adc.cancel();
    }

    fn convert(&mut self, raw: &mut [u16]) -> Result<(), AcquisitionError> {
        self.adc.convert(raw)
    }

    fn to_microvolts(
        &mut self,
        raw: &[u16],
        microvolts: &mut [u32],
    ) -> Result<(), AcquisitionError> {
        self.adc.to_microvolts(raw, microvolts)
    }
}

// ── FrontEndPort implementation ───────────────────────────────

impl<A: OutputPin, B: OutputPin> FrontEndPort for HardwareAdapter<A, B> {
    fn set_front_end(&mut self, lines: FrontEndLines) {
        self.front_end.apply(lines);
    }
}

// ── TimerPort implementation ──────────────────────────────────

impl<A: OutputPin, B: OutputPin> TimerPort for HardwareAdapter<A, B> {
    fn arm(&mut self, period_ms: u32) {
        self.timer.arm(period_ms);
    }

    fn disarm(&mut self) {
        self.timer.disarm();
    }
}
