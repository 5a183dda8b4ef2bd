//! Mode-dependent conversion from filtered microvolts to the published value.

use crate::config::MeterConfig;
use crate::fsm::mode::Mode;

/// Published when the input exceeds the front end's full-scale range.
pub const OVERFLOW_SENTINEL: u32 = u32::MAX;

/// Linear transforms for each range, taken from [`MeterConfig`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scaling {
    /// Readings strictly above this are overflow.
    pub full_scale_uv: u32,
    /// Range B: reading / ratio undoes the resistive divider.
    pub divider_ratio: f64,
    /// Range C: reading / divisor - offset.
    pub shunt_divisor: f64,
    pub shunt_offset: f64,
}

impl Default for Scaling {
    fn default() -> Self {
        Self::from_config(&MeterConfig::default())
    }
}

impl Scaling {
    pub fn from_config(config: &MeterConfig) -> Self {
        Self {
            full_scale_uv: config.full_scale_uv,
            divider_ratio: config.divider_ratio,
            shunt_divisor: config.shunt_divisor,
            shunt_offset: config.shunt_offset,
        }
    }

    /// Map one filtered reading to the value published for `mode`.
    ///
    /// Float results are truncated toward zero and saturate into `u32`, so
    /// a current reading below the shunt offset publishes 0.
    pub fn apply(&self, mode: Mode, microvolts: u32) -> u32 {
        if microvolts > self.full_scale_uv {
            return OVERFLOW_SENTINEL;
        }
        let uv = f64::from(microvolts);
        match mode {
            Mode::Volts10 => (uv / self.divider_ratio) as u32,
            Mode::MilliAmps500 => (uv / self.shunt_divisor - self.shunt_offset) as u32,
            Mode::Volts3 | Mode::Off | Mode::Ohms => microvolts,
        }
    }
}

/// Wire format of the measurement characteristic.
pub const fn encode(value: u32) -> [u8; 4] {
    value.to_be_bytes()
}
