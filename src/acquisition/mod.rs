//! Periodic acquisition: capture a batch, filter, scale, publish.
//!
//! ```text
//!  timer ──▶ convert(N raw) ──▶ to_microvolts ──▶ median ──▶ scale ──▶ publish BE u32
//! ```
//!
//! The pipeline owns its two batch buffers for its whole life; each cycle
//! overwrites them in place.  The analog front end is open exactly while
//! the pipeline is [`AcquisitionState::Running`].

pub mod filter;
pub mod scaling;

use log::{debug, info, warn};

use crate::app::ports::{AdcPort, ProfilePort, TimerPort, MEASUREMENT_LEN};
use crate::config::{MeterConfig, SAMPLES_PER_CYCLE};
use crate::error::{AcquisitionError, HardwareError};
use crate::fsm::mode::Mode;

use filter::median;
use scaling::{encode, Scaling};

/// Measurement value published while acquisition is stopped.
pub const ZERO_MEASUREMENT: [u8; MEASUREMENT_LEN] = [0; MEASUREMENT_LEN];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AcquisitionState {
    #[default]
    Idle,
    Running,
}

/// Drives one conversion per timer period while running.
pub struct AcquisitionPipeline<const N: usize = SAMPLES_PER_CYCLE> {
    state: AcquisitionState,
    raw: [u16; N],
    microvolts: [u32; N],
    scaling: Scaling,
    period_ms: u32,
    cycles: u32,
}

impl<const N: usize> AcquisitionPipeline<N> {
    pub fn new(config: &MeterConfig) -> Self {
        Self {
            state: AcquisitionState::Idle,
            raw: [0; N],
            microvolts: [0; N],
            scaling: Scaling::from_config(config),
            period_ms: config.sample_period_ms,
            cycles: 0,
        }
    }

    pub fn state(&self) -> AcquisitionState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == AcquisitionState::Running
    }

    /// Completed cycles since boot, successful or not.
    pub fn cycles(&self) -> u32 {
        self.cycles
    }

    pub fn period_ms(&self) -> u32 {
        self.period_ms
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Open the front end and arm the sample timer.
    ///
    /// An open failure is fatal to the caller; the timer is left disarmed
    /// and the state stays Idle.  Already running is a no-op.
    pub fn start(&mut self, hw: &mut (impl AdcPort + TimerPort)) -> Result<(), HardwareError> {
        if self.is_running() {
            debug!("acquisition: start while running ignored");
            return Ok(());
        }
        hw.open()?;
        self.state = AcquisitionState::Running;
        hw.arm(self.period_ms);
        info!("acquisition: started ({} samples every {} ms)", N, self.period_ms);
        Ok(())
    }

    /// Stop sampling, close the front end and zero the published value.
    ///
    /// Returns `false` (and touches nothing) if already idle.
    pub fn stop(
        &mut self,
        hw: &mut (impl AdcPort + TimerPort),
        profile: &mut impl ProfilePort,
    ) -> bool {
        if !self.is_running() {
            return false;
        }
        hw.disarm();
        hw.cancel();
        hw.close();
        profile.publish_measurement(ZERO_MEASUREMENT);
        self.state = AcquisitionState::Idle;
        info!("acquisition: stopped");
        true
    }

    // ── Per-tick work ─────────────────────────────────────────

    /// Handle a sample-timer expiry: re-arm, then run one cycle.
    ///
    /// Returns `None` for a stale tick that arrived after [`stop`](Self::stop);
    /// the timer is not re-armed in that case.
    pub fn on_tick(
        &mut self,
        mode: Mode,
        hw: &mut (impl AdcPort + TimerPort),
        profile: &mut impl ProfilePort,
    ) -> Option<Result<u32, AcquisitionError>> {
        if !self.is_running() {
            debug!("acquisition: stale tick dropped");
            return None;
        }
        hw.arm(self.period_ms);
        Some(self.run_cycle(mode, hw, profile))
    }

    /// Capture, filter, scale and publish one measurement.
    ///
    /// Any step failing abandons the cycle; nothing is published and the
    /// previous value stays in place.
    pub fn run_cycle(
        &mut self,
        mode: Mode,
        adc: &mut impl AdcPort,
        profile: &mut impl ProfilePort,
    ) -> Result<u32, AcquisitionError> {
        if !self.is_running() {
            return Err(AcquisitionError::NotRunning);
        }
        self.cycles = self.cycles.wrapping_add(1);

        let result = self.capture(adc).map(|filtered| self.scaling.apply(mode, filtered));
        match result {
            Ok(value) => {
                profile.publish_measurement(encode(value));
                debug!("acquisition: {:?} -> {}", mode, value);
            }
            Err(e) => warn!("acquisition: cycle abandoned ({})", e),
        }
        result
    }

    fn capture(&mut self, adc: &mut impl AdcPort) -> Result<u32, AcquisitionError> {
        adc.convert(&mut self.raw)?;
        adc.to_microvolts(&self.raw, &mut self.microvolts)?;
        Ok(median(&self.microvolts))
    }
}
