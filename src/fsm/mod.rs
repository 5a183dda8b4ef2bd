//! Mode state machine.
//!
//! The peer drives the meter by writing the mode characteristic.  The
//! controller maps each write onto the acquisition pipeline and the two
//! front-end switch lines:
//!
//! ```text
//!                  active mode (start + lines)
//!        ┌──────┐ ───────────────────────────▶ ┌─────────┐
//!        │ Idle │                              │ Running │ ◀─┐ active mode
//!        └──────┘ ◀─────────────────────────── └─────────┘ ──┘ (lines only)
//!                  Off / Ohms / unknown / link lost
//!                  (stop + zero + lines low)
//! ```
//!
//! Switching between two active modes never restarts acquisition; only the
//! switch lines move.

pub mod mode;

use log::{info, warn};

use crate::acquisition::AcquisitionPipeline;
use crate::app::ports::{AdcPort, FrontEndPort, ProfilePort, TimerPort};
use crate::error::HardwareError;

use mode::{FrontEndLines, Mode};

/// What a mode write (or link loss) did to the hardware.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeTransition {
    /// Acquisition was idle and is now running in this mode.
    Started(Mode),
    /// Acquisition kept running; only the switch lines changed.
    Reconfigured(Mode),
    /// Acquisition was running and has been shut down.
    Stopped,
    /// Nothing to do (already idle and an inactive mode was selected).
    Unchanged,
}

/// Tracks the selected mode and the levels last driven on the switch lines.
#[derive(Debug, Default)]
pub struct ModeController {
    mode: Mode,
    lines: FrontEndLines,
}

impl ModeController {
    pub const fn new() -> Self {
        Self {
            mode: Mode::Off,
            lines: FrontEndLines::LOW,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn lines(&self) -> FrontEndLines {
        self.lines
    }

    /// Drive both lines low without touching acquisition.  Used at boot.
    pub fn reset_lines(&mut self, hw: &mut impl FrontEndPort) {
        self.lines = FrontEndLines::LOW;
        hw.set_front_end(self.lines);
    }

    /// Apply a raw mode byte written by the peer.
    ///
    /// Unknown bytes and the resistance range have no front end and take
    /// the same path as Off.  A front-end open failure is returned to the
    /// caller, who must not continue with an unconfigured front end.
    pub fn on_mode_written<const N: usize>(
        &mut self,
        raw: u8,
        pipeline: &mut AcquisitionPipeline<N>,
        hw: &mut (impl AdcPort + FrontEndPort + TimerPort),
        profile: &mut impl ProfilePort,
    ) -> Result<ModeTransition, HardwareError> {
        let requested = Mode::from_raw(raw);
        if requested.is_none() {
            warn!("mode: unknown mode byte {raw:#04x}, treating as off");
        }
        let mode = requested.unwrap_or(Mode::Off);

        let Some(lines) = mode.front_end(self.lines) else {
            self.mode = mode;
            return Ok(self.shut_down(pipeline, hw, profile));
        };

        let transition = if pipeline.is_running() {
            ModeTransition::Reconfigured(mode)
        } else {
            pipeline.start(hw)?;
            ModeTransition::Started(mode)
        };

        self.mode = mode;
        self.lines = lines;
        hw.set_front_end(lines);
        info!("mode: {:?} ({:?})", mode, transition);
        Ok(transition)
    }

    /// The peer is gone.  Shut down as for Off and rewrite the mode
    /// characteristic so a reconnecting peer reads a consistent value.
    pub fn on_link_lost<const N: usize>(
        &mut self,
        pipeline: &mut AcquisitionPipeline<N>,
        hw: &mut (impl AdcPort + FrontEndPort + TimerPort),
        profile: &mut impl ProfilePort,
    ) -> ModeTransition {
        let transition = self.shut_down(pipeline, hw, profile);
        self.mode = Mode::Off;
        profile.set_mode(Mode::Off);
        transition
    }

    fn shut_down<const N: usize>(
        &mut self,
        pipeline: &mut AcquisitionPipeline<N>,
        hw: &mut (impl AdcPort + FrontEndPort + TimerPort),
        profile: &mut impl ProfilePort,
    ) -> ModeTransition {
        if !pipeline.stop(hw, profile) {
            return ModeTransition::Unchanged;
        }
        self.lines = FrontEndLines::LOW;
        hw.set_front_end(self.lines);
        ModeTransition::Stopped
    }
}
