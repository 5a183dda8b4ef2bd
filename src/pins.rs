//! GPIO / peripheral pin assignments for the multimeter board.
//!
//! Single source of truth: every driver references this module rather than
//! hard-coding pin numbers.

// ---------------------------------------------------------------------------
// Front-end switching
// ---------------------------------------------------------------------------

/// Line A: HIGH routes the input across the current shunt.
pub const FRONT_END_LINE_A_GPIO: i32 = 21;
/// Line B: HIGH switches the 10 V resistive divider in.
pub const FRONT_END_LINE_B_GPIO: i32 = 38;

// ---------------------------------------------------------------------------
// Measurement input (ADC1)
// ---------------------------------------------------------------------------

/// Conditioned front-end output.  ADC1 channel 3 (GPIO 4 on ESP32-S3).
pub const MEASURE_ADC_GPIO: i32 = 4;
pub const MEASURE_ADC_CHANNEL: u32 = 3;
