//! Peripheral drivers: measurement ADC, front-end switch lines, sample timer.

pub mod adc;
pub mod front_end;
pub mod hw_timer;
