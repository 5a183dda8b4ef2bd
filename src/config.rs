//! System configuration parameters
//!
//! All tunable parameters for the multimeter peripheral.  Defaults match
//! the shipped front end; the host simulator can override them from a JSON
//! file.  Nothing here is persisted on the device.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Number of raw samples captured per conversion cycle.
pub const SAMPLES_PER_CYCLE: usize = 100;

/// Longest device name that still fits the scan response next to the
/// connection-interval and tx-power fields.
pub const MAX_DEVICE_NAME_LEN: usize = 20;

/// Core measurement configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeterConfig {
    // --- Timing ---
    /// Periodic sample interval (milliseconds)
    pub sample_period_ms: u32,

    // --- Front end ---
    /// Highest calibrated input (µV) the front end can report
    pub full_scale_uv: u32,
    /// Resistive divider ratio in the 10 V range
    pub divider_ratio: f64,
    /// Current-sense transfer divisor in the 500 mA range
    pub shunt_divisor: f64,
    /// Current-sense transfer offset in the 500 mA range
    pub shunt_offset: f64,

    // --- Link ---
    pub advertising: AdvertisingConfig,
}

impl Default for MeterConfig {
    fn default() -> Self {
        Self {
            sample_period_ms: 1000,

            full_scale_uv: 3_000_000, // 3 V
            divider_ratio: 0.3,
            shunt_divisor: 6.85,
            shunt_offset: 1200.0,

            advertising: AdvertisingConfig::default(),
        }
    }
}

impl MeterConfig {
    /// Parse a JSON override and validate it.  Missing fields keep their
    /// defaults.
    pub fn from_json(raw: &[u8]) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_slice(raw).map_err(|_| ConfigError::Malformed)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would break the scaling maths or the link setup.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sample_period_ms == 0 {
            return Err(ConfigError::ValidationFailed("sample_period_ms"));
        }
        if self.full_scale_uv == 0 {
            return Err(ConfigError::ValidationFailed("full_scale_uv"));
        }
        if !(self.divider_ratio.is_finite() && self.divider_ratio > 0.0) {
            return Err(ConfigError::ValidationFailed("divider_ratio"));
        }
        if !(self.shunt_divisor.is_finite() && self.shunt_divisor > 0.0) {
            return Err(ConfigError::ValidationFailed("shunt_divisor"));
        }
        if !self.shunt_offset.is_finite() {
            return Err(ConfigError::ValidationFailed("shunt_offset"));
        }
        self.advertising.validate()
    }
}

/// Parameters handed to the BLE stack when advertising starts.
///
/// Units follow the link layer: advertising interval in 0.625 ms steps,
/// connection interval in 1.25 ms steps, supervision timeout in 10 ms steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvertisingConfig {
    pub device_name: heapless::String<MAX_DEVICE_NAME_LEN>,
    pub advertising_interval: u16,
    pub min_conn_interval: u16,
    pub max_conn_interval: u16,
    pub slave_latency: u16,
    pub supervision_timeout: u16,
    pub tx_power_dbm: i8,
}

impl Default for AdvertisingConfig {
    fn default() -> Self {
        let mut device_name = heapless::String::new();
        // Fits: "Multimeter" is 10 bytes.
        let _ = device_name.push_str("Multimeter");
        Self {
            device_name,
            advertising_interval: 160, // 100 ms
            min_conn_interval: 80,     // 100 ms
            max_conn_interval: 800,    // 1 s
            slave_latency: 0,
            supervision_timeout: 1000, // 10 s
            tx_power_dbm: 0,
        }
    }
}

impl AdvertisingConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.device_name.is_empty() {
            return Err(ConfigError::ValidationFailed("device_name"));
        }
        if self.advertising_interval == 0 {
            return Err(ConfigError::ValidationFailed("advertising_interval"));
        }
        if self.min_conn_interval == 0 || self.min_conn_interval > self.max_conn_interval {
            return Err(ConfigError::ValidationFailed("conn_interval"));
        }
        if self.supervision_timeout == 0 {
            return Err(ConfigError::ValidationFailed("supervision_timeout"));
        }
        Ok(())
    }
}
