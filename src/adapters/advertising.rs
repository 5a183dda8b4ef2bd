//! Advertising and scan-response payloads.
//!
//! Both are built once from [`AdvertisingConfig`] and handed to the stack
//! when advertising starts.  Each AD structure is `len, type, data...`
//! where `len` counts the type byte plus the data.

use crate::config::AdvertisingConfig;
use crate::error::ConfigError;

/// Legacy advertising PDU payload limit.
pub const MAX_ADV_LEN: usize = 31;

/// Multimeter primary service.
pub const SERVICE_UUID: u16 = 0xFFF0;
/// Mode characteristic (1 byte, read/write).
pub const CHAR_MODE_UUID: u16 = 0xFFF1;
/// Measurement characteristic (4 bytes big-endian, read/notify).
pub const CHAR_MEASUREMENT_UUID: u16 = 0xFFF4;

pub type AdvPayload = heapless::Vec<u8, MAX_ADV_LEN>;

// AD types (Core Supplement, part A)
const AD_FLAGS: u8 = 0x01;
const AD_UUID16_INCOMPLETE: u8 = 0x02;
const AD_NAME_COMPLETE: u8 = 0x09;
const AD_TX_POWER: u8 = 0x0A;
const AD_CONN_INTERVAL_RANGE: u8 = 0x12;

const FLAG_LE_GENERAL_DISC: u8 = 0x02;
const FLAG_BREDR_NOT_SUPPORTED: u8 = 0x04;

fn push_field(out: &mut AdvPayload, ad_type: u8, data: &[u8]) -> Result<(), ConfigError> {
    let len = u8::try_from(data.len() + 1).map_err(|_| ConfigError::ValidationFailed("adv_payload"))?;
    out.push(len)
        .and_then(|()| out.push(ad_type))
        .map_err(|_| ConfigError::ValidationFailed("adv_payload"))?;
    out.extend_from_slice(data)
        .map_err(|()| ConfigError::ValidationFailed("adv_payload"))
}

/// Flags (general discoverable, no BR/EDR) plus our service UUID.
pub fn advertising_data() -> Result<AdvPayload, ConfigError> {
    let mut out = AdvPayload::new();
    push_field(
        &mut out,
        AD_FLAGS,
        &[FLAG_LE_GENERAL_DISC | FLAG_BREDR_NOT_SUPPORTED],
    )?;
    push_field(&mut out, AD_UUID16_INCOMPLETE, &SERVICE_UUID.to_le_bytes())?;
    Ok(out)
}

/// Complete local name, preferred connection interval range, tx power.
pub fn scan_response_data(cfg: &AdvertisingConfig) -> Result<AdvPayload, ConfigError> {
    let mut out = AdvPayload::new();
    push_field(&mut out, AD_NAME_COMPLETE, cfg.device_name.as_bytes())?;

    let min = cfg.min_conn_interval.to_le_bytes();
    let max = cfg.max_conn_interval.to_le_bytes();
    push_field(&mut out, AD_CONN_INTERVAL_RANGE, &[min[0], min[1], max[0], max[1]])?;

    push_field(&mut out, AD_TX_POWER, &cfg.tx_power_dbm.to_le_bytes())?;
    Ok(out)
}
