//! Measurement ADC driver.
//!
//! Captures a batch of raw codes from the conditioned front-end output and
//! converts them to calibrated microvolts.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: ADC1 oneshot unit plus a curve-fitting calibration scheme,
//! both created on [`open`](AdcDriver::open) and deleted on
//! [`close`](AdcDriver::close) so the converter is unpowered while idle.
//! On host/test: reads the input voltage from a static `AtomicU32`.

#[cfg(not(target_os = "espidf"))]
use core::sync::atomic::{AtomicU32, Ordering};

use crate::error::{AcquisitionError, HardwareError};

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
use crate::pins;

#[cfg(not(target_os = "espidf"))]
static SIM_ADC_MICROVOLTS: AtomicU32 = AtomicU32::new(0);

/// Set the voltage the simulated front end reports.
#[cfg(not(target_os = "espidf"))]
pub fn sim_set_microvolts(uv: u32) {
    SIM_ADC_MICROVOLTS.store(uv, Ordering::Relaxed);
}

#[cfg(not(target_os = "espidf"))]
pub fn sim_microvolts() -> u32 {
    SIM_ADC_MICROVOLTS.load(Ordering::Relaxed)
}

// ── ESP-IDF ───────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
pub struct AdcDriver {
    unit: adc_oneshot_unit_handle_t,
    cali: adc_cali_handle_t,
}

#[cfg(target_os = "espidf")]
impl AdcDriver {
    pub fn new() -> Self {
        Self {
            unit: core::ptr::null_mut(),
            cali: core::ptr::null_mut(),
        }
    }

    pub fn is_open(&self) -> bool {
        !self.unit.is_null()
    }

    pub fn open(&mut self) -> Result<(), HardwareError> {
        if self.is_open() {
            return Ok(());
        }
        let init_cfg = adc_oneshot_unit_init_cfg_t {
            unit_id: adc_unit_t_ADC_UNIT_1,
            ulp_mode: adc_ulp_mode_t_ADC_ULP_MODE_DISABLE,
            ..Default::default()
        };
        // SAFETY: `unit` is owned by this driver and only touched from the
        // application task.
        let ret = unsafe { adc_oneshot_new_unit(&init_cfg, &mut self.unit) };
        if ret != ESP_OK as i32 {
            log::error!("adc: unit init failed (rc={})", ret);
            self.unit = core::ptr::null_mut();
            return Err(HardwareError::AdcOpenFailed);
        }

        let chan_cfg = adc_oneshot_chan_cfg_t {
            atten: adc_atten_t_ADC_ATTEN_DB_12,
            bitwidth: adc_bitwidth_t_ADC_BITWIDTH_12,
        };
        let ret = unsafe {
            adc_oneshot_config_channel(self.unit, pins::MEASURE_ADC_CHANNEL, &chan_cfg)
        };
        if ret != ESP_OK as i32 {
            log::error!("adc: channel config failed (rc={})", ret);
            self.close();
            return Err(HardwareError::AdcOpenFailed);
        }

        let cali_cfg = adc_cali_curve_fitting_config_t {
            unit_id: adc_unit_t_ADC_UNIT_1,
            chan: pins::MEASURE_ADC_CHANNEL,
            atten: adc_atten_t_ADC_ATTEN_DB_12,
            bitwidth: adc_bitwidth_t_ADC_BITWIDTH_12,
        };
        let ret = unsafe { adc_cali_create_scheme_curve_fitting(&cali_cfg, &mut self.cali) };
        if ret != ESP_OK as i32 {
            log::error!("adc: calibration scheme unavailable (rc={})", ret);
            self.cali = core::ptr::null_mut();
            self.close();
            return Err(HardwareError::AdcOpenFailed);
        }

        log::info!("adc: ADC1 CH{} open (12 dB, curve fitting)", pins::MEASURE_ADC_CHANNEL);
        Ok(())
    }

    pub fn close(&mut self) {
        // SAFETY: handles are either null or were created by `open`.
        unsafe {
            if !self.cali.is_null() {
                adc_cali_delete_scheme_curve_fitting(self.cali);
                self.cali = core::ptr::null_mut();
            }
            if !self.unit.is_null() {
                adc_oneshot_del_unit(self.unit);
                self.unit = core::ptr::null_mut();
            }
        }
    }

    /// Oneshot reads complete before `convert` returns, so there is never
    /// a conversion in flight to abort.
    pub fn cancel(&mut self) {}

    pub fn convert(&mut self, raw: &mut [u16]) -> Result<(), AcquisitionError> {
        if !self.is_open() {
            return Err(AcquisitionError::ConversionFailed);
        }
        for slot in raw.iter_mut() {
            let mut code: i32 = 0;
            let ret = unsafe { adc_oneshot_read(self.unit, pins::MEASURE_ADC_CHANNEL, &mut code) };
            if ret != ESP_OK as i32 {
                return Err(AcquisitionError::ConversionFailed);
            }
            *slot = code.max(0) as u16;
        }
        Ok(())
    }

    pub fn to_microvolts(
        &mut self,
        raw: &[u16],
        microvolts: &mut [u32],
    ) -> Result<(), AcquisitionError> {
        if self.cali.is_null() {
            return Err(AcquisitionError::CalibrationFailed);
        }
        for (code, uv) in raw.iter().zip(microvolts.iter_mut()) {
            let mut mv: i32 = 0;
            let ret = unsafe { adc_cali_raw_to_voltage(self.cali, i32::from(*code), &mut mv) };
            if ret != ESP_OK as i32 {
                return Err(AcquisitionError::CalibrationFailed);
            }
            *uv = (mv.max(0) as u32).saturating_mul(1000);
        }
        Ok(())
    }
}

// ── Host simulation ───────────────────────────────────────────

/// Simulated converter: raw codes are millivolts, calibration is exact.
#[cfg(not(target_os = "espidf"))]
pub struct AdcDriver {
    open: bool,
}

#[cfg(not(target_os = "espidf"))]
impl AdcDriver {
    pub fn new() -> Self {
        Self { open: false }
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn open(&mut self) -> Result<(), HardwareError> {
        self.open = true;
        log::info!("adc(sim): open");
        Ok(())
    }

    pub fn close(&mut self) {
        if self.open {
            log::info!("adc(sim): closed");
        }
        self.open = false;
    }

    pub fn cancel(&mut self) {}

    pub fn convert(&mut self, raw: &mut [u16]) -> Result<(), AcquisitionError> {
        if !self.open {
            return Err(AcquisitionError::ConversionFailed);
        }
        let mv = (sim_microvolts() / 1000).min(u32::from(u16::MAX)) as u16;
        raw.fill(mv);
        Ok(())
    }

    pub fn to_microvolts(
        &mut self,
        raw: &[u16],
        microvolts: &mut [u32],
    ) -> Result<(), AcquisitionError> {
        for (code, uv) in raw.iter().zip(microvolts.iter_mut()) {
            *uv = u32::from(*code) * 1000;
        }
        Ok(())
    }
}

impl Default for AdcDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(target_os = "espidf")]
impl Drop for AdcDriver {
    fn drop(&mut self) {
        self.close();
    }
}
