//! Voltage to engineering-unit conversions for the analog probes.

use serde::{Deserialize, Serialize};

pub const ADC_REFERENCE_V: f64 = 3.3;
pub const ADC_FULL_SCALE: f64 = 4095.0;

pub const MAX_TURBIDITY_NTU: f64 = 4550.0;
pub const MAX_CONDUCTIVITY_US_CM: f64 = 5000.0;
/// Below this the conductivity probe is considered dry
pub const CONDUCTIVITY_FLOOR_V: f64 = 0.1;

/// Probe calibration constants
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Calibration {
    pub ph_offset: f64,
    /// Volts per pH unit
    pub ph_slope: f64,
    pub conductivity_offset: f64,
    /// µS/cm at full-scale voltage
    pub conductivity_factor: f64,
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            ph_offset: 0.0,
            ph_slope: 3.5,
            conductivity_offset: 0.0,
            conductivity_factor: 1000.0,
        }
    }
}

pub fn raw_to_voltage(raw: u16) -> f64 {
    raw as f64 * (ADC_REFERENCE_V / ADC_FULL_SCALE)
}

/// Integer linear re-mapping, truncating like the microcontroller `map()`
pub(crate) fn map_range(x: i64, in_min: i64, in_max: i64, out_min: i64, out_max: i64) -> i64 {
    (x - in_min) * (out_max - out_min) / (in_max - in_min) + out_min
}

/// Turbidity (NTU) from the TSW-20M output voltage.
///
/// Piecewise-linear over centivolt bands; a clearer sample gives a higher
/// voltage.
pub fn turbidity_ntu(voltage: f64) -> f64 {
    let cv = (voltage * 100.0) as i64;
    let ntu = if voltage >= 3.0 {
        map_range(cv, 300, 330, 0, 100)
    } else if voltage >= 2.5 {
        map_range(cv, 250, 300, 100, 500)
    } else if voltage >= 2.0 {
        map_range(cv, 200, 250, 500, 1000)
    } else if voltage >= 1.5 {
        map_range(cv, 150, 200, 1000, 2000)
    } else if voltage >= 1.0 {
        map_range(cv, 100, 150, 2000, 3000)
    } else {
        map_range(cv, 0, 100, 3000, 4550)
    };

    (ntu as f64).clamp(0.0, MAX_TURBIDITY_NTU)
}

pub fn ph(voltage: f64, cal: &Calibration) -> f64 {
    (7.0 + (2.5 - voltage) / cal.ph_slope + cal.ph_offset).clamp(0.0, 14.0)
}

/// Temperature of a 10 mV/°C probe with a 500 mV offset
pub fn temperature_c(voltage: f64) -> f64 {
    (voltage - 0.5) * 100.0
}

pub fn conductivity_us_cm(voltage: f64, cal: &Calibration) -> f64 {
    if voltage < CONDUCTIVITY_FLOOR_V {
        return 0.0;
    }
    ((voltage / ADC_REFERENCE_V) * cal.conductivity_factor + cal.conductivity_offset)
        .clamp(0.0, MAX_CONDUCTIVITY_US_CM)
}
