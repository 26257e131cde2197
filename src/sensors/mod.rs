//! # Sensor Front End
//!
//! Live readings for normal mode: averaged ADC conversions turned into
//! engineering units by [`conversion`].

pub mod adc;
pub mod conversion;

pub use adc::{
    average_raw, AnalogInput, AnalogPin, MockAnalogInput, SensorError, SimulatedAnalogInput,
    SimulatedProbeConfig,
};
pub use conversion::Calibration;

use std::sync::Arc;
use tokio::time::Duration;
use tracing::debug;

use crate::domain::ReadingSet;

pub const SAMPLES_PER_READING: usize = 10;

pub struct SensorArray {
    input: Arc<dyn AnalogInput>,
    calibration: Calibration,
    sample_spacing: Duration,
}

impl SensorArray {
    pub fn new(input: Arc<dyn AnalogInput>, calibration: Calibration, sample_spacing: Duration) -> Self {
        Self {
            input,
            calibration,
            sample_spacing,
        }
    }

    /// Poll every probe once and convert to a reading set
    pub async fn read(&self) -> Result<ReadingSet, SensorError> {
        let input = self.input.as_ref();

        let turbidity_raw =
            average_raw(input, AnalogPin::Turbidity, SAMPLES_PER_READING, self.sample_spacing).await?;
        let turbidity_v = conversion::raw_to_voltage(turbidity_raw);
        let turbidity = conversion::turbidity_ntu(turbidity_v);

        let ph_raw = average_raw(input, AnalogPin::Ph, SAMPLES_PER_READING, self.sample_spacing).await?;
        let ph_v = conversion::raw_to_voltage(ph_raw);
        let ph = conversion::ph(ph_v, &self.calibration);

        // the temperature output shares the pH board and is read once
        let temperature_raw = input.read_raw(AnalogPin::Temperature).await?;
        let temperature = conversion::temperature_c(conversion::raw_to_voltage(temperature_raw));

        let conductivity_raw =
            average_raw(input, AnalogPin::Conductivity, SAMPLES_PER_READING, self.sample_spacing).await?;
        let conductivity_v = conversion::raw_to_voltage(conductivity_raw);
        let conductivity = conversion::conductivity_us_cm(conductivity_v, &self.calibration);

        let readings = ReadingSet::new(ph, temperature, turbidity, conductivity);
        debug!(
            turbidity_raw,
            turbidity_v,
            ph_raw,
            ph_v,
            temperature_raw,
            conductivity_raw,
            conductivity_v,
            ph = readings.ph(),
            turbidity_ntu = readings.turbidity_ntu(),
            conductivity_us_cm = readings.conductivity_us_cm(),
            tds_ppm = readings.tds_ppm(),
            temperature_c = readings.temperature_c(),
            "sensor read"
        );

        Ok(readings)
    }
}
