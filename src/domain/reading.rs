use serde::{Deserialize, Serialize};

use super::ChannelId;

/// Conversion from conductivity (µS/cm) to total dissolved solids (ppm)
pub const TDS_FACTOR: f64 = 0.5;

/// One published set of water quality readings.
///
/// `tds_ppm` is derived from conductivity on construction and cannot be set
/// independently.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ReadingSet {
    ph: f64,
    temperature_c: f64,
    turbidity_ntu: f64,
    conductivity_us_cm: f64,
    tds_ppm: f64,
}

impl ReadingSet {
    pub fn new(ph: f64, temperature_c: f64, turbidity_ntu: f64, conductivity_us_cm: f64) -> Self {
        Self {
            ph,
            temperature_c,
            turbidity_ntu,
            conductivity_us_cm,
            tds_ppm: conductivity_us_cm * TDS_FACTOR,
        }
    }

    /// Build from values ordered like [`ChannelId::ALL`]
    pub fn from_channel_values(values: [f64; 4]) -> Self {
        Self::new(values[0], values[1], values[2], values[3])
    }

    pub fn ph(&self) -> f64 {
        self.ph
    }

    pub fn temperature_c(&self) -> f64 {
        self.temperature_c
    }

    pub fn turbidity_ntu(&self) -> f64 {
        self.turbidity_ntu
    }

    pub fn conductivity_us_cm(&self) -> f64 {
        self.conductivity_us_cm
    }

    pub fn tds_ppm(&self) -> f64 {
        self.tds_ppm
    }

    pub fn value(&self, channel: ChannelId) -> f64 {
        match channel {
            ChannelId::Ph => self.ph,
            ChannelId::Temperature => self.temperature_c,
            ChannelId::Turbidity => self.turbidity_ntu,
            ChannelId::Conductivity => self.conductivity_us_cm,
        }
    }
}

/// Overall water quality verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaterQuality {
    Good,
    Fair,
    Poor,
}

impl WaterQuality {
    pub const MAX_TURBIDITY_NTU: f64 = 500.0;
    pub const PH_RANGE: (f64, f64) = (6.5, 8.5);
    pub const CONDUCTIVITY_RANGE_US_CM: (f64, f64) = (50.0, 800.0);
    pub const MAX_TDS_PPM: f64 = 300.0;

    /// Number of the four acceptance checks a reading set passes
    pub fn passing_checks(readings: &ReadingSet) -> u8 {
        let turbidity_ok = readings.turbidity_ntu() < Self::MAX_TURBIDITY_NTU;
        let ph_ok = (Self::PH_RANGE.0..=Self::PH_RANGE.1).contains(&readings.ph());
        let conductivity_ok = (Self::CONDUCTIVITY_RANGE_US_CM.0..=Self::CONDUCTIVITY_RANGE_US_CM.1)
            .contains(&readings.conductivity_us_cm());
        let tds_ok = readings.tds_ppm() < Self::MAX_TDS_PPM;

        [turbidity_ok, ph_ok, conductivity_ok, tds_ok]
            .iter()
            .filter(|ok| **ok)
            .count() as u8
    }

    pub fn assess(readings: &ReadingSet) -> Self {
        match Self::passing_checks(readings) {
            n if n >= 3 => WaterQuality::Good,
            2 => WaterQuality::Fair,
            _ => WaterQuality::Poor,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            WaterQuality::Good => "GOOD",
            WaterQuality::Fair => "FAIR",
            WaterQuality::Poor => "POOR",
        }
    }
}

impl std::fmt::Display for WaterQuality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tds_derived_from_conductivity() {
        let readings = ReadingSet::new(7.0, 20.0, 100.0, 640.0);
        assert_eq!(readings.tds_ppm(), 320.0);
        assert_eq!(readings.value(ChannelId::Conductivity), 640.0);
    }

    #[test]
    fn test_quality_good() {
        // turbidity, pH, conductivity and tds all pass
        let readings = ReadingSet::new(7.2, 20.0, 10.0, 400.0);
        assert_eq!(WaterQuality::passing_checks(&readings), 4);
        assert_eq!(WaterQuality::assess(&readings), WaterQuality::Good);
    }

    #[test]
    fn test_quality_fair() {
        // only turbidity and pH pass
        let readings = ReadingSet::new(7.9, 20.0, 184.0, 1729.0);
        assert_eq!(WaterQuality::passing_checks(&readings), 2);
        assert_eq!(WaterQuality::assess(&readings), WaterQuality::Fair);
    }

    #[test]
    fn test_quality_poor() {
        let readings = ReadingSet::new(10.45, 20.8, 900.0, 1729.0);
        assert_eq!(WaterQuality::passing_checks(&readings), 0);
        assert_eq!(WaterQuality::assess(&readings), WaterQuality::Poor);
        assert_eq!(WaterQuality::Poor.to_string(), "POOR");
    }
}
