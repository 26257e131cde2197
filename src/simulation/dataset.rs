//! # Dataset Generator
//!
//! Fabricates the filter-degradation dataset offline: `days * samples_per_day`
//! rows, one per operating hour, with raw and treated values for every channel.
//! The daily decay constant is spread over 24 hours, so consecutive rows fade
//! gently rather than by a full day's worth.

use serde::Serialize;
use std::io::Write;

use super::{decay, efficiency::calibrate_channels, ConfigurationError};
use crate::domain::{ChannelId, ChannelModel};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DatasetSpec {
    pub days: u32,
    pub samples_per_day: u32,
    pub daily_decay_rate: f64,
}

impl Default for DatasetSpec {
    fn default() -> Self {
        Self {
            days: 30,
            samples_per_day: 8,
            daily_decay_rate: 0.05,
        }
    }
}

impl DatasetSpec {
    pub fn hourly_decay_rate(&self) -> f64 {
        self.daily_decay_rate / 24.0
    }

    pub fn total_samples(&self) -> Result<u32, ConfigurationError> {
        self.days
            .checked_mul(self.samples_per_day)
            .ok_or(ConfigurationError::DatasetTooLarge {
                days: self.days,
                samples_per_day: self.samples_per_day,
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChannelSample {
    pub channel: ChannelId,
    pub raw: f64,
    pub treated: f64,
    pub efficiency: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetRow {
    /// 1-based day of filter use
    pub day: u32,
    /// 1-based sample within the day
    pub sample_in_day: u32,
    /// 0-based operating hour of the filter
    pub operating_hour: u32,
    pub samples: Vec<ChannelSample>,
    /// Mean efficiency over all channels, in percent
    pub mean_efficiency_percent: f64,
}

pub fn generate(model: &ChannelModel, spec: &DatasetSpec) -> Result<Vec<DatasetRow>, ConfigurationError> {
    if !spec.daily_decay_rate.is_finite() || spec.daily_decay_rate < 0.0 {
        return Err(ConfigurationError::InvalidDecayRate(spec.daily_decay_rate));
    }
    let total = spec.total_samples()?;
    let channels = calibrate_channels(model)?;
    let rate = spec.hourly_decay_rate();

    let rows = (0..total)
        .map(|hour| {
            let samples: Vec<ChannelSample> = channels
                .iter()
                .map(|channel| {
                    let efficiency =
                        decay::current_efficiency(channel.initial_efficiency(), rate, hour as f64);
                    ChannelSample {
                        channel: channel.id(),
                        raw: channel.baseline(),
                        treated: channel.baseline() * (1.0 - efficiency),
                        efficiency,
                    }
                })
                .collect();
            let mean = samples.iter().map(|s| s.efficiency).sum::<f64>() / samples.len() as f64;

            DatasetRow {
                day: hour / spec.samples_per_day + 1,
                sample_in_day: hour % spec.samples_per_day + 1,
                operating_hour: hour,
                samples,
                mean_efficiency_percent: mean * 100.0,
            }
        })
        .collect();

    Ok(rows)
}

/// One CSV line: an `in_*`/`out_*` column pair per channel
#[derive(Debug, Serialize)]
struct CsvRecord {
    day: u32,
    sample_in_day: u32,
    operating_hour: u32,
    in_ph: f64,
    out_ph: f64,
    in_temperature: f64,
    out_temperature: f64,
    in_turbidity: f64,
    out_turbidity: f64,
    in_conductivity: f64,
    out_conductivity: f64,
    efficiency_percent: f64,
}

impl From<&DatasetRow> for CsvRecord {
    fn from(row: &DatasetRow) -> Self {
        let pair = |id: ChannelId| {
            row.samples
                .iter()
                .find(|s| s.channel == id)
                .map_or((f64::NAN, f64::NAN), |s| (s.raw, s.treated))
        };
        let (in_ph, out_ph) = pair(ChannelId::Ph);
        let (in_temperature, out_temperature) = pair(ChannelId::Temperature);
        let (in_turbidity, out_turbidity) = pair(ChannelId::Turbidity);
        let (in_conductivity, out_conductivity) = pair(ChannelId::Conductivity);

        Self {
            day: row.day,
            sample_in_day: row.sample_in_day,
            operating_hour: row.operating_hour,
            in_ph,
            out_ph,
            in_temperature,
            out_temperature,
            in_turbidity,
            out_turbidity,
            in_conductivity,
            out_conductivity,
            efficiency_percent: row.mean_efficiency_percent,
        }
    }
}

/// Serialize rows to CSV, header included
pub fn write_csv<W: Write>(rows: &[DatasetRow], out: W) -> Result<(), csv::Error> {
    let mut writer = csv::Writer::from_writer(out);
    for row in rows {
        writer.serialize(CsvRecord::from(row))?;
    }
    writer.flush()?;
    Ok(())
}

pub fn to_csv(rows: &[DatasetRow]) -> Result<Vec<u8>, csv::Error> {
    let mut buf = Vec::new();
    write_csv(rows, &mut buf)?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_count_and_indices() {
        let rows = generate(&ChannelModel::default(), &DatasetSpec::default()).unwrap();
        assert_eq!(rows.len(), 240);
        assert_eq!((rows[0].day, rows[0].sample_in_day, rows[0].operating_hour), (1, 1, 0));
        assert_eq!((rows[8].day, rows[8].sample_in_day), (2, 1));
        assert_eq!(rows[239].day, 30);
        assert_eq!(rows[239].sample_in_day, 8);
    }

    #[test]
    fn test_first_row_matches_targets() {
        let rows = generate(&ChannelModel::default(), &DatasetSpec::default()).unwrap();
        let ph = rows[0].samples[0];
        assert_eq!(ph.channel, ChannelId::Ph);
        assert_eq!(ph.raw, 10.45);
        assert!((ph.treated - 7.89).abs() < 1e-9);
    }

    #[test]
    fn test_mean_efficiency_declines() {
        let rows = generate(&ChannelModel::default(), &DatasetSpec::default()).unwrap();
        assert!(rows
            .windows(2)
            .all(|w| w[1].mean_efficiency_percent < w[0].mean_efficiency_percent));
    }

    #[test]
    fn test_invalid_inputs() {
        let spec = DatasetSpec {
            daily_decay_rate: -1.0,
            ..Default::default()
        };
        assert!(generate(&ChannelModel::default(), &spec).is_err());

        let mut model = ChannelModel::default();
        model.turbidity.baseline = 0.0;
        assert!(generate(&model, &DatasetSpec::default()).is_err());
    }

    #[test]
    fn test_sample_count_overflow_is_rejected() {
        let spec = DatasetSpec {
            days: u32::MAX,
            samples_per_day: 2,
            ..Default::default()
        };
        assert_eq!(
            spec.total_samples(),
            Err(ConfigurationError::DatasetTooLarge {
                days: u32::MAX,
                samples_per_day: 2,
            })
        );
        assert!(matches!(
            generate(&ChannelModel::default(), &spec),
            Err(ConfigurationError::DatasetTooLarge { .. })
        ));
        assert_eq!(DatasetSpec::default().total_samples(), Ok(240));
    }

    #[test]
    fn test_csv_layout() {
        let spec = DatasetSpec {
            days: 1,
            samples_per_day: 2,
            ..Default::default()
        };
        let csv = String::from_utf8(to_csv(&generate(&ChannelModel::default(), &spec).unwrap()).unwrap()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[0],
            "day,sample_in_day,operating_hour,in_ph,out_ph,in_temperature,out_temperature,in_turbidity,out_turbidity,in_conductivity,out_conductivity,efficiency_percent"
        );
        assert!(lines[1].starts_with("1,1,0,10.45,"));
        assert_eq!(lines[2].split(',').count(), 12);
    }

    #[test]
    fn test_csv_of_no_rows_is_empty() {
        assert!(to_csv(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_csv_write_error_is_reported() {
        struct Broken;
        impl Write for Broken {
            fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
                Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed"))
            }
            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let rows = generate(&ChannelModel::default(), &DatasetSpec::default()).unwrap();
        let err = write_csv(&rows, Broken).unwrap_err();
        assert!(err.is_io_error());
    }
}
