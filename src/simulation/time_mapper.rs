//! # Time Mapper
//!
//! Converts elapsed wall-clock time into a simulated-day coordinate under a
//! [`CompressionProfile`], clamped to [`HORIZON_DAYS`].

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use super::{ConfigurationError, SimulationError};

/// Last simulated day; readings freeze once it is reached
pub const HORIZON_DAYS: f64 = 30.0;

pub const SECONDS_PER_DAY: f64 = 86_400.0;

/// Real duration of the default compressed demo
pub const DEFAULT_COMPRESSED_WINDOW: Duration = Duration::from_secs(30 * 60);

/// How real elapsed time maps onto simulated days
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CompressionProfile {
    /// One real day is one simulated day
    RealTime,
    /// The whole horizon is played back in `real_duration_for_horizon`
    Compressed { real_duration_for_horizon: Duration },
}

impl Default for CompressionProfile {
    fn default() -> Self {
        CompressionProfile::Compressed {
            real_duration_for_horizon: DEFAULT_COMPRESSED_WINDOW,
        }
    }
}

impl CompressionProfile {
    pub fn compressed(real_duration_for_horizon: Duration) -> Self {
        CompressionProfile::Compressed {
            real_duration_for_horizon,
        }
    }

    pub fn horizon_days(&self) -> f64 {
        HORIZON_DAYS
    }

    pub fn kind(&self) -> ProfileKind {
        match self {
            CompressionProfile::RealTime => ProfileKind::RealTime,
            CompressionProfile::Compressed { .. } => ProfileKind::Compressed,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        match self {
            CompressionProfile::RealTime => Ok(()),
            CompressionProfile::Compressed {
                real_duration_for_horizon,
            } if real_duration_for_horizon.is_zero() => Err(ConfigurationError::MalformedProfile(
                "compressed window must be longer than zero".to_string(),
            )),
            CompressionProfile::Compressed { .. } => Ok(()),
        }
    }

    /// Simulated day for an elapsed duration, always in `[0, HORIZON_DAYS]`
    pub fn simulated_day(&self, elapsed: Duration) -> f64 {
        let day = match self {
            CompressionProfile::RealTime => elapsed.as_secs_f64() / SECONDS_PER_DAY,
            CompressionProfile::Compressed {
                real_duration_for_horizon,
            } => {
                let window = real_duration_for_horizon.as_secs_f64();
                if window <= 0.0 {
                    return HORIZON_DAYS;
                }
                (elapsed.as_secs_f64() / window) * HORIZON_DAYS
            }
        };

        day.clamp(0.0, HORIZON_DAYS)
    }

    pub fn is_saturated(&self, elapsed: Duration) -> bool {
        self.simulated_day(elapsed) >= HORIZON_DAYS
    }

    /// Short label for the display and status page
    pub fn label(&self) -> String {
        match self {
            CompressionProfile::RealTime => format!("DEMO {} DAYS", HORIZON_DAYS as u32),
            CompressionProfile::Compressed {
                real_duration_for_horizon,
            } => {
                let secs = real_duration_for_horizon.as_secs();
                if secs >= 60 && secs % 60 == 0 {
                    format!("DEMO {} MIN", secs / 60)
                } else {
                    format!("DEMO {} S", secs)
                }
            }
        }
    }
}

/// Profile selector as written in configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileKind {
    RealTime,
    Compressed,
}

/// Time elapsed from `start` to `now`.
///
/// A time source that went backwards is reported as
/// [`SimulationError::ClockRegression`] instead of saturating to zero.
pub fn elapsed_since(start: Instant, now: Instant) -> Result<Duration, SimulationError> {
    now.checked_duration_since(start)
        .ok_or_else(|| SimulationError::ClockRegression {
            behind: start.duration_since(now),
        })
}
