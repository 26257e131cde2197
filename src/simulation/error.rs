use std::time::Duration;
use thiserror::Error;

use crate::domain::ChannelId;

/// Reasons a simulation refuses to start
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigurationError {
    #[error("division by zero: {channel} baseline is 0")]
    DivisionByZero { channel: ChannelId },

    #[error("{channel} baseline must be positive, got {baseline}")]
    NonPositiveBaseline { channel: ChannelId, baseline: f64 },

    #[error("{channel} target must not be negative, got {target}")]
    NegativeTarget { channel: ChannelId, target: f64 },

    #[error("{channel} constants must be finite")]
    NonFiniteConstant { channel: ChannelId },

    #[error("decay rate must be finite and non-negative, got {0}")]
    InvalidDecayRate(f64),

    #[error("malformed compression profile: {0}")]
    MalformedProfile(String),

    #[error("dataset of {days} days at {samples_per_day} samples per day does not fit in u32")]
    DatasetTooLarge { days: u32, samples_per_day: u32 },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimulationError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(#[from] ConfigurationError),

    /// The time source went backwards; the tick is skipped
    #[error("clock regression: now is {behind:?} before the last evaluation")]
    ClockRegression { behind: Duration },
}

impl SimulationError {
    /// Fatal errors stop the simulation from starting; the rest only skip a tick
    pub fn is_fatal(&self) -> bool {
        matches!(self, SimulationError::InvalidConfiguration(_))
    }
}
