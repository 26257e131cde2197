//! # Efficiency Calculator
//!
//! Derives each channel's initial treatment efficiency `1 - target / baseline`.
//! Runs once when a simulation starts, never per tick.

use super::ConfigurationError;
use crate::domain::{Channel, ChannelId, ChannelModel, ChannelSpec};

/// Initial efficiency of a single channel
pub fn initial_efficiency(channel: ChannelId, spec: &ChannelSpec) -> Result<f64, ConfigurationError> {
    if !spec.baseline.is_finite() || !spec.target.is_finite() {
        return Err(ConfigurationError::NonFiniteConstant { channel });
    }
    if spec.baseline == 0.0 {
        return Err(ConfigurationError::DivisionByZero { channel });
    }
    if spec.baseline < 0.0 {
        return Err(ConfigurationError::NonPositiveBaseline {
            channel,
            baseline: spec.baseline,
        });
    }
    if spec.target < 0.0 {
        return Err(ConfigurationError::NegativeTarget {
            channel,
            target: spec.target,
        });
    }

    Ok(1.0 - spec.target / spec.baseline)
}

/// Build the four runtime channels, failing on the first invalid one.
///
/// Nothing is returned unless every channel is valid, so a caller never
/// holds a partially calibrated set.
pub fn calibrate_channels(model: &ChannelModel) -> Result<[Channel; 4], ConfigurationError> {
    let mut efficiencies = [0.0; 4];
    for (i, (id, spec)) in model.entries().iter().enumerate() {
        efficiencies[i] = initial_efficiency(*id, spec)?;
    }

    Ok(ChannelId::ALL.map(|id| Channel::new(id, model.spec(id), efficiencies[id.index()])))
}
