//! # Decay Evaluator
//!
//! Treatment efficiency fades exponentially with simulated time:
//!
//! ```text
//! efficiency(t) = initial_efficiency * exp(-decay_rate * t)
//! value(t)      = baseline * (1 - efficiency(t))
//! ```
//!
//! At `t = 0` a channel reads its target; as `t` grows it drifts back to its
//! untreated baseline.

use crate::domain::{Channel, ReadingSet};

/// Treatment efficiency left after `simulated_day` days
pub fn current_efficiency(initial_efficiency: f64, decay_rate: f64, simulated_day: f64) -> f64 {
    initial_efficiency * (-decay_rate * simulated_day).exp()
}

/// Channel reading after `simulated_day` days
pub fn decayed_value(baseline: f64, initial_efficiency: f64, decay_rate: f64, simulated_day: f64) -> f64 {
    baseline * (1.0 - current_efficiency(initial_efficiency, decay_rate, simulated_day))
}

/// Evaluate every channel at `simulated_day`, store the new values and
/// return the resulting reading set.
pub fn evaluate(channels: &mut [Channel; 4], decay_rate: f64, simulated_day: f64) -> ReadingSet {
    let mut values = [0.0; 4];
    for channel in channels.iter_mut() {
        let value = decayed_value(
            channel.baseline(),
            channel.initial_efficiency(),
            decay_rate,
            simulated_day,
        );
        channel.set_current_value(value);
        values[channel.id().index()] = value;
    }

    ReadingSet::from_channel_values(values)
}
