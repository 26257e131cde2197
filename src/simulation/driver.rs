//! # Simulation Driver
//!
//! Owns all demo-mode state and advances it from an external `tick(now)`.
//!
//! ```text
//! Idle --start--> Running --simulated day reaches horizon--> Saturated
//!   ^                |                                           |
//!   +-----reset------+-------------------reset-------------------+
//! ```
//!
//! Saturated keeps ticking on the poll cadence but every tick returns the
//! horizon readings.

use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use super::{
    decay, efficiency::calibrate_channels, time_mapper::elapsed_since, CompressionProfile,
    ConfigurationError, SimulationError, HORIZON_DAYS,
};
use crate::domain::{Channel, ChannelModel, ReadingSet};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SimulationPhase {
    Idle,
    Running,
    Saturated,
}

/// Wall-clock anchors of a running simulation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulationClock {
    pub start_time: Instant,
    pub last_tick_time: Instant,
}

#[derive(Debug, Clone)]
struct ActiveRun {
    channels: [Channel; 4],
    decay_rate: f64,
    profile: CompressionProfile,
    clock: SimulationClock,
    simulated_day: f64,
    readings: ReadingSet,
}

#[derive(Debug, Clone)]
pub struct SimulationDriver {
    poll_interval: Duration,
    run: Option<ActiveRun>,
}

impl Default for SimulationDriver {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL)
    }
}

impl SimulationDriver {
    pub fn new(poll_interval: Duration) -> Self {
        Self {
            poll_interval,
            run: None,
        }
    }

    /// Calibrate channels and anchor the clock at `now`.
    ///
    /// On error the driver keeps whatever state it had before the call.
    /// Starting while already running restarts from day 0.
    pub fn start_simulation(
        &mut self,
        model: &ChannelModel,
        decay_rate: f64,
        profile: CompressionProfile,
        now: Instant,
    ) -> Result<(), SimulationError> {
        if !decay_rate.is_finite() || decay_rate < 0.0 {
            return Err(ConfigurationError::InvalidDecayRate(decay_rate).into());
        }
        profile.validate()?;
        let mut channels = calibrate_channels(model)?;

        for channel in &channels {
            info!(
                channel = %channel.id(),
                initial_efficiency = channel.initial_efficiency(),
                "channel calibrated"
            );
        }

        let readings = decay::evaluate(&mut channels, decay_rate, 0.0);
        self.run = Some(ActiveRun {
            channels,
            decay_rate,
            profile,
            clock: SimulationClock {
                start_time: now,
                last_tick_time: now,
            },
            simulated_day: 0.0,
            readings,
        });

        info!(profile = %profile.label(), decay_rate, "simulation started");
        Ok(())
    }

    /// Advance the simulation if the poll interval has elapsed.
    ///
    /// Returns `Ok(None)` while idle or between polls. A clock that moved
    /// backwards yields [`SimulationError::ClockRegression`] and leaves the
    /// state untouched.
    pub fn tick(&mut self, now: Instant) -> Result<Option<ReadingSet>, SimulationError> {
        let poll_interval = self.poll_interval;
        let Some(run) = self.run.as_mut() else {
            return Ok(None);
        };

        let since_last = elapsed_since(run.clock.last_tick_time, now)?;
        if since_last < poll_interval {
            return Ok(None);
        }

        let elapsed = elapsed_since(run.clock.start_time, now)?;
        let simulated_day = run.profile.simulated_day(elapsed);
        let was_saturated = run.simulated_day >= HORIZON_DAYS;

        let readings = decay::evaluate(&mut run.channels, run.decay_rate, simulated_day);
        run.simulated_day = simulated_day;
        run.readings = readings;
        run.clock.last_tick_time = now;

        if !was_saturated && simulated_day >= HORIZON_DAYS {
            info!(simulated_day, "simulation reached horizon, readings frozen");
        }
        debug!(
            simulated_day,
            ph = readings.ph(),
            temperature_c = readings.temperature_c(),
            turbidity_ntu = readings.turbidity_ntu(),
            conductivity_us_cm = readings.conductivity_us_cm(),
            tds_ppm = readings.tds_ppm(),
            "simulation tick"
        );

        Ok(Some(readings))
    }

    /// Back to idle; the next start recalibrates every channel
    pub fn reset(&mut self) {
        if self.run.take().is_some() {
            info!("simulation reset");
        }
    }

    /// Most recently published readings, `None` while idle
    pub fn current_reading_set(&self) -> Option<ReadingSet> {
        self.run.as_ref().map(|run| run.readings)
    }

    pub fn phase(&self) -> SimulationPhase {
        match &self.run {
            None => SimulationPhase::Idle,
            Some(run) if run.simulated_day >= HORIZON_DAYS => SimulationPhase::Saturated,
            Some(_) => SimulationPhase::Running,
        }
    }

    pub fn simulated_day(&self) -> Option<f64> {
        self.run.as_ref().map(|run| run.simulated_day)
    }

    pub fn clock(&self) -> Option<SimulationClock> {
        self.run.as_ref().map(|run| run.clock)
    }

    pub fn channels(&self) -> Option<&[Channel; 4]> {
        self.run.as_ref().map(|run| &run.channels)
    }

    pub fn profile(&self) -> Option<CompressionProfile> {
        self.run.as_ref().map(|run| run.profile)
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn started(now: Instant) -> SimulationDriver {
        let mut driver = SimulationDriver::default();
        driver
            .start_simulation(&ChannelModel::default(), 0.05, CompressionProfile::default(), now)
            .unwrap();
        driver
    }

    #[test]
    fn test_idle_until_started() {
        let mut driver = SimulationDriver::default();
        assert_eq!(driver.phase(), SimulationPhase::Idle);
        assert_eq!(driver.tick(Instant::now()).unwrap(), None);
        assert!(driver.current_reading_set().is_none());
    }

    #[test]
    fn test_start_publishes_day_zero() {
        let driver = started(Instant::now());
        assert_eq!(driver.phase(), SimulationPhase::Running);
        let readings = driver.current_reading_set().unwrap();
        assert!((readings.ph() - 7.89).abs() < 1e-6);
        assert_eq!(driver.simulated_day(), Some(0.0));
    }

    #[test]
    fn test_tick_respects_poll_interval() {
        let t0 = Instant::now();
        let mut driver = started(t0);

        assert_eq!(driver.tick(t0 + Duration::from_millis(1_999)).unwrap(), None);
        assert!(driver.tick(t0 + Duration::from_secs(2)).unwrap().is_some());
        assert_eq!(driver.tick(t0 + Duration::from_secs(3)).unwrap(), None);
        assert!(driver.tick(t0 + Duration::from_secs(4)).unwrap().is_some());
        assert_eq!(driver.clock().unwrap().last_tick_time, t0 + Duration::from_secs(4));
    }

    #[test]
    fn test_saturates_at_horizon() {
        let t0 = Instant::now();
        let mut driver = started(t0);

        let at_horizon = driver.tick(t0 + Duration::from_secs(30 * 60)).unwrap().unwrap();
        assert_eq!(driver.phase(), SimulationPhase::Saturated);
        let later = driver.tick(t0 + Duration::from_secs(60 * 60)).unwrap().unwrap();
        assert_eq!(at_horizon, later);
        assert_eq!(driver.simulated_day(), Some(HORIZON_DAYS));
    }

    #[test]
    fn test_clock_regression_skips_tick() {
        let t0 = Instant::now();
        let mut driver = started(t0 + Duration::from_secs(10));
        let before = driver.current_reading_set();

        let err = driver.tick(t0).unwrap_err();
        assert!(matches!(err, SimulationError::ClockRegression { .. }));
        assert!(!err.is_fatal());
        assert_eq!(driver.current_reading_set(), before);
        assert_eq!(driver.phase(), SimulationPhase::Running);
    }

    #[test]
    fn test_invalid_start_leaves_previous_state() {
        let t0 = Instant::now();
        let mut driver = started(t0);
        driver.tick(t0 + Duration::from_secs(600)).unwrap();
        let day_before = driver.simulated_day();

        let mut model = ChannelModel::default();
        model.ph.baseline = 0.0;
        let err = driver
            .start_simulation(&model, 0.05, CompressionProfile::default(), t0)
            .unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(driver.simulated_day(), day_before);

        let mut idle = SimulationDriver::default();
        assert!(idle
            .start_simulation(&ChannelModel::default(), -0.1, CompressionProfile::default(), t0)
            .is_err());
        assert_eq!(idle.phase(), SimulationPhase::Idle);
    }

    #[test]
    fn test_reset_returns_to_idle() {
        let t0 = Instant::now();
        let mut driver = started(t0);
        driver.reset();
        assert_eq!(driver.phase(), SimulationPhase::Idle);
        assert_eq!(driver.tick(t0 + Duration::from_secs(10)).unwrap(), None);
    }
}
