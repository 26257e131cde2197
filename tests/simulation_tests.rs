//! End-to-end checks of the demo-mode simulator through its public API.

use proptest::prelude::*;
use rstest::rstest;
use std::time::{Duration, Instant};

use water_quality_monitor::domain::{ChannelId, ChannelModel, ChannelSpec, ReadingSet};
use water_quality_monitor::simulation::{
    decay, efficiency, CompressionProfile, ConfigurationError, SimulationDriver, SimulationError,
    SimulationPhase, HORIZON_DAYS,
};

const DECAY_RATE: f64 = 0.05;

fn thirty_minutes() -> CompressionProfile {
    CompressionProfile::compressed(Duration::from_secs(30 * 60))
}

fn started(profile: CompressionProfile) -> (SimulationDriver, Instant) {
    let start = Instant::now();
    let mut driver = SimulationDriver::default();
    driver
        .start_simulation(&ChannelModel::default(), DECAY_RATE, profile, start)
        .unwrap();
    (driver, start)
}

fn assert_tds_derived(readings: &ReadingSet) {
    assert_eq!(readings.tds_ppm(), 0.5 * readings.conductivity_us_cm());
}

#[test]
fn test_day_zero_reproduces_every_target() {
    let (driver, _) = started(thirty_minutes());
    let readings = driver.current_reading_set().unwrap();
    let model = ChannelModel::default();

    for (id, spec) in model.entries() {
        assert!(
            (readings.value(id) - spec.target).abs() < 1e-6,
            "{id} started at {} instead of {}",
            readings.value(id),
            spec.target
        );
    }
    assert_tds_derived(&readings);
}

#[test]
fn test_ph_efficiency_matches_bench_figures() {
    let eff = efficiency::initial_efficiency(ChannelId::Ph, &ChannelSpec::new(10.45, 7.89)).unwrap();
    assert!((eff - 0.24498).abs() < 1e-4);
    assert!((decay::current_efficiency(eff, DECAY_RATE, 15.0) - 0.1157).abs() < 1e-4);
}

#[test]
fn test_half_window_is_day_fifteen() {
    let (mut driver, start) = started(thirty_minutes());
    let readings = driver.tick(start + Duration::from_secs(15 * 60)).unwrap().unwrap();

    assert!((driver.simulated_day().unwrap() - 15.0).abs() < 1e-9);
    assert!((readings.ph() - 9.24).abs() < 0.01);
    assert_tds_derived(&readings);
}

#[rstest]
#[case(Duration::from_secs(60 * 60))]
#[case(Duration::from_secs(6 * 60 * 60))]
#[case(Duration::from_secs(400 * 24 * 60 * 60))]
fn test_past_horizon_is_frozen(#[case] elapsed: Duration) {
    let (mut at_horizon, start) = started(thirty_minutes());
    let frozen = at_horizon.tick(start + Duration::from_secs(30 * 60)).unwrap().unwrap();

    let (mut later, start_later) = started(thirty_minutes());
    let readings = later.tick(start_later + elapsed).unwrap().unwrap();

    assert_eq!(later.simulated_day(), Some(HORIZON_DAYS));
    assert_eq!(later.phase(), SimulationPhase::Saturated);
    assert_eq!(readings, frozen);
}

#[test]
fn test_saturated_driver_keeps_publishing_identical_sets() {
    let (mut driver, start) = started(thirty_minutes());
    let first = driver.tick(start + Duration::from_secs(3600)).unwrap().unwrap();
    let second = driver.tick(start + Duration::from_secs(3602)).unwrap().unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_ticks_between_polls_publish_nothing() {
    let (mut driver, start) = started(thirty_minutes());
    assert_eq!(driver.tick(start + Duration::from_millis(1999)).unwrap(), None);
    assert!(driver.tick(start + Duration::from_secs(2)).unwrap().is_some());
    assert_eq!(driver.tick(start + Duration::from_secs(3)).unwrap(), None);
}

#[test]
fn test_clock_regression_is_reported_and_harmless() {
    let (mut driver, start) = started(thirty_minutes());
    let later = start + Duration::from_secs(60);
    let published = driver.tick(later).unwrap().unwrap();

    let err = driver.tick(start + Duration::from_secs(30)).unwrap_err();
    assert!(matches!(err, SimulationError::ClockRegression { .. }));
    assert!(!err.is_fatal());
    assert_eq!(driver.current_reading_set(), Some(published));
    assert_eq!(driver.clock().unwrap().last_tick_time, later);
}

#[test]
fn test_invalid_configuration_leaves_driver_idle() {
    let mut model = ChannelModel::default();
    model.conductivity = ChannelSpec::new(0.0, 191.0);

    let mut driver = SimulationDriver::default();
    let err = driver
        .start_simulation(&model, DECAY_RATE, thirty_minutes(), Instant::now())
        .unwrap_err();

    assert!(err.is_fatal());
    assert_eq!(
        err,
        SimulationError::InvalidConfiguration(ConfigurationError::DivisionByZero {
            channel: ChannelId::Conductivity
        })
    );
    assert_eq!(driver.phase(), SimulationPhase::Idle);
    assert_eq!(driver.current_reading_set(), None);
}

#[test]
fn test_reset_then_restart_recalibrates() {
    let (mut driver, start) = started(thirty_minutes());
    driver.tick(start + Duration::from_secs(900)).unwrap();
    driver.reset();
    assert_eq!(driver.phase(), SimulationPhase::Idle);
    assert_eq!(driver.tick(start + Duration::from_secs(1000)).unwrap(), None);

    let mut model = ChannelModel::default();
    model.ph = ChannelSpec::new(9.0, 6.0);
    driver
        .start_simulation(&model, DECAY_RATE, thirty_minutes(), start + Duration::from_secs(1000))
        .unwrap();
    let readings = driver.current_reading_set().unwrap();
    assert!((readings.ph() - 6.0).abs() < 1e-9);
    assert_eq!(driver.simulated_day(), Some(0.0));
}

#[test]
fn test_real_time_profile_takes_a_day_per_day() {
    let (mut driver, start) = started(CompressionProfile::RealTime);
    driver.tick(start + Duration::from_secs(36 * 60 * 60)).unwrap();
    assert!((driver.simulated_day().unwrap() - 1.5).abs() < 1e-9);
    assert_eq!(driver.phase(), SimulationPhase::Running);
}

#[test]
fn test_overshooting_target_is_kept() {
    let mut model = ChannelModel::default();
    model.temperature = ChannelSpec::new(20.0, 22.0);
    let mut driver = SimulationDriver::default();
    driver
        .start_simulation(&model, DECAY_RATE, thirty_minutes(), Instant::now())
        .unwrap();

    let channel = driver.channels().unwrap()[ChannelId::Temperature.index()];
    assert!(channel.initial_efficiency() < 0.0);
    assert!((channel.current_value() - 22.0).abs() < 1e-9);
}

proptest! {
    #[test]
    fn test_simulated_day_is_monotonic_and_bounded(a in 0u64..10_000_000, b in 0u64..10_000_000) {
        let (early, late) = if a <= b { (a, b) } else { (b, a) };
        for profile in [CompressionProfile::RealTime, thirty_minutes()] {
            let d_early = profile.simulated_day(Duration::from_millis(early));
            let d_late = profile.simulated_day(Duration::from_millis(late));
            prop_assert!(d_early <= d_late);
            prop_assert!((0.0..=HORIZON_DAYS).contains(&d_early));
            prop_assert!((0.0..=HORIZON_DAYS).contains(&d_late));
        }
    }

    #[test]
    fn test_values_stay_between_target_and_baseline(
        baseline in 1.0f64..5000.0,
        fraction in 0.0f64..1.0,
        day in 0.0f64..=30.0,
        rate in 0.0f64..1.0,
    ) {
        let target = baseline * fraction;
        let eff = efficiency::initial_efficiency(ChannelId::Turbidity, &ChannelSpec::new(baseline, target)).unwrap();
        let value = decay::decayed_value(baseline, eff, rate, day);
        prop_assert!(value >= target - 1e-9);
        prop_assert!(value <= baseline + 1e-9);
    }

    #[test]
    fn test_every_published_set_carries_derived_tds(secs in 2u64..7200) {
        let (mut driver, start) = started(thirty_minutes());
        let readings = driver.tick(start + Duration::from_secs(secs)).unwrap().unwrap();
        prop_assert_eq!(readings.tds_ppm(), 0.5 * readings.conductivity_us_cm());
    }
}
