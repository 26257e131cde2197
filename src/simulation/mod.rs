//! # Demo-Mode Simulation
//!
//! Replays the degradation of a water filter over [`HORIZON_DAYS`] simulated
//! days, compressed into a configurable real-time window.
//!
//! ## Components
//!
//! - **Efficiency**: per-channel initial efficiency, computed once at start
//! - **Time mapper**: wall-clock elapsed time to simulated day, clamped to the horizon
//! - **Decay**: exponential fade of treatment efficiency per channel
//! - **Driver**: idle/running/saturated state machine ticked by the control loop
//! - **Dataset**: offline generation of the full decay table
//!
//! ## Usage
//!
//! ```rust
//! use std::time::{Duration, Instant};
//! use water_quality_monitor::domain::ChannelModel;
//! use water_quality_monitor::simulation::{CompressionProfile, SimulationDriver};
//!
//! let start = Instant::now();
//! let mut driver = SimulationDriver::default();
//! driver
//!     .start_simulation(&ChannelModel::default(), 0.05, CompressionProfile::default(), start)
//!     .unwrap();
//!
//! // Half of the 30 minute window is day 15
//! let readings = driver.tick(start + Duration::from_secs(15 * 60)).unwrap().unwrap();
//! assert!((readings.ph() - 9.24).abs() < 0.01);
//! ```

pub mod dataset;
pub mod decay;
pub mod driver;
pub mod efficiency;
pub mod error;
pub mod time_mapper;

pub use dataset::{ChannelSample, DatasetRow, DatasetSpec};
pub use driver::{SimulationClock, SimulationDriver, SimulationPhase, DEFAULT_POLL_INTERVAL};
pub use error::{ConfigurationError, SimulationError};
pub use time_mapper::{
    CompressionProfile, ProfileKind, DEFAULT_COMPRESSED_WINDOW, HORIZON_DAYS, SECONDS_PER_DAY,
};
