use async_trait::async_trait;
use parking_lot::Mutex;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use strum::Display;
use thiserror::Error;
use tokio::sync::RwLock;
use tokio::time::{sleep, Duration};

use super::conversion::{ADC_FULL_SCALE, ADC_REFERENCE_V};

#[derive(Debug, Error)]
pub enum SensorError {
    #[error("ADC read failed on {pin}: {reason}")]
    Read { pin: AnalogPin, reason: String },
    #[error("no samples requested for {0}")]
    NoSamples(AnalogPin),
}

/// Analog probe outputs wired to the ADC
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AnalogPin {
    Turbidity,
    Ph,
    Temperature,
    Conductivity,
}

impl AnalogPin {
    /// GPIO of the reference board wiring
    pub fn gpio(&self) -> u8 {
        match self {
            AnalogPin::Turbidity => 34,
            AnalogPin::Ph => 35,
            AnalogPin::Temperature => 39,
            AnalogPin::Conductivity => 26,
        }
    }
}

#[async_trait]
pub trait AnalogInput: Send + Sync {
    /// One 12-bit conversion
    async fn read_raw(&self, pin: AnalogPin) -> Result<u16, SensorError>;
}

/// Integer mean of `samples` conversions spaced by `spacing`
pub async fn average_raw(
    input: &dyn AnalogInput,
    pin: AnalogPin,
    samples: usize,
    spacing: Duration,
) -> Result<u16, SensorError> {
    if samples == 0 {
        return Err(SensorError::NoSamples(pin));
    }

    let mut sum: u32 = 0;
    for i in 0..samples {
        sum += input.read_raw(pin).await? as u32;
        if !spacing.is_zero() && i + 1 < samples {
            sleep(spacing).await;
        }
    }
    Ok((sum / samples as u32) as u16)
}

fn voltage_to_raw(voltage: f64) -> u16 {
    (voltage / ADC_REFERENCE_V * ADC_FULL_SCALE)
        .round()
        .clamp(0.0, ADC_FULL_SCALE) as u16
}

/// Voltages a simulated probe set sits at, with optional gaussian noise
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulatedProbeConfig {
    pub turbidity_v: f64,
    pub ph_v: f64,
    pub temperature_v: f64,
    pub conductivity_v: f64,
    /// Standard deviation of read noise in volts (0 = noiseless)
    pub noise_std_v: f64,
    /// Random seed for reproducibility (None = random)
    pub random_seed: Option<u64>,
}

impl Default for SimulatedProbeConfig {
    fn default() -> Self {
        Self {
            turbidity_v: 3.1,     // clear water
            ph_v: 2.5,            // neutral
            temperature_v: 0.7,   // 20 °C
            conductivity_v: 1.0,  // ~300 µS/cm
            noise_std_v: 0.01,
            random_seed: None,
        }
    }
}

/// ADC stand-in for bench runs without probes attached
pub struct SimulatedAnalogInput {
    voltages: HashMap<AnalogPin, f64>,
    noise: Option<Normal<f64>>,
    rng: Mutex<rand::rngs::StdRng>,
}

impl SimulatedAnalogInput {
    pub fn new(config: &SimulatedProbeConfig) -> Self {
        let rng = match config.random_seed {
            Some(seed) => rand::rngs::StdRng::seed_from_u64(seed),
            None => rand::rngs::StdRng::from_entropy(),
        };
        let noise = if config.noise_std_v > 0.0 {
            Normal::new(0.0, config.noise_std_v).ok()
        } else {
            None
        };

        let voltages = HashMap::from([
            (AnalogPin::Turbidity, config.turbidity_v),
            (AnalogPin::Ph, config.ph_v),
            (AnalogPin::Temperature, config.temperature_v),
            (AnalogPin::Conductivity, config.conductivity_v),
        ]);

        Self {
            voltages,
            noise,
            rng: Mutex::new(rng),
        }
    }
}

#[async_trait]
impl AnalogInput for SimulatedAnalogInput {
    async fn read_raw(&self, pin: AnalogPin) -> Result<u16, SensorError> {
        let base = self.voltages.get(&pin).copied().ok_or_else(|| SensorError::Read {
            pin,
            reason: "pin not wired".to_string(),
        })?;
        let voltage = match &self.noise {
            Some(noise) => base + noise.sample(&mut *self.rng.lock()),
            None => base,
        };
        Ok(voltage_to_raw(voltage))
    }
}

/// Replays queued raw values per pin; falls back to mid-scale when drained
pub struct MockAnalogInput {
    pub queues: Arc<RwLock<HashMap<AnalogPin, VecDeque<u16>>>>,
    fallback: u16,
}

impl MockAnalogInput {
    pub fn new(queues: HashMap<AnalogPin, VecDeque<u16>>) -> Self {
        Self {
            queues: Arc::new(RwLock::new(queues)),
            fallback: 2048,
        }
    }

    /// Every read of `pin` returns `raw`
    pub fn constant(values: [(AnalogPin, u16); 4]) -> Self {
        let mut input = Self::new(HashMap::new());
        input.fallback = 0;
        let queues = values
            .iter()
            .map(|(pin, raw)| (*pin, VecDeque::from(vec![*raw; 64])))
            .collect();
        input.queues = Arc::new(RwLock::new(queues));
        input
    }
}

#[async_trait]
impl AnalogInput for MockAnalogInput {
    async fn read_raw(&self, pin: AnalogPin) -> Result<u16, SensorError> {
        let mut queues = self.queues.write().await;
        Ok(queues
            .get_mut(&pin)
            .and_then(|q| q.pop_front())
            .unwrap_or(self.fallback))
    }
}
