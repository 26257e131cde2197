use anyhow::Result;
use figment::{providers::{Env, Format, Toml}, Figment};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;

use crate::domain::ChannelModel;
use crate::sensors::{Calibration, SimulatedProbeConfig};
use crate::simulation::{CompressionProfile, ConfigurationError, ProfileKind};

pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub monitor: MonitorConfig,
    pub demo: DemoConfig,
    #[serde(default)]
    pub channels: ChannelModel,
    #[serde(default)]
    pub sensors: SensorConfig,
    #[serde(default)]
    pub wifi: WifiConfig,
    #[serde(default)]
    pub provisioning: ProvisioningConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub enable_cors: bool,
}
impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        Ok(format!("{}:{}", self.host, self.port).parse()?)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperatingMode {
    /// Live probes
    Normal,
    /// Time-compressed decay simulation
    Demo,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonitorConfig {
    pub mode: OperatingMode,
    /// Cadence at which readings are refreshed and published
    pub poll_interval_ms: u64,
    /// How often the control loop wakes to check for work
    pub loop_interval_ms: u64,
}

impl MonitorConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn loop_interval(&self) -> Duration {
        Duration::from_millis(self.loop_interval_ms.max(1))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DemoConfig {
    pub profile: ProfileKind,
    /// Real duration of the whole horizon for the compressed profile
    pub window_minutes: f64,
    /// Fraction of treatment efficiency lost per simulated day (exponential)
    pub decay_rate: f64,
}

impl DemoConfig {
    pub fn compression_profile(&self) -> Result<CompressionProfile, ConfigurationError> {
        match self.profile {
            ProfileKind::RealTime => Ok(CompressionProfile::RealTime),
            ProfileKind::Compressed => {
                let window = Duration::try_from_secs_f64(self.window_minutes * 60.0)
                    .ok()
                    .filter(|window| !window.is_zero())
                    .ok_or_else(|| {
                        ConfigurationError::MalformedProfile(format!(
                            "window_minutes must be a positive duration, got {}",
                            self.window_minutes
                        ))
                    })?;
                Ok(CompressionProfile::compressed(window))
            }
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SensorConfig {
    #[serde(default)]
    pub calibration: Calibration,
    pub sample_spacing_ms: u64,
    #[serde(default)]
    pub simulated: SimulatedProbeConfig,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            calibration: Calibration::default(),
            sample_spacing_ms: 10,
            simulated: SimulatedProbeConfig::default(),
        }
    }
}

impl SensorConfig {
    pub fn sample_spacing(&self) -> Duration {
        Duration::from_millis(self.sample_spacing_ms)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WifiConfig {
    pub ssid: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProvisioningConfig {
    /// Accept credentials over the serial link (stdin/stdout)
    pub enabled: bool,
}

impl Default for ProvisioningConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::from_figment(
            Figment::new()
                .merge(Toml::file(DEFAULT_CONFIG_PATH))
                .merge(Env::prefixed("WQM__").split("__")),
        )
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        Ok(figment.extract()?)
    }

    /// Short label for the display and status page
    pub fn mode_label(&self) -> Result<String, ConfigurationError> {
        Ok(match self.monitor.mode {
            OperatingMode::Normal => "NORMAL".to_string(),
            OperatingMode::Demo => self.demo.compression_profile()?.label(),
        })
    }
}
