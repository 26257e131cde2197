use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, watch, RwLock};
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use crate::config::{Config, OperatingMode};
use crate::display::{render_frame, ConsoleDisplay, Display};
use crate::domain::{ChannelModel, ReadingSet, WaterQuality};
use crate::provisioning::{Provisioner, WifiCredentials};
use crate::sensors::{AnalogInput, SensorArray};
use crate::simulation::{CompressionProfile, SimulationDriver, SimulationPhase};

const COMMAND_QUEUE_DEPTH: usize = 16;

#[derive(Clone)]
pub struct AppState {
    pub cfg: Config,
    pub monitor: Arc<MonitorHandle>,
    pub wifi: Arc<watch::Sender<Option<WifiCredentials>>>,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// Build the shared state and the control loop that feeds it.
    ///
    /// In demo mode the simulation starts here, so a bad channel model or
    /// profile fails startup instead of the first tick.
    pub fn new(cfg: Config) -> Result<(Self, MonitorController)> {
        let mode_label = cfg.mode_label().inspect_err(|e| {
            error!(error = %e, "demo profile rejected");
        })?;

        let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_QUEUE_DEPTH);
        let monitor = Arc::new(MonitorHandle {
            published: RwLock::new(None),
            cmd_tx,
            mode: cfg.monitor.mode,
            mode_label,
            loop_running: AtomicBool::new(false),
        });

        let source = match cfg.monitor.mode {
            OperatingMode::Demo => {
                let mut driver = SimulationDriver::new(cfg.monitor.poll_interval());
                let profile = cfg.demo.compression_profile()?;
                if let Err(e) =
                    driver.start_simulation(&cfg.channels, cfg.demo.decay_rate, profile, Instant::now())
                {
                    error!(error = %e, "demo simulation failed to start");
                    return Err(e.into());
                }
                ReadingSource::Demo {
                    driver,
                    model: cfg.channels,
                    decay_rate: cfg.demo.decay_rate,
                    profile,
                }
            }
            OperatingMode::Normal => {
                #[cfg(feature = "sim")]
                let input: Arc<dyn AnalogInput> =
                    Arc::new(crate::sensors::SimulatedAnalogInput::new(&cfg.sensors.simulated));
                #[cfg(not(feature = "sim"))]
                let input: Arc<dyn AnalogInput> =
                    Arc::new(crate::sensors::MockAnalogInput::new(Default::default()));

                ReadingSource::Live {
                    sensors: SensorArray::new(input, cfg.sensors.calibration, cfg.sensors.sample_spacing()),
                    poll_interval: cfg.monitor.poll_interval(),
                    last_read: None,
                }
            }
        };

        let initial_wifi = (!cfg.wifi.ssid.is_empty()).then(|| WifiCredentials {
            ssid: cfg.wifi.ssid.clone(),
            password: cfg.wifi.password.clone(),
        });
        let (wifi_tx, _) = watch::channel(initial_wifi);

        let mut controller = MonitorController {
            handle: monitor.clone(),
            source,
            display: Box::new(ConsoleDisplay::default()),
            cmd_rx,
            loop_interval: cfg.monitor.loop_interval(),
        };
        controller.publish_current();

        let state = Self {
            cfg,
            monitor,
            wifi: Arc::new(wifi_tx),
            started_at: Utc::now(),
        };
        Ok((state, controller))
    }

    pub fn uptime_seconds(&self) -> u64 {
        (Utc::now() - self.started_at).num_seconds().max(0) as u64
    }
}

/// Run the control loop, the serial link and the network watcher
pub fn spawn_controller_tasks(state: &AppState, controller: MonitorController) {
    tokio::spawn(async move {
        if let Err(e) = controller.run().await {
            error!(error = %e, "control loop stopped");
        }
    });

    if state.cfg.provisioning.enabled {
        let provisioner = Provisioner::new(state.wifi.clone());
        tokio::spawn(async move {
            let reader = tokio::io::BufReader::new(tokio::io::stdin());
            if let Err(e) = provisioner.run(reader, tokio::io::stdout()).await {
                warn!(error = %e, "provisioning link stopped");
            }
        });
    }

    let mut wifi_rx = state.wifi.subscribe();
    tokio::spawn(async move {
        while wifi_rx.changed().await.is_ok() {
            let ssid = wifi_rx.borrow_and_update().as_ref().map(|c| c.ssid.clone());
            match ssid {
                Some(ssid) => info!(%ssid, "joining wifi network"),
                None => info!("wifi credentials cleared"),
            }
        }
    });
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCmd {
    ResetSimulation,
}

/// Snapshot handed from the control loop to readers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublishedReadings {
    pub readings: ReadingSet,
    pub quality: WaterQuality,
    pub published_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub simulated_day: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<SimulationPhase>,
}

pub struct MonitorHandle {
    published: RwLock<Option<PublishedReadings>>,
    cmd_tx: mpsc::Sender<ControlCmd>,
    mode: OperatingMode,
    mode_label: String,
    loop_running: AtomicBool,
}

impl MonitorHandle {
    pub async fn latest(&self) -> Option<PublishedReadings> {
        self.published.read().await.clone()
    }

    pub fn mode(&self) -> OperatingMode {
        self.mode
    }

    pub fn mode_label(&self) -> &str {
        &self.mode_label
    }

    pub fn is_loop_running(&self) -> bool {
        self.loop_running.load(Ordering::Relaxed)
    }

    /// Queue a command for the control loop; applied before its next tick
    pub async fn send(&self, cmd: ControlCmd) -> Result<()> {
        self.cmd_tx
            .send(cmd)
            .await
            .map_err(|_| anyhow::anyhow!("control loop is not running"))
    }
}

enum ReadingSource {
    Demo {
        driver: SimulationDriver,
        model: ChannelModel,
        decay_rate: f64,
        profile: CompressionProfile,
    },
    Live {
        sensors: SensorArray,
        poll_interval: Duration,
        last_read: Option<Instant>,
    },
}

/// Owns every piece of mutable monitor state; only the published snapshot
/// leaves this struct.
pub struct MonitorController {
    handle: Arc<MonitorHandle>,
    source: ReadingSource,
    display: Box<dyn Display>,
    cmd_rx: mpsc::Receiver<ControlCmd>,
    loop_interval: Duration,
}

impl MonitorController {
    pub fn with_display(mut self, display: Box<dyn Display>) -> Self {
        self.display = display;
        self
    }

    pub fn phase(&self) -> Option<SimulationPhase> {
        match &self.source {
            ReadingSource::Demo { driver, .. } => Some(driver.phase()),
            ReadingSource::Live { .. } => None,
        }
    }

    pub async fn run(mut self) -> Result<()> {
        self.handle.loop_running.store(true, Ordering::Relaxed);
        let mut interval = tokio::time::interval(self.loop_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let result = loop {
            interval.tick().await;
            self.poll_commands(Instant::now());
            if let Err(e) = self.step(Instant::now()).await {
                break Err(e);
            }
        };

        self.handle.loop_running.store(false, Ordering::Relaxed);
        result
    }

    /// Drain queued commands without blocking
    pub fn poll_commands(&mut self, now: Instant) {
        while let Ok(cmd) = self.cmd_rx.try_recv() {
            match cmd {
                ControlCmd::ResetSimulation => self.reset_simulation(now),
            }
        }
    }

    fn reset_simulation(&mut self, now: Instant) {
        let ReadingSource::Demo {
            driver,
            model,
            decay_rate,
            profile,
        } = &mut self.source
        else {
            warn!("reset ignored outside demo mode");
            return;
        };

        driver.reset();
        match driver.start_simulation(model, *decay_rate, *profile, now) {
            Ok(()) => self.publish_current(),
            Err(e) => error!(error = %e, "simulation restart failed"),
        }
    }

    /// One pass of the loop: refresh readings if they are due
    pub async fn step(&mut self, now: Instant) -> Result<()> {
        let fresh = match &mut self.source {
            ReadingSource::Demo { driver, .. } => match driver.tick(now) {
                Ok(readings) => readings,
                Err(e) if !e.is_fatal() => {
                    warn!(error = %e, "tick skipped");
                    None
                }
                Err(e) => return Err(e.into()),
            },
            ReadingSource::Live {
                sensors,
                poll_interval,
                last_read,
            } => {
                let due = last_read.map_or(true, |last| {
                    now.checked_duration_since(last)
                        .map_or(false, |since| since >= *poll_interval)
                });
                if !due {
                    None
                } else {
                    *last_read = Some(now);
                    match sensors.read().await {
                        Ok(readings) => Some(readings),
                        Err(e) => {
                            warn!(error = %e, "sensor read failed, keeping last readings");
                            None
                        }
                    }
                }
            }
        };

        if let Some(readings) = fresh {
            self.publish(readings).await;
        }
        Ok(())
    }

    /// Publish whatever the driver currently holds (start and reset)
    fn publish_current(&mut self) {
        let ReadingSource::Demo { driver, .. } = &self.source else {
            return;
        };
        let Some(readings) = driver.current_reading_set() else {
            return;
        };
        let snapshot = self.snapshot(readings);
        // only the control loop writes, readers hold the lock briefly
        match self.handle.published.try_write() {
            Ok(mut slot) => *slot = Some(snapshot),
            Err(_) => warn!("published snapshot busy, skipping"),
        }
        self.render(&readings);
    }

    async fn publish(&mut self, readings: ReadingSet) {
        let snapshot = self.snapshot(readings);
        *self.handle.published.write().await = Some(snapshot);
        self.render(&readings);
    }

    fn snapshot(&self, readings: ReadingSet) -> PublishedReadings {
        let (simulated_day, phase) = match &self.source {
            ReadingSource::Demo { driver, .. } => (driver.simulated_day(), Some(driver.phase())),
            ReadingSource::Live { .. } => (None, None),
        };
        PublishedReadings {
            readings,
            quality: WaterQuality::assess(&readings),
            published_at: Utc::now(),
            simulated_day,
            phase,
        }
    }

    fn render(&mut self, readings: &ReadingSet) {
        let frame = render_frame(readings, &self.handle.mode_label);
        if let Err(e) = self.display.render(&frame) {
            warn!(error = %e, "display render failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::DisplayFrame;
    use crate::simulation::ConfigurationError;
    use figment::{providers::{Format, Toml}, Figment};
    use parking_lot::Mutex;

    const DEFAULT_TOML: &str = include_str!("../../config/default.toml");

    fn config(overrides: &str) -> Config {
        Config::from_figment(
            Figment::new()
                .merge(Toml::string(DEFAULT_TOML))
                .merge(Toml::string(overrides)),
        )
        .unwrap()
    }

    #[derive(Clone, Default)]
    struct RecordingDisplay {
        frames: Arc<Mutex<Vec<DisplayFrame>>>,
    }

    impl Display for RecordingDisplay {
        fn render(&mut self, frame: &DisplayFrame) -> Result<()> {
            self.frames.lock().push(frame.clone());
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_demo_publishes_day_zero_at_startup() {
        let (state, controller) = AppState::new(config("")).unwrap();
        let latest = state.monitor.latest().await.unwrap();

        assert_eq!(latest.simulated_day, Some(0.0));
        assert_eq!(latest.phase, Some(SimulationPhase::Running));
        assert!((latest.readings.ph() - 7.89).abs() < 1e-9);
        assert_eq!(controller.phase(), Some(SimulationPhase::Running));
        assert_eq!(state.monitor.mode_label(), "DEMO 30 MIN");
    }

    #[tokio::test]
    async fn test_invalid_channel_model_fails_startup() {
        let result = AppState::new(config("[channels.ph]\nbaseline = 0.0\ntarget = 7.0\n"));
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_unrepresentable_window_fails_startup() {
        for window in ["1e300", "nan", "0.0"] {
            let err = AppState::new(config(&format!("[demo]\nwindow_minutes = {window}\n")))
                .err()
                .unwrap();
            assert!(
                matches!(
                    err.downcast_ref::<ConfigurationError>(),
                    Some(ConfigurationError::MalformedProfile(_))
                ),
                "window_minutes = {window}: {err}"
            );
        }

        // normal mode never builds a profile
        assert!(AppState::new(config("[monitor]\nmode = \"normal\"\n[demo]\nwindow_minutes = 1e300\n")).is_ok());
    }

    #[tokio::test]
    async fn test_step_gates_on_poll_interval_and_renders() {
        let (state, controller) = AppState::new(config("")).unwrap();
        let display = RecordingDisplay::default();
        let mut controller = controller.with_display(Box::new(display.clone()));

        let now = Instant::now();
        controller.step(now).await.unwrap();
        let before = state.monitor.latest().await.unwrap();

        controller.step(now + Duration::from_secs(900)).await.unwrap();
        let after = state.monitor.latest().await.unwrap();

        assert!(after.simulated_day.unwrap() > before.simulated_day.unwrap());
        assert!(after.readings.ph() > before.readings.ph());
        assert_eq!(display.frames.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_reset_is_applied_between_ticks() {
        let (state, mut controller) = AppState::new(config("")).unwrap();
        let now = Instant::now();

        controller.step(now + Duration::from_secs(3600)).await.unwrap();
        assert_eq!(controller.phase(), Some(SimulationPhase::Saturated));

        state.monitor.send(ControlCmd::ResetSimulation).await.unwrap();
        // not observed until the loop drains commands
        assert_eq!(controller.phase(), Some(SimulationPhase::Saturated));

        controller.poll_commands(now + Duration::from_secs(3601));
        assert_eq!(controller.phase(), Some(SimulationPhase::Running));
        let latest = state.monitor.latest().await.unwrap();
        assert_eq!(latest.simulated_day, Some(0.0));
    }

    #[tokio::test]
    async fn test_normal_mode_reads_sensors() {
        let (state, mut controller) =
            AppState::new(config("[monitor]\nmode = \"normal\"\n[sensors]\nsample_spacing_ms = 0\n")).unwrap();
        assert!(state.monitor.latest().await.is_none());

        controller.step(Instant::now()).await.unwrap();
        let latest = state.monitor.latest().await.unwrap();
        assert_eq!(latest.phase, None);
        assert_eq!(state.monitor.mode_label(), "NORMAL");

        // reset has no effect outside demo mode
        state.monitor.send(ControlCmd::ResetSimulation).await.unwrap();
        controller.poll_commands(Instant::now());
        assert_eq!(controller.phase(), None);
    }
}
