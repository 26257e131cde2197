use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};

/// Monitored water quality quantity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter)]
#[serde(rename_all = "snake_case")]
pub enum ChannelId {
    #[strum(serialize = "ph")]
    Ph,
    #[strum(serialize = "temperature")]
    Temperature,
    #[strum(serialize = "turbidity")]
    Turbidity,
    #[strum(serialize = "conductivity")]
    Conductivity,
}

impl ChannelId {
    /// Evaluation order used everywhere a channel array is built
    pub const ALL: [ChannelId; 4] = [
        ChannelId::Ph,
        ChannelId::Temperature,
        ChannelId::Turbidity,
        ChannelId::Conductivity,
    ];

    pub fn unit(&self) -> &'static str {
        match self {
            ChannelId::Ph => "",
            ChannelId::Temperature => "°C",
            ChannelId::Turbidity => "NTU",
            ChannelId::Conductivity => "µS/cm",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ChannelId::Ph => "pH",
            ChannelId::Temperature => "Temperature",
            ChannelId::Turbidity => "Turbidity",
            ChannelId::Conductivity => "Conductivity",
        }
    }

    pub fn index(&self) -> usize {
        match self {
            ChannelId::Ph => 0,
            ChannelId::Temperature => 1,
            ChannelId::Turbidity => 2,
            ChannelId::Conductivity => 3,
        }
    }
}

/// Static constants of one channel: untreated reading and treated reading at day 0
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelSpec {
    pub baseline: f64,
    pub target: f64,
}

impl ChannelSpec {
    pub const fn new(baseline: f64, target: f64) -> Self {
        Self { baseline, target }
    }
}

/// Per-channel constants for the four monitored quantities.
///
/// Defaults are the bench measurements of the filter prototype: raw inlet
/// water versus water leaving a fresh filter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelModel {
    pub ph: ChannelSpec,
    pub temperature: ChannelSpec,
    pub turbidity: ChannelSpec,
    pub conductivity: ChannelSpec,
}

impl Default for ChannelModel {
    fn default() -> Self {
        Self {
            ph: ChannelSpec::new(10.45, 7.89),
            temperature: ChannelSpec::new(20.8, 20.0),
            turbidity: ChannelSpec::new(336.0, 184.0),
            conductivity: ChannelSpec::new(1729.0, 191.0),
        }
    }
}

impl ChannelModel {
    pub fn spec(&self, id: ChannelId) -> ChannelSpec {
        match id {
            ChannelId::Ph => self.ph,
            ChannelId::Temperature => self.temperature,
            ChannelId::Turbidity => self.turbidity,
            ChannelId::Conductivity => self.conductivity,
        }
    }

    /// Channels paired with their constants, in evaluation order
    pub fn entries(&self) -> [(ChannelId, ChannelSpec); 4] {
        ChannelId::ALL.map(|id| (id, self.spec(id)))
    }
}

/// Runtime state of a simulated channel.
///
/// `initial_efficiency` is fixed when the channel is calibrated at simulation
/// start; only `current_value` changes afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Channel {
    id: ChannelId,
    baseline: f64,
    target: f64,
    initial_efficiency: f64,
    current_value: f64,
}

impl Channel {
    pub(crate) fn new(id: ChannelId, spec: ChannelSpec, initial_efficiency: f64) -> Self {
        Self {
            id,
            baseline: spec.baseline,
            target: spec.target,
            initial_efficiency,
            current_value: spec.target,
        }
    }

    pub fn id(&self) -> ChannelId {
        self.id
    }

    pub fn baseline(&self) -> f64 {
        self.baseline
    }

    pub fn target(&self) -> f64 {
        self.target
    }

    pub fn initial_efficiency(&self) -> f64 {
        self.initial_efficiency
    }

    pub fn current_value(&self) -> f64 {
        self.current_value
    }

    pub(crate) fn set_current_value(&mut self, value: f64) {
        self.current_value = value;
    }
}
