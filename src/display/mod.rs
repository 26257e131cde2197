//! # Local Display
//!
//! Builds the text frame shown on the panel next to the probes: one line per
//! quantity with a severity band, three bar graphs and the overall verdict.
//! Drawing is left to a [`Display`] implementation.

use anyhow::Result;
use serde::Serialize;
use tracing::info;

use crate::domain::{ReadingSet, WaterQuality};
use crate::sensors::conversion::map_range;

/// Inner height of a bar graph in pixels
pub const BAR_FILL_MAX: i64 = 23;

/// Color class of a rendered value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Band {
    Green,
    Yellow,
    Orange,
    Red,
    Blue,
    Magenta,
    Cyan,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayLine {
    pub label: &'static str,
    pub value: String,
    pub band: Band,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarGraph {
    pub label: &'static str,
    /// Filled pixels, `0..=BAR_FILL_MAX`
    pub fill: u8,
    pub band: Band,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayFrame {
    pub mode_label: String,
    pub lines: Vec<DisplayLine>,
    pub bars: Vec<BarGraph>,
    pub quality: WaterQuality,
}

pub trait Display: Send {
    fn render(&mut self, frame: &DisplayFrame) -> Result<()>;
}

fn ph_band(ph: f64) -> Band {
    if ph < 6.5 {
        Band::Red
    } else if ph > 8.5 {
        Band::Blue
    } else {
        Band::Green
    }
}

fn tds_band(tds: f64) -> Band {
    if tds < 150.0 {
        Band::Green
    } else if tds < 300.0 {
        Band::Yellow
    } else if tds < 600.0 {
        Band::Orange
    } else {
        Band::Red
    }
}

fn quality_band(quality: WaterQuality) -> Band {
    match quality {
        WaterQuality::Good => Band::Green,
        WaterQuality::Fair => Band::Yellow,
        WaterQuality::Poor => Band::Red,
    }
}

fn bar_fill(value: i64, full_scale: i64) -> u8 {
    map_range(value, 0, full_scale, 0, BAR_FILL_MAX).clamp(0, BAR_FILL_MAX) as u8
}

fn turbidity_bar(ntu: f64) -> BarGraph {
    let band = if ntu > 2000.0 {
        Band::Red
    } else if ntu > 1000.0 {
        Band::Orange
    } else if ntu > 500.0 {
        Band::Yellow
    } else {
        Band::Green
    };
    BarGraph {
        label: "Turbidity",
        fill: bar_fill(ntu as i64, 4550),
        band,
    }
}

fn ph_bar(ph: f64) -> BarGraph {
    let band = if ph < 4.0 {
        Band::Red
    } else if ph < 6.5 {
        Band::Orange
    } else if ph <= 8.5 {
        Band::Green
    } else if ph <= 10.0 {
        Band::Blue
    } else {
        Band::Magenta
    };
    BarGraph {
        label: "pH",
        fill: bar_fill((ph * 10.0) as i64, 140),
        band,
    }
}

fn conductivity_bar(us_cm: f64) -> BarGraph {
    let band = if us_cm < 50.0 {
        Band::Blue
    } else if us_cm < 200.0 {
        Band::Green
    } else if us_cm < 800.0 {
        Band::Yellow
    } else if us_cm < 1500.0 {
        Band::Orange
    } else {
        Band::Red
    };
    BarGraph {
        label: "Conductivity",
        fill: bar_fill(us_cm as i64, 2000),
        band,
    }
}

pub fn render_frame(readings: &ReadingSet, mode_label: &str) -> DisplayFrame {
    let quality = WaterQuality::assess(readings);

    let lines = vec![
        DisplayLine {
            label: "Turbidity",
            value: format!("{:.0} NTU", readings.turbidity_ntu()),
            band: Band::Yellow,
        },
        DisplayLine {
            label: "pH",
            value: format!("{:.1}", readings.ph()),
            band: ph_band(readings.ph()),
        },
        DisplayLine {
            label: "Conductivity",
            value: format!("{:.0} uS/cm", readings.conductivity_us_cm()),
            band: Band::Cyan,
        },
        DisplayLine {
            label: "TDS",
            value: format!("{:.0} ppm", readings.tds_ppm()),
            band: tds_band(readings.tds_ppm()),
        },
        DisplayLine {
            label: "Temp",
            value: format!("{:.1} C", readings.temperature_c()),
            band: Band::Cyan,
        },
        DisplayLine {
            label: "Status",
            value: quality.label().to_string(),
            band: quality_band(quality),
        },
    ];

    DisplayFrame {
        mode_label: mode_label.to_string(),
        lines,
        bars: vec![
            turbidity_bar(readings.turbidity_ntu()),
            ph_bar(readings.ph()),
            conductivity_bar(readings.conductivity_us_cm()),
        ],
        quality,
    }
}

/// Writes frames to the log; used when no panel is attached
#[derive(Debug, Default)]
pub struct ConsoleDisplay {
    frames_rendered: u64,
}

impl ConsoleDisplay {
    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }
}

impl Display for ConsoleDisplay {
    fn render(&mut self, frame: &DisplayFrame) -> Result<()> {
        let summary = frame
            .lines
            .iter()
            .map(|line| format!("{}: {}", line.label, line.value))
            .collect::<Vec<_>>()
            .join(" | ");
        info!(
            target: "display",
            mode = %frame.mode_label,
            quality = %frame.quality,
            "{summary}"
        );
        self.frames_rendered += 1;
        Ok(())
    }
}
