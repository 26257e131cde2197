use axum::{extract::State, response::Html, Json};
use serde::Serialize;

use crate::{
    api::response::ApiResponse,
    config::OperatingMode,
    controller::{AppState, PublishedReadings},
    domain::WaterQuality,
    simulation::SimulationPhase,
};

pub const REFRESH_SECONDS: u32 = 5;

#[derive(Debug, Serialize)]
pub struct MonitorStatus {
    mode: OperatingMode,
    mode_label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    phase: Option<SimulationPhase>,
    #[serde(skip_serializing_if = "Option::is_none")]
    simulated_day: Option<f64>,
    quality: Option<WaterQuality>,
    control_loop_running: bool,
    wifi_ssid: Option<String>,
    uptime_seconds: u64,
    version: String,
}

/// GET /api/v1/status
pub async fn get_status(State(state): State<AppState>) -> Json<ApiResponse<MonitorStatus>> {
    let latest = state.monitor.latest().await;
    let wifi_ssid = state.wifi.borrow().as_ref().map(|c| c.ssid.clone());

    let status = MonitorStatus {
        mode: state.monitor.mode(),
        mode_label: state.monitor.mode_label().to_string(),
        phase: latest.as_ref().and_then(|p| p.phase),
        simulated_day: latest.as_ref().and_then(|p| p.simulated_day),
        quality: latest.as_ref().map(|p| p.quality),
        control_loop_running: state.monitor.is_loop_running(),
        wifi_ssid,
        uptime_seconds: state.uptime_seconds(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    };

    Json(ApiResponse::success(status))
}

/// GET / - status page for a browser on the local network
pub async fn status_page(State(state): State<AppState>) -> Html<String> {
    let latest = state.monitor.latest().await;
    Html(render_status_page(state.monitor.mode_label(), latest.as_ref()))
}

fn quality_color(quality: WaterQuality) -> &'static str {
    match quality {
        WaterQuality::Good => "#2e7d32",
        WaterQuality::Fair => "#f9a825",
        WaterQuality::Poor => "#c62828",
    }
}

pub fn render_status_page(mode_label: &str, latest: Option<&PublishedReadings>) -> String {
    let body = match latest {
        None => "<p>Waiting for the first reading...</p>".to_string(),
        Some(p) => {
            let r = &p.readings;
            let day = p
                .simulated_day
                .map(|d| format!("<p>Simulated day {d:.1}</p>"))
                .unwrap_or_default();
            format!(
                "<h2 style=\"color:{color}\">{quality}</h2>{day}\
                 <table>\
                 <tr><td>pH</td><td>{ph:.2}</td></tr>\
                 <tr><td>Turbidity</td><td>{turbidity:.0} NTU</td></tr>\
                 <tr><td>Conductivity</td><td>{conductivity:.0} uS/cm</td></tr>\
                 <tr><td>TDS</td><td>{tds:.0} ppm</td></tr>\
                 <tr><td>Temperature</td><td>{temperature:.1} C</td></tr>\
                 </table>",
                color = quality_color(p.quality),
                quality = p.quality.label(),
                ph = r.ph(),
                turbidity = r.turbidity_ntu(),
                conductivity = r.conductivity_us_cm(),
                tds = r.tds_ppm(),
                temperature = r.temperature_c(),
            )
        }
    };

    format!(
        "<!DOCTYPE html><html><head>\
         <meta charset=\"utf-8\">\
         <meta http-equiv=\"refresh\" content=\"{REFRESH_SECONDS}\">\
         <title>Water Quality Monitor</title></head>\
         <body><h1>Water Quality Monitor</h1><p>Mode: {mode_label}</p>{body}</body></html>"
    )
}
