use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{
    api::{error::ApiError, response::ApiResponse, status},
    config::OperatingMode,
    controller::{AppState, ControlCmd, PublishedReadings},
    simulation::{dataset, DatasetRow, DatasetSpec},
};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/readings", get(get_readings))
        .route("/status", get(status::get_status))
        .route("/simulation/reset", post(reset_simulation))
        .route("/dataset", get(get_dataset))
        .with_state(state)
}

/// GET /api/v1/readings
pub async fn get_readings(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<PublishedReadings>>, ApiError> {
    let latest = state
        .monitor
        .latest()
        .await
        .ok_or_else(|| ApiError::ServiceUnavailable("no readings published yet".to_string()))?;
    Ok(Json(ApiResponse::success(latest)))
}

#[derive(Debug, Serialize)]
pub struct ResetAccepted {
    queued: bool,
}

/// POST /api/v1/simulation/reset - applied by the control loop before its next tick
pub async fn reset_simulation(State(state): State<AppState>) -> Result<Response, ApiError> {
    if state.monitor.mode() != OperatingMode::Demo {
        return Err(ApiError::Conflict("simulation reset requires demo mode".to_string()));
    }
    state
        .monitor
        .send(ControlCmd::ResetSimulation)
        .await
        .map_err(|e| ApiError::ServiceUnavailable(e.to_string()))?;

    Ok((
        StatusCode::ACCEPTED,
        Json(ApiResponse::success(ResetAccepted { queued: true })),
    )
        .into_response())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetFormat {
    #[default]
    Json,
    Csv,
}

#[derive(Debug, Deserialize, Validate)]
pub struct DatasetQuery {
    #[validate(range(min = 1, max = 24))]
    pub samples_per_day: Option<u32>,
    #[validate(range(min = 1, max = 365))]
    pub days: Option<u32>,
    #[serde(default)]
    pub format: DatasetFormat,
}

/// GET /api/v1/dataset
pub async fn get_dataset(
    State(state): State<AppState>,
    Query(query): Query<DatasetQuery>,
) -> Result<Response, ApiError> {
    query.validate()?;

    let defaults = DatasetSpec::default();
    let spec = DatasetSpec {
        days: query.days.unwrap_or(defaults.days),
        samples_per_day: query.samples_per_day.unwrap_or(defaults.samples_per_day),
        daily_decay_rate: state.cfg.demo.decay_rate,
    };
    let rows: Vec<DatasetRow> = dataset::generate(&state.cfg.channels, &spec)?;

    Ok(match query.format {
        DatasetFormat::Json => {
            let count = rows.len();
            ApiResponse::success(rows).with_count(count).into_response()
        }
        DatasetFormat::Csv => (
            [(header::CONTENT_TYPE, "text/csv; charset=utf-8")],
            dataset::to_csv(&rows)?,
        )
            .into_response(),
    })
}
