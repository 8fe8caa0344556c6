use crate::{error::AppError, extract::ReportBody, AppState};
use axum::{extract::State, http::StatusCode, http::Uri, Json};
use core_types::{normalize_payload, NewReport, Report};
use database::ConnectionState;
use serde::Serialize;
use std::sync::Arc;

/// Body shape shared by the success responses: `{ message, data }`.
#[derive(Debug, Serialize)]
pub struct DataResponse<T> {
    pub message: &'static str,
    pub data: T,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub mongo_state: ConnectionState,
}

/// # GET /
pub async fn root() -> &'static str {
    "Backend running"
}

/// # GET /health
/// Reports the last known store state. Never touches the store.
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        mongo_state: state.store.connection_state(),
    })
}

/// # POST /add
/// Validates a report submission and persists it.
///
/// Payload problems are reported before availability, so a client learns about
/// a bad submission even while the store is down.
pub async fn add_report(
    State(state): State<Arc<AppState>>,
    ReportBody(body): ReportBody,
) -> Result<(StatusCode, Json<DataResponse<Report>>), AppError> {
    tracing::debug!(body = %body, "Received report submission.");
    let payload = normalize_payload(&body);
    let report = match NewReport::try_from(&payload) {
        Ok(report) => report,
        Err(error) => {
            return Err(AppError::InvalidReport {
                error,
                received: payload,
            })
        }
    };

    let mongo_state = state.store.connection_state();
    if !mongo_state.is_connected() {
        return Err(AppError::StoreUnavailable(mongo_state));
    }

    let saved = state.store.create(report).await.map_err(AppError::Save)?;
    tracing::info!(id = %saved.id, order_id = saved.order_id, "Report saved.");

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            message: "Data saved",
            data: saved,
        }),
    ))
}

/// # GET /get
/// Lists every stored report in store order.
pub async fn list_reports(
    State(state): State<Arc<AppState>>,
) -> Result<Json<DataResponse<Vec<Report>>>, AppError> {
    let reports = state.store.find_all().await.map_err(AppError::Fetch)?;
    Ok(Json(DataResponse {
        message: "Reports fetched",
        data: reports,
    }))
}

/// Fallback for unknown routes.
pub async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(uri.path().to_string())
}
