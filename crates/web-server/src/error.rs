use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use core_types::ReportError;
use database::{ConnectionState, DbError};
use serde_json::{json, Value};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid report: {error}")]
    InvalidReport { error: ReportError, received: Value },
    #[error("Request body rejected: {message}")]
    BodyRejected { status: StatusCode, message: String },
    #[error("Database not connected (state={})", .0.code())]
    StoreUnavailable(ConnectionState),
    #[error("Error saving data: {0}")]
    Save(DbError),
    #[error("Error fetching data: {0}")]
    Fetch(DbError),
    #[error("Not found: {0}")]
    NotFound(String),
}

/// Converts our custom `AppError` into an HTTP response.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::InvalidReport { error, received } => {
                tracing::info!(error = %error, "Rejected report payload.");
                let message = match error {
                    ReportError::MissingFields(_) => "Missing fields fullName/orderId/issue",
                    ReportError::InvalidFields(_) => "Invalid report fields",
                };
                (
                    StatusCode::BAD_REQUEST,
                    json!({ "message": message, "received": received, "details": error.details() }),
                )
            }
            AppError::BodyRejected { status, message } => {
                tracing::info!(%status, error = %message, "Malformed request body.");
                (
                    status,
                    json!({ "message": "Malformed request body", "error": message }),
                )
            }
            AppError::StoreUnavailable(state) => {
                tracing::warn!(mongo_state = state.code(), "DB not connected.");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    json!({ "message": "DB not connected, try later", "mongoState": state }),
                )
            }
            AppError::Save(db_err) => {
                tracing::error!(error = ?db_err, "Error saving data.");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "message": "Error saving data", "error": error_detail(&db_err) }),
                )
            }
            AppError::Fetch(db_err) => {
                tracing::error!(error = ?db_err, "Error fetching data.");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "message": "Error fetching data", "error": error_detail(&db_err) }),
                )
            }
            AppError::NotFound(path) => (
                StatusCode::NOT_FOUND,
                json!({ "message": "Not found", "path": path }),
            ),
        };

        (status, Json(body)).into_response()
    }
}

/// `{ name, message, details? }` for a store failure.
fn error_detail(err: &DbError) -> Value {
    let mut detail = json!({ "name": err.name(), "message": err.to_string() });
    if let Some(details) = err.details() {
        detail["details"] = json!(details);
    }
    detail
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::FieldErrors;

    #[test]
    fn store_detail_includes_fields_only_for_validation_errors() {
        let mut fields = FieldErrors::new();
        fields.insert("orderId", "must be a number");
        let detail = error_detail(&DbError::ValidationError(fields));
        assert_eq!(detail["name"], "ValidationError");
        assert_eq!(detail["details"]["orderId"], "must be a number");

        let detail = error_detail(&DbError::NotConnected);
        assert_eq!(detail["name"], "MongoNotConnectedError");
        assert!(detail.get("details").is_none());
    }

    #[test]
    fn status_codes_follow_error_kind() {
        let cases = [
            (
                AppError::StoreUnavailable(ConnectionState::Connecting),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (AppError::Save(DbError::NotConnected), StatusCode::INTERNAL_SERVER_ERROR),
            (AppError::Fetch(DbError::NotConnected), StatusCode::INTERNAL_SERVER_ERROR),
            (AppError::NotFound("/nope".into()), StatusCode::NOT_FOUND),
            (
                AppError::BodyRejected {
                    status: StatusCode::PAYLOAD_TOO_LARGE,
                    message: "too big".into(),
                },
                StatusCode::PAYLOAD_TOO_LARGE,
            ),
        ];
        for (error, status) in cases {
            assert_eq!(error.into_response().status(), status);
        }
    }
}
