use axum::{
    extract::DefaultBodyLimit,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use database::ReportStore;
use serde_json::json;
use std::any::Any;
use std::sync::Arc;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{AllowHeaders, AllowOrigin, Any as AnyCors, CorsLayer},
    trace::TraceLayer,
};

pub mod error;
pub mod extract;
pub mod handlers;
pub mod lifecycle;
pub mod shutdown;

pub use error::AppError;
pub use lifecycle::{run, Lifecycle, Server, Stage, StartupError, ValidatedConfig};

/// Maximum accepted request body: 1 MiB.
const MAX_BODY_SIZE: usize = 1024 * 1024;

/// The shared application state that all handlers can access.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ReportStore>,
}

impl AppState {
    pub fn new(store: Arc<dyn ReportStore>) -> Self {
        Self { store }
    }
}

/// Builds the router with every route and middleware layer.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::any())
        .allow_methods(AnyCors)
        .allow_headers(AllowHeaders::any());

    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/get", get(handlers::list_reports))
        .route("/add", post(handlers::add_report))
        .fallback(handlers::not_found)
        .with_state(Arc::new(state))
        .layer(cors)
        // Logs every incoming request and its response status.
        .layer(TraceLayer::new_for_http())
        // A panicking handler answers 500 instead of dropping the connection.
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE))
}

fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic payload");
    tracing::error!(panic = detail, "Request handler panicked.");

    let body = Json(json!({ "message": "Internal server error" }));
    (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
}
