pub mod api;
pub mod upload;

use crate::error::AppError;
use crate::services::{
    IndicatorEngine, IngestPipeline, SharedConfigStore, SharedSeriesStore,
};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub store: SharedSeriesStore,
    pub config: SharedConfigStore,
    pub engine: Arc<IndicatorEngine>,
    pub pipeline: Arc<IngestPipeline>,
}

impl AppState {
    pub fn new(store: SharedSeriesStore, config: SharedConfigStore) -> Self {
        let engine = Arc::new(IndicatorEngine::new(store.clone(), config.clone()));
        let pipeline = Arc::new(IngestPipeline::new(store.clone(), engine.clone()));
        Self {
            store,
            config,
            engine,
            pipeline,
        }
    }
}

/// Map a core error onto the HTTP status the caller should see.
fn status_for(error: &AppError) -> StatusCode {
    match error {
        AppError::NotFound(_) => StatusCode::NOT_FOUND,
        AppError::MissingColumns { .. }
        | AppError::DateParse(_)
        | AppError::InvalidNumericValue(_)
        | AppError::NumericCoercion { .. }
        | AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        AppError::Io(_) | AppError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub(crate) fn app_error_response(error: &AppError) -> Response {
    error_response(status_for(error), &error.to_string())
}

pub(crate) fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(serde_json::json!({ "error": message }))).into_response()
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
        .allow_headers(Any);

    Router::new()
        .route("/upload", post(upload::upload_linear_handler))
        .route("/upload-candlestick", post(upload::upload_candlestick_handler))
        .route("/reset", post(upload::reset_handler))
        .route("/set-indicators", post(upload::set_indicators_handler))
        .route("/indicator-settings", get(api::indicator_settings_handler))
        .route("/api/tickers", get(api::tickers_handler))
        .route("/api/available-groups", get(api::available_groups_handler))
        .route("/api/chart-data", get(api::chart_data_handler))
        .route("/indicators/{ticker}", get(api::indicator_handler))
        .layer(cors)
        .with_state(state)
}

/// Start the axum server
pub async fn serve(state: AppState, port: u16) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!("Starting priceboard server");
    tracing::info!("Registering routes:");
    tracing::info!("  POST /upload");
    tracing::info!("  POST /upload-candlestick");
    tracing::info!("  POST /reset");
    tracing::info!("  POST /set-indicators");
    tracing::info!("  GET  /indicator-settings");
    tracing::info!("  GET  /api/tickers");
    tracing::info!("  GET  /api/available-groups");
    tracing::info!("  GET  /api/chart-data?ticker=|group=");
    tracing::info!("  GET  /indicators/{{ticker}}?indicator=&period=");

    let app = router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!(%addr, "Server listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
