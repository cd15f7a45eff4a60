use crate::error::Error;
use crate::server::{app_error_response, error_response, AppState};
use crate::services::ChartData;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, instrument, warn};

/// GET /api/tickers - tickers currently present in the meta index
#[instrument(skip(state))]
pub async fn tickers_handler(State(state): State<AppState>) -> Response {
    match state.store.list_tickers() {
        Ok(tickers) => {
            debug!(count = tickers.len(), "listed tickers");
            Json(tickers).into_response()
        }
        Err(e) => {
            warn!(error = %e, "failed to list tickers");
            app_error_response(&e)
        }
    }
}

/// GET /api/available-groups - groups with their chart type and tickers
#[instrument(skip(state))]
pub async fn available_groups_handler(State(state): State<AppState>) -> Response {
    match state.store.group_summary() {
        Ok(groups) => Json(groups).into_response(),
        Err(e) => {
            warn!(error = %e, "failed to build group summary");
            app_error_response(&e)
        }
    }
}

/// Query parameters for /api/chart-data
#[derive(Debug, Deserialize)]
pub struct ChartDataQuery {
    pub ticker: Option<String>,
    pub group: Option<String>,
}

/// GET /api/chart-data?ticker=AI95 or /api/chart-data?group=95
///
/// A single ticker returns its full payload; a group returns a map of
/// payloads for every member with stored data.
#[instrument(skip(state))]
pub async fn chart_data_handler(
    State(state): State<AppState>,
    Query(params): Query<ChartDataQuery>,
) -> Response {
    if let Some(ticker) = params.ticker {
        return match state.store.load_full(&ticker) {
            Ok(payload) => Json(payload).into_response(),
            Err(e) => app_error_response(&e),
        };
    }

    if let Some(group) = params.group {
        return match group_chart_data(&state, &group) {
            Ok(payload) => Json(payload).into_response(),
            Err(e) => app_error_response(&e),
        };
    }

    error_response(
        StatusCode::BAD_REQUEST,
        "either group or ticker parameter is required",
    )
}

fn group_chart_data(
    state: &AppState,
    group: &str,
) -> crate::error::Result<BTreeMap<String, ChartData>> {
    let meta = state.store.load_meta()?;
    let members: Vec<String> = meta
        .values()
        .filter(|entry| entry.group == group)
        .map(|entry| entry.ticker.clone())
        .collect();

    if members.is_empty() {
        return Err(Error::NotFound(format!("group {}", group)));
    }

    let mut payload = BTreeMap::new();
    for ticker in members {
        match state.store.load_full(&ticker) {
            Ok(data) => {
                payload.insert(ticker, data);
            }
            // A meta entry without a history file: skip, like any other
            // missing data file in a group read.
            Err(Error::NotFound(_)) => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(payload)
}

/// Query parameters for /indicators/{ticker}
#[derive(Debug, Deserialize)]
pub struct IndicatorQuery {
    /// Indicator name (e.g. ema, rsi)
    pub indicator: String,
    /// Indicator period (e.g. 14, 50, 200)
    pub period: u32,
}

/// One aligned (date, value) point of an indicator series
#[derive(Debug, Serialize)]
pub struct IndicatorPoint {
    pub date: String,
    pub value: Option<f64>,
}

/// Response for /indicators/{ticker}
#[derive(Debug, Serialize)]
pub struct IndicatorResponse {
    pub ticker: String,
    pub indicator: String,
    pub data: Vec<IndicatorPoint>,
}

/// GET /indicators/{ticker}?indicator=ema&period=50
#[instrument(skip(state))]
pub async fn indicator_handler(
    State(state): State<AppState>,
    Path(ticker): Path<String>,
    Query(params): Query<IndicatorQuery>,
) -> Response {
    match state
        .engine
        .indicator_series(&ticker, &params.indicator, params.period)
    {
        Ok((dates, values)) => {
            let data: Vec<IndicatorPoint> = dates
                .into_iter()
                .zip(values)
                .map(|(date, value)| IndicatorPoint { date, value })
                .collect();
            Json(IndicatorResponse {
                ticker,
                indicator: format!("{}_{}", params.indicator, params.period),
                data,
            })
            .into_response()
        }
        Err(e) => app_error_response(&e),
    }
}

/// GET /indicator-settings - current indicator configuration
#[instrument(skip(state))]
pub async fn indicator_settings_handler(State(state): State<AppState>) -> Response {
    match state.config.get() {
        Ok(config) => Json(config).into_response(),
        Err(e) => {
            warn!(error = %e, "failed to read indicator configuration");
            app_error_response(&e)
        }
    }
}
