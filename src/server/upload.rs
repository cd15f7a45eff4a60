use crate::models::{IndicatorConfigUpdate, Table, Workbook};
use crate::server::{app_error_response, error_response, AppState};
use axum::extract::{Multipart, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Deserialize;
use tracing::{error, info, instrument, warn};

/// POST /upload - linear spreadsheet upload
///
/// Expects one multipart file field containing a CSV export with
/// `date, ticker, volume, price` columns.
#[instrument(skip(state, multipart))]
pub async fn upload_linear_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Response {
    let (filename, table) = match read_single_table(&mut multipart).await {
        Ok(decoded) => decoded,
        Err(response) => return response,
    };

    info!(filename = %filename, rows = table.rows.len(), "processing linear upload");

    match state.pipeline.ingest_linear(&table) {
        Ok(stats) => Json(serde_json::json!({
            "message": "Data processed successfully",
            "filename": filename,
            "statistics": stats,
        }))
        .into_response(),
        Err(e) => {
            error!(filename = %filename, error = %e, "linear upload failed");
            app_error_response(&e)
        }
    }
}

/// POST /upload-candlestick - multi-sheet candlestick upload
///
/// Each multipart field is one sheet: the field name (or file stem) is the
/// ticker, the content a CSV with `date, open, high, low, close, volume`
/// columns.
#[instrument(skip(state, multipart))]
pub async fn upload_candlestick_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Response {
    let mut workbook = Workbook::new();

    while let Ok(Some(field)) = multipart.next_field().await {
        let sheet_name = match sheet_name_for(field.name(), field.file_name()) {
            Some(name) => name,
            None => {
                warn!("multipart field without a usable name, skipping");
                continue;
            }
        };

        let data = match field.bytes().await {
            Ok(bytes) => bytes,
            Err(e) => {
                error!(sheet = %sheet_name, error = %e, "failed to read upload field");
                return error_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "failed to read file data",
                );
            }
        };

        match Table::from_csv(data.as_ref()) {
            Ok(table) => workbook.add_sheet(sheet_name, table),
            Err(e) => {
                return error_response(
                    StatusCode::BAD_REQUEST,
                    &format!("sheet {} is not valid CSV: {}", sheet_name, e),
                );
            }
        }
    }

    if workbook.sheets.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "upload contains no sheets");
    }

    info!(sheets = workbook.sheets.len(), "processing candlestick upload");

    match state.pipeline.ingest_candlestick(&workbook) {
        Ok(stats) => Json(serde_json::json!({
            "message": "Candlestick data processed successfully",
            "statistics": stats,
        }))
        .into_response(),
        Err(e) => {
            error!(error = %e, "candlestick upload failed");
            app_error_response(&e)
        }
    }
}

/// Query parameters for /reset
#[derive(Debug, Deserialize)]
pub struct ResetQuery {
    pub ticker: Option<String>,
}

/// POST /reset or /reset?ticker=AI95
#[instrument(skip(state))]
pub async fn reset_handler(
    State(state): State<AppState>,
    Query(params): Query<ResetQuery>,
) -> Response {
    match state.store.reset(params.ticker.as_deref()) {
        Ok(()) => {
            let message = match params.ticker {
                Some(ticker) => format!("Data reset for {}", ticker),
                None => "All data reset".to_string(),
            };
            Json(serde_json::json!({ "message": message })).into_response()
        }
        Err(e) => {
            error!(error = %e, "reset failed");
            app_error_response(&e)
        }
    }
}

/// POST /set-indicators - update configuration and resweep every ticker
#[instrument(skip(state, update))]
pub async fn set_indicators_handler(
    State(state): State<AppState>,
    Json(update): Json<IndicatorConfigUpdate>,
) -> Response {
    let config = match state.config.update(update) {
        Ok(config) => config,
        Err(e) => return app_error_response(&e),
    };

    match state.engine.recompute_all() {
        Ok(sweep) => Json(serde_json::json!({
            "message": "Indicators updated successfully",
            "config": config,
            "sweep": sweep,
        }))
        .into_response(),
        Err(e) => {
            error!(error = %e, "indicator sweep failed");
            app_error_response(&e)
        }
    }
}

/// Read the single file field of a linear upload into a decoded table.
async fn read_single_table(
    multipart: &mut Multipart,
) -> std::result::Result<(String, Table), Response> {
    while let Ok(Some(field)) = multipart.next_field().await {
        let filename = field
            .file_name()
            .map(|name| name.to_string())
            .or_else(|| field.name().map(|name| name.to_string()));
        let filename = match filename {
            Some(name) => name,
            None => continue,
        };

        let data = field.bytes().await.map_err(|e| {
            error!(error = %e, "failed to read upload field");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "failed to read file data")
        })?;

        let table = Table::from_csv(data.as_ref()).map_err(|e| {
            error_response(StatusCode::BAD_REQUEST, &format!("not valid CSV: {}", e))
        })?;

        return Ok((filename, table));
    }

    Err(error_response(
        StatusCode::BAD_REQUEST,
        "upload contains no file field",
    ))
}

/// Sheet name: prefer the multipart field name, fall back to the file name
/// without its extension.
fn sheet_name_for(field_name: Option<&str>, file_name: Option<&str>) -> Option<String> {
    if let Some(name) = field_name {
        let trimmed = name.trim();
        if !trimmed.is_empty() && trimmed != "file" {
            return Some(trimmed.to_string());
        }
    }
    file_name.map(|name| {
        std::path::Path::new(name)
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| name.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sheet_name_prefers_field_name() {
        assert_eq!(
            sheet_name_for(Some("BRENT"), Some("export.csv")),
            Some("BRENT".to_string())
        );
    }

    #[test]
    fn test_sheet_name_falls_back_to_file_stem() {
        assert_eq!(
            sheet_name_for(Some("file"), Some("BRENT.csv")),
            Some("BRENT".to_string())
        );
        assert_eq!(sheet_name_for(None, Some("WTI.csv")), Some("WTI".to_string()));
    }

    #[test]
    fn test_sheet_name_none_when_unnamed() {
        assert_eq!(sheet_name_for(None, None), None);
        assert_eq!(sheet_name_for(Some("  "), None), None);
    }
}
