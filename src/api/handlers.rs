use axum::extract::{Multipart, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use std::sync::Arc;
use std::time::Duration;

use crate::error::EngineError;
use crate::ingest;
use crate::pipeline::AnalysisEngine;
use crate::store::StoredResult;

use super::types::*;
use super::AppState;

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ErrorResponse>)>;

fn api_error(status: StatusCode, msg: impl Into<String>) -> (StatusCode, Json<ErrorResponse>) {
    (
        status,
        Json(ErrorResponse {
            error: msg.into(),
        }),
    )
}

// ============================================================
// Health
// ============================================================

pub async fn health(State(_state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "online".to_string(),
        engine: format!("mulewatch {}", env!("CARGO_PKG_VERSION")),
        patterns: vec![
            "circular_fund_routing",
            "smurfing_patterns",
            "layered_shell_networks",
        ],
    })
}

// ============================================================
// Analyze
// ============================================================

pub async fn analyze(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> ApiResult<AnalyzeResponse> {
    let content = read_csv_upload(&mut multipart).await?;

    let transactions = ingest::parse_csv(&content)
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, e.to_string()))?;

    if transactions.len() > state.config.limits.max_transactions {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            format!(
                "Upload has {} transactions; limit is {}",
                transactions.len(),
                state.config.limits.max_transactions
            ),
        ));
    }

    // One run at a time; each run owns its own graph.
    let _guard = state.analyze_lock.lock().await;

    let engine = AnalysisEngine::new(state.config.detection.clone());
    let budget = Duration::from_secs(state.config.limits.processing_timeout_secs);
    let run = tokio::task::spawn_blocking(move || engine.run(&transactions));

    let outcome = match tokio::time::timeout(budget, run).await {
        Err(_) => {
            // The blocking task cannot be cancelled; it keeps its thread
            // until it finishes, and releasing the lock here lets the next
            // upload overlap its tail. Its result is discarded either way.
            return Err(api_error(
                StatusCode::SERVICE_UNAVAILABLE,
                "Analysis exceeded the processing time budget",
            ))
        }
        Ok(Err(join_err)) => {
            return Err(api_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Analysis task failed: {join_err}"),
            ))
        }
        Ok(Ok(Err(EngineError::EmptyGraph))) => {
            return Err(api_error(
                StatusCode::BAD_REQUEST,
                "CSV file is empty or has no valid transactions",
            ))
        }
        Ok(Ok(Ok(outcome))) => outcome,
    };

    state
        .store
        .publish(StoredResult {
            report: outcome.report.clone(),
            graph: outcome.graph_data.clone(),
        })
        .await;

    Ok(Json(AnalyzeResponse {
        report: outcome.report,
        graph_data: outcome.graph_data,
    }))
}

/// Pull the CSV file out of the multipart form. Accepts the first field
/// named `file` (or the first file-bearing field), rejecting non-CSV names.
async fn read_csv_upload(
    multipart: &mut Multipart,
) -> Result<Vec<u8>, (StatusCode, Json<ErrorResponse>)> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, format!("Invalid multipart body: {e}")))?
    {
        let is_file = field.file_name().is_some() || field.name() == Some("file");
        if !is_file {
            continue;
        }

        if let Some(name) = field.file_name() {
            if !name.to_ascii_lowercase().ends_with(".csv") {
                return Err(api_error(
                    StatusCode::BAD_REQUEST,
                    "Only CSV files are accepted",
                ));
            }
        }

        let bytes = field
            .bytes()
            .await
            .map_err(|e| api_error(StatusCode::BAD_REQUEST, format!("Failed to read upload: {e}")))?;
        return Ok(bytes.to_vec());
    }

    Err(api_error(
        StatusCode::BAD_REQUEST,
        "Multipart form must contain a CSV file field",
    ))
}

// ============================================================
// Export & graph projection
// ============================================================

pub async fn export_json(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, Json<ErrorResponse>)> {
    let latest = state.store.latest().await.ok_or_else(|| {
        api_error(
            StatusCode::NOT_FOUND,
            "No analysis data available; run /api/v1/analyze first",
        )
    })?;

    // Export carries the scoring report only, without the graph view.
    Ok((
        [(
            header::CONTENT_DISPOSITION,
            "attachment; filename=mule_detection_results.json",
        )],
        Json(latest.report.clone()),
    ))
}

pub async fn graph(State(state): State<Arc<AppState>>) -> ApiResult<crate::model::GraphData> {
    state
        .store
        .latest()
        .await
        .map(|latest| Json(latest.graph.clone()))
        .ok_or_else(|| {
            api_error(
                StatusCode::NOT_FOUND,
                "No analysis data available; run /api/v1/analyze first",
            )
        })
}
