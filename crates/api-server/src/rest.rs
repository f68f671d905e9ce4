//! REST handlers for the analysis tracks and operational endpoints.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use campaign_core::config::AnalysisConfig;
use campaign_core::{CampaignError, CampaignResult};
use campaign_engine::{
    CampaignPipeline, CampaignReport, KeywordPipeline, KeywordReport, MonthlyPipeline,
    MonthlyReport,
};
use campaign_ingest::monthly::parse_month_label;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, warn};

/// Shared application state for REST handlers.
#[derive(Clone)]
pub struct AppState {
    pub analysis: Arc<AnalysisConfig>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(analysis: AnalysisConfig) -> Self {
        Self {
            analysis: Arc::new(analysis),
            start_time: Instant::now(),
        }
    }
}

pub type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ErrorResponse>)>;

/// One month of a multi-month upload.
#[derive(Debug, Deserialize)]
pub struct MonthUpload {
    /// Month label such as `Mar 2025`.
    pub label: String,
    /// The month's campaign export, as CSV text.
    pub csv: String,
}

/// POST /v1/analyze/campaigns: campaign export as the CSV request body.
pub async fn analyze_campaigns(State(state): State<AppState>, body: String) -> ApiResult<CampaignReport> {
    run_blocking("campaign", move || {
        CampaignPipeline::new(&state.analysis).run_csv(&body)
    })
    .await
}

/// POST /v1/analyze/keywords: keyword export as the CSV request body.
pub async fn analyze_keywords(State(state): State<AppState>, body: String) -> ApiResult<KeywordReport> {
    run_blocking("keyword", move || {
        KeywordPipeline::new(&state.analysis).run_csv(&body)
    })
    .await
}

/// POST /v1/analyze/monthly: JSON list of `{label, csv}` month exports.
pub async fn analyze_monthly(
    State(state): State<AppState>,
    Json(uploads): Json<Vec<MonthUpload>>,
) -> ApiResult<MonthlyReport> {
    let mut months = Vec::with_capacity(uploads.len());
    for upload in uploads {
        let Some(tag) = parse_month_label(&upload.label) else {
            warn!(label = %upload.label, "Unrecognized month label");
            metrics::counter!("api.validation_errors").increment(1);
            return Err((
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: "invalid_month_label".to_string(),
                    message: format!("expected a label like 'Mar 2025', got '{}'", upload.label),
                }),
            ));
        };
        months.push((tag, upload.csv));
    }

    run_blocking("monthly", move || {
        MonthlyPipeline::new(&state.analysis).run_months(months)
    })
    .await
}

/// Runs a pipeline off the async executor and maps its outcome to HTTP.
async fn run_blocking<T, F>(track: &'static str, f: F) -> ApiResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> CampaignResult<T> + Send + 'static,
{
    metrics::counter!("api.analysis_requests", "track" => track).increment(1);
    match tokio::task::spawn_blocking(f).await {
        Ok(Ok(report)) => Ok(Json(report)),
        Ok(Err(e)) => Err(analysis_error(track, e)),
        Err(e) => {
            error!(track, error = %e, "Analysis task aborted");
            metrics::counter!("api.errors", "track" => track).increment(1);
            Err(internal_error())
        }
    }
}

/// Structural input errors are the caller's problem; anything else is ours.
fn analysis_error(track: &'static str, e: CampaignError) -> (StatusCode, Json<ErrorResponse>) {
    if e.is_structural() {
        warn!(track, error = %e, "Rejected upload");
        metrics::counter!("api.validation_errors").increment(1);
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: e.code().to_string(),
                message: e.to_string(),
            }),
        )
    } else {
        error!(track, error = %e, "Analysis failed");
        metrics::counter!("api.errors", "track" => track).increment(1);
        internal_error()
    }
}

fn internal_error() -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: "analysis_failed".to_string(),
            message: "Internal processing error".to_string(),
        }),
    )
}

/// GET /health: Health check endpoint.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

/// GET /ready: Readiness probe.
pub async fn readiness() -> StatusCode {
    StatusCode::OK
}

/// GET /live: Liveness probe.
pub async fn liveness() -> StatusCode {
    StatusCode::OK
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
}
