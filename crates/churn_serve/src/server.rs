use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use churn_core::{validate_batch, ChurnError, FieldViolation, Predictions, Record};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;
use tracing::{debug, error, warn};

use crate::readiness::PipelineHandle;
use crate::telemetry::{PREDICTIONS_TOTAL, PREDICTION_ERRORS_TOTAL, VALIDATION_REJECTIONS_TOTAL};

#[derive(Clone)]
pub struct AppState {
    pub pipeline: PipelineHandle,
    pub start_time: Instant,
    pub prometheus: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(pipeline: PipelineHandle, prometheus: Option<PrometheusHandle>) -> Self {
        Self {
            pipeline,
            start_time: Instant::now(),
            prometheus,
        }
    }

    fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

pub type SharedState = Arc<AppState>;

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    violations: Vec<FieldViolation>,
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
    violations: Vec<FieldViolation>,
}

impl ApiError {
    fn new<S: Into<String>>(status: StatusCode, message: S) -> Self {
        Self {
            status,
            message: message.into(),
            violations: Vec::new(),
        }
    }

    fn internal<S: Into<String>>(message: S) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    fn service_unavailable<S: Into<String>>(message: S) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, message)
    }
}

impl From<ChurnError> for ApiError {
    fn from(err: ChurnError) -> Self {
        match err {
            ChurnError::Validation(violations) => Self {
                status: StatusCode::UNPROCESSABLE_ENTITY,
                message: format!("{} field(s) failed validation", violations.len()),
                violations,
            },
            ChurnError::NotReady => Self::service_unavailable("model is not loaded yet"),
            other => Self::internal(other.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(rejection.status(), rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let payload = Json(ErrorResponse {
            error: self.message,
            violations: self.violations,
        });
        (self.status, payload).into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct PredictionRequest {
    pub records: Vec<Record>,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    ready: bool,
    uptime_secs: u64,
    version: &'static str,
}

#[derive(Debug, Serialize)]
struct ReadyResponse {
    ready: bool,
}

/// Bind the HTTP listener; accepts `host:port` or a socket address
pub async fn bind_listener(addr: &str) -> Result<tokio::net::TcpListener> {
    if let Ok(socket_addr) = addr.parse::<SocketAddr>() {
        tokio::net::TcpListener::bind(socket_addr)
            .await
            .with_context(|| format!("failed to bind HTTP listener on {socket_addr}"))
    } else {
        tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind HTTP listener on {addr}"))
    }
}

pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(handle_health))
        .route("/ready", get(handle_ready))
        .route("/predict", post(handle_predict))
        .route("/metrics", get(handle_metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn handle_health(State(state): State<SharedState>) -> Json<HealthResponse> {
    let ready = state.pipeline.is_ready();
    Json(HealthResponse {
        status: if ready { "ok" } else { "starting" },
        ready,
        uptime_secs: state.uptime_seconds(),
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn handle_ready(State(state): State<SharedState>) -> (StatusCode, Json<ReadyResponse>) {
    let ready = state.pipeline.is_ready();
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(ReadyResponse { ready }))
}

async fn handle_predict(
    State(state): State<SharedState>,
    payload: std::result::Result<Json<PredictionRequest>, JsonRejection>,
) -> Result<Json<Predictions>, ApiError> {
    let pipeline = state.pipeline.get()?;
    let Json(request) = payload.map_err(|rejection| {
        metrics::counter!(VALIDATION_REJECTIONS_TOTAL).increment(1);
        debug!("Rejected malformed prediction request: {}", rejection.body_text());
        ApiError::from(rejection)
    })?;

    if let Err(err) = validate_batch(&request.records) {
        metrics::counter!(VALIDATION_REJECTIONS_TOTAL).increment(1);
        debug!("Rejected batch of {} record(s): {}", request.records.len(), err);
        return Err(err.into());
    }

    match pipeline.predict_records(&request.records) {
        Ok(predictions) => {
            metrics::counter!(PREDICTIONS_TOTAL).increment(predictions.len() as u64);
            Ok(Json(predictions))
        }
        Err(err) => {
            metrics::counter!(PREDICTION_ERRORS_TOTAL).increment(1);
            error!("Prediction failed for batch of {}: {}", request.records.len(), err);
            Err(err.into())
        }
    }
}

async fn handle_metrics(State(state): State<SharedState>) -> Result<Response, ApiError> {
    let Some(prometheus) = &state.prometheus else {
        warn!("Metrics requested but the Prometheus exporter is disabled");
        return Err(ApiError::new(
            StatusCode::NOT_FOUND,
            "metrics exporter disabled",
        ));
    };

    let mut response = prometheus.render().into_response();
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; version=0.0.4"),
    );
    Ok(response)
}
