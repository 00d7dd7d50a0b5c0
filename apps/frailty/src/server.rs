//! HTTP surface: the questionnaire form plus a small JSON API.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Form, Json, State},
    http::{Method, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Router,
};
use frailty_ai::{Evaluation, EvaluationOptions, Evaluator};
use frailty_model::{FeatureVector, Indicator, InputError};
use log::{debug, error, info};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tower_http::cors::{Any, CorsLayer};

use crate::output::{catalogue, EvaluationReport, FeatureInfo};
use crate::pages;

/// Shared, read-only per-process state.
#[derive(Clone)]
pub struct AppState {
    evaluator: Arc<Evaluator>,
    options: EvaluationOptions,
}

impl AppState {
    pub fn new(evaluator: Arc<Evaluator>, options: EvaluationOptions) -> Self {
        Self { evaluator, options }
    }

    async fn evaluate(&self, features: FeatureVector) -> Result<Evaluation, ApiError> {
        let evaluator = Arc::clone(&self.evaluator);
        let options = self.options;
        tokio::task::spawn_blocking(move || evaluator.evaluate(&features, &options))
            .await
            .map_err(|e| ApiError::Internal(e.to_string()))
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Input(#[from] InputError),
    #[error("request must contain either \"features\" or \"codes\"")]
    EmptyRequest,
    #[error("malformed request: {}", .0.body_text())]
    Malformed(#[from] JsonRejection),
    #[error("evaluation failed: {0}")]
    Internal(String),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    field: Option<&'static str>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Input(_) | ApiError::EmptyRequest => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Malformed(rejection) => rejection.status(),
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let field = match &self {
            ApiError::Input(e) => e.indicator().map(Indicator::key),
            _ => None,
        };
        let body = ErrorBody {
            error: self.to_string(),
            field,
        };
        (status, Json(body)).into_response()
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PredictRequest {
    #[serde(default)]
    pub features: Option<BTreeMap<String, i64>>,
    #[serde(default)]
    pub codes: Option<Vec<i64>>,
}

impl PredictRequest {
    pub fn into_features(self) -> Result<FeatureVector, ApiError> {
        match (self.features, self.codes) {
            (Some(map), None) => Ok(FeatureVector::from_map(&map)?),
            (None, Some(codes)) => Ok(FeatureVector::from_codes(&codes)?),
            _ => Err(ApiError::EmptyRequest),
        }
    }
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    Router::new()
        .route("/", get(index))
        .route("/predict", post(predict_form))
        .route("/api/predict", post(api_predict))
        .route("/api/features", get(api_features))
        .route("/health", get(health))
        .layer(cors)
        .with_state(state)
}

pub async fn serve(addr: SocketAddr, state: AppState) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("frailty server listening on http://{addr}");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("shutting down");
            }
        })
        .await
}

async fn health() -> &'static str {
    "ok"
}

async fn index(State(state): State<AppState>) -> Html<String> {
    Html(pages::page(
        state.options.locale,
        &FeatureVector::all_zero(),
        None,
        None,
    ))
}

async fn predict_form(
    State(state): State<AppState>,
    Form(fields): Form<Vec<(String, String)>>,
) -> Response {
    let locale = state.options.locale;
    let features = match FeatureVector::from_pairs(fields.iter().map(|(k, v)| (k, v))) {
        Ok(f) => f,
        Err(e) => {
            debug!("rejected form submission: {e}");
            let answers = sticky_answers(&fields);
            let html = pages::page(locale, &answers, Some(&e.to_string()), None);
            return (StatusCode::UNPROCESSABLE_ENTITY, Html(html)).into_response();
        }
    };
    match state.evaluate(features).await {
        Ok(ev) => Html(pages::page(locale, &features, None, Some(&ev))).into_response(),
        Err(e) => {
            error!("{e}");
            e.into_response()
        }
    }
}

/// Best-effort reconstruction of a rejected form so valid answers stay selected.
fn sticky_answers(fields: &[(String, String)]) -> FeatureVector {
    fields
        .iter()
        .fold(FeatureVector::all_zero(), |acc, (k, v)| {
            match (Indicator::from_key(k), v.trim()) {
                (Some(i), "1") => acc.with(i, true),
                _ => acc,
            }
        })
}

async fn api_predict(
    State(state): State<AppState>,
    payload: Result<Json<PredictRequest>, JsonRejection>,
) -> Result<Json<EvaluationReport>, ApiError> {
    let Json(req) = payload?;
    let features = req.into_features()?;
    let ev = state.evaluate(features).await?;
    Ok(Json(EvaluationReport::from(&ev)))
}

async fn api_features(State(state): State<AppState>) -> Json<Vec<FeatureInfo>> {
    Json(catalogue(state.options.locale))
}
