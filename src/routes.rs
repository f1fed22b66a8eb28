use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::json;
use std::{collections::BTreeMap, sync::Arc};
use tower_http::cors::{Any, CorsLayer};

use crate::{
    config::{ApiKeys, ConfiguredProviders, MaskedKeys},
    models::{Area, EnrichedPlan, GenerateRequest},
    planner::PlanGenerator,
};

#[derive(Clone)]
pub struct AppState {
    pub generator: Arc<PlanGenerator>,
    pub api_keys: Arc<ApiKeys>,
}

/// Failure envelope: `{ "success": false, "error": ... }`.
pub struct AppError {
    status: StatusCode,
    message: String,
}

impl AppError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self { status: StatusCode::BAD_REQUEST, message: msg.into() }
    }

    pub fn internal(err: impl std::fmt::Display) -> Self {
        Self { status: StatusCode::INTERNAL_SERVER_ERROR, message: err.to_string() }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "success": false, "error": self.message }))).into_response()
    }
}

#[derive(Debug, Serialize)]
pub struct PlansResponse {
    pub success: bool,
    pub plans: Vec<EnrichedPlan>,
}

#[derive(Debug, Serialize)]
pub struct KeyStatusResponse {
    pub success: bool,
    pub configured: ConfiguredProviders,
    pub keys: MaskedKeys,
}

#[derive(Debug, Serialize)]
pub struct AreasResponse<'a> {
    pub success: bool,
    pub areas: &'a BTreeMap<String, Area>,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/plan/generate", post(generate_plans).fallback(method_not_allowed))
        .route("/api/plan/areas", get(list_areas))
        .route("/api/settings/keys", get(key_status))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        )
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> { Json(json!({ "status": "ok" })) }

async fn method_not_allowed() -> Response {
    (StatusCode::METHOD_NOT_ALLOWED, Json(json!({ "error": "Method not allowed" }))).into_response()
}

pub async fn generate_plans(
    State(state): State<AppState>,
    body: Result<Json<GenerateRequest>, JsonRejection>,
) -> Result<Json<PlansResponse>, AppError> {
    let Json(req) = body.map_err(|rejection| {
        tracing::warn!("⚠️ Rejected plan request body: {}", rejection.body_text());
        AppError::bad_request(rejection.body_text())
    })?;

    tracing::info!("🚀 Generating plans: duration={:?} tags={:?} purpose={:?}", req.duration, req.tags, req.purpose);

    let plans = state.generator.generate(&req).map_err(|e| {
        tracing::error!("❌ Plan generation failed: {}", e);
        AppError::internal(e)
    })?;
    Ok(Json(PlansResponse { success: true, plans }))
}

pub async fn list_areas(State(state): State<AppState>) -> Response {
    Json(AreasResponse { success: true, areas: state.generator.catalog().areas() }).into_response()
}

pub async fn key_status(State(state): State<AppState>) -> Json<KeyStatusResponse> {
    Json(KeyStatusResponse {
        success: true,
        configured: state.api_keys.configured(),
        keys: state.api_keys.masked(),
    })
}
