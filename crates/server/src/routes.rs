//! HTTP surface over the scan-state engine and live resolver.
//!
//! All JSON bodies are camelCase, matching the entities' own serialization.
//! Scan, status, and redirect are public; generation, blocking, deletion,
//! and live-link updates require the admin bearer token.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::{Method, StatusCode, header};
use axum::response::{IntoResponse, Redirect};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use chrono::Utc;
use mealpass_core::{Error, HistoryRecord, LiveConfigRecord, QrCode, ScanHistory, ScanOutcome};
use serde::Deserialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;

use crate::auth::AdminUser;
use crate::error::ApiError;
use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .max_age(Duration::from_secs(60 * 60));

    let api = Router::new()
        .route("/generate", post(generate))
        .route("/scan", post(scan))
        .route("/meal-status/{qr_number}", get(meal_status))
        .route("/history/{qr_number}", get(history))
        .route("/allhistory", get(all_codes))
        .route("/block", post(block))
        .route("/unblock", post(unblock))
        .route("/delete/{qr_number}", delete(delete_code))
        .route("/update-live-link", post(update_live_link))
        .route("/redirect/{qr_number}", get(redirect));

    Router::new()
        .nest("/api/v1", api)
        .nest_service("/blobs", ServeDir::new(&state.config.blob_root))
        .layer(cors)
        .with_state(state)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QrNumberRequest {
    qr_number: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateLiveLinkRequest {
    url: String,
}

async fn generate(
    State(state): State<Arc<AppState>>,
    AdminUser(_): AdminUser,
) -> Result<(StatusCode, Json<QrCode>), ApiError> {
    let qr = state.engine.generate().await?;
    Ok((StatusCode::CREATED, Json(qr)))
}

async fn scan(
    State(state): State<Arc<AppState>>,
    Json(request): Json<QrNumberRequest>,
) -> Result<Json<ScanOutcome>, ApiError> {
    let outcome = state.engine.scan(&request.qr_number, Utc::now()).await?;
    Ok(Json(outcome))
}

async fn meal_status(
    State(state): State<Arc<AppState>>,
    Path(qr_number): Path<String>,
) -> Result<Json<ScanHistory>, ApiError> {
    let status = state.engine.today_meal_status(&qr_number, Utc::now()).await?;
    Ok(Json(status))
}

async fn history(
    State(state): State<Arc<AppState>>,
    Path(qr_number): Path<String>,
) -> Result<Json<Vec<HistoryRecord>>, ApiError> {
    let records = state.engine.history(&qr_number).await?;
    Ok(Json(records))
}

async fn all_codes(State(state): State<Arc<AppState>>) -> Result<Json<Vec<QrCode>>, ApiError> {
    let codes = state.engine.get_all().await?;
    Ok(Json(codes))
}

async fn block(
    State(state): State<Arc<AppState>>,
    AdminUser(_): AdminUser,
    Json(request): Json<QrNumberRequest>,
) -> Result<Json<QrCode>, ApiError> {
    let qr = state.engine.block(&request.qr_number).await?;
    Ok(Json(qr))
}

async fn unblock(
    State(state): State<Arc<AppState>>,
    AdminUser(_): AdminUser,
    Json(request): Json<QrNumberRequest>,
) -> Result<Json<QrCode>, ApiError> {
    let qr = state.engine.unblock(&request.qr_number).await?;
    Ok(Json(qr))
}

async fn delete_code(
    State(state): State<Arc<AppState>>,
    AdminUser(_): AdminUser,
    Path(qr_number): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.engine.delete(&qr_number).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn update_live_link(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Json(request): Json<UpdateLiveLinkRequest>,
) -> Result<Json<LiveConfigRecord>, ApiError> {
    let record = state.live.set_live_url(&request.url, &admin).await?;
    Ok(Json(record))
}

/// The scanned QR payload lands here. The number itself is not consulted;
/// the destination is whatever live URL is currently configured.
async fn redirect(
    State(state): State<Arc<AppState>>,
    Path(_qr_number): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    match state.live.resolve_live_url().await? {
        Some(url) => Ok(Redirect::temporary(&url)),
        None => Err(ApiError::Core(Error::NotFound("no live event configured".into()))),
    }
}
