use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::Deserialize;

use crate::error::{RegistryError, StorageError};
use crate::orchestrator::{CycleSummary, PollOrchestrator};
use crate::registry::ImportReport;
use crate::store::SeenLedger;
use crate::types::{SeenRecord, Source, SourceIdentity};

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<PollOrchestrator>,
    pub ledger: Arc<dyn SeenLedger>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route(
            "/sources",
            get(list_sources).post(add_source).delete(remove_by_name),
        )
        .route("/sources/import", post(import_sources))
        .route("/sources/{id}", delete(remove_source))
        .route("/sources/{id}/seen", get(seen_for_source))
        .route("/check", post(check_now))
        .with_state(state)
}

pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl ToString) -> Self {
        Self {
            status,
            message: message.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "error": self.message });
        (self.status, Json(body)).into_response()
    }
}

impl From<StorageError> for ApiError {
    fn from(e: StorageError) -> Self {
        tracing::error!(error = %e, "storage error in api");
        Self::new(StatusCode::SERVICE_UNAVAILABLE, e)
    }
}

impl From<RegistryError> for ApiError {
    fn from(e: RegistryError) -> Self {
        match e {
            RegistryError::Duplicate { .. } => Self::new(StatusCode::CONFLICT, e),
            RegistryError::Resolution(_) => Self::new(StatusCode::UNPROCESSABLE_ENTITY, e),
            RegistryError::Storage(inner) => inner.into(),
        }
    }
}

async fn list_sources(State(state): State<AppState>) -> Result<Json<Vec<Source>>, ApiError> {
    Ok(Json(state.orchestrator.registry().list()?))
}

#[derive(Deserialize)]
struct AddReq {
    locator: String,
}

async fn add_source(
    State(state): State<AppState>,
    Json(body): Json<AddReq>,
) -> Result<(StatusCode, Json<Source>), ApiError> {
    let fetcher = state.orchestrator.detector().fetcher().clone();
    let source = state
        .orchestrator
        .registry()
        .add(fetcher.as_ref(), &body.locator)
        .await?;
    Ok((StatusCode::CREATED, Json(source)))
}

async fn import_sources(
    State(state): State<AppState>,
    Json(identities): Json<Vec<SourceIdentity>>,
) -> Result<Json<ImportReport>, ApiError> {
    Ok(Json(state.orchestrator.registry().import_synced(identities)?))
}

async fn remove_source(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if state.orchestrator.registry().remove_by_id(&id)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::new(StatusCode::NOT_FOUND, format!("no source {id}")))
    }
}

#[derive(Deserialize)]
struct ByName {
    name: String,
}

async fn remove_by_name(
    State(state): State<AppState>,
    Query(q): Query<ByName>,
) -> Result<StatusCode, ApiError> {
    if state.orchestrator.registry().remove(&q.name)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::new(
            StatusCode::NOT_FOUND,
            format!("no source named {}", q.name),
        ))
    }
}

async fn seen_for_source(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<SeenRecord>>, ApiError> {
    Ok(Json(state.ledger.list_for_source(&id)?))
}

/// Manual "check now". Subject to the same minimum interval as the scheduler.
async fn check_now(State(state): State<AppState>) -> Result<Json<CycleSummary>, ApiError> {
    state
        .orchestrator
        .run_cycle()
        .await
        .map(Json)
        .map_err(|e| ApiError::new(StatusCode::SERVICE_UNAVAILABLE, e))
}
