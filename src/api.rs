use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;

use crate::batch::{self, BatchCursor, BatchReport};
use crate::config::SeoConfig;
use crate::content::{ContentId, ContentItem, ContentUpdate};
use crate::diagnostics::{Diagnostic, DiagnosticLog};
use crate::processor::{record_failure, ProcessError, ProcessOutcome, SaveHook, Trigger};
use crate::readiness::{self, Readiness};
use crate::store::ContentStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ContentStore>,
    config: Arc<RwLock<SeoConfig>>,
    pub diagnostics: Arc<DiagnosticLog>,
    pub hook: SaveHook,
    pub batch_cursor: Arc<BatchCursor>,
}

impl AppState {
    pub fn new(store: Arc<dyn ContentStore>, config: SeoConfig) -> Self {
        let diagnostics = Arc::new(DiagnosticLog::with_capacity(config.diagnostics_capacity));
        Self {
            store,
            config: Arc::new(RwLock::new(config)),
            diagnostics,
            hook: SaveHook::new(),
            batch_cursor: Arc::new(BatchCursor::new()),
        }
    }

    /// Snapshot of the current config; operations take it by reference.
    pub fn config(&self) -> SeoConfig {
        match self.config.read() {
            Ok(g) => g.clone(),
            Err(p) => p.into_inner().clone(),
        }
    }

    pub fn replace_config(&self, fresh: SeoConfig) {
        match self.config.write() {
            Ok(mut w) => *w = fresh,
            Err(p) => *p.into_inner() = fresh,
        }
    }
}

type ApiError = (StatusCode, String);

fn internal(e: anyhow::Error) -> ApiError {
    (StatusCode::INTERNAL_SERVER_ERROR, format!("{e:#}"))
}

fn not_found(id: ContentId) -> ApiError {
    (StatusCode::NOT_FOUND, format!("content item {id} not found"))
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/items/{id}", get(get_item).put(update_item))
        .route("/items/{id}/readiness", get(item_readiness))
        .route("/items/{id}/process", post(process_item))
        .route("/batch/run", post(run_batch))
        .route("/debug/diagnostics", get(debug_diagnostics))
        .route("/admin/reload-config", post(admin_reload_config))
        .merge(crate::webhook::router())
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(Debug, Default, Deserialize)]
struct ForceQuery {
    #[serde(default)]
    force: bool,
}

async fn get_item(
    State(state): State<AppState>,
    Path(id): Path<ContentId>,
) -> Result<Json<ContentItem>, ApiError> {
    match state.store.get(id).await.map_err(internal)? {
        Some(item) => Ok(Json(item)),
        None => Err(not_found(id)),
    }
}

#[derive(Serialize)]
struct UpdateResp {
    id: ContentId,
    outcome: Option<ProcessOutcome>,
}

/// Authoring update; the save trigger runs afterwards.
async fn update_item(
    State(state): State<AppState>,
    Path(id): Path<ContentId>,
    Json(update): Json<ContentUpdate>,
) -> Result<Json<UpdateResp>, ApiError> {
    if !state.store.update(id, update).await.map_err(internal)? {
        return Err(not_found(id));
    }
    let cfg = state.config();
    let outcome = state
        .hook
        .on_save(state.store.as_ref(), &cfg, state.diagnostics.as_ref(), id)
        .await;
    Ok(Json(UpdateResp { id, outcome }))
}

#[derive(Serialize)]
struct ReadinessResp {
    id: ContentId,
    needs_processing: bool,
    #[serde(flatten)]
    readiness: Readiness,
}

async fn item_readiness(
    State(state): State<AppState>,
    Path(id): Path<ContentId>,
    Query(q): Query<ForceQuery>,
) -> Result<Json<ReadinessResp>, ApiError> {
    let item = state
        .store
        .get(id)
        .await
        .map_err(internal)?
        .ok_or_else(|| not_found(id))?;
    let cfg = state.config();
    let readiness = readiness::evaluate(
        state.store.as_ref(),
        &cfg,
        state.diagnostics.as_ref(),
        &item,
        q.force,
    )
    .await
    .map_err(internal)?;
    Ok(Json(ReadinessResp {
        id,
        needs_processing: readiness.needs_processing(),
        readiness,
    }))
}

/// Manual trigger. Unlike a save, this processes without a readiness gate.
async fn process_item(
    State(state): State<AppState>,
    Path(id): Path<ContentId>,
    Query(q): Query<ForceQuery>,
) -> Result<Json<ProcessOutcome>, ApiError> {
    let cfg = state.config();
    let sink = state.diagnostics.as_ref();
    let trigger = Trigger::manual().forced(q.force);
    match state
        .hook
        .process(state.store.as_ref(), &cfg, sink, id, trigger)
        .await
    {
        Ok(outcome) => Ok(Json(outcome)),
        Err(ProcessError::NotFound(id)) => Err(not_found(id)),
        Err(e) => {
            record_failure(sink, id, trigger, &e);
            Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
    }
}

async fn run_batch(
    State(state): State<AppState>,
    Query(q): Query<ForceQuery>,
) -> Result<Json<BatchReport>, ApiError> {
    let cfg = state.config();
    let report = batch::run_batch(
        state.store.as_ref(),
        &cfg,
        state.diagnostics.as_ref(),
        &state.hook,
        &state.batch_cursor,
        q.force,
    )
    .await
    .map_err(internal)?;
    Ok(Json(report))
}

async fn debug_diagnostics(
    State(state): State<AppState>,
    Query(q): Query<HashMap<String, String>>,
) -> Json<Vec<Diagnostic>> {
    let limit = q
        .get("limit")
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(50);
    if let Some(id) = q.get("item").and_then(|v| v.parse::<ContentId>().ok()) {
        let mut rows = state.diagnostics.for_item(id);
        let start = rows.len().saturating_sub(limit);
        return Json(rows.split_off(start));
    }
    Json(state.diagnostics.snapshot_last_n(limit))
}

async fn admin_reload_config(State(state): State<AppState>) -> Result<String, ApiError> {
    let fresh = SeoConfig::load_default().map_err(internal)?;
    state.replace_config(fresh);
    tracing::info!(target: "seo", "seo config reloaded");
    Ok("reloaded".to_string())
}
