use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use common::{
    DownloadEntry, EtlError, EtlStatus, LoadJobRequest, LoadSummary, PullLoadJob, PullLoadTask,
    SetJobStateRequest, TaskReportRequest,
};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/v1/loads", post(create_load).get(list_loads))
        .route("/api/v1/loads/:id/tasks", post(report_task))
        .route("/api/v1/loads/:id/state", post(set_job_state))
        .route("/api/v1/loads/:id/etl_status", get(get_etl_status))
        .route("/api/v1/loads/:id/files", get(get_files))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn status_code(err: &EtlError) -> StatusCode {
    match err {
        EtlError::JobNotFound(_) => StatusCode::NOT_FOUND,
        EtlError::MissingFileMap | EtlError::JobClosed { .. } => StatusCode::CONFLICT,
        EtlError::CounterParse { .. }
        | EtlError::CounterOverflow { .. }
        | EtlError::MalformedFileKey { .. }
        | EtlError::QualityUnsatisfied { .. } => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

/* ---------------- handlers HTTP ---------------- */

async fn health() -> &'static str {
    "ok"
}

// Crea el job de pull load y la carga que lo supervisa
async fn create_load(
    State(state): State<AppState>,
    Json(req): Json<LoadJobRequest>,
) -> Result<Json<LoadSummary>, StatusCode> {
    if req.label.trim().is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }
    let summary = state.create_load(&req.label);
    info!(job_id = %summary.id, label = %summary.label, "carga creada");
    Ok(Json(summary))
}

async fn list_loads(State(state): State<AppState>) -> Json<Vec<LoadSummary>> {
    let loads = state.loads();
    let mut out: Vec<LoadSummary> = loads.iter().map(|(id, entry)| entry.summary(id)).collect();
    out.sort_by(|a, b| a.created_at.cmp(&b.created_at));
    Json(out)
}

// Resultado de una tarea del ETL (lo reporta quien ejecuta las tareas)
async fn report_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<TaskReportRequest>,
) -> Result<Json<PullLoadTask>, StatusCode> {
    let task = state.registry.add_task(&id, req).map_err(|e| {
        warn!(job_id = %id, error = %e, "no se pudo agregar la tarea");
        status_code(&e)
    })?;
    info!(
        job_id = %id,
        task_id = %task.id,
        files = task.file_map.len(),
        "tarea reportada"
    );
    Ok(Json(task))
}

// Cambia el estado interno del job (superficie del job manager)
async fn set_job_state(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<SetJobStateRequest>,
) -> Result<Json<PullLoadJob>, StatusCode> {
    let job = state
        .registry
        .set_state(&id, req.state)
        .map_err(|e| status_code(&e))?;
    Ok(Json(PullLoadJob::clone(&job)))
}

// Último estado del ETL publicado por el supervisor
async fn get_etl_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<EtlStatus>, StatusCode> {
    let loads = state.loads();
    let entry = loads.get(&id).ok_or(StatusCode::NOT_FOUND)?;
    let status = entry.etl_task.status();
    Ok(Json(EtlStatus::clone(&status)))
}

// Plan de descarga; sólo existe cuando el ETL terminó bien
async fn get_files(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<DownloadEntry>>, StatusCode> {
    let loads = state.loads();
    let entry = loads.get(&id).ok_or(StatusCode::NOT_FOUND)?;
    match &entry.download_plan {
        Some(plan) => Ok(Json(plan.clone())),
        None => Err(status_code(&EtlError::MissingFileMap)),
    }
}
