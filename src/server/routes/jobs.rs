//! Ingestion job progress endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::jobs::JobProgress;
use crate::server::state::AppState;

/// GET /train/jobs
pub async fn list_jobs(State(state): State<AppState>) -> Json<Vec<JobProgress>> {
    Json(state.jobs().list())
}

/// GET /train/jobs/:id
pub async fn get_job(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<JobProgress>> {
    state
        .jobs()
        .get(job_id)
        .map(Json)
        .ok_or_else(|| Error::source_unavailable(format!("No such job {}", job_id)))
}
