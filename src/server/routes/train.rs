//! Training (ingestion) endpoint

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::ingestion::{derive_collection_name, DatasetReader, IngestMode};
use crate::server::state::AppState;
use crate::store::RecordKind;

/// Request to start ingestion from a dataset or an uploaded file
#[derive(Debug, Deserialize)]
pub struct TrainRequest {
    /// Dataset name; ingested as a detached background job
    pub dataset_name: Option<String>,
    /// Id of a previously uploaded file; ingested synchronously
    pub file_id: Option<u64>,
    #[serde(default)]
    pub mode: IngestMode,
}

#[derive(Debug, Serialize)]
pub struct TrainAccepted {
    pub job_id: Uuid,
    pub collection: String,
    pub message: String,
}

/// POST /train
pub async fn start_training(
    State(state): State<AppState>,
    Json(request): Json<TrainRequest>,
) -> Result<axum::response::Response> {
    if let Some(file_id) = request.file_id {
        return ingest_uploaded_file(&state, file_id).await;
    }

    let dataset_name = request.dataset_name.ok_or_else(|| {
        Error::source_unavailable("Request must name a dataset or an uploaded file")
    })?;

    // The dataset file must exist before a job is registered for it
    let reader = DatasetReader::open(&state.config().ingest.datasets_dir, &dataset_name)?;

    if state.records().dataset_by_name(&dataset_name).is_none() {
        state.records().create(RecordKind::Dataset, &dataset_name);
    }

    let collection = derive_collection_name(&dataset_name);
    let job_id = state.jobs().create(&dataset_name, &collection);

    let job_state = state.clone();
    let source = dataset_name.clone();
    let mode = request.mode;
    tokio::spawn(async move {
        job_state.jobs().mark_running(job_id);
        match job_state.pipeline().ingest_dataset(reader, &source, mode).await {
            Ok(summary) => job_state.jobs().complete(job_id, &summary),
            Err(e) => {
                tracing::error!("Ingestion job {} for {} failed: {}", job_id, source, e);
                job_state.jobs().fail(job_id, e.to_string());
            }
        }
    });

    let accepted = TrainAccepted {
        job_id,
        collection,
        message: format!("Ingestion started. Poll /train/jobs/{} for progress.", job_id),
    };
    Ok((StatusCode::ACCEPTED, Json(accepted)).into_response())
}

async fn ingest_uploaded_file(state: &AppState, file_id: u64) -> Result<axum::response::Response> {
    let record = state
        .records()
        .get(file_id)
        .filter(|r| r.kind == RecordKind::File)
        .ok_or_else(|| Error::source_unavailable(format!("No uploaded file with id {}", file_id)))?;

    let path = state.config().ingest.upload_dir.join(&record.name);
    let summary = state.pipeline().ingest_file(&path).await?;
    Ok(Json(summary).into_response())
}
