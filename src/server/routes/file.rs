//! File upload and source listing endpoints

use axum::{
    extract::{Multipart, State},
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::server::state::AppState;
use crate::store::{RecordKind, SourceRecord};

#[derive(Debug, Serialize)]
pub struct UploadedFile {
    pub id: u64,
    pub filename: String,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub files: Vec<UploadedFile>,
}

/// POST /file - save uploads and register a record per file
pub async fn upload_file(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>> {
    let mut files = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::internal(format!("Failed to read multipart field: {}", e)))?
    {
        let filename = field
            .file_name()
            .map(sanitize_filename)
            .unwrap_or_else(|| format!("file_{}.bin", Uuid::new_v4()));

        let data = field
            .bytes()
            .await
            .map_err(|e| Error::internal(format!("Failed to read file {}: {}", filename, e)))?;

        let path = state.config().ingest.upload_dir.join(&filename);
        tokio::fs::write(&path, &data).await?;
        tracing::info!("Saved upload {} ({} bytes)", filename, data.len());

        let record = state.records().create(RecordKind::File, &filename);
        files.push(UploadedFile {
            id: record.id,
            filename,
        });
    }

    if files.is_empty() {
        return Err(Error::source_unavailable("No files provided"));
    }

    Ok(Json(UploadResponse { files }))
}

/// GET /file/dataset - list registered dataset records
pub async fn list_datasets(State(state): State<AppState>) -> Json<Vec<SourceRecord>> {
    Json(state.records().list_datasets())
}

/// Keep only the final path component of a client-supplied filename
fn sanitize_filename(name: &str) -> String {
    std::path::Path::new(name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("upload.bin")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_strips_directories() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("notes.csv"), "notes.csv");
    }
}
