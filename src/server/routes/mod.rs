//! API routes

pub mod chat;
pub mod file;
pub mod jobs;
pub mod train;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::server::state::AppState;

/// Build all API routes
pub fn api_routes(max_upload_size: usize) -> Router<AppState> {
    Router::new()
        // Ingestion
        .route("/train", post(train::start_training))
        .route("/train/jobs", get(jobs::list_jobs))
        .route("/train/jobs/:id", get(jobs::get_job))
        // Uploads - with larger body limit for multipart
        .route(
            "/file",
            post(file::upload_file).layer(DefaultBodyLimit::max(max_upload_size)),
        )
        .route("/file/dataset", get(file::list_datasets))
        // Conversation
        .route("/chat", post(chat::chat))
}
