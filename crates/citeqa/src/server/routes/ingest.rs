//! Document upload endpoint

use axum::{
    extract::{Multipart, State},
    Json,
};

use crate::error::{Error, Result};
use crate::server::state::AppState;
use crate::types::{DocumentSource, IngestReport};

/// POST /api/ingest - Upload and index documents
pub async fn ingest_files(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<IngestReport>> {
    let mut sources = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::InvalidRequest(format!("Failed to read multipart field: {}", e)))?
    {
        let Some(filename) = field.file_name().map(|s| s.to_string()) else {
            tracing::debug!("Ignoring multipart field without a file name: {:?}", field.name());
            continue;
        };

        let data = field
            .bytes()
            .await
            .map_err(|e| Error::InvalidRequest(format!("Failed to read {}: {}", filename, e)))?;

        tracing::info!("Received upload: {} ({} bytes)", filename, data.len());
        sources.push(DocumentSource::from_bytes(filename, data.to_vec()));
    }

    if sources.is_empty() {
        return Err(Error::InvalidRequest("no files uploaded".to_string()));
    }

    let report = state.ingest(sources).await?;
    Ok(Json(report))
}
