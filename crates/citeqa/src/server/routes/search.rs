//! Raw index search, without expansion or generation

use axum::{
    extract::{Query, State},
    Json,
};

use crate::error::{Error, Result};
use crate::server::state::AppState;
use crate::types::{SearchHit, SearchParams};

/// GET /api/search?q=...&k=... - Ranked chunks as the index returns them
pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<SearchHit>>> {
    params.validate().map_err(Error::InvalidRequest)?;
    let hits = state.pipeline().search(&params.q, params.k).await?;
    Ok(Json(hits))
}
