//! Question endpoint and recent-question history

use axum::{extract::State, Json};

use crate::error::{Error, Result};
use crate::server::history::HistoryEntry;
use crate::server::state::AppState;
use crate::types::{AskRequest, QueryResult};

/// POST /api/ask - Answer a question with citations
pub async fn ask(
    State(state): State<AppState>,
    Json(request): Json<AskRequest>,
) -> Result<Json<QueryResult>> {
    request.validate().map_err(Error::InvalidRequest)?;

    let retrieval = &state.pipeline().config().retrieval;
    let top_k = request.top_k.unwrap_or(retrieval.top_k);
    let query_expansion = request.query_expansion.unwrap_or(retrieval.query_expansion);

    let result = state
        .pipeline()
        .ask_with(&request.question, top_k, query_expansion)
        .await;
    state.record(request.question.trim(), result.clone());

    Ok(Json(result))
}

/// GET /api/history - Recent questions, newest last
pub async fn history(State(state): State<AppState>) -> Json<Vec<HistoryEntry>> {
    Json(state.history())
}
