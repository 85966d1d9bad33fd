//! Handlers for the `/retros` resource.

use axum::extract::{Path, State};
use axum::Json;
use retro_core::types::RetroId;

use crate::error::AppResult;
use crate::gateway::snapshot::{load_snapshot, RetroSnapshot};
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/retros/{retro_id}/snapshot
///
/// Same content a WebSocket client receives in `initRetro`.
pub async fn snapshot(
    State(state): State<AppState>,
    Path(retro_id): Path<RetroId>,
) -> AppResult<Json<DataResponse<RetroSnapshot>>> {
    let snapshot = load_snapshot(state.store.as_ref(), retro_id).await?;
    Ok(Json(DataResponse { data: snapshot }))
}
