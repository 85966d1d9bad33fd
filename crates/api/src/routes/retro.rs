//! Route definitions for the `/retros` resource.

use axum::routing::get;
use axum::Router;

use crate::handlers::retro;
use crate::state::AppState;

/// Routes mounted at `/retros`.
///
/// ```text
/// GET    /{retro_id}/snapshot               -> snapshot
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/{retro_id}/snapshot", get(retro::snapshot))
}
