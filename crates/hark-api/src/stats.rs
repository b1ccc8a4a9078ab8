//! Handler for `/contacts/stats`.

use axum::{Json, extract::State};
use hark_core::{stats::ContactStats, store::ContactAdminStore as _};

use crate::{ApiError, ApiResponse, ApiState, StoreBundle, auth::AdminOnly, store_err};

/// `GET /contacts/stats` — the derived aggregate the dashboard re-fetches
/// after update/delete events instead of patching counters locally.
pub async fn handler<S>(
  State(state): State<ApiState<S>>,
  AdminOnly(_): AdminOnly,
) -> Result<Json<ApiResponse<ContactStats>>, ApiError>
where
  S: StoreBundle,
{
  let stats = state.store.stats_all().await.map_err(store_err)?;
  Ok(Json(ApiResponse::new(stats)))
}
