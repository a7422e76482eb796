//! Edge endpoints

use axum::{
    Json,
    extract::{Path, RawQuery, State},
    http::StatusCode,
};
use tracing::debug;

use crate::api::{
    error::ApiResult,
    state::ApiState,
    types::{CreateEdgeRequest, EdgeResponse},
};
use crate::error::SystemError;

use super::query_ids;

/// POST /api/systems/:system_id/edges
pub async fn create_edge(
    State(state): State<ApiState>,
    Path(system_id): Path<String>,
    Json(request): Json<CreateEdgeRequest>,
) -> ApiResult<(StatusCode, Json<EdgeResponse>)> {
    let system = state.system(&system_id).await?;
    let edge = system.add_edge(&request.source, &request.target)?;

    Ok((StatusCode::CREATED, Json(edge.into())))
}

/// DELETE /api/systems/:system_id/edges?id=..&id=..
///
/// Unknown ids are skipped
pub async fn delete_edges(
    State(state): State<ApiState>,
    Path(system_id): Path<String>,
    RawQuery(query): RawQuery,
) -> ApiResult<StatusCode> {
    let system = state.system(&system_id).await?;

    for id in query_ids(query.as_deref()) {
        match system.remove_edge(&id) {
            Ok(()) => {}
            Err(SystemError::EdgeNotFound(_)) => debug!("edge {id} already gone"),
            Err(e) => return Err(e.into()),
        }
    }

    Ok(StatusCode::OK)
}
