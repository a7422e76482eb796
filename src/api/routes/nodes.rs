//! Node endpoints

use axum::{
    Json,
    extract::{Path, RawQuery, State},
    http::StatusCode,
};
use tracing::debug;

use crate::api::{
    error::{ApiError, ApiResult},
    state::ApiState,
    types::{CreateNodeRequest, NodeResponse, UpdateNodeRequest},
};
use crate::error::SystemError;

use super::query_ids;

/// POST /api/systems/:system_id/nodes
pub async fn create_node(
    State(state): State<ApiState>,
    Path(system_id): Path<String>,
    Json(request): Json<CreateNodeRequest>,
) -> ApiResult<(StatusCode, Json<NodeResponse>)> {
    let system = state.system(&system_id).await?;
    let node = system.add_node(request.kind);

    Ok((StatusCode::CREATED, Json(node.into())))
}

/// PATCH /api/systems/:system_id/nodes/:node_id
pub async fn update_node(
    State(state): State<ApiState>,
    Path((system_id, node_id)): Path<(String, String)>,
    Json(request): Json<UpdateNodeRequest>,
) -> ApiResult<StatusCode> {
    let system = state.system(&system_id).await?;
    let position = request.position().ok_or_else(|| {
        ApiError::InvalidRequest(format!(
            "invalid position ({}, {})",
            request.x, request.y
        ))
    })?;

    system.set_position(&node_id, position)?;

    Ok(StatusCode::OK)
}

/// DELETE /api/systems/:system_id/nodes?id=..&id=..
///
/// Unknown ids are skipped
pub async fn delete_nodes(
    State(state): State<ApiState>,
    Path(system_id): Path<String>,
    RawQuery(query): RawQuery,
) -> ApiResult<StatusCode> {
    let system = state.system(&system_id).await?;

    for id in query_ids(query.as_deref()) {
        match system.remove_node(&id) {
            Ok(()) => {}
            Err(SystemError::NodeNotFound(_)) => debug!("node {id} already gone"),
            Err(e) => return Err(e.into()),
        }
    }

    Ok(StatusCode::OK)
}
