//! System endpoints

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use tracing::{debug, info};

use crate::api::{
    error::{ApiError, ApiResult},
    state::ApiState,
    types::{CreateSystemResponse, GraphResponse},
};
use crate::system::System;
use crate::topology::default_topology;

/// POST /api/systems
///
/// Creates a system pre-populated with the default topology
pub async fn create_system(
    State(state): State<ApiState>,
) -> ApiResult<(StatusCode, Json<CreateSystemResponse>)> {
    let system = Arc::new(System::new(state.simulation.clone())?);
    default_topology(&system)?;

    let id = system.id().to_string();
    state.systems.insert(system).await;

    info!("created system {id}");

    Ok((StatusCode::CREATED, Json(CreateSystemResponse { id })))
}

/// GET /api/systems/:system_id
pub async fn get_system(
    State(state): State<ApiState>,
    Path(system_id): Path<String>,
) -> ApiResult<Json<GraphResponse>> {
    let system = state.system(&system_id).await?;
    Ok(Json(system.snapshot().into()))
}

/// PUT /api/systems/:system_id/start
///
/// Drains any previous run and starts a fresh one; `409` while another start
/// is still resetting the system
pub async fn start_system(
    State(state): State<ApiState>,
    Path(system_id): Path<String>,
) -> ApiResult<StatusCode> {
    let system = state.system(&system_id).await?;

    debug!("start requested for system {system_id}");
    system.start().await.map_err(ApiError::from)?;

    Ok(StatusCode::OK)
}
