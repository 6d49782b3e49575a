use super::StatusMessage;
use crate::{
    error::{ApiError, Error},
    state::AppState,
};
use axum::{
    Json,
    extract::{
        Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
};
use libqrtrack::{Location, LocationUpdate, empty_string_as_none};
use serde::Deserialize;
use tracing::info;

const UPDATED_MESSAGE: &str = "Location updated successfully";

/// Store the position that a phone reports
pub(crate) async fn update_location(
    State(state): State<AppState>,
    payload: Result<Json<LocationUpdate>, JsonRejection>,
) -> Result<Json<StatusMessage>, ApiError> {
    let Json(update) = payload.map_err(|e| Error::InvalidData(e.body_text()))?;
    let location = update.into_location()?;
    state.storage.save(&location).await?;
    info!("Location updated: {}", location.address);
    Ok(Json(StatusMessage::success(UPDATED_MESSAGE, location)))
}

pub(crate) async fn latest(State(state): State<AppState>) -> Result<Json<Location>, ApiError> {
    let location = state
        .storage
        .latest()
        .await?
        .ok_or_else(|| Error::NotFound("No location has been recorded yet".to_string()))?;
    Ok(Json(location))
}

#[derive(Debug, Deserialize)]
pub(crate) struct HistoryParams {
    #[serde(default, deserialize_with = "empty_string_as_none")]
    limit: Option<u32>,
}

pub(crate) async fn history(
    State(state): State<AppState>,
    params: Result<Query<HistoryParams>, QueryRejection>,
) -> Result<Json<Vec<Location>>, ApiError> {
    let Query(params) = params.map_err(|e| Error::InvalidData(e.body_text()))?;
    Ok(Json(state.storage.history(params.limit).await?))
}
