use crate::state::AppState;
use axum::{Json, Router, response::IntoResponse, routing::get};
use libqrtrack::Location;
use serde::Serialize;
use serde_json::json;

pub(crate) mod location;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/location", get(location::latest))
        .route("/locations", get(location::history))
}

#[derive(Debug, Serialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub(crate) enum Status {
    Success,
    Error,
}

/// The body of every json response that isn't a plain record
#[derive(Debug, Serialize)]
pub(crate) struct StatusMessage {
    pub(crate) status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) location: Option<Location>,
}

impl StatusMessage {
    pub(crate) fn success(message: &str, location: Location) -> Self {
        Self {
            status: Status::Success,
            message: Some(message.to_string()),
            location: Some(location),
        }
    }

    pub(crate) fn error(message: String) -> Self {
        Self {
            status: Status::Error,
            message: Some(message),
            location: None,
        }
    }
}

pub(crate) async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
