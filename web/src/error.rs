use crate::api::StatusMessage;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::warn;

#[derive(thiserror::Error, Debug)]
pub(crate) enum Error {
    #[error(transparent)]
    Other(#[from] anyhow::Error),
    #[error(transparent)]
    Library(#[from] libqrtrack::Error),
    #[error("Resource Not Found: {0}")]
    NotFound(String),
    #[error("The request could not be processed: {0}")]
    InvalidData(String),
    #[error("The environment is not set up correctly: {0}")]
    Environment(String),
}

impl Error {
    pub(crate) fn to_client_status(&self) -> (StatusCode, String) {
        match self {
            Error::Other(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Unknown error".to_string(),
            ),
            Error::Library(libqrtrack::Error::MissingField(_)) | Error::InvalidData(_) => {
                (StatusCode::BAD_REQUEST, "Invalid data".to_string())
            }
            Error::Library(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Unable to access location storage".to_string(),
            ),
            Error::NotFound(message) => (StatusCode::NOT_FOUND, message.clone()),
            Error::Environment(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "The server is not configured correctly. Please contact the administrator."
                    .to_string(),
            ),
        }
    }
}

// Tell axum how to convert `Error` into a response.
impl IntoResponse for Error {
    fn into_response(self) -> Response {
        warn!("Got error for response: {self:?}");
        self.to_client_status().into_response()
    }
}

/// An [Error] that is reported to the client as a json status message
#[derive(Debug)]
pub(crate) struct ApiError(pub(crate) Error);

impl<E> From<E> for ApiError
where
    E: Into<Error>,
{
    fn from(value: E) -> Self {
        Self(value.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        warn!("Got error for api response: {:?}", self.0);
        let (status, message) = self.0.to_client_status();
        (status, Json(StatusMessage::error(message))).into_response()
    }
}
