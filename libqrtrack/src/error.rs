//! Objects related to reporting errors from this library

/// A list of error types that can occur within this library
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error("Required field '{0}' is missing")]
    MissingField(&'static str),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Unable to parse location data: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    DatabaseError(#[from] sqlx::Error),

    #[error(transparent)]
    DatabaseMigrationError(#[from] sqlx::migrate::MigrateError),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("Invalid spreadsheet api url '{0}'")]
    InvalidUrl(String),

    #[error("Spreadsheet request failed ({status}): {message}")]
    Sheets { status: u16, message: String },

    #[error("Unable to authenticate with the service account: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error("Unable to read service account credentials '{path}'")]
    Credentials {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Unable to encode QR code: {0}")]
    Qr(#[from] qrcode::types::QrError),

    #[error(transparent)]
    Image(#[from] image::ImageError),
}

/// A convenience type alias for a [Result] with [Error] as its error type
pub type Result<T, E = Error> = std::result::Result<T, E>;
