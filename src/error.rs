use std::path::PathBuf;

use thiserror::Error;

// ---------------------------------------------------------------------------
// Library error type
// ---------------------------------------------------------------------------

/// Every failure the loaders, stores and rendering service can raise.
///
/// The raster bundle itself never constructs one of these: whatever the
/// collaborators return is passed straight back to the caller.
#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("reading npy: {0}")]
    ReadNpy(#[from] ndarray_npy::ReadNpyError),

    #[error("writing npy: {0}")]
    WriteNpy(#[from] ndarray_npy::WriteNpyError),

    #[error("request to {url} failed with status {status}")]
    Http { status: u16, url: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("invalid content URI '{uri}': {reason}")]
    InvalidUri { uri: String, reason: &'static str },

    #[error("scheme '{0}' is not handled by this loader")]
    UnsupportedScheme(String),

    #[error("unsupported array dtype: {0}")]
    UnsupportedDtype(String),

    #[error("unsupported raster file: {}", .0.display())]
    UnsupportedFormat(PathBuf),

    #[error("invalid value: {0}")]
    InvalidValue(String),

    #[error("missing column '{0}'")]
    MissingColumn(String),

    #[error("content not found: {0}")]
    NotFound(String),

    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<ureq::Error> for Error {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::Status(status, response) => Error::Http {
                status,
                url: response.get_url().to_string(),
            },
            ureq::Error::Transport(transport) => Error::Transport(transport.to_string()),
        }
    }
}
