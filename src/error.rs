use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to decode image {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("File watch error: {0}")]
    Watch(#[from] notify::Error),

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("Image file not found: {0}")]
    ImageNotFound(PathBuf),

    #[error("Invalid model config: {0}")]
    ModelConfig(String),

    #[error("Model requires labeller '{0}' but none is registered under that name")]
    UnknownLabeller(String),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Invalid model output: {0}")]
    InvalidModelOutput(String),

    #[error("No two-digit class in model output")]
    NoMatchingClass,

    #[error("Confused state: no image available in {0} mode")]
    ConfusedState(String),

    #[error("Gave up waiting for an image in {0}")]
    LookTimeout(PathBuf),

    #[error("Cancelled")]
    Cancelled,
}

impl AppError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        AppError::Io {
            path: path.into(),
            source,
        }
    }

    /// Errors that end the prediction loop instead of skipping one cycle.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            AppError::ConfusedState(_)
                | AppError::InvalidArguments(_)
                | AppError::LookTimeout(_)
                | AppError::Cancelled
        )
    }
}
