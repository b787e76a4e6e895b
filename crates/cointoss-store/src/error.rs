use std::path::PathBuf;

/// Errors that can occur while persisting coins.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A filesystem operation failed.
    #[error("store I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The image reference does not name a file inside the store.
    #[error("invalid image reference: {0:?}")]
    InvalidRef(String),

    /// The referenced image does not exist.
    #[error("image not found: {0}")]
    ImageNotFound(String),

    /// An image with no bytes cannot be shown as a coin face.
    #[error("image is empty")]
    EmptyImage,

    /// The image exceeds the configured maximum size.
    #[error("image too large ({size} bytes, max {max})")]
    ImageTooLarge { size: usize, max: usize },

    /// The coin name failed validation.
    #[error("invalid coin name: {0}")]
    InvalidName(String),

    /// No saved custom coin has this id.
    #[error("custom coin {0} not found")]
    CoinNotFound(u64),

    /// The repository file could not be parsed or written.
    #[error("repository data error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| StoreError::Io { path, source }
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
