use std::path::PathBuf;

/// Failures of the device link.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("cannot listen on {path}: {source}")]
    Bind {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("cannot reach device at {path}: {source}")]
    Connect {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("accepting a channel failed: {0}")]
    Accept(std::io::Error),

    #[error("channel I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// `sockaddr_un` cannot hold the socket path.
    #[error("socket path {path} is {len} bytes, limit is {max}")]
    PathTooLong {
        path: PathBuf,
        len: usize,
        max: usize,
    },

    /// The path preamble of a channel is empty, oversized, or not UTF-8.
    #[error("invalid channel path: {0}")]
    InvalidChannelPath(String),

    /// The peer hung up before finishing the path preamble.
    #[error("peer closed the channel before naming it")]
    Shutdown,

    /// Reading the path preamble failed or timed out.
    #[error("reading channel path failed: {0}")]
    Preamble(std::io::Error),
}

impl TransportError {
    /// True when only the channel being opened is affected, not the listener.
    pub fn is_channel_local(&self) -> bool {
        matches!(
            self,
            TransportError::Shutdown
                | TransportError::InvalidChannelPath(_)
                | TransportError::Preamble(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;
