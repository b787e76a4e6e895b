use std::fmt;
use std::io;

use cointoss_frame::FrameError;
use cointoss_store::StoreError;
use cointoss_transport::TransportError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

/// A failure carrying the process exit code it should produce.
#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::NotFound | io::ErrorKind::ConnectionRefused => FAILURE,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::Bind { source, .. }
        | TransportError::Connect { source, .. }
        | TransportError::Accept(source)
        | TransportError::Io(source)
        | TransportError::Preamble(source) => io_error(context, source),
        TransportError::PathTooLong { .. } | TransportError::InvalidChannelPath(_) => {
            CliError::new(USAGE, format!("{context}: {err}"))
        }
        TransportError::Shutdown => CliError::new(TRANSPORT_ERROR, format!("{context}: {err}")),
    }
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    match err {
        FrameError::Io(source) => io_error(context, source),
        FrameError::Malformed(_)
        | FrameError::SegmentTooLarge { .. }
        | FrameError::FrameTooLarge { .. } => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        FrameError::ConnectionClosed => CliError::new(TRANSPORT_ERROR, format!("{context}: {err}")),
    }
}

pub fn store_error(context: &str, err: StoreError) -> CliError {
    match err {
        StoreError::Io { source, .. } => io_error(context, source),
        StoreError::InvalidName(_) => CliError::new(USAGE, format!("{context}: {err}")),
        StoreError::EmptyImage
        | StoreError::ImageTooLarge { .. }
        | StoreError::InvalidRef(_)
        | StoreError::Json(_) => CliError::new(DATA_INVALID, format!("{context}: {err}")),
        StoreError::ImageNotFound(_) | StoreError::CoinNotFound(_) => {
            CliError::new(FAILURE, format!("{context}: {err}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cointoss_frame::{MalformedFrame, Segment};

    #[test]
    fn malformed_frames_are_data_errors() {
        let err = FrameError::Malformed(MalformedFrame::TruncatedLength {
            segment: Segment::Tails,
            available: 1,
        });
        assert_eq!(frame_error("decode", err).code, DATA_INVALID);
    }

    #[test]
    fn timeouts_map_to_124() {
        let err = FrameError::Io(io::Error::from(io::ErrorKind::WouldBlock));
        assert_eq!(frame_error("read", err).code, TIMEOUT);
    }

    #[test]
    fn missing_socket_is_plain_failure() {
        let err = TransportError::Connect {
            path: "/tmp/absent.sock".into(),
            source: io::Error::from(io::ErrorKind::NotFound),
        };
        let cli = transport_error("connect failed", err);
        assert_eq!(cli.code, FAILURE);
        assert!(cli.message.starts_with("connect failed: "));
    }

    #[test]
    fn bad_names_are_usage_errors() {
        let err = StoreError::InvalidName("name must not be empty".to_string());
        assert_eq!(store_error("send", err).code, USAGE);
    }
}
