use crate::codec::Segment;

/// Ways a received frame can fail to parse.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MalformedFrame {
    /// The buffer ends inside a segment's 4-byte length field.
    #[error("{segment} length field truncated ({available} of 4 bytes present)")]
    TruncatedLength { segment: Segment, available: usize },

    /// A segment declares more bytes than remain in the buffer.
    #[error("{segment} segment declares {declared} bytes but only {available} remain")]
    TruncatedPayload {
        segment: Segment,
        declared: usize,
        available: usize,
    },

    /// A length field has the sign bit set; the peer reads lengths as signed.
    #[error("{segment} length {raw:#010x} is negative as a signed 32-bit value")]
    NegativeLength { segment: Segment, raw: u32 },

    /// The name segment is not valid UTF-8.
    #[error("name is not valid UTF-8: {0}")]
    InvalidLabel(#[from] std::str::Utf8Error),
}

/// Errors that can occur during transfer encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The bytes received do not form a valid frame.
    #[error("malformed frame: {0}")]
    Malformed(#[from] MalformedFrame),

    /// A segment is longer than the wire format can carry.
    #[error("{segment} segment too large ({size} bytes, max {max})")]
    SegmentTooLarge {
        segment: Segment,
        size: usize,
        max: usize,
    },

    /// The whole frame exceeds the configured maximum size.
    #[error("frame too large ({size} bytes, max {max})")]
    FrameTooLarge { size: usize, max: usize },

    /// An I/O error occurred while reading or writing a transfer.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The channel closed before any frame byte arrived.
    #[error("connection closed")]
    ConnectionClosed,
}

impl FrameError {
    /// True for errors caused by the bytes on the wire rather than the channel.
    pub fn is_malformed(&self) -> bool {
        matches!(self, FrameError::Malformed(_))
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
