use std::io::{ErrorKind, Read};

use bytes::BytesMut;
#[cfg(unix)]
use cointoss_transport::ChannelStream;

use crate::codec::{decode_transfer_with, try_decode_transfer, CoinTransfer, TransferConfig};
use crate::error::{FrameError, Result};

const INITIAL_BUFFER_CAPACITY: usize = 64 * 1024;
const READ_CHUNK_SIZE: usize = 16 * 1024;

/// Reads complete transfers from any `Read` stream.
///
/// Handles partial reads internally. A transfer is only decoded once all of
/// its bytes are buffered.
pub struct TransferReader<T> {
    inner: T,
    buf: BytesMut,
    config: TransferConfig,
}

impl<T: Read> TransferReader<T> {
    /// Create a new transfer reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, TransferConfig::default())
    }

    /// Create a new transfer reader with explicit configuration.
    pub fn with_config(inner: T, config: TransferConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
        }
    }

    /// Read the next complete transfer (blocking).
    ///
    /// Returns `Err(FrameError::ConnectionClosed)` when EOF arrives before any
    /// byte of a new transfer, and a malformed-frame error when EOF cuts a
    /// transfer short.
    pub fn read_transfer(&mut self) -> Result<CoinTransfer> {
        loop {
            if let Some(transfer) = try_decode_transfer(&mut self.buf, &self.config)? {
                tracing::debug!(
                    heads = transfer.heads.len(),
                    tails = transfer.tails.len(),
                    name = %transfer.name,
                    "decoded coin transfer"
                );
                return Ok(transfer);
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let read = match self.inner.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            };

            if read == 0 {
                return Err(self.eof_error());
            }

            self.buf.extend_from_slice(&chunk[..read]);
        }
    }

    /// The decode error for whatever is left in the buffer at EOF.
    fn eof_error(&self) -> FrameError {
        if self.buf.is_empty() {
            return FrameError::ConnectionClosed;
        }
        decode_transfer_with(&self.buf, self.config.label_policy)
            .err()
            .unwrap_or(FrameError::ConnectionClosed)
    }

    /// Number of bytes buffered but not yet returned as part of a transfer.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Update maximum frame size for subsequent reads.
    pub fn set_max_frame_size(&mut self, max_frame_size: usize) {
        self.config.max_frame_size = max_frame_size;
    }

    /// Current reader configuration.
    pub fn config(&self) -> &TransferConfig {
        &self.config
    }
}

#[cfg(unix)]
impl TransferReader<ChannelStream> {
    /// Create a reader for a device channel and apply the read timeout from config.
    pub fn with_config_channel(inner: ChannelStream, config: TransferConfig) -> Result<Self> {
        inner
            .set_read_timeout(config.read_timeout)
            .map_err(transport_to_frame_error)?;
        Ok(Self::with_config(inner, config))
    }
}

#[cfg(unix)]
pub(crate) fn transport_to_frame_error(err: cointoss_transport::TransportError) -> FrameError {
    match err {
        cointoss_transport::TransportError::Io(io)
        | cointoss_transport::TransportError::Accept(io)
        | cointoss_transport::TransportError::Preamble(io) => FrameError::Io(io),
        cointoss_transport::TransportError::Bind { source, .. }
        | cointoss_transport::TransportError::Connect { source, .. } => FrameError::Io(source),
        cointoss_transport::TransportError::Shutdown => FrameError::ConnectionClosed,
        other => FrameError::Io(std::io::Error::other(other.to_string())),
    }
}
