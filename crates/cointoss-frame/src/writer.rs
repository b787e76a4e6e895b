use std::io::{ErrorKind, Write};

use bytes::BytesMut;
#[cfg(unix)]
use cointoss_transport::ChannelStream;

use crate::codec::{encode_transfer, CoinTransfer, TransferConfig, MIN_FRAME_SIZE};
use crate::error::{FrameError, Result};
#[cfg(unix)]
use crate::reader::transport_to_frame_error;

const INITIAL_BUFFER_CAPACITY: usize = 64 * 1024;

/// Writes complete transfers to any `Write` stream.
pub struct TransferWriter<T> {
    inner: T,
    buf: BytesMut,
    config: TransferConfig,
}

impl<T: Write> TransferWriter<T> {
    /// Create a new transfer writer with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, TransferConfig::default())
    }

    /// Create a new transfer writer with explicit configuration.
    pub fn with_config(inner: T, config: TransferConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
        }
    }

    /// Write a complete transfer (blocking).
    pub fn send(&mut self, transfer: &CoinTransfer) -> Result<()> {
        self.send_parts(&transfer.heads, &transfer.tails, &transfer.name)
    }

    /// Encode and send two images and a name.
    pub fn send_parts(&mut self, heads: &[u8], tails: &[u8], name: &str) -> Result<()> {
        let size = MIN_FRAME_SIZE + heads.len() + tails.len() + name.len();
        if size > self.config.max_frame_size {
            return Err(FrameError::FrameTooLarge {
                size,
                max: self.config.max_frame_size,
            });
        }

        self.buf.clear();
        encode_transfer(heads, tails, name, &mut self.buf)?;

        let mut offset = 0usize;
        while offset < self.buf.len() {
            match self.inner.write(&self.buf[offset..]) {
                Ok(0) => return Err(FrameError::ConnectionClosed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }

        tracing::debug!(bytes = size, name, "sent coin transfer");
        self.flush()
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Update maximum frame size for subsequent sends.
    pub fn set_max_frame_size(&mut self, max_frame_size: usize) {
        self.config.max_frame_size = max_frame_size;
    }

    /// Current writer configuration.
    pub fn config(&self) -> &TransferConfig {
        &self.config
    }
}

#[cfg(unix)]
impl TransferWriter<ChannelStream> {
    /// Create a writer for a device channel and apply the write timeout from config.
    pub fn with_config_channel(inner: ChannelStream, config: TransferConfig) -> Result<Self> {
        inner
            .set_write_timeout(config.write_timeout)
            .map_err(transport_to_frame_error)?;
        Ok(Self::with_config(inner, config))
    }

    /// Half-close the channel so the receiver sees end-of-stream.
    pub fn finish(self) -> Result<()> {
        self.inner
            .shutdown_write()
            .map_err(transport_to_frame_error)
    }
}
