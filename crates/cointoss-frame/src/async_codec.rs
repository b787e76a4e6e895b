//! `tokio_util` codec for coin transfers.

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use crate::codec::{decode_transfer_with, try_decode_transfer, CoinTransfer, TransferConfig};
use crate::error::FrameError;

/// Frames a byte stream into [`CoinTransfer`]s for `FramedRead`/`FramedWrite`.
#[derive(Debug, Clone, Default)]
pub struct CoinTransferCodec {
    config: TransferConfig,
}

impl CoinTransferCodec {
    pub fn new(config: TransferConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TransferConfig {
        &self.config
    }
}

impl Decoder for CoinTransferCodec {
    type Item = CoinTransfer;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        try_decode_transfer(src, &self.config)
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.decode(buf)? {
            Some(transfer) => Ok(Some(transfer)),
            None if buf.is_empty() => Ok(None),
            None => Err(decode_transfer_with(buf, self.config.label_policy)
                .err()
                .unwrap_or(FrameError::ConnectionClosed)),
        }
    }
}

impl Encoder<&CoinTransfer> for CoinTransferCodec {
    type Error = FrameError;

    fn encode(&mut self, item: &CoinTransfer, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let size = item.wire_size();
        if size > self.config.max_frame_size {
            return Err(FrameError::FrameTooLarge {
                size,
                max: self.config.max_frame_size,
            });
        }
        item.encode_into(dst)
    }
}
