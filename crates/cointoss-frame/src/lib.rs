//! Framing codec for custom coin transfers.
//!
//! A transfer carries two compressed images (heads and tails) and the coin's
//! name as three length-prefixed segments in fixed order:
//!
//! ```text
//! [u32 BE heads_len][heads] [u32 BE tails_len][tails] [u32 BE name_len][name UTF-8]
//! ```
//!
//! There is no magic number, version tag or checksum. Both ends agree on the
//! layout out of band.

#[cfg(feature = "async")]
pub mod async_codec;
pub mod codec;
pub mod error;
pub mod reader;
pub mod writer;

#[cfg(feature = "async")]
pub use async_codec::CoinTransferCodec;
pub use codec::{
    decode_transfer, decode_transfer_prefix, decode_transfer_with, encode_transfer,
    try_decode_transfer, CoinTransfer, LabelPolicy, Segment, TransferConfig,
    DEFAULT_MAX_FRAME_SIZE, LENGTH_FIELD_SIZE, MAX_SEGMENT_LEN, MIN_FRAME_SIZE,
};
pub use error::{FrameError, MalformedFrame, Result};
pub use reader::TransferReader;
pub use writer::TransferWriter;
