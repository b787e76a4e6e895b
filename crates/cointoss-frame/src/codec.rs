use std::fmt;
use std::ops::Range;

use bytes::{BufMut, Bytes, BytesMut};
use tracing::debug;

use crate::error::{FrameError, MalformedFrame, Result};

/// Size of each segment's length prefix.
pub const LENGTH_FIELD_SIZE: usize = 4;

/// Size of a frame with three empty segments.
pub const MIN_FRAME_SIZE: usize = 3 * LENGTH_FIELD_SIZE;

/// Largest segment the paired endpoint can read (it decodes lengths as `i32`).
pub const MAX_SEGMENT_LEN: usize = i32::MAX as usize;

/// Default maximum frame size accepted from a stream: 16 MiB.
pub const DEFAULT_MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// One `(length, payload)` unit of a frame, in wire order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Segment {
    Heads,
    Tails,
    Label,
}

impl Segment {
    /// Segments in the order they appear on the wire.
    pub const ORDER: [Segment; 3] = [Segment::Heads, Segment::Tails, Segment::Label];

    pub fn as_str(self) -> &'static str {
        match self {
            Segment::Heads => "heads",
            Segment::Tails => "tails",
            Segment::Label => "label",
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A custom coin in transit: both face images and the coin's name.
///
/// Images are opaque compressed bytes (PNG, JPEG, ...). The codec never
/// looks inside them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoinTransfer {
    pub heads: Bytes,
    pub tails: Bytes,
    pub name: String,
}

impl CoinTransfer {
    pub fn new(heads: impl Into<Bytes>, tails: impl Into<Bytes>, name: impl Into<String>) -> Self {
        Self {
            heads: heads.into(),
            tails: tails.into(),
            name: name.into(),
        }
    }

    /// Encoded size: three length fields plus all payload bytes.
    pub fn wire_size(&self) -> usize {
        MIN_FRAME_SIZE + self.heads.len() + self.tails.len() + self.name.len()
    }

    /// Append the wire form of this transfer to `dst`.
    pub fn encode_into(&self, dst: &mut BytesMut) -> Result<()> {
        encode_transfer(&self.heads, &self.tails, &self.name, dst)
    }

    /// Encode this transfer into a fresh buffer.
    pub fn encode(&self) -> Result<Bytes> {
        let mut dst = BytesMut::with_capacity(self.wire_size());
        self.encode_into(&mut dst)?;
        Ok(dst.freeze())
    }
}

/// What to do with a name segment that is not valid UTF-8.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LabelPolicy {
    /// Fail with [`MalformedFrame::InvalidLabel`].
    #[default]
    Reject,
    /// Substitute U+FFFD for each invalid sequence.
    Replace,
}

/// Configuration for transfer streams.
#[derive(Debug, Clone)]
pub struct TransferConfig {
    /// Maximum frame size accepted from a stream. Default: 16 MiB.
    pub max_frame_size: usize,
    /// Handling of non-UTF-8 names.
    pub label_policy: LabelPolicy,
    /// Read timeout for blocking operations.
    pub read_timeout: Option<std::time::Duration>,
    /// Write timeout for blocking operations.
    pub write_timeout: Option<std::time::Duration>,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            label_policy: LabelPolicy::default(),
            read_timeout: None,
            write_timeout: None,
        }
    }
}

/// Encode two images and a name into the wire format.
///
/// Wire format:
/// ```text
/// ┌───────────┬─────────┬───────────┬─────────┬───────────┬──────────────┐
/// │ Heads len │ Heads   │ Tails len │ Tails   │ Name len  │ Name         │
/// │ (4B BE)   │         │ (4B BE)   │         │ (4B BE)   │ (UTF-8)      │
/// └───────────┴─────────┴───────────┴─────────┴───────────┴──────────────┘
/// ```
pub fn encode_transfer(heads: &[u8], tails: &[u8], name: &str, dst: &mut BytesMut) -> Result<()> {
    let segments = [heads, tails, name.as_bytes()];

    for (segment, payload) in Segment::ORDER.into_iter().zip(segments) {
        if payload.len() > MAX_SEGMENT_LEN {
            return Err(FrameError::SegmentTooLarge {
                segment,
                size: payload.len(),
                max: MAX_SEGMENT_LEN,
            });
        }
    }

    dst.reserve(MIN_FRAME_SIZE + heads.len() + tails.len() + name.len());
    for payload in segments {
        dst.put_u32(payload.len() as u32);
        dst.put_slice(payload);
    }
    Ok(())
}

/// Decode a complete frame, rejecting names that are not UTF-8.
///
/// Bytes after the name segment are ignored. The input is never modified.
pub fn decode_transfer(frame: &[u8]) -> Result<CoinTransfer> {
    decode_transfer_with(frame, LabelPolicy::Reject)
}

/// Decode a complete frame with an explicit name policy.
///
/// A frame that ends early fails with [`MalformedFrame`]; nothing past the end
/// of `frame` is ever read.
pub fn decode_transfer_with(frame: &[u8], policy: LabelPolicy) -> Result<CoinTransfer> {
    let (transfer, consumed) = decode_transfer_prefix(frame, policy)?;
    if consumed < frame.len() {
        debug!(
            trailing = frame.len() - consumed,
            "ignoring bytes after name segment"
        );
    }
    Ok(transfer)
}

/// Decode the frame at the start of `frame` and report how many bytes it spans.
///
/// The count comes from the wire lengths, so it stays exact when
/// [`LabelPolicy::Replace`] changes the length of the decoded name.
pub fn decode_transfer_prefix(frame: &[u8], policy: LabelPolicy) -> Result<(CoinTransfer, usize)> {
    let (spans, consumed) = match scan(frame)? {
        Scan::Complete { spans, consumed } => (spans, consumed),
        Scan::Incomplete { truncation, .. } => return Err(truncation.into()),
    };

    let [heads, tails, label] = spans;
    let transfer = CoinTransfer {
        heads: Bytes::copy_from_slice(&frame[heads]),
        tails: Bytes::copy_from_slice(&frame[tails]),
        name: decode_label(&frame[label], policy)?,
    };
    Ok((transfer, consumed))
}

/// Decode a frame from a stream buffer.
///
/// Returns `Ok(None)` if the buffer doesn't contain a complete frame yet.
/// On success, consumes exactly the frame bytes; anything after stays in `src`.
pub fn try_decode_transfer(
    src: &mut BytesMut,
    config: &TransferConfig,
) -> Result<Option<CoinTransfer>> {
    let (spans, consumed) = match scan(&src[..])? {
        Scan::Complete { spans, consumed } => (spans, consumed),
        Scan::Incomplete { needed, .. } => {
            if needed > config.max_frame_size {
                return Err(FrameError::FrameTooLarge {
                    size: needed,
                    max: config.max_frame_size,
                });
            }
            return Ok(None);
        }
    };

    if consumed > config.max_frame_size {
        return Err(FrameError::FrameTooLarge {
            size: consumed,
            max: config.max_frame_size,
        });
    }

    let [heads, tails, label] = spans;
    let name = decode_label(&src[label], config.label_policy)?;
    let frame = src.split_to(consumed).freeze();

    Ok(Some(CoinTransfer {
        heads: frame.slice(heads),
        tails: frame.slice(tails),
        name,
    }))
}

enum Scan {
    Complete {
        spans: [Range<usize>; 3],
        consumed: usize,
    },
    Incomplete {
        /// Lower bound on the frame size implied by the length fields seen so far.
        needed: usize,
        truncation: MalformedFrame,
    },
}

/// Walk the three length prefixes without copying payload bytes.
fn scan(src: &[u8]) -> std::result::Result<Scan, MalformedFrame> {
    let mut offset = 0usize;
    let mut spans: [Range<usize>; 3] = [0..0, 0..0, 0..0];

    for (span, segment) in spans.iter_mut().zip(Segment::ORDER) {
        let remaining = &src[offset..];
        let Some(field) = remaining.first_chunk::<LENGTH_FIELD_SIZE>() else {
            return Ok(Scan::Incomplete {
                needed: offset + LENGTH_FIELD_SIZE,
                truncation: MalformedFrame::TruncatedLength {
                    segment,
                    available: remaining.len(),
                },
            });
        };

        let raw = u32::from_be_bytes(*field);
        if raw as usize > MAX_SEGMENT_LEN {
            return Err(MalformedFrame::NegativeLength { segment, raw });
        }
        let declared = raw as usize;
        offset += LENGTH_FIELD_SIZE;

        let available = src.len() - offset;
        if available < declared {
            return Ok(Scan::Incomplete {
                needed: offset.saturating_add(declared),
                truncation: MalformedFrame::TruncatedPayload {
                    segment,
                    declared,
                    available,
                },
            });
        }

        *span = offset..offset + declared;
        offset += declared;
    }

    Ok(Scan::Complete {
        spans,
        consumed: offset,
    })
}

fn decode_label(bytes: &[u8], policy: LabelPolicy) -> std::result::Result<String, MalformedFrame> {
    match policy {
        LabelPolicy::Reject => Ok(std::str::from_utf8(bytes)?.to_owned()),
        LabelPolicy::Replace => Ok(String::from_utf8_lossy(bytes).into_owned()),
    }
}

#[cfg(test)]
mod tests {
    use bytes::BufMut;

    use super::*;

    const PNG_HEAD: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
    const JPEG_HEAD: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0];

    fn encode(heads: &[u8], tails: &[u8], name: &str) -> BytesMut {
        let mut buf = BytesMut::new();
        encode_transfer(heads, tails, name, &mut buf).unwrap();
        buf
    }

    #[test]
    fn lucky_coin_roundtrip() {
        let wire = encode(PNG_HEAD, JPEG_HEAD, "Lucky Coin");
        let transfer = decode_transfer(&wire).unwrap();

        assert_eq!(transfer.heads.as_ref(), PNG_HEAD);
        assert_eq!(transfer.tails.as_ref(), JPEG_HEAD);
        assert_eq!(transfer.name, "Lucky Coin");
    }

    #[test]
    fn wire_layout_matches_offsets() {
        let wire = encode(PNG_HEAD, JPEG_HEAD, "Lucky Coin");

        assert_eq!(wire.len(), MIN_FRAME_SIZE + 8 + 4 + 10);
        assert_eq!(&wire[0..4], &[0, 0, 0, 8]);
        assert_eq!(&wire[4..12], PNG_HEAD);
        assert_eq!(&wire[12..16], &[0, 0, 0, 4]);
        assert_eq!(&wire[16..20], JPEG_HEAD);
        assert_eq!(&wire[20..24], &[0, 0, 0, 10]);
        assert_eq!(&wire[24..], b"Lucky Coin");
    }

    #[test]
    fn empty_transfer_is_twelve_zero_bytes() {
        let wire = encode(b"", b"", "");
        assert_eq!(wire.as_ref(), &[0u8; MIN_FRAME_SIZE]);

        let transfer = decode_transfer(&wire).unwrap();
        assert!(transfer.heads.is_empty());
        assert!(transfer.tails.is_empty());
        assert!(transfer.name.is_empty());
    }

    #[test]
    fn every_truncation_is_malformed() {
        let wire = encode(PNG_HEAD, JPEG_HEAD, "Lucky Coin");

        for len in 0..wire.len() {
            let err = decode_transfer(&wire[..len]).unwrap_err();
            assert!(err.is_malformed(), "prefix of {len} bytes: {err}");
        }
    }

    #[test]
    fn truncated_payload_reports_segment() {
        let wire = encode(PNG_HEAD, JPEG_HEAD, "Lucky Coin");
        let err = decode_transfer(&wire[..14]).unwrap_err();

        assert!(matches!(
            err,
            FrameError::Malformed(MalformedFrame::TruncatedPayload {
                segment: Segment::Tails,
                declared: 4,
                available: 2,
            })
        ));
    }

    #[test]
    fn declared_length_beyond_buffer_is_malformed() {
        let mut wire = BytesMut::new();
        wire.put_u32(1024);
        wire.put_slice(b"tiny");

        let err = decode_transfer(&wire).unwrap_err();
        assert!(matches!(
            err,
            FrameError::Malformed(MalformedFrame::TruncatedPayload {
                segment: Segment::Heads,
                ..
            })
        ));
    }

    #[test]
    fn negative_length_is_malformed() {
        let mut wire = BytesMut::new();
        wire.put_u32(0);
        wire.put_u32(0x8000_0000);

        let err = decode_transfer(&wire).unwrap_err();
        assert!(matches!(
            err,
            FrameError::Malformed(MalformedFrame::NegativeLength {
                segment: Segment::Tails,
                raw: 0x8000_0000,
            })
        ));
    }

    #[test]
    fn trailing_bytes_are_ignored() {
        let mut wire = encode(PNG_HEAD, JPEG_HEAD, "Lucky Coin");
        wire.put_slice(b"future extension");

        let transfer = decode_transfer(&wire).unwrap();
        assert_eq!(transfer.name, "Lucky Coin");
    }

    #[test]
    fn invalid_label_rejected_by_default() {
        let wire = encode_raw_label(&[0x66, 0x6F, 0xFF, 0x6F]);
        let err = decode_transfer(&wire).unwrap_err();
        assert!(matches!(
            err,
            FrameError::Malformed(MalformedFrame::InvalidLabel(_))
        ));
    }

    #[test]
    fn invalid_label_replaced_on_request() {
        let wire = encode_raw_label(&[0x66, 0x6F, 0xFF, 0x6F]);
        let transfer = decode_transfer_with(&wire, LabelPolicy::Replace).unwrap();
        assert_eq!(transfer.name, "fo\u{FFFD}o");
    }

    #[test]
    fn prefix_length_ignores_replacement_growth() {
        let mut wire = encode_raw_label(&[0xFF]);
        let frame_len = wire.len();
        wire.put_slice(&[1, 2, 3, 4, 5]);

        let (transfer, consumed) = decode_transfer_prefix(&wire, LabelPolicy::Replace).unwrap();
        assert_eq!(transfer.name, "\u{FFFD}");
        assert_eq!(consumed, frame_len);
        assert_eq!(wire.len() - consumed, 5);
        assert_ne!(transfer.wire_size(), consumed);
    }

    #[test]
    fn non_ascii_label_survives() {
        let wire = encode(b"h", b"t", "Onnenkolikko €");
        assert_eq!(decode_transfer(&wire).unwrap().name, "Onnenkolikko €");
    }

    #[test]
    fn multi_megabyte_image_roundtrip() {
        let heads: Vec<u8> = (0..6 * 1024 * 1024).map(|i| (i % 251) as u8).collect();
        let tails = vec![0x5A; 3 * 1024 * 1024 + 7];

        let wire = encode(&heads, &tails, "big");
        let transfer = decode_transfer(&wire).unwrap();

        assert_eq!(transfer.heads.as_ref(), heads.as_slice());
        assert_eq!(transfer.tails.as_ref(), tails.as_slice());
    }

    #[test]
    fn encoding_is_deterministic() {
        let transfer = CoinTransfer::new(PNG_HEAD, JPEG_HEAD, "Lucky Coin");
        assert_eq!(transfer.encode().unwrap(), transfer.encode().unwrap());
        assert_eq!(transfer.encode().unwrap().len(), transfer.wire_size());
    }

    #[test]
    fn decode_does_not_mutate_input() {
        let wire = encode(PNG_HEAD, JPEG_HEAD, "Lucky Coin").freeze();
        let snapshot = wire.clone();

        let first = decode_transfer(&wire).unwrap();
        let second = decode_transfer(&wire).unwrap();

        assert_eq!(first, second);
        assert_eq!(wire, snapshot);
    }

    #[test]
    fn incremental_decode_waits_for_complete_frame() {
        let wire = encode(PNG_HEAD, JPEG_HEAD, "Lucky Coin");
        let config = TransferConfig::default();
        let mut buf = BytesMut::new();

        for byte in &wire[..wire.len() - 1] {
            buf.put_u8(*byte);
            assert!(try_decode_transfer(&mut buf, &config).unwrap().is_none());
        }
        assert_eq!(buf.len(), wire.len() - 1);

        buf.put_u8(wire[wire.len() - 1]);
        let transfer = try_decode_transfer(&mut buf, &config).unwrap().unwrap();
        assert_eq!(transfer.name, "Lucky Coin");
        assert!(buf.is_empty());
    }

    #[test]
    fn incremental_decode_leaves_following_frame() {
        let mut buf = encode(b"a", b"b", "first");
        buf.unsplit(encode(b"c", b"d", "second"));
        let config = TransferConfig::default();

        let first = try_decode_transfer(&mut buf, &config).unwrap().unwrap();
        let second = try_decode_transfer(&mut buf, &config).unwrap().unwrap();

        assert_eq!(first.name, "first");
        assert_eq!(second.name, "second");
        assert!(buf.is_empty());
    }

    #[test]
    fn incremental_decode_rejects_oversized_declaration_early() {
        let mut buf = BytesMut::new();
        buf.put_u32(64);
        let config = TransferConfig {
            max_frame_size: 32,
            ..TransferConfig::default()
        };

        let err = try_decode_transfer(&mut buf, &config).unwrap_err();
        assert!(matches!(err, FrameError::FrameTooLarge { size: 68, max: 32 }));
    }

    #[test]
    fn incremental_decode_applies_label_policy() {
        let mut buf = encode_raw_label(&[0xC3, 0x28]);
        let config = TransferConfig {
            label_policy: LabelPolicy::Replace,
            ..TransferConfig::default()
        };

        let transfer = try_decode_transfer(&mut buf, &config).unwrap().unwrap();
        assert_eq!(transfer.name, "\u{FFFD}(");
    }

    fn encode_raw_label(label: &[u8]) -> BytesMut {
        let mut wire = BytesMut::new();
        wire.put_u32(0);
        wire.put_u32(0);
        wire.put_u32(label.len() as u32);
        wire.put_slice(label);
        wire
    }
}
