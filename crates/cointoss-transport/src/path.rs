//! Channel open preamble.
//!
//! The opener writes the channel path before any payload:
//!
//! ```text
//! ┌───────────────┬──────────────────────┐
//! │ Length (2B BE)│ Path (UTF-8, Length) │
//! └───────────────┴──────────────────────┘
//! ```

use std::io::{ErrorKind, Read, Write};

use crate::error::{Result, TransportError};

/// Path of the channel that carries a custom coin transfer.
pub const IMAGE_PATH: &str = "/image";

/// Maximum channel path length in bytes.
pub const MAX_CHANNEL_PATH_LEN: usize = 1024;

/// Write the channel path preamble.
pub fn write_channel_path<W: Write>(dst: &mut W, path: &str) -> Result<()> {
    validate(path)?;
    let mut preamble = Vec::with_capacity(2 + path.len());
    preamble.extend_from_slice(&(path.len() as u16).to_be_bytes());
    preamble.extend_from_slice(path.as_bytes());
    dst.write_all(&preamble)?;
    dst.flush()?;
    Ok(())
}

/// Read the channel path preamble.
///
/// Returns [`TransportError::Shutdown`] if the peer hangs up before sending
/// the complete preamble.
pub fn read_channel_path<R: Read>(src: &mut R) -> Result<String> {
    let mut len_buf = [0u8; 2];
    read_exact_or_shutdown(src, &mut len_buf)?;
    let len = u16::from_be_bytes(len_buf) as usize;
    if len == 0 || len > MAX_CHANNEL_PATH_LEN {
        return Err(TransportError::InvalidChannelPath(format!(
            "declared length {len} outside 1..={MAX_CHANNEL_PATH_LEN}"
        )));
    }

    let mut path = vec![0u8; len];
    read_exact_or_shutdown(src, &mut path)?;
    String::from_utf8(path)
        .map_err(|err| TransportError::InvalidChannelPath(format!("path is not UTF-8: {err}")))
}

fn validate(path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(TransportError::InvalidChannelPath(
            "path must not be empty".to_string(),
        ));
    }
    if path.len() > MAX_CHANNEL_PATH_LEN {
        return Err(TransportError::InvalidChannelPath(format!(
            "path is {} bytes, max {MAX_CHANNEL_PATH_LEN}",
            path.len()
        )));
    }
    Ok(())
}

fn read_exact_or_shutdown<R: Read>(src: &mut R, buf: &mut [u8]) -> Result<()> {
    match src.read_exact(buf) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::UnexpectedEof => Err(TransportError::Shutdown),
        Err(err) => Err(TransportError::Io(err)),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn preamble_roundtrip() {
        let mut wire = Vec::new();
        write_channel_path(&mut wire, IMAGE_PATH).unwrap();
        assert_eq!(&wire[..2], &[0x00, 0x06]);

        let path = read_channel_path(&mut Cursor::new(wire)).unwrap();
        assert_eq!(path, IMAGE_PATH);
    }

    #[test]
    fn payload_after_preamble_is_untouched() {
        let mut wire = Vec::new();
        write_channel_path(&mut wire, "/start-activity").unwrap();
        wire.extend_from_slice(b"rest");

        let mut cursor = Cursor::new(wire);
        read_channel_path(&mut cursor).unwrap();
        let mut rest = Vec::new();
        cursor.read_to_end(&mut rest).unwrap();
        assert_eq!(rest, b"rest");
    }

    #[test]
    fn rejects_empty_path() {
        let err = write_channel_path(&mut Vec::new(), "").unwrap_err();
        assert!(matches!(err, TransportError::InvalidChannelPath(_)));
    }

    #[test]
    fn rejects_overlong_declared_length() {
        let wire = ((MAX_CHANNEL_PATH_LEN + 1) as u16).to_be_bytes().to_vec();
        let err = read_channel_path(&mut Cursor::new(wire)).unwrap_err();
        assert!(matches!(err, TransportError::InvalidChannelPath(_)));
    }

    #[test]
    fn rejects_non_utf8_path() {
        let wire = vec![0x00, 0x02, 0xC3, 0x28];
        let err = read_channel_path(&mut Cursor::new(wire)).unwrap_err();
        assert!(matches!(err, TransportError::InvalidChannelPath(_)));
    }

    #[test]
    fn hangup_mid_preamble_is_shutdown() {
        let wire = vec![0x00, 0x06, b'/', b'i'];
        let err = read_channel_path(&mut Cursor::new(wire)).unwrap_err();
        assert!(matches!(err, TransportError::Shutdown));
    }
}
