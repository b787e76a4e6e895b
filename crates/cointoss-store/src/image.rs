use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::StoreConfig;
use crate::error::{Result, StoreError};

/// Stable reference to a stored image: its file name inside the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ImageRef(String);

impl ImageRef {
    /// Parse a reference, rejecting anything that could escape the store directory.
    pub fn parse(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let valid = !name.is_empty()
            && !name.starts_with('.')
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
        if !valid {
            return Err(StoreError::InvalidRef(name));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ImageRef {
    type Error = StoreError;

    fn try_from(name: String) -> Result<Self> {
        Self::parse(name)
    }
}

impl From<ImageRef> for String {
    fn from(image: ImageRef) -> Self {
        image.0
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Compressed image container, sniffed from the leading bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Jpeg,
    Webp,
    Unknown,
}

impl ImageFormat {
    pub fn sniff(bytes: &[u8]) -> Self {
        match bytes {
            [0x89, b'P', b'N', b'G', ..] => ImageFormat::Png,
            [0xFF, 0xD8, 0xFF, ..] => ImageFormat::Jpeg,
            [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => ImageFormat::Webp,
            _ => ImageFormat::Unknown,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpg",
            ImageFormat::Webp => "webp",
            ImageFormat::Unknown => "bin",
        }
    }
}

/// Directory of coin face images.
pub struct ImageStore {
    dir: PathBuf,
    max_image_size: usize,
    counter: AtomicU64,
}

impl ImageStore {
    /// Open (creating if needed) the image directory described by `config`.
    pub fn open(config: &StoreConfig) -> Result<Self> {
        let dir = config.images_dir();
        std::fs::create_dir_all(&dir).map_err(StoreError::io(&dir))?;
        debug!(?dir, "opened image store");
        Ok(Self {
            dir,
            max_image_size: config.max_image_size,
            counter: AtomicU64::new(0),
        })
    }

    /// Persist `bytes` and return a fresh reference to them.
    ///
    /// The file appears under its final name only once fully written.
    pub fn store(&self, bytes: &[u8]) -> Result<ImageRef> {
        if bytes.is_empty() {
            return Err(StoreError::EmptyImage);
        }
        if bytes.len() > self.max_image_size {
            return Err(StoreError::ImageTooLarge {
                size: bytes.len(),
                max: self.max_image_size,
            });
        }

        let image_ref = self.next_ref(ImageFormat::sniff(bytes));
        let final_path = self.dir.join(image_ref.as_str());
        let tmp_path = self.dir.join(format!(".{image_ref}.tmp"));

        let write = || -> std::io::Result<()> {
            let mut file = std::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&tmp_path)?;
            file.write_all(bytes)?;
            file.sync_all()?;
            std::fs::rename(&tmp_path, &final_path)
        };

        if let Err(err) = write() {
            let _ = std::fs::remove_file(&tmp_path);
            return Err(StoreError::Io {
                path: final_path,
                source: err,
            });
        }

        debug!(image = %image_ref, size = bytes.len(), "stored image");
        Ok(image_ref)
    }

    /// Read a stored image back.
    pub fn load(&self, image: &ImageRef) -> Result<Vec<u8>> {
        let path = self.path_of(image);
        std::fs::read(&path).map_err(|err| match err.kind() {
            std::io::ErrorKind::NotFound => StoreError::ImageNotFound(image.to_string()),
            _ => StoreError::Io { path, source: err },
        })
    }

    /// Delete a stored image. Deleting a missing image is not an error.
    pub fn delete(&self, image: &ImageRef) -> Result<()> {
        let path = self.path_of(image);
        match std::fs::remove_file(&path) {
            Ok(()) => {
                debug!(%image, "deleted image");
                Ok(())
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                warn!(%image, "image already gone");
                Ok(())
            }
            Err(err) => Err(StoreError::Io { path, source: err }),
        }
    }

    pub fn contains(&self, image: &ImageRef) -> bool {
        self.path_of(image).is_file()
    }

    /// Filesystem location of a stored image.
    pub fn path_of(&self, image: &ImageRef) -> PathBuf {
        self.dir.join(image.as_str())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn next_ref(&self, format: ImageFormat) -> ImageRef {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        let seq = self.counter.fetch_add(1, Ordering::Relaxed);
        ImageRef(format!(
            "{nanos:x}-{}-{seq}.{}",
            std::process::id(),
            format.extension()
        ))
    }
}
