use std::path::{Path, PathBuf};

/// Default maximum size of a single stored image: 16 MiB.
pub const DEFAULT_MAX_IMAGE_SIZE: usize = 16 * 1024 * 1024;

/// Where and how coins are persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Root directory. Images live in `<root>/images`, coin data in `<root>/coins.json`.
    pub root: PathBuf,
    /// Largest image accepted by [`ImageStore::store`](crate::ImageStore::store).
    pub max_image_size: usize,
}

impl StoreConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    pub fn images_dir(&self) -> PathBuf {
        self.root.join("images")
    }

    pub fn repository_file(&self) -> PathBuf {
        self.root.join("coins.json")
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("cointoss-data"),
            max_image_size: DEFAULT_MAX_IMAGE_SIZE,
        }
    }
}
