use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::StoreConfig;
use crate::error::{Result, StoreError};
use crate::image::ImageRef;

/// Longest accepted coin name, in characters.
pub const MAX_NAME_LEN: usize = 64;

/// Which coin the flip screen shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoinType {
    /// One of the coins bundled with the app, by id.
    Builtin(String),
    /// The user's active custom coin.
    Custom,
}

impl Default for CoinType {
    fn default() -> Self {
        CoinType::Builtin("classic".to_string())
    }
}

/// A coin made from two user images.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomCoin {
    pub id: u64,
    pub heads: ImageRef,
    pub tails: ImageRef,
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct RepositoryState {
    coin_type: CoinType,
    custom_coin: Option<CustomCoin>,
    library: Vec<CustomCoin>,
    selected: Option<u64>,
    next_id: u64,
}

impl RepositoryState {
    fn allocate_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn library_coin_mut(&mut self, id: u64) -> Result<&mut CustomCoin> {
        self.library
            .iter_mut()
            .find(|coin| coin.id == id)
            .ok_or(StoreError::CoinNotFound(id))
    }
}

/// Coin preferences and saved custom coins, persisted as JSON.
///
/// Every mutation is written through before it returns. A mutation whose
/// write fails leaves the in-memory state as it was.
pub struct CoinRepository {
    path: PathBuf,
    state: RepositoryState,
}

impl CoinRepository {
    /// Load the repository described by `config`, or start empty if none exists.
    pub fn open(config: &StoreConfig) -> Result<Self> {
        let path = config.repository_file();
        let state = match std::fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!(?path, "no repository file; starting empty");
                RepositoryState::default()
            }
            Err(err) => return Err(StoreError::Io { path, source: err }),
        };
        Ok(Self { path, state })
    }

    pub fn coin_type(&self) -> &CoinType {
        &self.state.coin_type
    }

    pub fn set_coin_type(&mut self, coin_type: CoinType) -> Result<()> {
        self.update(|state| {
            state.coin_type = coin_type;
            Ok(())
        })
    }

    /// The coin received from the phone, if any.
    pub fn custom_coin(&self) -> Option<&CustomCoin> {
        self.state.custom_coin.as_ref()
    }

    /// Replace the active custom coin. Returns the coin it replaced so the
    /// caller can delete its images.
    pub fn set_custom_coin(
        &mut self,
        heads: ImageRef,
        tails: ImageRef,
        name: &str,
    ) -> Result<Option<CustomCoin>> {
        let name = validate_name(name)?;
        self.update(|state| {
            let coin = CustomCoin {
                id: state.allocate_id(),
                heads,
                tails,
                name,
            };
            Ok(state.custom_coin.replace(coin))
        })
    }

    /// Replace the active custom coin and switch the coin type to
    /// [`CoinType::Custom`] in a single write.
    ///
    /// Returns the new coin and the one it replaced.
    pub fn activate_custom_coin(
        &mut self,
        heads: ImageRef,
        tails: ImageRef,
        name: &str,
    ) -> Result<(CustomCoin, Option<CustomCoin>)> {
        let name = validate_name(name)?;
        self.update(|state| {
            let coin = CustomCoin {
                id: state.allocate_id(),
                heads,
                tails,
                name,
            };
            let replaced = state.custom_coin.replace(coin.clone());
            state.coin_type = CoinType::Custom;
            Ok((coin, replaced))
        })
    }

    /// Saved coins, oldest first.
    pub fn custom_coins(&self) -> &[CustomCoin] {
        &self.state.library
    }

    /// Save a new coin to the library and return its id.
    pub fn store_custom_coin(&mut self, heads: ImageRef, tails: ImageRef, name: &str) -> Result<u64> {
        let name = validate_name(name)?;
        let id = self.update(|state| {
            let id = state.allocate_id();
            state.library.push(CustomCoin {
                id,
                heads,
                tails,
                name,
            });
            Ok(id)
        })?;
        info!(id, "saved custom coin");
        Ok(id)
    }

    /// Replace the images and name of a saved coin. Returns the previous version.
    pub fn update_custom_coin(
        &mut self,
        id: u64,
        heads: ImageRef,
        tails: ImageRef,
        name: &str,
    ) -> Result<CustomCoin> {
        let name = validate_name(name)?;
        self.update(|state| {
            let coin = state.library_coin_mut(id)?;
            Ok(std::mem::replace(
                coin,
                CustomCoin {
                    id,
                    heads,
                    tails,
                    name,
                },
            ))
        })
    }

    /// Remove a saved coin. Returns it so the caller can delete its images.
    pub fn delete_custom_coin(&mut self, id: u64) -> Result<CustomCoin> {
        self.update(|state| {
            let index = state
                .library
                .iter()
                .position(|coin| coin.id == id)
                .ok_or(StoreError::CoinNotFound(id))?;
            if state.selected == Some(id) {
                state.selected = None;
            }
            Ok(state.library.remove(index))
        })
    }

    pub fn select_custom_coin(&mut self, id: u64) -> Result<()> {
        self.update(|state| {
            state.library_coin_mut(id)?;
            state.selected = Some(id);
            Ok(())
        })
    }

    pub fn selected_custom_coin(&self) -> Option<&CustomCoin> {
        let id = self.state.selected?;
        self.state.library.iter().find(|coin| coin.id == id)
    }

    /// Apply `change` to a copy of the state and keep the copy once it is on disk.
    fn update<T>(
        &mut self,
        change: impl FnOnce(&mut RepositoryState) -> Result<T>,
    ) -> Result<T> {
        let mut next = self.state.clone();
        let out = change(&mut next)?;
        write_state(&self.path, &next)?;
        self.state = next;
        Ok(out)
    }
}

fn write_state(path: &Path, state: &RepositoryState) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(state)?;
    let tmp = path.with_extension("json.tmp");

    let write = || -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = std::fs::File::create(&tmp)?;
        file.write_all(&bytes)?;
        file.sync_all()?;
        std::fs::rename(&tmp, path)
    };

    write().map_err(|err| {
        let _ = std::fs::remove_file(&tmp);
        StoreError::io(path)(err)
    })
}

/// Trim a coin name and check it is non-empty and at most [`MAX_NAME_LEN`] characters.
pub fn validate_name(name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(StoreError::InvalidName("name must not be empty".to_string()));
    }
    let len = trimmed.chars().count();
    if len > MAX_NAME_LEN {
        return Err(StoreError::InvalidName(format!(
            "name is {len} characters, max {MAX_NAME_LEN}"
        )));
    }
    Ok(trimmed.to_string())
}
