//! Persistence for custom coins.
//!
//! - [`ImageStore`] keeps face images as files and hands out [`ImageRef`]s.
//! - [`CoinRepository`] remembers the selected coin type, the active custom
//!   coin, and the phone-side library of saved coins.
//! - [`install_transfer`] is the receive pipeline: it persists a decoded
//!   [`CoinTransfer`](cointoss_frame::CoinTransfer) and retires the coin it replaces.

pub mod config;
pub mod error;
pub mod image;
pub mod install;
pub mod repository;

pub use config::{StoreConfig, DEFAULT_MAX_IMAGE_SIZE};
pub use error::{Result, StoreError};
pub use image::{ImageFormat, ImageRef, ImageStore};
pub use install::{install_transfer, InstalledCoin};
pub use repository::{validate_name, CoinRepository, CoinType, CustomCoin, MAX_NAME_LEN};
