//! Custom coins for a paired phone and watch.
//!
//! The phone packs two face images and a name into one frame and ships it
//! over a device channel; the watch decodes it, stores the images and makes
//! the coin active. Flipping is modelled separately.
//!
//! # Crate Structure
//!
//! - [`transport`]: device channels over Unix domain sockets
//! - [`frame`]: the transfer codec and blocking reader/writer
//! - [`store`]: image store, coin repository and transfer install
//! - [`flip`]: flip randomness, landing side and face visibility

/// Re-export transport types.
pub mod transport {
    pub use cointoss_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use cointoss_frame::*;
}

/// Re-export store types.
pub mod store {
    pub use cointoss_store::*;
}

/// Re-export flip types.
pub mod flip {
    pub use cointoss_flip::*;
}
