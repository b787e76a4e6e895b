//! Point-to-point byte channel between paired devices.
//!
//! A channel is opened on a *path* (for example [`IMAGE_PATH`]) and then
//! carries an opaque byte stream in both directions. The receiving side
//! routes each accepted channel by its path.
//!
//! Channels run over Unix domain sockets. This is the lowest layer of
//! cointoss; the transfer codec builds on [`ChannelStream`].

pub mod error;
pub mod path;

#[cfg(unix)]
pub mod stream;
#[cfg(unix)]
pub mod uds;

pub use error::{Result, TransportError};
pub use path::{read_channel_path, write_channel_path, IMAGE_PATH, MAX_CHANNEL_PATH_LEN};

#[cfg(unix)]
pub use stream::{ChannelStream, PeerCredentials};
#[cfg(unix)]
pub use uds::{ChannelClient, ChannelListener, OpenedChannel, DEFAULT_SOCKET_MODE};
