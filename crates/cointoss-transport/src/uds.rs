use std::os::unix::fs::{FileTypeExt, MetadataExt, PermissionsExt};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::path::{read_channel_path, write_channel_path};
use crate::stream::ChannelStream;

/// Default permission mode for created socket paths.
pub const DEFAULT_SOCKET_MODE: u32 = 0o600;

/// `sockaddr_un.sun_path` is 108 bytes on Linux, 104 elsewhere.
#[cfg(target_os = "linux")]
const MAX_SOCKET_PATH_LEN: usize = 108;
#[cfg(not(target_os = "linux"))]
const MAX_SOCKET_PATH_LEN: usize = 104;

/// A channel accepted by a [`ChannelListener`], with the path it was opened on.
#[derive(Debug)]
pub struct OpenedChannel {
    pub path: String,
    pub stream: ChannelStream,
}

/// Receiving end of the device link.
///
/// Binds a filesystem Unix domain socket. Each accepted connection is one
/// channel: the peer's path preamble is read before the channel is returned.
/// The socket file is removed on drop, unless something else replaced it.
pub struct ChannelListener {
    listener: UnixListener,
    path: PathBuf,
    created_inode: (u64, u64),
    preamble_timeout: Option<Duration>,
}

impl ChannelListener {
    /// Bind with [`DEFAULT_SOCKET_MODE`].
    ///
    /// An existing socket at `path` is treated as stale and removed. Any other
    /// kind of file is left alone and binding fails.
    pub fn bind(path: impl AsRef<Path>) -> Result<Self> {
        Self::bind_with_mode(path, DEFAULT_SOCKET_MODE)
    }

    pub fn bind_with_mode(path: impl AsRef<Path>, mode: u32) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let len = path.as_os_str().len();
        if len >= MAX_SOCKET_PATH_LEN {
            return Err(TransportError::PathTooLong {
                path,
                len,
                max: MAX_SOCKET_PATH_LEN,
            });
        }

        let bind_err = |source| TransportError::Bind {
            path: path.clone(),
            source,
        };

        if let Ok(metadata) = std::fs::symlink_metadata(&path) {
            if !metadata.file_type().is_socket() {
                return Err(bind_err(std::io::Error::new(
                    std::io::ErrorKind::AlreadyExists,
                    "existing path is not a unix socket",
                )));
            }
            debug!(?path, "removing stale socket");
            std::fs::remove_file(&path).map_err(bind_err)?;
        }

        let listener = UnixListener::bind(&path).map_err(bind_err)?;
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(mode)).map_err(bind_err)?;
        let created = std::fs::symlink_metadata(&path).map_err(bind_err)?;

        info!(?path, "listening for device channels");

        Ok(Self {
            listener,
            created_inode: (created.dev(), created.ino()),
            path,
            preamble_timeout: None,
        })
    }

    /// Bound the wait for a peer's path preamble. `None` waits forever.
    pub fn set_preamble_timeout(&mut self, timeout: Option<Duration>) {
        self.preamble_timeout = timeout;
    }

    /// Accept the next channel (blocking) and read the path it was opened on.
    ///
    /// I/O failures while reading the preamble, including the preamble
    /// timeout, surface as [`TransportError::Preamble`].
    pub fn accept(&self) -> Result<OpenedChannel> {
        let (stream, _addr) = self.listener.accept().map_err(TransportError::Accept)?;
        self.open_channel(ChannelStream::from_unix(stream))
            .map_err(|err| match err {
                TransportError::Io(source) => TransportError::Preamble(source),
                other => other,
            })
    }

    fn open_channel(&self, mut stream: ChannelStream) -> Result<OpenedChannel> {
        stream.set_read_timeout(self.preamble_timeout)?;
        let path = read_channel_path(&mut stream)?;
        stream.set_read_timeout(None)?;

        match stream.peer_credentials() {
            Some(peer) => debug!(%path, uid = peer.uid, pid = peer.pid, "channel opened"),
            None => debug!(%path, "channel opened"),
        }

        Ok(OpenedChannel { path, stream })
    }

    /// The socket path this listener is bound to.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ChannelListener {
    fn drop(&mut self) {
        let (dev, ino) = self.created_inode;
        if let Ok(metadata) = std::fs::symlink_metadata(&self.path) {
            if metadata.file_type().is_socket() && metadata.dev() == dev && metadata.ino() == ino {
                debug!(path = ?self.path, "cleaning up socket file");
                let _ = std::fs::remove_file(&self.path);
            } else {
                debug!(path = ?self.path, "socket path identity changed; skipping cleanup");
            }
        }
    }
}

/// Sending end of the device link.
pub struct ChannelClient;

impl ChannelClient {
    /// Connect to the listener at `socket_path` and open a channel on `channel_path`.
    pub fn open(socket_path: impl AsRef<Path>, channel_path: &str) -> Result<ChannelStream> {
        let socket_path = socket_path.as_ref();
        let stream = UnixStream::connect(socket_path).map_err(|source| TransportError::Connect {
            path: socket_path.to_path_buf(),
            source,
        })?;
        let mut stream = ChannelStream::from_unix(stream);
        write_channel_path(&mut stream, channel_path)?;
        debug!(?socket_path, channel_path, "opened channel");
        Ok(stream)
    }
}
