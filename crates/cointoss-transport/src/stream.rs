use std::io::{self, Read, Write};
use std::net::Shutdown;
use std::os::fd::{AsRawFd, RawFd};
use std::os::unix::net::UnixStream;
use std::time::Duration;

use crate::error::Result;

/// An opened device channel.
///
/// The path preamble has already been exchanged when a `ChannelStream` is
/// handed out, so every byte read or written here is payload.
pub struct ChannelStream {
    socket: UnixStream,
}

/// Peer process identity reported by the kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeerCredentials {
    pub uid: u32,
    pub gid: u32,
    pub pid: u32,
}

impl ChannelStream {
    pub(crate) fn from_unix(socket: UnixStream) -> Self {
        Self { socket }
    }

    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        Ok(self.socket.set_read_timeout(timeout)?)
    }

    pub fn set_write_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        Ok(self.socket.set_write_timeout(timeout)?)
    }

    /// Close the write half. The peer reads end-of-stream once it has drained
    /// what was sent.
    pub fn shutdown_write(&self) -> Result<()> {
        Ok(self.socket.shutdown(Shutdown::Write)?)
    }

    /// A second handle on the same channel (new file descriptor).
    pub fn try_clone(&self) -> Result<Self> {
        Ok(Self::from_unix(self.socket.try_clone()?))
    }

    /// Credentials of the connected peer (Linux only).
    #[cfg(target_os = "linux")]
    pub fn peer_credentials(&self) -> Option<PeerCredentials> {
        let mut cred = libc::ucred {
            pid: 0,
            uid: 0,
            gid: 0,
        };
        let mut len = std::mem::size_of::<libc::ucred>() as libc::socklen_t;

        // SAFETY: `cred` and `len` are valid for writes of the sizes passed, and
        // the descriptor is an open Unix socket owned by `self`.
        let rc = unsafe {
            libc::getsockopt(
                self.socket.as_raw_fd(),
                libc::SOL_SOCKET,
                libc::SO_PEERCRED,
                (&mut cred as *mut libc::ucred).cast::<libc::c_void>(),
                &mut len,
            )
        };

        (rc == 0 && len as usize == std::mem::size_of::<libc::ucred>()).then(|| PeerCredentials {
            uid: cred.uid,
            gid: cred.gid,
            pid: cred.pid as u32,
        })
    }

    #[cfg(not(target_os = "linux"))]
    pub fn peer_credentials(&self) -> Option<PeerCredentials> {
        None
    }
}

impl Read for ChannelStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.socket.read(buf)
    }
}

impl Write for ChannelStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.socket.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.socket.flush()
    }
}

impl AsRawFd for ChannelStream {
    fn as_raw_fd(&self) -> RawFd {
        self.socket.as_raw_fd()
    }
}

impl std::fmt::Debug for ChannelStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelStream")
            .field("fd", &self.socket.as_raw_fd())
            .finish()
    }
}
