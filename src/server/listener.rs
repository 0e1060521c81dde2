//! Listening sockets and the closable handle the acceptor uses.

use std::{
    fmt,
    io,
    net::{SocketAddr, TcpListener as StdTcpListener},
    sync::Arc,
};
#[cfg(unix)]
use std::{
    os::unix::net::UnixListener as StdUnixListener,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use log::{debug, warn};
use tokio::{io::AsyncRead, net::TcpListener, select};
#[cfg(unix)]
use tokio::net::UnixListener;
use tokio_util::sync::CancellationToken;

use crate::config::ListenAddress;

/// A connection accepted from any listener kind.
pub(crate) type BoxedConnection = Box<dyn AsyncRead + Send + Unpin>;

/// An accepted connection and a printable description of its peer.
pub(crate) struct Accepted {
    pub stream: BoxedConnection,
    pub peer: String,
}

impl fmt::Debug for Accepted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Accepted")
            .field("stream", &"<connection>")
            .field("peer", &self.peer)
            .finish()
    }
}

/// Abstraction for sources of incoming connections consumed by the accept loop.
///
/// Implementations must be cancellation-safe: dropping a pending `accept()`
/// future must not leak resources.
#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub(crate) trait AcceptListener: Send + Sync {
    async fn accept(&self) -> io::Result<Accepted>;
    fn local_addr(&self) -> io::Result<String>;
}

/// A bound TCP or Unix stream listener.
///
/// Dropping a Unix listener removes its socket file.
#[derive(Debug)]
pub(crate) enum Listener {
    Tcp(TcpListener),
    #[cfg(unix)]
    Unix {
        listener: UnixListener,
        path: PathBuf,
    },
}

impl Listener {
    /// Bind `address`. Must be called from within a Tokio runtime.
    pub(crate) fn bind(address: &ListenAddress) -> io::Result<Self> {
        match address {
            ListenAddress::Tcp(addr) => Self::from_std(StdTcpListener::bind(addr.as_str())?),
            #[cfg(unix)]
            ListenAddress::Unix(path) => {
                remove_stale_socket(path)?;
                let std_listener = StdUnixListener::bind(path)?;
                std_listener.set_nonblocking(true)?;
                Ok(Self::Unix {
                    listener: UnixListener::from_std(std_listener)?,
                    path: path.clone(),
                })
            }
            #[cfg(not(unix))]
            ListenAddress::Unix(_) => Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "unix sockets are not supported on this platform",
            )),
        }
    }

    /// Adopt an already bound standard-library TCP listener.
    pub(crate) fn from_std(std_listener: StdTcpListener) -> io::Result<Self> {
        std_listener.set_nonblocking(true)?;
        Ok(Self::Tcp(TcpListener::from_std(std_listener)?))
    }

    /// The bound TCP address, if this is a TCP listener.
    pub(crate) fn tcp_addr(&self) -> Option<SocketAddr> {
        match self {
            Self::Tcp(listener) => listener.local_addr().ok(),
            #[cfg(unix)]
            Self::Unix { .. } => None,
        }
    }
}

#[async_trait]
impl AcceptListener for Listener {
    async fn accept(&self) -> io::Result<Accepted> {
        match self {
            Self::Tcp(listener) => {
                let (stream, peer) = listener.accept().await?;
                Ok(Accepted {
                    stream: Box::new(stream),
                    peer: peer.to_string(),
                })
            }
            #[cfg(unix)]
            Self::Unix { listener, path } => {
                let (stream, peer) = listener.accept().await?;
                let peer = peer.as_pathname().map_or_else(
                    || format!("unix:{}", path.display()),
                    |peer| format!("unix:{}", peer.display()),
                );
                Ok(Accepted {
                    stream: Box::new(stream),
                    peer,
                })
            }
        }
    }

    fn local_addr(&self) -> io::Result<String> {
        match self {
            Self::Tcp(listener) => listener.local_addr().map(|addr| addr.to_string()),
            #[cfg(unix)]
            Self::Unix { path, .. } => Ok(format!("unix:{}", path.display())),
        }
    }
}

impl Drop for Listener {
    fn drop(&mut self) {
        #[cfg(unix)]
        if let Self::Unix { path, .. } = self {
            match std::fs::remove_file(&*path) {
                Ok(()) => debug!("removed socket file: path={}", path.display()),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => warn!(
                    "failed to remove socket file: path={}, error={e}",
                    path.display()
                ),
            }
        }
    }
}

/// Remove a socket file left behind by an earlier process.
///
/// Anything at `path` that is not a socket is left untouched and reported as
/// [`io::ErrorKind::AlreadyExists`].
#[cfg(unix)]
fn remove_stale_socket(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::FileTypeExt;

    let metadata = match std::fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e),
    };
    if !metadata.file_type().is_socket() {
        return Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("path {} exists but is not a socket", path.display()),
        ));
    }
    std::fs::remove_file(path)?;
    debug!("removed stale socket file: path={}", path.display());
    Ok(())
}

/// Shared handle on a listener that can be closed exactly once.
///
/// Closing the handle makes every pending and future [`accept`] call return
/// an error, which the acceptor treats as its termination signal. The socket
/// itself is released when the last handle is dropped.
///
/// [`accept`]: ListenerHandle::accept
pub(crate) struct ListenerHandle<L> {
    listener: Arc<L>,
    closed: CancellationToken,
}

impl<L> Clone for ListenerHandle<L> {
    fn clone(&self) -> Self {
        Self {
            listener: Arc::clone(&self.listener),
            closed: self.closed.clone(),
        }
    }
}

impl<L: AcceptListener> ListenerHandle<L> {
    pub(crate) fn new(listener: Arc<L>) -> Self {
        Self {
            listener,
            closed: CancellationToken::new(),
        }
    }

    pub(crate) async fn accept(&self) -> io::Result<Accepted> {
        select! {
            biased;

            () = self.closed.cancelled() => Err(io::Error::new(
                io::ErrorKind::NotConnected,
                "listener closed",
            )),
            res = self.listener.accept() => res,
        }
    }

    pub(crate) fn close(&self) { self.closed.cancel(); }

    pub(crate) fn is_closed(&self) -> bool { self.closed.is_cancelled() }

    pub(crate) async fn closed(&self) { self.closed.cancelled().await; }

    pub(crate) fn local_addr(&self) -> io::Result<String> { self.listener.local_addr() }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::time::timeout;

    use super::*;

    #[tokio::test]
    async fn closing_unblocks_a_pending_accept() {
        let mut mock = MockAcceptListener::new();
        mock.expect_accept()
            .returning(|| Box::pin(futures::future::pending::<io::Result<Accepted>>()));
        let handle = ListenerHandle::new(Arc::new(mock));

        let pending = tokio::spawn({
            let handle = handle.clone();
            async move { handle.accept().await.map(|accepted| accepted.peer) }
        });
        tokio::task::yield_now().await;
        handle.close();

        let err = timeout(Duration::from_secs(1), pending)
            .await
            .expect("accept should unblock")
            .expect("accept task")
            .expect_err("closed listener");
        assert_eq!(err.kind(), io::ErrorKind::NotConnected);
        assert!(handle.is_closed());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn unix_listener_replaces_stale_socket_and_cleans_up() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("relay.sock");
        drop(StdUnixListener::bind(&path).expect("stale socket"));
        assert!(path.exists());

        let listener = Listener::bind(&ListenAddress::Unix(path.clone())).expect("bind over stale");
        assert_eq!(
            listener.local_addr().expect("local addr"),
            format!("unix:{}", path.display())
        );
        drop(listener);
        assert!(!path.exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn unix_listener_refuses_to_replace_regular_files() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("not-a-socket");
        std::fs::write(&path, b"keep me").expect("write file");

        let err = Listener::bind(&ListenAddress::Unix(path.clone())).expect_err("regular file");
        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
        assert_eq!(std::fs::read(&path).expect("file kept"), b"keep me");
    }
}
