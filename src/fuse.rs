//! Shared circuit breaker used for backpressure.
//!
//! A [`Fuse`] is owned by whatever monitors resource pressure; consumers only
//! receive a [`FuseMonitor`], which can observe and wait on the state but
//! never change it. While the fuse is burned the acceptor stops admitting
//! connections and active connection handlers close their sockets.

use std::sync::Arc;

use log::info;
use tokio::sync::watch;

/// Toggling side of the circuit breaker. Starts clear.
///
/// # Examples
///
/// ```
/// use relayframe::Fuse;
///
/// let fuse = Fuse::new();
/// let monitor = fuse.monitor();
/// assert!(fuse.burn());
/// assert!(monitor.is_burned());
/// assert!(!fuse.burn());
/// assert!(fuse.clear());
/// assert!(!monitor.is_burned());
/// ```
#[derive(Clone, Debug)]
pub struct Fuse {
    state: Arc<watch::Sender<bool>>,
}

impl Fuse {
    #[must_use]
    pub fn new() -> Self {
        let (state, _) = watch::channel(false);
        Self {
            state: Arc::new(state),
        }
    }

    /// Burn the fuse, waking every task waiting for it to burn.
    ///
    /// Returns `true` if the fuse was clear before the call.
    pub fn burn(&self) -> bool {
        let was_burned = self.state.send_replace(true);
        if !was_burned {
            info!("fuse burned");
        }
        !was_burned
    }

    /// Clear the fuse, waking every task waiting for it to clear.
    ///
    /// Returns `true` if the fuse was burned before the call.
    pub fn clear(&self) -> bool {
        let was_burned = self.state.send_replace(false);
        if was_burned {
            info!("fuse cleared");
        }
        was_burned
    }

    #[must_use]
    pub fn is_burned(&self) -> bool { *self.state.borrow() }

    /// Wait until the fuse is clear. Returns immediately if it already is.
    pub async fn wait_until_clear(&self) { self.monitor().wait_until_clear().await; }

    /// A read-only view of this fuse.
    #[must_use]
    pub fn monitor(&self) -> FuseMonitor {
        FuseMonitor {
            state: self.state.subscribe(),
        }
    }
}

impl Default for Fuse {
    fn default() -> Self { Self::new() }
}

/// Read-only handle on a [`Fuse`].
///
/// Every clone observes the same state. If the owning [`Fuse`] is dropped the
/// last state it held stays in effect forever.
#[derive(Clone, Debug)]
pub struct FuseMonitor {
    state: watch::Receiver<bool>,
}

impl FuseMonitor {
    /// A monitor whose fuse is clear and can never burn.
    #[must_use]
    pub fn never_burned() -> Self {
        let (_, state) = watch::channel(false);
        Self { state }
    }

    #[must_use]
    pub fn is_burned(&self) -> bool { *self.state.borrow() }

    /// Wait until the fuse is clear.
    pub async fn wait_until_clear(&self) { self.wait_for(false).await; }

    /// Wait until the fuse is burned.
    pub async fn wait_until_burned(&self) { self.wait_for(true).await; }

    async fn wait_for(&self, burned: bool) {
        let mut state = self.state.clone();
        if state.wait_for(|value| *value == burned).await.is_err() {
            // The fuse is gone and its final state is not the one wanted.
            futures::future::pending::<()>().await;
        }
    }
}
