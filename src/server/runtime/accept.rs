//! Accept loop for the consumer runtime.

use log::{debug, error};
use tokio::select;
use tokio_util::task::TaskTracker;

use crate::{
    message::MessageSink,
    metrics::{self, ErrorKind},
    server::{
        connection::{ConnectionContext, spawn_connection_task},
        listener::{AcceptListener, ListenerHandle},
    },
};

pub(in crate::server) struct AcceptLoopOptions<K> {
    pub ctx: ConnectionContext<K>,
    pub tracker: TaskTracker,
}

/// Accepts incoming connections and spawns handler tasks.
///
/// While the fuse is burned the loop waits for it to clear instead of
/// accepting; a burn during a pending accept abandons that accept. The loop
/// ends when the consumer becomes inactive, when the listener is closed, or
/// on the first accept error. Accept errors are logged only while the
/// consumer is still active. Spawned connection tasks are tracked by
/// `tracker` and are not affected when the loop ends.
pub(in crate::server) async fn accept_loop<L, K>(
    listener: ListenerHandle<L>,
    options: AcceptLoopOptions<K>,
) where
    L: AcceptListener + 'static,
    K: MessageSink,
{
    let AcceptLoopOptions { ctx, tracker } = options;
    let fuse = ctx.fuse.clone();
    let shutdown = ctx.shutdown.clone();
    debug!("acceptor started: local_addr={:?}", listener.local_addr().ok());

    while !shutdown.is_cancelled() {
        if fuse.is_burned() {
            select! {
                biased;

                () = listener.closed() => break,
                () = fuse.wait_until_clear() => continue,
            }
        }

        let accepted = select! {
            biased;

            () = fuse.wait_until_burned() => continue,
            res = listener.accept() => res,
        };

        match accepted {
            Ok(accepted) => {
                debug!("connection accepted: peer={}", accepted.peer);
                spawn_connection_task(accepted, ctx.clone(), &tracker);
            }
            Err(e) => {
                if !shutdown.is_cancelled() && !listener.is_closed() {
                    let local_addr = listener.local_addr().ok();
                    error!("accept failed: error={e}, local_addr={local_addr:?}");
                    metrics::inc_errors(ErrorKind::Accept);
                }
                break;
            }
        }
    }

    debug!("acceptor stopped");
}
