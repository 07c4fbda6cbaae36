//! Reader task: decodes frames and dispatches them in arrival order.

use std::sync::Arc;

use futures::StreamExt;
use futures::stream::SplitStream;

use super::{FramedChannel, Inner, TaskGuard};
use crate::state::CloseReason;

pub(super) type FrameStream = SplitStream<FramedChannel>;

pub(super) async fn run(inner: Arc<Inner>, mut stream: FrameStream) {
    let _guard = TaskGuard::new(Arc::clone(&inner));
    let shutdown = inner.shutdown_token().clone();

    let reason = loop {
        let next = tokio::select! {
            biased;
            () = shutdown.cancelled() => break None,
            next = stream.next() => next,
        };

        match next {
            // Handlers run inline; a slow one stalls every service.
            Some(Ok(message)) => inner.dispatch(message),
            Some(Err(e)) => break Some(CloseReason::from_error(&e)),
            None => break Some(CloseReason::PeerClosed),
        }
    };

    if let Some(reason) = reason {
        inner.begin_shutdown(reason);
    }
    tracing::debug!("reader stopped");
}
