//! Writer task: the only code that writes to the channel.

use std::sync::Arc;

use futures::SinkExt;
use futures::stream::SplitSink;
use tokio_util::sync::CancellationToken;

use super::outbox::OutboxReceiver;
use super::{FramedChannel, Inner, TaskGuard};
use crate::error::TransportError;
use crate::message::Message;
use crate::state::CloseReason;

pub(super) type FrameSink = SplitSink<FramedChannel, Message>;

/// Maximum frames encoded between two flushes.
pub(super) const MAX_BATCH_SIZE: usize = 64;

/// How the writer loop ended without an error.
#[derive(Debug, PartialEq, Eq)]
enum Stop {
    /// Shutdown seen while idle; everything fed so far was flushed.
    Idle,
    /// Shutdown seen while a write was blocked on the channel.
    Interrupted,
}

pub(super) async fn run(inner: Arc<Inner>, mut sink: FrameSink, mut outbox: OutboxReceiver) {
    let _guard = TaskGuard::new(Arc::clone(&inner));

    match drain(inner.shutdown_token(), &mut sink, &mut outbox).await {
        Ok(Stop::Idle) => {
            // Unsent frames stay in the dropped queue.
            let _ = sink.close().await;
        }
        // The peer stopped reading. Dropping the sink, together with the
        // reader's half, drops the channel.
        Ok(Stop::Interrupted) => tracing::debug!("write abandoned on shutdown"),
        Err(e) => inner.begin_shutdown(CloseReason::from_error(&e)),
    }
    tracing::debug!("writer stopped");
}

/// Write queued frames until shutdown or a write fails.
///
/// Each wake-up takes up to [`MAX_BATCH_SIZE`] queued frames, encodes them
/// back to back and flushes once. Every write races the shutdown signal, so
/// a stalled peer cannot hold the transport open.
async fn drain(
    shutdown: &CancellationToken,
    sink: &mut FrameSink,
    outbox: &mut OutboxReceiver,
) -> Result<Stop, TransportError> {
    loop {
        let first = tokio::select! {
            biased;
            () = shutdown.cancelled() => return Ok(Stop::Idle),
            next = outbox.recv() => match next {
                Some(message) => message,
                None => return Ok(Stop::Idle),
            },
        };

        let mut batched = 1;
        let mut next = Some(first);
        while let Some(message) = next.take() {
            tokio::select! {
                biased;
                () = shutdown.cancelled() => return Ok(Stop::Interrupted),
                fed = sink.feed(message) => fed?,
            }
            if batched < MAX_BATCH_SIZE {
                next = outbox.try_recv();
                batched += 1;
            }
        }

        tokio::select! {
            biased;
            () = shutdown.cancelled() => return Ok(Stop::Interrupted),
            flushed = sink.flush() => flushed?,
        }
    }
}
