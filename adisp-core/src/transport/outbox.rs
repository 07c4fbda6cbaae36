//! Send queue between callers and the writer task.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::mpsc;

use crate::error::TransportError;
use crate::message::Message;

/// Producer half, shared by every caller of `send`.
#[derive(Debug)]
pub(crate) struct Outbox {
    tx: OutboxSender,
    queued: Arc<AtomicUsize>,
}

#[derive(Debug)]
enum OutboxSender {
    Bounded(mpsc::Sender<Message>),
    Unbounded(mpsc::UnboundedSender<Message>),
}

/// Consumer half, owned by the writer task.
#[derive(Debug)]
pub(crate) struct OutboxReceiver {
    rx: OutboxChannel,
    queued: Arc<AtomicUsize>,
}

#[derive(Debug)]
enum OutboxChannel {
    Bounded(mpsc::Receiver<Message>),
    Unbounded(mpsc::UnboundedReceiver<Message>),
}

/// Create a queue holding `capacity` frames, or unbounded for `None`.
///
/// `capacity` must be non-zero; `TransportConfig::validate` enforces it.
pub(crate) fn outbox(capacity: Option<usize>) -> (Outbox, OutboxReceiver) {
    let queued = Arc::new(AtomicUsize::new(0));
    let (tx, rx) = match capacity {
        Some(capacity) => {
            let (tx, rx) = mpsc::channel(capacity.max(1));
            (OutboxSender::Bounded(tx), OutboxChannel::Bounded(rx))
        }
        None => {
            let (tx, rx) = mpsc::unbounded_channel();
            (OutboxSender::Unbounded(tx), OutboxChannel::Unbounded(rx))
        }
    };
    (
        Outbox {
            tx,
            queued: Arc::clone(&queued),
        },
        OutboxReceiver { rx, queued },
    )
}

impl Outbox {
    /// Queue without waiting. Fails with `QueueFull` on a full bounded queue.
    pub(crate) fn try_push(&self, message: Message) -> Result<(), TransportError> {
        self.queued.fetch_add(1, Ordering::AcqRel);
        let result = match &self.tx {
            OutboxSender::Bounded(tx) => tx.try_send(message).map_err(TransportError::from),
            OutboxSender::Unbounded(tx) => tx.send(message).map_err(TransportError::from),
        };
        if result.is_err() {
            self.queued.fetch_sub(1, Ordering::AcqRel);
        }
        result
    }

    /// Queue, waiting for room on a bounded queue.
    pub(crate) async fn push(&self, message: Message) -> Result<(), TransportError> {
        self.queued.fetch_add(1, Ordering::AcqRel);
        let result = match &self.tx {
            OutboxSender::Bounded(tx) => tx.send(message).await.map_err(TransportError::from),
            OutboxSender::Unbounded(tx) => tx.send(message).map_err(TransportError::from),
        };
        if result.is_err() {
            self.queued.fetch_sub(1, Ordering::AcqRel);
        }
        result
    }

    /// Frames accepted but not yet taken by the writer.
    pub(crate) fn len(&self) -> usize {
        self.queued.load(Ordering::Acquire)
    }
}

impl OutboxReceiver {
    pub(crate) async fn recv(&mut self) -> Option<Message> {
        let message = match &mut self.rx {
            OutboxChannel::Bounded(rx) => rx.recv().await,
            OutboxChannel::Unbounded(rx) => rx.recv().await,
        };
        self.taken(message)
    }

    /// Next frame if one is already queued.
    pub(crate) fn try_recv(&mut self) -> Option<Message> {
        let message = match &mut self.rx {
            OutboxChannel::Bounded(rx) => rx.try_recv().ok(),
            OutboxChannel::Unbounded(rx) => rx.try_recv().ok(),
        };
        self.taken(message)
    }

    fn taken(&self, message: Option<Message>) -> Option<Message> {
        if message.is_some() {
            self.queued.fetch_sub(1, Ordering::AcqRel);
        }
        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn bounded_reports_full_and_counts() {
        let (tx, mut rx) = outbox(Some(2));
        tx.try_push(Message::empty(1, 1)).unwrap();
        tx.try_push(Message::empty(1, 2)).unwrap();
        assert!(matches!(
            tx.try_push(Message::empty(1, 3)),
            Err(TransportError::QueueFull)
        ));
        assert_eq!(tx.len(), 2);

        assert_eq!(rx.recv().await.unwrap().message_type(), 1);
        assert_eq!(rx.try_recv().unwrap().message_type(), 2);
        assert!(rx.try_recv().is_none());
        assert_eq!(tx.len(), 0);
    }

    #[tokio::test]
    async fn unbounded_never_full() {
        let (tx, mut rx) = outbox(None);
        for i in 0..1000 {
            tx.try_push(Message::empty(1, i)).unwrap();
        }
        assert_eq!(tx.len(), 1000);
        for i in 0..1000 {
            assert_eq!(rx.recv().await.unwrap().message_type(), i);
        }
    }

    #[tokio::test]
    async fn closed_receiver_reports_channel_closed() {
        let (tx, rx) = outbox(Some(4));
        drop(rx);
        assert!(matches!(
            tx.try_push(Message::empty(1, 1)),
            Err(TransportError::ChannelClosed)
        ));
        assert!(matches!(
            tx.push(Message::empty(1, 1)).await,
            Err(TransportError::ChannelClosed)
        ));
        assert_eq!(tx.len(), 0);
    }
}
