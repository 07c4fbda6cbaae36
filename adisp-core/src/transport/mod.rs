//! Framed message transport over one duplex byte channel.
//!
//! ```text
//! Service A ─┐                                     ┌─► Service A handler
//! Service B ─┼─► Outbox ─► writer task ─► channel ─┼─► reader task ─► registry
//! Service N ─┘                                     └─► (unknown id: dropped)
//! ```
//!
//! Exactly one reader and one writer touch the channel. Callers only queue
//! whole messages, so frames from concurrent senders never interleave on
//! the wire.

mod outbox;
mod reader;
pub(crate) mod registry;
mod writer;

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use bytes::Bytes;
use futures::StreamExt;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::watch;
use tokio_util::codec::Framed;
use tokio_util::sync::CancellationToken;

use crate::codec::FrameCodec;
use crate::config::TransportConfig;
use crate::error::TransportError;
use crate::message::Message;
use crate::state::{CloseReason, TransportState};

use outbox::{Outbox, OutboxReceiver};
use registry::ServiceRegistry;

/// Duplex byte stream a [`Transport`] runs on. A `TcpStream` in practice.
pub trait ByteChannel: AsyncRead + AsyncWrite + Send + Unpin + 'static {}

impl<T> ByteChannel for T where T: AsyncRead + AsyncWrite + Send + Unpin + 'static {}

type FramedChannel = Framed<Box<dyn ByteChannel>, FrameCodec>;

/// Channel and queue held until `start_reading` hands them to the tasks.
struct Pending {
    channel: Box<dyn ByteChannel>,
    outbox_rx: OutboxReceiver,
}

/// Cloneable handle to one transport session.
///
/// Every clone refers to the same session; closing any of them closes all.
/// Dropping the last clone (including those held by [`Service`](crate::Service)
/// handles) closes the transport too.
#[derive(Clone)]
pub struct Transport {
    owner: Arc<Owner>,
}

/// Non-owning handle that does not keep the transport open.
///
/// Handlers that reply on the transport they are registered with should hold
/// one of these: a [`Transport`] stored in the registry would keep the
/// session alive until it is closed explicitly.
#[derive(Clone, Default)]
pub struct WeakTransport {
    owner: Weak<Owner>,
}

/// Shared by every [`Transport`] clone. The tasks only hold `Inner`.
struct Owner {
    inner: Arc<Inner>,
}

impl Drop for Owner {
    fn drop(&mut self) {
        self.inner.begin_shutdown(CloseReason::Requested);
    }
}

pub(crate) struct Inner {
    config: TransportConfig,
    pub(crate) registry: ServiceRegistry,
    outbox: Outbox,
    pending: Mutex<Option<Pending>>,
    state: watch::Sender<TransportState>,
    close_reason: Mutex<Option<CloseReason>>,
    shutdown: CancellationToken,
    live_tasks: AtomicUsize,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Transport {
    /// Wrap `channel` in a transport in the `Created` state.
    ///
    /// The transport does not read until [`start_reading`](Self::start_reading);
    /// frames sent before then are queued.
    pub fn new(channel: impl ByteChannel, config: TransportConfig) -> Result<Self, TransportError> {
        config.validate()?;
        let (outbox, outbox_rx) = outbox::outbox(config.send_queue_capacity);
        let (state, _) = watch::channel(TransportState::Created);
        let pending = Pending {
            channel: Box::new(channel),
            outbox_rx,
        };

        let inner = Arc::new(Inner {
            config,
            registry: ServiceRegistry::default(),
            outbox,
            pending: Mutex::new(Some(pending)),
            state,
            close_reason: Mutex::new(None),
            shutdown: CancellationToken::new(),
            live_tasks: AtomicUsize::new(0),
        });
        Ok(Self {
            owner: Arc::new(Owner { inner }),
        })
    }

    /// Move `Created → Open` and spawn the reader and writer tasks.
    ///
    /// Must be called from within a Tokio runtime. Register services first:
    /// frames for an id with no handler yet are dropped.
    pub fn start_reading(&self) -> Result<(), TransportError> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| TransportError::NoRuntime)?;

        let mut pending = lock(&self.inner().pending);
        let mut opened = Ok(());
        self.inner().state.send_if_modified(|state| {
            opened = state.open();
            opened.is_ok()
        });
        opened?;
        let Pending { channel, outbox_rx } = pending.take().ok_or(TransportError::ChannelClosed)?;

        let codec = FrameCodec::new(self.inner().config.max_payload_capacity);
        let framed: FramedChannel = Framed::new(channel, codec);
        let (sink, stream) = framed.split();

        self.inner().live_tasks.store(2, Ordering::SeqCst);
        runtime.spawn(writer::run(Arc::clone(&self.owner.inner), sink, outbox_rx));
        runtime.spawn(reader::run(Arc::clone(&self.owner.inner), stream));
        drop(pending);

        tracing::info!(
            max_payload = self.inner().config.max_payload_capacity,
            services = ?self.inner().registry.service_ids(),
            "transport open"
        );
        Ok(())
    }

    /// Queue a message for `service_id` on the peer.
    ///
    /// Returns once the frame is queued, never waiting for the channel. Fails
    /// with `OversizedMessage` if the payload exceeds the configured capacity,
    /// `QueueFull` if a bounded queue has no room, and `ChannelClosed` once
    /// shutdown has begun. None of these change the transport's state.
    pub fn send(
        &self,
        service_id: u32,
        message_type: u32,
        payload: impl Into<Bytes>,
    ) -> Result<(), TransportError> {
        let message = self.prepare(service_id, message_type, payload.into())?;
        self.inner().outbox.try_push(message)
    }

    /// Like [`send`](Self::send), but waits for room in a bounded queue
    /// instead of failing with `QueueFull`.
    pub async fn send_async(
        &self,
        service_id: u32,
        message_type: u32,
        payload: impl Into<Bytes>,
    ) -> Result<(), TransportError> {
        let message = self.prepare(service_id, message_type, payload.into())?;
        self.inner().outbox.push(message).await
    }

    fn prepare(
        &self,
        service_id: u32,
        message_type: u32,
        payload: Bytes,
    ) -> Result<Message, TransportError> {
        let max = self.inner().config.max_payload_capacity;
        if payload.len() > max {
            return Err(TransportError::OversizedMessage {
                size: payload.len(),
                max,
            });
        }
        if !self.state().accepts_sends() {
            return Err(TransportError::ChannelClosed);
        }
        tracing::trace!(service_id, message_type, len = payload.len(), "queue frame");
        Ok(Message::new(service_id, message_type, payload))
    }

    /// Begin shutdown. Safe to call from any thread, any number of times.
    ///
    /// Queued frames that have not reached the channel are discarded.
    pub fn close(&self) {
        self.inner().begin_shutdown(CloseReason::Requested);
    }

    /// Wait until the transport reaches `Closed`.
    pub async fn closed(&self) {
        let mut rx = self.inner().state.subscribe();
        // The sender lives in `inner`, which `self` keeps alive.
        let _ = rx.wait_for(TransportState::is_closed).await;
    }

    pub fn state(&self) -> TransportState {
        *self.inner().state.borrow()
    }

    /// Observe state transitions as they happen.
    pub fn subscribe(&self) -> watch::Receiver<TransportState> {
        self.inner().state.subscribe()
    }

    /// Why the transport left `Open`, once it has.
    pub fn close_reason(&self) -> Option<CloseReason> {
        lock(&self.inner().close_reason).clone()
    }

    pub fn config(&self) -> &TransportConfig {
        &self.inner().config
    }

    pub fn max_payload_capacity(&self) -> usize {
        self.inner().config.max_payload_capacity
    }

    /// Frames queued but not yet taken by the writer.
    pub fn queued_frames(&self) -> usize {
        self.inner().outbox.len()
    }

    pub fn is_registered(&self, service_id: u32) -> bool {
        self.inner().registry.contains(service_id)
    }

    /// A handle that does not keep the transport open.
    pub fn downgrade(&self) -> WeakTransport {
        WeakTransport {
            owner: Arc::downgrade(&self.owner),
        }
    }

    pub(crate) fn inner(&self) -> &Inner {
        &self.owner.inner
    }
}

impl fmt::Debug for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transport")
            .field("state", &self.state())
            .field("config", &self.inner().config)
            .field("registry", &self.inner().registry)
            .field("queued_frames", &self.queued_frames())
            .finish()
    }
}

impl WeakTransport {
    /// The transport, if any strong handle to it is still alive.
    pub fn upgrade(&self) -> Option<Transport> {
        self.owner.upgrade().map(|owner| Transport { owner })
    }
}

impl fmt::Debug for WeakTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakTransport")
            .field("alive", &(self.owner.strong_count() > 0))
            .finish()
    }
}

impl Inner {
    /// Move to `Closing` and record why. Only the first call has any effect.
    pub(crate) fn begin_shutdown(&self, reason: CloseReason) {
        let mut pending = lock(&self.pending);
        let mut recorded = lock(&self.close_reason);
        let mut began = false;
        self.state.send_if_modified(|state| {
            began = state.begin_close();
            began
        });
        if !began {
            return;
        }

        log_close(&reason);
        *recorded = Some(reason);
        drop(recorded);
        self.shutdown.cancel();

        // Never started: no task will finish the close, and dropping the
        // channel here is what closes it.
        let never_started = pending.take();
        drop(pending);
        if let Some(pending) = never_started {
            drop(pending);
            self.finish_close();
        }
    }

    /// Called by each task as it exits; the last one completes the close.
    pub(crate) fn task_finished(&self) {
        if self.live_tasks.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.finish_close();
        }
    }

    /// Drops every handler. Must run with no lock held: a handler may own the
    /// last `Transport`.
    fn finish_close(&self) {
        if self.state.send_if_modified(TransportState::finish_close) {
            self.registry.clear();
            tracing::debug!("transport closed");
        }
    }

    pub(crate) fn shutdown_token(&self) -> &CancellationToken {
        &self.shutdown
    }

    /// Route one decoded message to its service, on the reader task.
    pub(crate) fn dispatch(&self, message: Message) {
        let (service_id, message_type, payload) = message.into_parts();
        match self.registry.lookup(service_id) {
            Some(handler) => handler.on_message_received(message_type, payload),
            None => tracing::warn!(
                service_id,
                message_type,
                len = payload.len(),
                "no service registered; dropping message"
            ),
        }
    }
}

fn log_close(reason: &CloseReason) {
    match reason {
        CloseReason::Requested | CloseReason::PeerClosed => {
            tracing::info!("closing transport: {reason}")
        }
        CloseReason::ProtocolViolation(_) => tracing::warn!("closing transport: {reason}"),
        CloseReason::ChannelFailure(_) | CloseReason::Aborted => {
            tracing::error!("closing transport: {reason}")
        }
    }
}

/// Completes the close when a task exits, including by panic.
pub(crate) struct TaskGuard {
    inner: Arc<Inner>,
}

impl TaskGuard {
    pub(crate) fn new(inner: Arc<Inner>) -> Self {
        Self { inner }
    }
}

impl Drop for TaskGuard {
    fn drop(&mut self) {
        self.inner.begin_shutdown(CloseReason::Aborted);
        self.inner.task_finished();
    }
}
