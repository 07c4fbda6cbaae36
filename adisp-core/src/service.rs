//! Service endpoints multiplexed over a [`Transport`].
//!
//! A service is anything that can take a decoded message for its id:
//! registration stores a [`MessageHandler`] under that id, and the
//! returned [`Service`] handle owns the registration until it is dropped.

use std::sync::Arc;

use bytes::Bytes;

use crate::error::TransportError;
use crate::transport::Transport;

/// Receives messages addressed to one service id.
///
/// Called on the transport's reader task, one message at a time, in arrival
/// order. Handlers must return promptly: while one runs, no other message on
/// the transport is dispatched. Hand slow work to another task.
///
/// The transport keeps its handlers until it reaches `Closed`. A handler that
/// replies should hold a [`WeakTransport`](crate::WeakTransport), not a
/// `Transport`, or the session stays open until someone calls `close()`.
pub trait MessageHandler: Send + Sync + 'static {
    fn on_message_received(&self, message_type: u32, payload: Bytes);
}

impl<F> MessageHandler for F
where
    F: Fn(u32, Bytes) + Send + Sync + 'static,
{
    fn on_message_received(&self, message_type: u32, payload: Bytes) {
        self(message_type, payload)
    }
}

/// Optional start/stop callbacks for handlers managed with
/// [`Service::start`] and [`Service::stop`].
pub trait ServiceHooks: MessageHandler {
    /// Runs right after registration.
    fn on_start(&self, service: &Service) {
        let _ = service;
    }

    /// Runs right before the registration is removed.
    fn on_stop(&self, service: &Service) {
        let _ = service;
    }
}

/// A registered endpoint, bound to one transport and one id for its lifetime.
///
/// Dropping the handle unregisters it; later frames for the id are treated
/// as addressed to an unknown service.
pub struct Service {
    transport: Transport,
    service_id: u32,
    token: u64,
    hooks: Option<Arc<dyn ServiceHooks>>,
}

impl Service {
    /// Bind `handler` to `service_id` on `transport`.
    ///
    /// Register before [`Transport::start_reading`] to see every frame;
    /// frames that arrive before registration completes are dropped. Fails
    /// with `ChannelClosed` once the transport is closed.
    pub fn register(
        transport: &Transport,
        service_id: u32,
        handler: impl MessageHandler,
    ) -> Result<Self, TransportError> {
        Self::register_shared(transport, service_id, Arc::new(handler))
    }

    /// Like [`register`](Self::register), for a handler that is shared elsewhere.
    pub fn register_shared(
        transport: &Transport,
        service_id: u32,
        handler: Arc<dyn MessageHandler>,
    ) -> Result<Self, TransportError> {
        let registry = &transport.inner().registry;
        let token = registry.register(service_id, handler)?;
        // Closing clears the registry; anything inserted after that is ours to undo.
        if transport.state().is_closed() {
            registry.unregister(service_id, token);
            return Err(TransportError::ChannelClosed);
        }
        tracing::debug!(service_id, "service registered");
        Ok(Self {
            transport: transport.clone(),
            service_id,
            token,
            hooks: None,
        })
    }

    /// Register `hooks` and run its `on_start` callback.
    pub fn start<H: ServiceHooks>(
        transport: &Transport,
        service_id: u32,
        hooks: Arc<H>,
    ) -> Result<Self, TransportError> {
        let handler: Arc<dyn MessageHandler> = hooks.clone();
        let mut service = Self::register_shared(transport, service_id, handler)?;
        hooks.on_start(&service);
        service.hooks = Some(hooks);
        Ok(service)
    }

    /// Run `on_stop` (if started with hooks) and unregister.
    pub fn stop(self) {
        if let Some(hooks) = &self.hooks {
            hooks.on_stop(&self);
        }
    }

    /// Remove this service's handler from the transport.
    pub fn unregister(self) {
        drop(self);
    }

    pub fn id(&self) -> u32 {
        self.service_id
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    /// Queue a message for `target_service` on the peer.
    pub fn send(
        &self,
        target_service: u32,
        message_type: u32,
        payload: impl Into<Bytes>,
    ) -> Result<(), TransportError> {
        self.transport.send(target_service, message_type, payload)
    }

    /// Queue a message, waiting for room in a bounded send queue.
    pub async fn send_async(
        &self,
        target_service: u32,
        message_type: u32,
        payload: impl Into<Bytes>,
    ) -> Result<(), TransportError> {
        self.transport
            .send_async(target_service, message_type, payload)
            .await
    }
}

impl Drop for Service {
    fn drop(&mut self) {
        if self
            .transport
            .inner()
            .registry
            .unregister(self.service_id, self.token)
        {
            tracing::debug!(service_id = self.service_id, "service unregistered");
        }
    }
}

impl std::fmt::Debug for Service {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Service")
            .field("service_id", &self.service_id)
            .field("has_hooks", &self.hooks.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TransportConfig;
    use std::sync::Mutex;

    fn transport() -> Transport {
        let (local, _remote) = tokio::io::duplex(64);
        Transport::new(local, TransportConfig::default()).unwrap()
    }

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<&'static str>>,
    }

    impl MessageHandler for Recorder {
        fn on_message_received(&self, _message_type: u32, _payload: Bytes) {
            self.events.lock().unwrap().push("message");
        }
    }

    impl ServiceHooks for Recorder {
        fn on_start(&self, service: &Service) {
            assert!(service.transport().is_registered(service.id()));
            self.events.lock().unwrap().push("start");
        }

        fn on_stop(&self, service: &Service) {
            assert!(service.transport().is_registered(service.id()));
            self.events.lock().unwrap().push("stop");
        }
    }

    #[test]
    fn drop_unregisters() {
        let transport = transport();
        let service = Service::register(&transport, 7, |_: u32, _: Bytes| {}).unwrap();
        assert!(transport.is_registered(7));
        drop(service);
        assert!(!transport.is_registered(7));
    }

    #[test]
    fn one_handler_per_id() {
        let transport = transport();
        let _first = Service::register(&transport, 7, |_: u32, _: Bytes| {}).unwrap();
        let err = Service::register(&transport, 7, |_: u32, _: Bytes| {}).unwrap_err();
        assert!(matches!(err, TransportError::ServiceAlreadyRegistered(7)));
    }

    #[test]
    fn id_reusable_after_unregister() {
        let transport = transport();
        Service::register(&transport, 7, |_: u32, _: Bytes| {})
            .unwrap()
            .unregister();
        assert!(Service::register(&transport, 7, |_: u32, _: Bytes| {}).is_ok());
    }

    #[test]
    fn start_and_stop_run_hooks_around_registration() {
        let transport = transport();
        let recorder = Arc::new(Recorder::default());

        let service = Service::start(&transport, 2, Arc::clone(&recorder)).unwrap();
        service.stop();

        assert!(!transport.is_registered(2));
        assert_eq!(*recorder.events.lock().unwrap(), vec!["start", "stop"]);
    }

    #[test]
    fn register_after_close_rejected() {
        let transport = transport();
        transport.close();
        let err = Service::register(&transport, 7, |_: u32, _: Bytes| {}).unwrap_err();
        assert!(matches!(err, TransportError::ChannelClosed));
        assert!(!transport.is_registered(7));
    }

    #[test]
    fn closing_releases_handlers() {
        let transport = transport();
        let recorder = Arc::new(Recorder::default());
        let _service = Service::register_shared(&transport, 3, recorder.clone()).unwrap();
        assert_eq!(Arc::strong_count(&recorder), 2);

        transport.close();
        assert!(transport.state().is_closed());
        assert_eq!(Arc::strong_count(&recorder), 1);
    }

    #[test]
    fn send_delegates_to_transport() {
        let transport = transport();
        let service = Service::register(&transport, 2, |_: u32, _: Bytes| {}).unwrap();
        service.send(1, 1, Bytes::new()).unwrap();
        assert_eq!(transport.queued_frames(), 1);
    }
}
