//! Service id → handler table consulted by the reader on every frame.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use crate::error::TransportError;
use crate::service::MessageHandler;

struct Entry {
    /// Identifies the registration that installed this handler, so a stale
    /// handle can never remove a newer registration for the same id.
    token: u64,
    handler: Arc<dyn MessageHandler>,
}

#[derive(Default)]
pub(crate) struct ServiceRegistry {
    entries: RwLock<HashMap<u32, Entry>>,
    next_token: AtomicU64,
}

impl ServiceRegistry {
    pub(crate) fn register(
        &self,
        service_id: u32,
        handler: Arc<dyn MessageHandler>,
    ) -> Result<u64, TransportError> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if entries.contains_key(&service_id) {
            return Err(TransportError::ServiceAlreadyRegistered(service_id));
        }
        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        entries.insert(service_id, Entry { token, handler });
        Ok(token)
    }

    /// Remove the handler installed under `token`. Returns `false` if that
    /// registration is already gone.
    pub(crate) fn unregister(&self, service_id: u32, token: u64) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        match entries.get(&service_id) {
            Some(entry) if entry.token == token => {
                entries.remove(&service_id);
                true
            }
            _ => false,
        }
    }

    /// Clone the handler out so it runs without the lock held.
    pub(crate) fn lookup(&self, service_id: u32) -> Option<Arc<dyn MessageHandler>> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.get(&service_id).map(|entry| Arc::clone(&entry.handler))
    }

    pub(crate) fn contains(&self, service_id: u32) -> bool {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.contains_key(&service_id)
    }

    /// Remove every handler, dropping them after the lock is released.
    pub(crate) fn clear(&self) {
        let entries = {
            let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
            std::mem::take(&mut *entries)
        };
        drop(entries);
    }

    pub(crate) fn service_ids(&self) -> Vec<u32> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let mut ids: Vec<u32> = entries.keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}

impl std::fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceRegistry")
            .field("services", &self.service_ids())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn noop() -> Arc<dyn MessageHandler> {
        Arc::new(|_: u32, _: Bytes| {})
    }

    #[test]
    fn duplicate_registration_rejected() {
        let registry = ServiceRegistry::default();
        registry.register(7, noop()).unwrap();
        let err = registry.register(7, noop()).unwrap_err();
        assert!(matches!(err, TransportError::ServiceAlreadyRegistered(7)));
    }

    #[test]
    fn stale_token_does_not_remove_newer_registration() {
        let registry = ServiceRegistry::default();
        let old = registry.register(7, noop()).unwrap();
        assert!(registry.unregister(7, old));

        let new = registry.register(7, noop()).unwrap();
        assert_ne!(old, new);
        assert!(!registry.unregister(7, old));
        assert!(registry.contains(7));
    }

    #[test]
    fn clear_removes_everything() {
        let registry = ServiceRegistry::default();
        let token = registry.register(1, noop()).unwrap();
        registry.register(2, noop()).unwrap();
        registry.clear();
        assert!(registry.service_ids().is_empty());
        assert!(!registry.unregister(1, token));
    }

    #[test]
    fn lookup_and_listing() {
        let registry = ServiceRegistry::default();
        registry.register(2, noop()).unwrap();
        registry.register(1, noop()).unwrap();
        assert!(registry.lookup(1).is_some());
        assert!(registry.lookup(3).is_none());
        assert_eq!(registry.service_ids(), vec![1, 2]);
    }
}
