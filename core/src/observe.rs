//! Listener registry behind the components' `subscribe` methods.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener<E> = Arc<dyn Fn(&E) + Send + Sync>;

pub(crate) struct Observers<E> {
    next_id: AtomicU64,
    listeners: Mutex<Vec<(SubscriptionId, Listener<E>)>>,
}

impl<E> Default for Observers<E> {
    fn default() -> Self {
        Self {
            next_id: AtomicU64::new(0),
            listeners: Mutex::new(Vec::new()),
        }
    }
}

impl<E> Observers<E> {
    pub(crate) fn subscribe(
        &self,
        listener: impl Fn(&E) + Send + Sync + 'static,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.lock().push((id, Arc::new(listener)));
        id
    }

    pub(crate) fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = self.lock();
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    /// Call every listener in subscription order. The registry lock is not
    /// held during the calls, so a listener may subscribe or unsubscribe.
    pub(crate) fn emit(&self, event: &E) {
        let listeners: Vec<Listener<E>> = self.lock().iter().map(|(_, l)| l.clone()).collect();
        for listener in listeners {
            listener(event);
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(SubscriptionId, Listener<E>)>> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emit_reaches_current_subscribers_only() {
        let observers = Observers::<u32>::default();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let sink = seen.clone();
        let id = observers.subscribe(move |n| sink.lock().unwrap().push(*n));
        observers.emit(&1);
        assert!(observers.unsubscribe(id));
        observers.emit(&2);

        assert_eq!(*seen.lock().unwrap(), vec![1]);
        assert!(!observers.unsubscribe(id));
    }
}
