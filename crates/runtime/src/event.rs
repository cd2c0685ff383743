//! A minimal observer dispatcher shared by `Wire`, `Mesh`, and the registry
//! (§3, §4.D: "per-wire event dispatcher", "an event dispatcher").

use std::sync::{Arc, Mutex};

/// Events a wire fires to its subscribed observers over its lifetime.
#[derive(Debug, Clone)]
pub enum WireEventKind {
    /// An exposed variable's value changed (§4.E: fired "iff the EXPOSED flag
    /// is set").
    OnExposedVarSet { name: String },
    /// The wire's `cleanup` ran.
    OnCleanup,
    /// The wire reached a terminal state (`Ended`/`Failed`).
    OnStop,
}

/// A broadcast list of observer callbacks. Cloning an `EventDispatcher` is
/// cheap and shares the same observer list (`Arc` inside).
pub struct EventDispatcher<E> {
    observers: Mutex<Vec<Arc<dyn Fn(&E) + Send + Sync>>>,
}

impl<E> EventDispatcher<E> {
    pub fn new() -> Self {
        EventDispatcher { observers: Mutex::new(Vec::new()) }
    }

    pub fn subscribe(&self, observer: Arc<dyn Fn(&E) + Send + Sync>) {
        self.observers.lock().expect("dispatcher mutex poisoned").push(observer);
    }

    pub fn fire(&self, event: &E) {
        for observer in self.observers.lock().expect("dispatcher mutex poisoned").iter() {
            observer(event);
        }
    }

    pub fn observer_count(&self) -> usize {
        self.observers.lock().expect("dispatcher mutex poisoned").len()
    }
}

impl<E> Default for EventDispatcher<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn fire_calls_every_subscriber() {
        let dispatcher: EventDispatcher<WireEventKind> = EventDispatcher::new();
        let count = Arc::new(AtomicUsize::new(0));
        for _ in 0..3 {
            let count = Arc::clone(&count);
            dispatcher.subscribe(Arc::new(move |_event: &WireEventKind| {
                count.fetch_add(1, Ordering::SeqCst);
            }));
        }
        dispatcher.fire(&WireEventKind::OnCleanup);
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }
}
