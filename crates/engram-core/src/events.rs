//! In-process publish/subscribe for memory lifecycle events.

use engram_protocol::{MemoryEvent, MemoryEventKind};
use log::warn;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

/// Identifier handed back at subscription time.
pub type ListenerId = u64;

type Listener = Arc<dyn Fn(&MemoryEvent) + Send + Sync>;

#[derive(Default)]
struct BusState {
    last_id: ListenerId,
    typed: HashMap<MemoryEventKind, Vec<(ListenerId, Listener)>>,
    global: Vec<(ListenerId, Listener)>,
}

impl BusState {
    fn next_id(&mut self) -> ListenerId {
        self.last_id += 1;
        self.last_id
    }
}

/// Synchronous fan-out of lifecycle events to typed and global listeners.
///
/// Listeners run on the emitting flow of control, in subscription order. A
/// panicking listener is logged and never interrupts delivery to the
/// remaining listeners or propagates to the emitter. No persistence, no
/// replay, no cross-process delivery.
#[derive(Default)]
pub struct MemoryEventBus {
    state: Mutex<BusState>,
}

impl MemoryEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener for a single event kind.
    pub fn on(
        &self,
        kind: MemoryEventKind,
        listener: impl Fn(&MemoryEvent) + Send + Sync + 'static,
    ) -> ListenerId {
        let mut state = self.state.lock();
        let id = state.next_id();
        state
            .typed
            .entry(kind)
            .or_default()
            .push((id, Arc::new(listener)));
        id
    }

    /// Register a listener for every event.
    pub fn subscribe(&self, listener: impl Fn(&MemoryEvent) + Send + Sync + 'static) -> ListenerId {
        let mut state = self.state.lock();
        let id = state.next_id();
        state.global.push((id, Arc::new(listener)));
        id
    }

    /// Remove a typed listener; unknown ids are a no-op.
    pub fn off(&self, id: ListenerId) {
        let mut state = self.state.lock();
        for listeners in state.typed.values_mut() {
            listeners.retain(|(listener_id, _)| *listener_id != id);
        }
    }

    /// Remove a global listener; unknown ids are a no-op.
    pub fn unsubscribe(&self, id: ListenerId) {
        self.state
            .lock()
            .global
            .retain(|(listener_id, _)| *listener_id != id);
    }

    /// Drop every listener.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.typed.clear();
        state.global.clear();
    }

    /// Count of registered listeners, for diagnostics.
    pub fn listener_count(&self) -> usize {
        let state = self.state.lock();
        state.typed.values().map(Vec::len).sum::<usize>() + state.global.len()
    }

    /// Deliver an event to matching typed listeners, then global listeners.
    pub fn emit(&self, event: &MemoryEvent) {
        let listeners: Vec<Listener> = {
            let state = self.state.lock();
            state
                .typed
                .get(&event.kind)
                .into_iter()
                .flatten()
                .chain(state.global.iter())
                .map(|(_, listener)| listener.clone())
                .collect()
        };
        for listener in listeners {
            if catch_unwind(AssertUnwindSafe(|| listener(event))).is_err() {
                warn!(
                    "memory event listener panicked (kind={})",
                    event.kind.as_str()
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::MemoryEventBus;
    use chrono::Utc;
    use engram_protocol::{MemoryEvent, MemoryEventKind};
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn event(kind: MemoryEventKind) -> MemoryEvent {
        MemoryEvent {
            kind,
            entry_id: None,
            category: None,
            agent_id: "a".to_string(),
            tab_id: None,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn typed_listeners_only_see_their_kind() {
        let bus = MemoryEventBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        bus.on(MemoryEventKind::Added, move |event| {
            sink.lock().push(event.kind);
        });

        bus.emit(&event(MemoryEventKind::Added));
        bus.emit(&event(MemoryEventKind::Searched));

        assert_eq!(*seen.lock(), vec![MemoryEventKind::Added]);
    }

    #[test]
    fn delivery_follows_subscription_order() {
        let bus = MemoryEventBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        for index in 0..3 {
            let sink = seen.clone();
            bus.subscribe(move |_| sink.lock().push(index));
        }

        bus.emit(&event(MemoryEventKind::Added));

        assert_eq!(*seen.lock(), vec![0, 1, 2]);
    }

    #[test]
    fn panicking_listener_does_not_interrupt_delivery() {
        let bus = MemoryEventBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        bus.subscribe(|_| panic!("listener failure"));
        let sink = seen.clone();
        bus.subscribe(move |event| sink.lock().push(event.kind));

        bus.emit(&event(MemoryEventKind::Searched));

        assert_eq!(*seen.lock(), vec![MemoryEventKind::Searched]);
    }

    #[test]
    fn removing_unknown_listeners_is_a_no_op() {
        let bus = MemoryEventBus::new();
        let id = bus.subscribe(|_| {});
        bus.unsubscribe(id);
        bus.unsubscribe(id);
        bus.off(9999);
        assert_eq!(bus.listener_count(), 0);
    }

    #[test]
    fn clear_drops_every_listener() {
        let bus = MemoryEventBus::new();
        bus.subscribe(|_| {});
        bus.on(MemoryEventKind::Added, |_| {});
        assert_eq!(bus.listener_count(), 2);
        bus.clear();
        assert_eq!(bus.listener_count(), 0);
    }
}
