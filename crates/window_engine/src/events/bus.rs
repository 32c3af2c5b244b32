//! Ordered, cancelable publish/subscribe
//!
//! Listeners subscribe per [`EventKind`] and run in registration order.
//! Dispatch works from a snapshot of the listener list, so listeners may
//! add or remove listeners (their own included) while an event is in
//! flight: additions wait for the next event, removals take effect
//! immediately.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

use super::{Event, EventError, EventKind};

/// Error a listener may return; logged, never propagated
pub type ListenerError = Box<dyn std::error::Error>;

/// Listener outcome
pub type ListenerResult = Result<(), ListenerError>;

/// Event callback
pub type Listener = Rc<dyn Fn(&Event) -> ListenerResult>;

/// Registration token used to remove a listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Single publish point for every window event
#[derive(Default)]
pub struct EventBus {
    listeners: RefCell<HashMap<EventKind, Vec<(ListenerId, Listener)>>>,
    next_id: Cell<u64>,
}

impl EventBus {
    /// Create a bus with no listeners
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to one kind
    pub fn add_listener<F>(&self, kind: EventKind, listener: F) -> ListenerId
    where
        F: Fn(&Event) -> ListenerResult + 'static,
    {
        let id = ListenerId(self.next_id.get() + 1);
        self.next_id.set(id.0);
        self.listeners
            .borrow_mut()
            .entry(kind)
            .or_default()
            .push((id, Rc::new(listener)));
        id
    }

    /// Subscribe by kind name, e.g. `"dblclick"`
    pub fn add_event_listener<F>(&self, name: &str, listener: F) -> Result<ListenerId, EventError>
    where
        F: Fn(&Event) -> ListenerResult + 'static,
    {
        let kind = name.parse()?;
        Ok(self.add_listener(kind, listener))
    }

    /// Unsubscribe; returns whether the listener was registered
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.borrow_mut();
        for list in listeners.values_mut() {
            if let Some(index) = list.iter().position(|(existing, _)| *existing == id) {
                list.remove(index);
                return true;
            }
        }
        false
    }

    /// Number of listeners for a kind
    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.listeners.borrow().get(&kind).map_or(0, Vec::len)
    }

    /// Drop every listener
    pub fn clear(&self) {
        self.listeners.borrow_mut().clear();
    }

    /// Deliver `event` to its listeners
    ///
    /// Returns `true` unless a listener cancelled the event. Listener errors
    /// and panics are logged and the remaining listeners still run.
    pub fn dispatch(&self, event: &Event) -> bool {
        let kind = event.kind();
        let snapshot = self
            .listeners
            .borrow()
            .get(&kind)
            .cloned()
            .unwrap_or_default();

        for (id, listener) in snapshot {
            if !self.is_registered(kind, id) {
                continue;
            }
            match panic::catch_unwind(AssertUnwindSafe(|| listener(event))) {
                Ok(Ok(())) => {}
                Ok(Err(err)) => log::error!("Listener {id} for '{kind}' failed: {err}"),
                Err(payload) => {
                    let message = panic_message(&*payload);
                    log::error!("Listener {id} for '{kind}' panicked: {message}");
                }
            }
        }

        !event.default_prevented()
    }

    fn is_registered(&self, kind: EventKind, id: ListenerId) -> bool {
        self.listeners
            .borrow()
            .get(&kind)
            .is_some_and(|list| list.iter().any(|(existing, _)| *existing == id))
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let listeners = self.listeners.borrow();
        f.debug_struct("EventBus")
            .field("kinds", &listeners.len())
            .field("listeners", &listeners.values().map(Vec::len).sum::<usize>())
            .finish()
    }
}

/// Best-effort text of a panic payload
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventData;

    fn event(kind: EventKind) -> Event {
        Event::new(kind, None, 0.0, EventData::None)
    }

    #[test]
    fn test_listeners_run_in_registration_order() {
        let bus = EventBus::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        for n in 0..3 {
            let log = Rc::clone(&log);
            bus.add_listener(EventKind::Refresh, move |_| {
                log.borrow_mut().push(n);
                Ok(())
            });
        }

        assert!(bus.dispatch(&event(EventKind::Refresh)));
        assert_eq!(*log.borrow(), vec![0, 1, 2]);
    }

    #[test]
    fn test_only_matching_kind_is_invoked() {
        let bus = EventBus::new();
        let hits = Rc::new(Cell::new(0));
        let counter = Rc::clone(&hits);
        bus.add_listener(EventKind::Focus, move |_| {
            counter.set(counter.get() + 1);
            Ok(())
        });

        bus.dispatch(&event(EventKind::Refresh));
        bus.dispatch(&event(EventKind::Focus));

        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn test_cancellation_is_reported() {
        let bus = EventBus::new();
        bus.add_listener(EventKind::Close, |event| {
            event.prevent_default();
            Ok(())
        });

        assert!(!bus.dispatch(&event(EventKind::Close)));
    }

    #[test]
    fn test_non_cancelable_cannot_be_cancelled() {
        let bus = EventBus::new();
        bus.add_listener(EventKind::Closed, |event| {
            event.prevent_default();
            Ok(())
        });

        assert!(bus.dispatch(&event(EventKind::Closed)));
    }

    #[test]
    fn test_errors_and_panics_do_not_stop_dispatch() {
        let bus = EventBus::new();
        let reached = Rc::new(Cell::new(false));

        bus.add_listener(EventKind::Refresh, |_| Err("listener failed".into()));
        bus.add_listener(EventKind::Refresh, |_| panic!("listener panicked"));
        let flag = Rc::clone(&reached);
        bus.add_listener(EventKind::Refresh, move |_| {
            flag.set(true);
            Ok(())
        });

        assert!(bus.dispatch(&event(EventKind::Refresh)));
        assert!(reached.get());
    }

    #[test]
    fn test_removed_listener_skipped_for_in_flight_event() {
        let bus = Rc::new(EventBus::new());
        let second_ran = Rc::new(Cell::new(false));
        let second_id = Rc::new(Cell::new(None));

        let remover_bus = Rc::clone(&bus);
        let target = Rc::clone(&second_id);
        bus.add_listener(EventKind::Refresh, move |_| {
            if let Some(id) = target.get() {
                remover_bus.remove_listener(id);
            }
            Ok(())
        });
        let flag = Rc::clone(&second_ran);
        let id = bus.add_listener(EventKind::Refresh, move |_| {
            flag.set(true);
            Ok(())
        });
        second_id.set(Some(id));

        bus.dispatch(&event(EventKind::Refresh));

        assert!(!second_ran.get());
        assert_eq!(bus.listener_count(EventKind::Refresh), 1);
    }

    #[test]
    fn test_listener_can_remove_itself() {
        let bus = Rc::new(EventBus::new());
        let hits = Rc::new(Cell::new(0));
        let own_id = Rc::new(Cell::new(None));

        let inner_bus = Rc::clone(&bus);
        let counter = Rc::clone(&hits);
        let slot = Rc::clone(&own_id);
        let id = bus.add_listener(EventKind::Refresh, move |_| {
            counter.set(counter.get() + 1);
            if let Some(id) = slot.get() {
                inner_bus.remove_listener(id);
            }
            Ok(())
        });
        own_id.set(Some(id));

        bus.dispatch(&event(EventKind::Refresh));
        bus.dispatch(&event(EventKind::Refresh));

        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn test_listener_added_during_dispatch_waits() {
        let bus = Rc::new(EventBus::new());
        let late_hits = Rc::new(Cell::new(0));

        let inner_bus = Rc::clone(&bus);
        let counter = Rc::clone(&late_hits);
        bus.add_listener(EventKind::Move, move |_| {
            let counter = Rc::clone(&counter);
            inner_bus.add_listener(EventKind::Move, move |_| {
                counter.set(counter.get() + 1);
                Ok(())
            });
            Ok(())
        });

        bus.dispatch(&event(EventKind::Move));
        assert_eq!(late_hits.get(), 0);

        bus.dispatch(&event(EventKind::Move));
        assert_eq!(late_hits.get(), 1);
    }

    #[test]
    fn test_string_subscription() {
        let bus = EventBus::new();
        assert!(bus.add_event_listener("dblclick", |_| Ok(())).is_ok());
        assert_eq!(bus.listener_count(EventKind::DblClick), 1);
        assert_eq!(
            bus.add_event_listener("doubleclick", |_| Ok(())),
            Err(EventError::UnknownKind("doubleclick".to_string()))
        );
    }

    #[test]
    fn test_remove_unknown_listener() {
        let bus = EventBus::new();
        let id = bus.add_listener(EventKind::Scroll, |_| Ok(()));
        assert!(bus.remove_listener(id));
        assert!(!bus.remove_listener(id));
        bus.clear();
        assert_eq!(bus.listener_count(EventKind::Scroll), 0);
    }
}
