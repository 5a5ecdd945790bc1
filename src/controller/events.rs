//! Typed pub-sub event bus (§4.5). Every session mutation funnels through
//! [`super::WaveformController`], which publishes one of these events after
//! applying the change; views subscribe to the `EventKind`s they care about
//! and never touch [`crate::session::WaveformSession`] directly.
//!
//! Grounded on `original_source/wavescout/application/event_bus.py`'s
//! typed `subscribe`/`publish`/`unsubscribe` shape. The Python bus keys
//! subscriptions by the event's Python *type*; `Event`/`EventKind` here
//! split that into a payload enum plus a cheap, `Copy`, `Hash`-able
//! discriminant so subscription keys don't require hashing an enum that
//! carries `String`/`Vec` payloads.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};

use crate::types::{DataFormat, RenderType, RgbColor, SignalNodeID, Time};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StructureChangeKind {
    Insert,
    Delete,
    Move,
    Group,
    Ungroup,
}

/// A single, optional format field change reported by `FormatChanged`.
#[derive(Debug, Clone, PartialEq)]
pub enum FormatChange {
    DataFormat(DataFormat),
    RenderType(RenderType),
    Color(RgbColor),
    Nickname(String),
    HeightScaling(u8),
    AnalogScalingMode(crate::types::AnalogScalingMode),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    StructureChanged {
        kind: StructureChangeKind,
        affected_ids: Vec<SignalNodeID>,
        parent_id: Option<SignalNodeID>,
        insert_row: Option<usize>,
    },
    FormatChanged {
        node_id: SignalNodeID,
        changes: Vec<FormatChange>,
    },
    ViewportChanged {
        old_left: f64,
        old_right: f64,
        new_left: f64,
        new_right: f64,
    },
    CursorMoved {
        old_time: Time,
        new_time: Time,
    },
    SelectionChanged {
        old_ids: Vec<SignalNodeID>,
        new_ids: Vec<SignalNodeID>,
    },
    MarkerAdded {
        slot: usize,
        time: Time,
    },
    MarkerRemoved {
        slot: usize,
    },
    MarkerMoved {
        slot: usize,
        old_time: Time,
        new_time: Time,
    },
    SessionLoaded {
        uri: String,
    },
    SessionClosed,
    BenchmarkModeChanged {
        enabled: bool,
    },
}

/// Cheap, `Hash`-able discriminant used as the subscription key, since
/// `Event` itself carries non-`Copy` payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    StructureChanged,
    FormatChanged,
    ViewportChanged,
    CursorMoved,
    SelectionChanged,
    MarkerAdded,
    MarkerRemoved,
    MarkerMoved,
    SessionLoaded,
    SessionClosed,
    BenchmarkModeChanged,
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::StructureChanged { .. } => EventKind::StructureChanged,
            Event::FormatChanged { .. } => EventKind::FormatChanged,
            Event::ViewportChanged { .. } => EventKind::ViewportChanged,
            Event::CursorMoved { .. } => EventKind::CursorMoved,
            Event::SelectionChanged { .. } => EventKind::SelectionChanged,
            Event::MarkerAdded { .. } => EventKind::MarkerAdded,
            Event::MarkerRemoved { .. } => EventKind::MarkerRemoved,
            Event::MarkerMoved { .. } => EventKind::MarkerMoved,
            Event::SessionLoaded { .. } => EventKind::SessionLoaded,
            Event::SessionClosed => EventKind::SessionClosed,
            Event::BenchmarkModeChanged { .. } => EventKind::BenchmarkModeChanged,
        }
    }
}

type Handler = Box<dyn FnMut(&Event) + Send>;

/// Type-safe publish-subscribe event bus (§4.5).
///
/// Handler panics are caught, logged via `log::error!`, and swallowed —
/// fan-out to the remaining handlers continues regardless (see DESIGN.md's
/// "Open Question decisions": Rust has no `__debug__`-gated re-raise, so
/// this always takes the Python original's release-mode branch).
#[derive(Default)]
pub struct EventBus {
    subscribers: HashMap<EventKind, Vec<Handler>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, kind: EventKind, handler: Handler) {
        self.subscribers.entry(kind).or_default().push(handler);
    }

    pub fn publish(&mut self, event: Event) {
        let kind = event.kind();
        if let Some(handlers) = self.subscribers.get_mut(&kind) {
            for handler in handlers.iter_mut() {
                let result = panic::catch_unwind(AssertUnwindSafe(|| handler(&event)));
                if let Err(payload) = result {
                    let message = payload
                        .downcast_ref::<&str>()
                        .map(|s| s.to_string())
                        .or_else(|| payload.downcast_ref::<String>().cloned())
                        .unwrap_or_else(|| "non-string panic payload".to_string());
                    log::error!("handler error for {kind:?}: {message}");
                }
            }
        }
    }

    pub fn clear(&mut self) {
        self.subscribers.clear();
    }

    pub fn clear_event_kind(&mut self, kind: EventKind) {
        self.subscribers.remove(&kind);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn publish_fans_out_in_subscription_order() {
        let mut bus = EventBus::new();
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));
        let order_a = order.clone();
        let order_b = order.clone();
        bus.subscribe(
            EventKind::CursorMoved,
            Box::new(move |_| order_a.lock().unwrap().push(1)),
        );
        bus.subscribe(
            EventKind::CursorMoved,
            Box::new(move |_| order_b.lock().unwrap().push(2)),
        );
        bus.publish(Event::CursorMoved { old_time: 0, new_time: 10 });
        assert_eq!(*order.lock().unwrap(), vec![1, 2]);
    }

    #[test]
    fn handler_panic_does_not_stop_fan_out() {
        let mut bus = EventBus::new();
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = count.clone();
        bus.subscribe(EventKind::SessionClosed, Box::new(|_| panic!("boom")));
        bus.subscribe(
            EventKind::SessionClosed,
            Box::new(move |_| {
                count_clone.fetch_add(1, Ordering::SeqCst);
            }),
        );
        bus.publish(Event::SessionClosed);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unrelated_event_kinds_do_not_fire() {
        let mut bus = EventBus::new();
        let fired = Arc::new(AtomicUsize::new(0));
        let fired_clone = fired.clone();
        bus.subscribe(
            EventKind::MarkerAdded,
            Box::new(move |_| {
                fired_clone.fetch_add(1, Ordering::SeqCst);
            }),
        );
        bus.publish(Event::SessionClosed);
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }
}
