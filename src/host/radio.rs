use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use slotmap::{SlotMap, new_key_type};
use tracing::{debug, trace};

use crate::session::{EventHandler, EventKind, HostSession, SessionEvent, SliceRef, Subscription};

new_key_type! {
    struct HandlerKey;
}

type HandlerTable = SlotMap<HandlerKey, (EventKind, EventHandler)>;

/// Static identity of a simulated radio.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RadioProfile {
    pub model: String,
    pub nickname: String,
    pub callsign: String,
}

impl Default for RadioProfile {
    fn default() -> Self {
        Self {
            model: "FLEX-6600".to_string(),
            nickname: "Shack".to_string(),
            callsign: "N0CALL".to_string(),
        }
    }
}

/// What `RADIO INFO` reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RadioInfo {
    #[serde(flatten)]
    pub profile: RadioProfile,
    pub mox: bool,
    pub slices: Vec<SliceRef>,
}

/// In-process radio standing in for the host's live session.
///
/// Event handlers are kept in a slot map; each [`Subscription`] holds only a
/// weak reference to the table, so a guard that outlives the radio is inert.
#[derive(Default)]
pub struct SimulatedRadio {
    profile: RadioProfile,
    transmit: AtomicBool,
    slices: Mutex<Vec<SliceRef>>,
    next_slice: AtomicU32,
    handlers: Arc<Mutex<HandlerTable>>,
}

impl SimulatedRadio {
    pub fn new(profile: RadioProfile) -> Self {
        Self {
            profile,
            ..Self::default()
        }
    }

    pub fn with_slices(self, count: u32) -> Self {
        for _ in 0..count {
            self.open_slice();
        }
        self
    }

    pub fn profile(&self) -> &RadioProfile {
        &self.profile
    }

    /// Delivers `event` to every handler registered for its kind. Returns the
    /// number of handlers called.
    pub fn publish(&self, event: SessionEvent) -> usize {
        let kind = event.kind();
        let targets: Vec<EventHandler> = self
            .handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|(registered, _)| *registered == kind)
            .map(|(_, handler)| Arc::clone(handler))
            .collect();

        trace!(kind = %kind, handlers = targets.len(), "publishing session event");
        for handler in &targets {
            handler(&event);
        }
        targets.len()
    }

    pub fn add_slice(&self) -> SliceRef {
        let slice = self.open_slice();
        debug!(slice = %slice.letter, "slice added");
        self.publish(SessionEvent::SliceAdded(slice.clone()));
        slice
    }

    /// Closes the most recently opened slice.
    pub fn remove_slice(&self) -> Option<SliceRef> {
        let slice = self
            .slices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop()?;
        debug!(slice = %slice.letter, "slice removed");
        self.publish(SessionEvent::SliceRemoved(slice.clone()));
        Some(slice)
    }

    pub fn property_changed(&self, name: impl Into<String>) -> usize {
        self.publish(SessionEvent::PropertyChanged(name.into()))
    }

    pub fn subscriber_count(&self) -> usize {
        self.handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn info(&self) -> RadioInfo {
        RadioInfo {
            profile: self.profile.clone(),
            mox: self.transmit(),
            slices: self.slices(),
        }
    }

    fn open_slice(&self) -> SliceRef {
        let slice = SliceRef::new(self.next_slice.fetch_add(1, Ordering::SeqCst));
        self.slices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(slice.clone());
        slice
    }
}

impl HostSession for SimulatedRadio {
    fn subscribe(&self, kind: EventKind, handler: EventHandler) -> Subscription {
        let key = self
            .handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((kind, handler));

        let table = Arc::downgrade(&self.handlers);
        Subscription::new(kind, move || {
            if let Some(table) = table.upgrade() {
                table
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .remove(key);
            }
        })
    }

    fn slices(&self) -> Vec<SliceRef> {
        self.slices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn transmit(&self) -> bool {
        self.transmit.load(Ordering::SeqCst)
    }

    fn set_transmit(&self, on: bool) {
        let was = self.transmit.swap(on, Ordering::SeqCst);
        if was != on {
            self.property_changed("Mox");
        }
    }

    fn toggle_transmit(&self) -> bool {
        let on = !self.transmit.fetch_xor(true, Ordering::SeqCst);
        self.property_changed("Mox");
        on
    }
}
