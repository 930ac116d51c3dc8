//! Contract for the host's live radio session.
//!
//! The host owns the radio object. Functions see it only through
//! [`HostSession`], and hear about changes only through handlers registered
//! with [`HostSession::subscribe`].

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

/// Reference to a receiver slice on the radio.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct SliceRef {
    pub index: u32,
    pub letter: char,
}

impl SliceRef {
    pub fn new(index: u32) -> Self {
        let letter = char::from_u32(u32::from(b'A') + index % 26).unwrap_or('?');
        Self { index, letter }
    }
}

/// Notifications raised by the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    PropertyChanged(String),
    SliceAdded(SliceRef),
    SliceRemoved(SliceRef),
}

impl SessionEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            SessionEvent::PropertyChanged(_) => EventKind::PropertyChanged,
            SessionEvent::SliceAdded(_) => EventKind::SliceAdded,
            SessionEvent::SliceRemoved(_) => EventKind::SliceRemoved,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    PropertyChanged,
    SliceAdded,
    SliceRemoved,
}

impl EventKind {
    pub fn label(&self) -> &'static str {
        match self {
            EventKind::PropertyChanged => "property_changed",
            EventKind::SliceAdded => "slice_added",
            EventKind::SliceRemoved => "slice_removed",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

pub type EventHandler = Arc<dyn Fn(&SessionEvent) + Send + Sync>;

/// The live radio session as seen by a function set.
pub trait HostSession: Send + Sync {
    /// Registers `handler` for events of `kind`.
    ///
    /// The handler stays registered until the returned [`Subscription`] is
    /// released or dropped.
    fn subscribe(&self, kind: EventKind, handler: EventHandler) -> Subscription;

    /// Slices currently open on the radio.
    fn slices(&self) -> Vec<SliceRef>;

    /// Current state of the transmit (MOX) flag.
    fn transmit(&self) -> bool;

    fn set_transmit(&self, on: bool);

    /// Flips the transmit flag in one atomic step and returns the new state.
    fn toggle_transmit(&self) -> bool;
}

/// Guard for a registered event handler.
///
/// Releasing the guard removes the handler exactly once, whether through
/// [`Subscription::release`] or by dropping it.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    kind: EventKind,
    unsubscribe: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    pub fn new(kind: EventKind, unsubscribe: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            kind,
            unsubscribe: Some(Box::new(unsubscribe)),
        }
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    pub fn is_active(&self) -> bool {
        self.unsubscribe.is_some()
    }

    pub fn release(mut self) {
        self.release_inner();
    }

    fn release_inner(&mut self) {
        if let Some(unsubscribe) = self.unsubscribe.take() {
            unsubscribe();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release_inner();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("kind", &self.kind)
            .field("active", &self.is_active())
            .finish()
    }
}
