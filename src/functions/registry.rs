use std::future::Future;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use serde::Serialize;
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use crate::channel::Channel;
use crate::error::{FunctionError, Result};
use crate::functions::action::{Action, FunctionContext, Invocation};
use crate::functions::item::{FunctionItem, ItemView};
use crate::rest::HostContext;
use crate::session::{EventHandler, EventKind, SessionEvent, Subscription};

/// Property the host raises when a non-GUI client is bound to a new GUI client.
const BOUND_CLIENT_PROPERTY: &str = "BoundClientID";

/// Event kinds subscribed at `init`, in registration order.
const SUBSCRIBED_EVENTS: [EventKind; 3] = [
    EventKind::PropertyChanged,
    EventKind::SliceAdded,
    EventKind::SliceRemoved,
];

/// Supplies the fixed list of items a registry exposes.
pub trait FunctionSet: Send + Sync {
    fn name(&self) -> &str;

    /// Builds items in display order. Items that need a radio should be
    /// hidden when `host` carries no session.
    fn build(&self, host: &HostContext) -> Vec<FunctionItem>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RegistryState {
    Uninitialized,
    Active,
    TornDown,
}

/// Session activity recorded by the registry's event handlers.
#[derive(Debug, Default)]
pub struct SessionActivity {
    slices: AtomicUsize,
    events: AtomicU64,
    bound_client_changes: AtomicU64,
    last_property: Mutex<Option<String>>,
}

impl SessionActivity {
    fn with_slices(slices: usize) -> Self {
        Self {
            slices: AtomicUsize::new(slices),
            ..Self::default()
        }
    }

    fn record(&self, event: &SessionEvent) {
        trace!(kind = %event.kind(), "session event");
        self.events.fetch_add(1, Ordering::SeqCst);

        match event {
            SessionEvent::PropertyChanged(name) => {
                if name == BOUND_CLIENT_PROPERTY {
                    self.bound_client_changes.fetch_add(1, Ordering::SeqCst);
                }
                *self
                    .last_property
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner) = Some(name.clone());
            }
            SessionEvent::SliceAdded(_) => {
                self.slices.fetch_add(1, Ordering::SeqCst);
            }
            SessionEvent::SliceRemoved(_) => {
                // The closure never declines, so the update always lands.
                self.slices
                    .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                        Some(n.saturating_sub(1))
                    })
                    .ok();
            }
        }
    }

    pub fn snapshot(&self) -> ActivitySnapshot {
        ActivitySnapshot {
            slices: self.slices.load(Ordering::SeqCst),
            events: self.events.load(Ordering::SeqCst),
            bound_client_changes: self.bound_client_changes.load(Ordering::SeqCst),
            last_property: self
                .last_property
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ActivitySnapshot {
    pub slices: usize,
    pub events: u64,
    pub bound_client_changes: u64,
    pub last_property: Option<String>,
}

struct ActiveState {
    context: FunctionContext,
    activity: Arc<SessionActivity>,
    subscriptions: Vec<Subscription>,
    events_seen_at_poll: AtomicU64,
}

/// Ordered set of host-invocable functions plus their lifecycle.
pub struct FunctionRegistry {
    set: Box<dyn FunctionSet>,
    state: RegistryState,
    active: Option<ActiveState>,
    ticks: AtomicU64,
}

impl FunctionRegistry {
    pub fn new(set: impl FunctionSet + 'static) -> Self {
        Self {
            set: Box::new(set),
            state: RegistryState::Uninitialized,
            active: None,
            ticks: AtomicU64::new(0),
        }
    }

    pub fn state(&self) -> RegistryState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == RegistryState::Active
    }

    /// Builds the item list and hooks session events when a radio is bound.
    pub fn init(&mut self, host: HostContext) -> Result<()> {
        if self.is_active() {
            warn!(set = self.set.name(), "init called on an active registry");
            return Err(FunctionError::AlreadyActive);
        }

        let items: Arc<[FunctionItem]> = self.set.build(&host).into();
        let initial_slices = host.session.as_ref().map_or(0, |s| s.slices().len());
        let activity = Arc::new(SessionActivity::with_slices(initial_slices));

        let mut subscriptions = Vec::with_capacity(SUBSCRIBED_EVENTS.len());
        if let Some(session) = host.session.as_ref() {
            for kind in SUBSCRIBED_EVENTS {
                subscriptions.push(session.subscribe(kind, activity_handler(&activity)));
            }
        }

        info!(
            set = self.set.name(),
            items = items.len(),
            connected = host.has_session(),
            subscriptions = subscriptions.len(),
            "function registry initialised"
        );

        self.active = Some(ActiveState {
            context: FunctionContext {
                items,
                session: host.session,
                rest: host.rest,
            },
            activity,
            subscriptions,
            events_seen_at_poll: AtomicU64::new(0),
        });
        self.state = RegistryState::Active;
        Ok(())
    }

    /// Periodic tick from the host loop. Reads counters only.
    pub fn poll(&self) {
        let Some(active) = self.active.as_ref() else {
            return;
        };

        let tick = self.ticks.fetch_add(1, Ordering::Relaxed) + 1;
        let events = active.activity.events.load(Ordering::SeqCst);
        let seen = active.events_seen_at_poll.swap(events, Ordering::SeqCst);
        if events != seen {
            debug!(
                tick,
                new_events = events.saturating_sub(seen),
                slices = active.activity.slices.load(Ordering::SeqCst),
                "session activity since last poll"
            );
        }
    }

    /// Releases every subscription in reverse registration order and drops
    /// the item list. Safe to call in any state.
    pub fn cleanup(&mut self) {
        let Some(mut active) = self.active.take() else {
            return;
        };

        let released = active.subscriptions.len();
        while let Some(subscription) = active.subscriptions.pop() {
            trace!(kind = %subscription.kind(), "releasing subscription");
            subscription.release();
        }

        self.state = RegistryState::TornDown;
        info!(set = self.set.name(), released, "function registry torn down");
    }

    /// Invokes item `index` with `args`.
    ///
    /// `args[0]`, when present, must name the calling channel. Every contract
    /// check runs before the action, so a rejected dispatch changes nothing.
    pub fn dispatch(
        &self,
        index: usize,
        args: Vec<Value>,
    ) -> impl Future<Output = Result<Value>> + Send + use<> {
        let prepared = self.prepare(index, args);

        async move {
            let (action, ctx, call) = prepared?;
            let result = action.invoke(&ctx, &call).await;
            if let Err(err) = &result {
                warn!(index = call.index, error = %err, "function failed");
            }
            result
        }
    }

    fn prepare(
        &self,
        index: usize,
        args: Vec<Value>,
    ) -> Result<(Arc<dyn Action>, FunctionContext, Invocation)> {
        let active = self.active.as_ref().ok_or(FunctionError::NotActive)?;
        let items = &active.context.items;

        let Some(item) = items.get(index) else {
            warn!(index, len = items.len(), "dispatch index out of range");
            return Err(FunctionError::InvalidArgument {
                index,
                len: items.len(),
            });
        };

        let channel = Channel::from_args(&args)?;

        if !item.is_enabled() {
            warn!(index, label = %item.display_label(), "dispatch to disabled function");
            return Err(FunctionError::Disabled { index });
        }

        debug!(
            index,
            label = %item.display_label(),
            channel = channel.map(|c| c.label()).unwrap_or("none"),
            "dispatching function"
        );

        Ok((
            item.action(),
            active.context.clone(),
            Invocation {
                index,
                channel,
                args,
            },
        ))
    }

    /// Runs `work` as an independent task on the current tokio runtime.
    ///
    /// Returns `None` when called outside a runtime.
    pub fn spawn_background<F>(&self, work: F) -> Option<JoinHandle<F::Output>>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        tokio::runtime::Handle::try_current()
            .ok()
            .map(|handle| handle.spawn(work))
    }

    pub fn len(&self) -> usize {
        self.active
            .as_ref()
            .map_or(0, |active| active.context.items.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn items(&self) -> Vec<ItemView> {
        self.active
            .as_ref()
            .map(|active| {
                active
                    .context
                    .items
                    .iter()
                    .enumerate()
                    .map(|(index, item)| item.view(index))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn visible_items(&self) -> Vec<ItemView> {
        self.items().into_iter().filter(|item| !item.hidden).collect()
    }

    pub fn item(&self, index: usize) -> Option<ItemView> {
        self.active
            .as_ref()?
            .context
            .items
            .get(index)
            .map(|item| item.view(index))
    }

    /// Resolves a label (with or without its accelerator marker) or a
    /// single mnemonic character to an index.
    pub fn find(&self, query: &str) -> Option<usize> {
        let query = query.trim();
        let items = &self.active.as_ref()?.context.items;

        items
            .iter()
            .position(|item| {
                item.label().eq_ignore_ascii_case(query)
                    || item.display_label().eq_ignore_ascii_case(query)
            })
            .or_else(|| {
                let mut chars = query.chars();
                let (Some(ch), None) = (chars.next(), chars.next()) else {
                    return None;
                };
                let ch = ch.to_ascii_lowercase();
                items.iter().position(|item| item.mnemonic() == Some(ch))
            })
    }

    pub fn subscription_count(&self) -> usize {
        self.active
            .as_ref()
            .map_or(0, |active| active.subscriptions.len())
    }

    pub fn activity(&self) -> Option<ActivitySnapshot> {
        self.active
            .as_ref()
            .map(|active| active.activity.snapshot())
    }

    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }
}

impl Drop for FunctionRegistry {
    fn drop(&mut self) {
        self.cleanup();
    }
}

fn activity_handler(activity: &Arc<SessionActivity>) -> EventHandler {
    let weak: Weak<SessionActivity> = Arc::downgrade(activity);
    Arc::new(move |event: &SessionEvent| {
        if let Some(activity) = weak.upgrade() {
            activity.record(event);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorKind, RestError};
    use crate::functions::samples::{SampleFunctions, SayHello};
    use crate::host::SimulatedRadio;
    use crate::rest::RestCall;
    use crate::session::{HostSession, SliceRef};
    use async_trait::async_trait;
    use serde_json::json;

    struct EchoRest;

    #[async_trait]
    impl RestCall for EchoRest {
        async fn call(
            &self,
            category: &str,
            command: &str,
            _argument: Option<&str>,
        ) -> std::result::Result<Value, RestError> {
            Ok(json!({ "category": category, "command": command }))
        }
    }

    fn connected() -> (Arc<SimulatedRadio>, HostContext) {
        let radio = Arc::new(SimulatedRadio::default());
        let session: Arc<dyn HostSession> = radio.clone();
        (radio, HostContext::new(Some(session), Arc::new(EchoRest)))
    }

    #[test]
    fn test_lifecycle_states() {
        let (_radio, host) = connected();
        let mut registry = FunctionRegistry::new(SampleFunctions);
        assert_eq!(registry.state(), RegistryState::Uninitialized);
        assert!(registry.is_empty());

        registry.init(host.clone()).unwrap();
        assert_eq!(registry.state(), RegistryState::Active);
        assert_eq!(registry.len(), 5);
        assert_eq!(registry.subscription_count(), 3);

        assert!(matches!(
            registry.init(host),
            Err(FunctionError::AlreadyActive)
        ));
        assert_eq!(registry.len(), 5);

        registry.cleanup();
        assert_eq!(registry.state(), RegistryState::TornDown);
        assert!(registry.is_empty());
        assert_eq!(registry.subscription_count(), 0);
    }

    #[test]
    fn test_reinit_after_cleanup() {
        let (radio, host) = connected();
        let mut registry = FunctionRegistry::new(SampleFunctions);
        registry.init(host.clone()).unwrap();
        registry.cleanup();
        registry.init(host).unwrap();

        assert!(registry.is_active());
        assert_eq!(radio.subscriber_count(), 3);
    }

    #[test]
    fn test_events_update_activity() {
        let (radio, host) = connected();
        let mut registry = FunctionRegistry::new(SampleFunctions);
        registry.init(host).unwrap();

        radio.publish(SessionEvent::SliceAdded(SliceRef::new(0)));
        radio.publish(SessionEvent::SliceAdded(SliceRef::new(1)));
        radio.publish(SessionEvent::SliceRemoved(SliceRef::new(0)));
        radio.publish(SessionEvent::PropertyChanged("BoundClientID".into()));

        let activity = registry.activity().unwrap();
        assert_eq!(activity.slices, 1);
        assert_eq!(activity.events, 4);
        assert_eq!(activity.bound_client_changes, 1);
        assert_eq!(activity.last_property.as_deref(), Some("BoundClientID"));
    }

    #[test]
    fn test_slice_count_does_not_underflow() {
        let (radio, host) = connected();
        let mut registry = FunctionRegistry::new(SampleFunctions);
        registry.init(host).unwrap();

        radio.publish(SessionEvent::SliceRemoved(SliceRef::new(0)));
        radio.publish(SessionEvent::SliceRemoved(SliceRef::new(1)));
        radio.publish(SessionEvent::SliceAdded(SliceRef::new(2)));

        let activity = registry.activity().unwrap();
        assert_eq!(activity.slices, 1);
        assert_eq!(activity.events, 3);
    }

    /// Session that only records the order its subscriptions are released in.
    #[derive(Default)]
    struct ReleaseLog {
        released: Arc<Mutex<Vec<EventKind>>>,
    }

    impl HostSession for ReleaseLog {
        fn subscribe(&self, kind: EventKind, _handler: EventHandler) -> Subscription {
            let released = Arc::clone(&self.released);
            Subscription::new(kind, move || released.lock().unwrap().push(kind))
        }

        fn slices(&self) -> Vec<SliceRef> {
            Vec::new()
        }

        fn transmit(&self) -> bool {
            false
        }

        fn set_transmit(&self, _on: bool) {}

        fn toggle_transmit(&self) -> bool {
            false
        }
    }

    #[test]
    fn test_cleanup_releases_in_reverse_order() {
        let session = Arc::new(ReleaseLog::default());
        let released = Arc::clone(&session.released);
        let session: Arc<dyn HostSession> = session;
        let host = HostContext::new(Some(session), Arc::new(EchoRest));

        let mut registry = FunctionRegistry::new(SampleFunctions);
        registry.init(host).unwrap();
        assert!(released.lock().unwrap().is_empty());

        registry.cleanup();
        assert_eq!(
            *released.lock().unwrap(),
            vec![
                EventKind::SliceRemoved,
                EventKind::SliceAdded,
                EventKind::PropertyChanged,
            ]
        );

        registry.cleanup();
        assert_eq!(released.lock().unwrap().len(), 3);
    }

    #[test]
    fn test_poll_is_noop_when_inactive() {
        let registry = FunctionRegistry::new(SampleFunctions);
        registry.poll();
        assert_eq!(registry.ticks(), 0);
    }

    #[test]
    fn test_poll_counts_ticks() {
        let (radio, host) = connected();
        let mut registry = FunctionRegistry::new(SampleFunctions);
        registry.init(host).unwrap();

        registry.poll();
        radio.publish(SessionEvent::PropertyChanged("Mox".into()));
        registry.poll();
        assert_eq!(registry.ticks(), 2);
    }

    #[test]
    fn test_find_by_label_and_mnemonic() {
        let (_radio, host) = connected();
        let mut registry = FunctionRegistry::new(SampleFunctions);
        registry.init(host).unwrap();

        assert_eq!(registry.find("Say Hello"), Some(0));
        assert_eq!(registry.find("toggle _mox"), Some(2));
        assert_eq!(registry.find("m"), Some(2));
        assert_eq!(registry.find("rest radio info"), Some(3));
        assert_eq!(registry.find("nothing"), None);
    }

    #[tokio::test]
    async fn test_dispatch_before_init() {
        let registry = FunctionRegistry::new(SampleFunctions);
        let err = registry.dispatch(0, vec![]).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Lifecycle);
    }

    #[tokio::test]
    async fn test_dispatch_disabled_item() {
        struct Single;
        impl FunctionSet for Single {
            fn name(&self) -> &str {
                "single"
            }
            fn build(&self, _host: &HostContext) -> Vec<FunctionItem> {
                vec![FunctionItem::new("hello", SayHello).enabled(false)]
            }
        }

        let (_radio, host) = connected();
        let mut registry = FunctionRegistry::new(Single);
        registry.init(host).unwrap();

        let err = registry.dispatch(0, vec![json!("Menu")]).await.unwrap_err();
        assert!(matches!(err, FunctionError::Disabled { index: 0 }));
    }

    #[tokio::test]
    async fn test_dispatch_future_outlives_borrow() {
        let (_radio, host) = connected();
        let mut registry = FunctionRegistry::new(SampleFunctions);
        registry.init(host).unwrap();

        let pending = registry.dispatch(4, vec![json!("Rest")]);
        let handle = registry.spawn_background(pending).unwrap();
        drop(registry);

        let out = handle.await.unwrap().unwrap();
        assert_eq!(out, json!({ "category": "FRStack", "command": "SPEWINDOW" }));
    }

    #[test]
    fn test_spawn_background_outside_runtime() {
        let registry = FunctionRegistry::new(SampleFunctions);
        assert!(registry.spawn_background(async {}).is_none());
    }
}
