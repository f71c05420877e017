//! Synchronous event bus.
//!
//! The bus routes events from game logic to observers (UI, logging,
//! achievements) without either side knowing about the other.
//!
//! ## Dispatch Rules
//!
//! - `emit` calls every matching handler before returning: type-specific
//!   subscribers first, then wildcard subscribers, each in subscription
//!   order.
//! - Handlers run against the subscriber list as it was when `emit`
//!   started. Subscribing or unsubscribing from inside a handler affects
//!   the next emission.
//! - A handler that returns `Err` or panics is contained: dispatch
//!   continues, the failure is logged, and an `ERROR` event describing it is
//!   emitted once dispatch finishes.
//! - All methods take `&self`, so handlers may emit re-entrantly.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

use rustc_hash::FxHashMap;
use tracing::{debug, error, trace};

use super::event::{event_types, Event};
use crate::core::{EventConfig, Payload, StateValue};

/// Event handler callback.
pub type Handler = Rc<dyn Fn(&Event) -> anyhow::Result<()>>;

/// Identifier returned by `subscribe`, used to unsubscribe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    /// Get the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Subscription({})", self.0)
    }
}

/// A contained handler failure.
///
/// Never returned to the emitter; reported through logs and `ERROR` events.
#[derive(Debug, thiserror::Error)]
pub enum EventHandlerError {
    /// The handler returned an error.
    #[error("{subscription} failed handling {event_type}: {message}")]
    Failed {
        /// The failing subscription.
        subscription: SubscriptionId,
        /// Type of the event being dispatched.
        event_type: String,
        /// The handler's error message.
        message: String,
    },

    /// The handler panicked.
    #[error("{subscription} panicked handling {event_type}: {message}")]
    Panicked {
        /// The failing subscription.
        subscription: SubscriptionId,
        /// Type of the event being dispatched.
        event_type: String,
        /// The panic message, if it was a string.
        message: String,
    },
}

impl EventHandlerError {
    fn subscription(&self) -> SubscriptionId {
        match self {
            EventHandlerError::Failed { subscription, .. }
            | EventHandlerError::Panicked { subscription, .. } => *subscription,
        }
    }

    fn event_type(&self) -> &str {
        match self {
            EventHandlerError::Failed { event_type, .. }
            | EventHandlerError::Panicked { event_type, .. } => event_type,
        }
    }

    /// Payload of the `ERROR` event reporting this failure.
    fn to_payload(&self) -> Payload {
        let mut payload = Payload::new();
        payload.insert("event_type".into(), StateValue::from(self.event_type()));
        payload.insert("error".into(), StateValue::from(self.to_string()));
        payload.insert(
            "subscription".into(),
            StateValue::Int(self.subscription().raw() as i64),
        );
        payload
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Topic {
    Type(String),
    All,
}

struct Subscription {
    id: SubscriptionId,
    topic: Topic,
    handler: Handler,
}

struct BusState {
    /// All subscriptions, in subscription order.
    subscriptions: Vec<Subscription>,
    history: FxHashMap<String, VecDeque<Event>>,
    global_history: VecDeque<Event>,
    enabled: bool,
    next_subscription: u64,
    next_sequence: u64,
}

fn push_bounded(ring: &mut VecDeque<Event>, event: Event, capacity: usize) {
    ring.push_back(event);
    while ring.len() > capacity {
        ring.pop_front();
    }
}

/// Synchronous publish/subscribe router with bounded history.
///
/// ## Example
///
/// ```
/// use std::cell::Cell;
/// use std::rc::Rc;
/// use rust_arcade::core::payload;
/// use rust_arcade::events::{event_types, EventBus};
///
/// let bus = EventBus::new();
/// let moves = Rc::new(Cell::new(0));
///
/// let counter = Rc::clone(&moves);
/// bus.subscribe(event_types::PLAYER_MOVE, move |_event| {
///     counter.set(counter.get() + 1);
///     Ok(())
/// });
///
/// bus.emit(event_types::PLAYER_MOVE, payload([("pos", "A1".into())]));
/// assert_eq!(moves.get(), 1);
/// assert_eq!(bus.get_history(Some(event_types::PLAYER_MOVE)).len(), 1);
/// ```
pub struct EventBus {
    config: EventConfig,
    state: RefCell<BusState>,
}

impl EventBus {
    /// Create a bus with default history capacities.
    #[must_use]
    pub fn new() -> Self {
        Self::from_config(&EventConfig::default())
    }

    /// Create a bus from configuration.
    #[must_use]
    pub fn from_config(config: &EventConfig) -> Self {
        Self {
            config: config.clone(),
            state: RefCell::new(BusState {
                subscriptions: Vec::new(),
                history: FxHashMap::default(),
                global_history: VecDeque::new(),
                enabled: true,
                next_subscription: 0,
                next_sequence: 0,
            }),
        }
    }

    /// Create a bus keeping `capacity` events per type.
    #[must_use]
    pub fn with_history_capacity(capacity: usize) -> Self {
        Self::from_config(&EventConfig {
            history_capacity: capacity,
            ..EventConfig::default()
        })
    }

    /// The bus configuration.
    #[must_use]
    pub fn config(&self) -> &EventConfig {
        &self.config
    }

    fn add_subscription(&self, topic: Topic, handler: Handler) -> SubscriptionId {
        let mut state = self.state.borrow_mut();
        let id = SubscriptionId(state.next_subscription);
        state.next_subscription += 1;

        debug!(%id, ?topic, "subscribed");
        state.subscriptions.push(Subscription { id, topic, handler });
        id
    }

    /// Subscribe a handler to one event type.
    pub fn subscribe<F>(&self, event_type: impl Into<String>, handler: F) -> SubscriptionId
    where
        F: Fn(&Event) -> anyhow::Result<()> + 'static,
    {
        self.add_subscription(Topic::Type(event_type.into()), Rc::new(handler))
    }

    /// Subscribe a handler to every event type.
    pub fn subscribe_all<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&Event) -> anyhow::Result<()> + 'static,
    {
        self.add_subscription(Topic::All, Rc::new(handler))
    }

    /// Remove a subscription. Returns false if it was not subscribed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut state = self.state.borrow_mut();
        let before = state.subscriptions.len();
        state.subscriptions.retain(|s| s.id != id);
        let removed = state.subscriptions.len() != before;
        if removed {
            debug!(%id, "unsubscribed");
        }
        removed
    }

    /// Number of subscribers for a type (`None` counts wildcard subscribers).
    #[must_use]
    pub fn subscriber_count(&self, event_type: Option<&str>) -> usize {
        let state = self.state.borrow();
        state
            .subscriptions
            .iter()
            .filter(|s| match (&s.topic, event_type) {
                (Topic::Type(t), Some(wanted)) => t == wanted,
                (Topic::All, None) => true,
                _ => false,
            })
            .count()
    }

    /// Emit an event with no source.
    pub fn emit(&self, event_type: impl Into<String>, payload: Payload) {
        self.publish(Event::new(event_type, payload));
    }

    /// Emit an event on behalf of a source.
    pub fn emit_from(
        &self,
        source_id: impl Into<String>,
        event_type: impl Into<String>,
        payload: Payload,
    ) {
        self.publish(Event::new(event_type, payload).with_source(source_id));
    }

    /// Record and dispatch a prepared event.
    ///
    /// The bus assigns the event's sequence number.
    pub fn publish(&self, mut event: Event) {
        let handlers = {
            let mut state = self.state.borrow_mut();
            if !state.enabled {
                trace!(event_type = %event.event_type, "bus disabled, dropping event");
                return;
            }

            event.sequence = state.next_sequence;
            state.next_sequence += 1;

            push_bounded(
                state.history.entry(event.event_type.clone()).or_default(),
                event.clone(),
                self.config.history_capacity,
            );
            if self.config.global_history_capacity > 0 {
                push_bounded(
                    &mut state.global_history,
                    event.clone(),
                    self.config.global_history_capacity,
                );
            }

            let typed = state
                .subscriptions
                .iter()
                .filter(|s| matches!(&s.topic, Topic::Type(t) if *t == event.event_type));
            let wildcard = state.subscriptions.iter().filter(|s| s.topic == Topic::All);
            typed
                .chain(wildcard)
                .map(|s| (s.id, Rc::clone(&s.handler)))
                .collect::<Vec<_>>()
        };

        trace!(
            event_type = %event.event_type,
            sequence = event.sequence,
            handlers = handlers.len(),
            "dispatching event"
        );

        let failures: Vec<EventHandlerError> = handlers
            .into_iter()
            .filter_map(|(id, handler)| Self::invoke(id, &handler, &event))
            .collect();

        for failure in failures {
            error!(error = %failure, "event handler failed");
            // Failures while reporting failures are only logged.
            if event.event_type != event_types::ERROR {
                self.emit_from("event_bus", event_types::ERROR, failure.to_payload());
            }
        }
    }

    fn invoke(id: SubscriptionId, handler: &Handler, event: &Event) -> Option<EventHandlerError> {
        match panic::catch_unwind(AssertUnwindSafe(|| handler(event))) {
            Ok(Ok(())) => None,
            Ok(Err(err)) => Some(EventHandlerError::Failed {
                subscription: id,
                event_type: event.event_type.clone(),
                message: format!("{err:#}"),
            }),
            Err(panic) => Some(EventHandlerError::Panicked {
                subscription: id,
                event_type: event.event_type.clone(),
                message: panic_message(panic.as_ref()),
            }),
        }
    }

    /// Recorded events, oldest first.
    ///
    /// `Some(type)` returns that type's ring; `None` returns the global ring.
    #[must_use]
    pub fn get_history(&self, event_type: Option<&str>) -> Vec<Event> {
        let state = self.state.borrow();
        match event_type {
            Some(t) => state
                .history
                .get(t)
                .map(|ring| ring.iter().cloned().collect())
                .unwrap_or_default(),
            None => state.global_history.iter().cloned().collect(),
        }
    }

    /// Forget all recorded events.
    pub fn clear_history(&self) {
        let mut state = self.state.borrow_mut();
        state.history.clear();
        state.global_history.clear();
    }

    /// Enable or disable the bus.
    ///
    /// While disabled, events are neither dispatched nor recorded.
    pub fn set_enabled(&self, enabled: bool) {
        self.state.borrow_mut().enabled = enabled;
        debug!(enabled, "event bus toggled");
    }

    /// Check if the bus is enabled.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.state.borrow().enabled
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("EventBus")
            .field("config", &self.config)
            .field("subscriptions", &state.subscriptions.len())
            .field("enabled", &state.enabled)
            .field("next_sequence", &state.next_sequence)
            .finish()
    }
}

pub(crate) fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
