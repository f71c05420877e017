//! Publish/subscribe event channel.
//!
//! The event bus decouples game logic from its observers. Game code emits
//! events ("a player moved", "the game ended"); UI and other observers
//! subscribe to the types they care about. Dispatch is synchronous, so by
//! the time `emit` returns every observer has seen the event.
//!
//! ## Key Components
//!
//! - [`Event`]: an immutable record of something that happened
//! - [`event_types`]: the baseline event type vocabulary
//! - [`EventBus`]: the router, with bounded per-type and global history
//! - [`SubscriptionId`]: handle for unsubscribing
//!
//! Event types are open strings. Games add their own without registering
//! them anywhere.

mod bus;
mod event;

pub(crate) use bus::panic_message;
pub use bus::{EventBus, EventHandlerError, Handler, SubscriptionId};
pub use event::{event_types, Event};
