//! Event bus core.
//!
//! The bus owns two pieces of runtime state: the set of known event kinds
//! and, per kind, the ordered list of subscribed handler types. Both live
//! behind a lock on the bus instance itself; there is no ambient global
//! state, and every collaborator that publishes or subscribes receives the
//! bus explicitly.
//!
//! Dispatch is table-driven: `subscribe::<E, H>()` builds a decode closure
//! for `E` and an invoke closure for `H` at registration time, so inbound
//! deliveries route through statically-typed code with no reflection. The
//! payload is deserialized once per delivery and shared by every handler
//! subscribed to that kind.

mod error;
mod event_bus;
mod registry;

pub use error::{PublishError, SubscribeError};
pub use event_bus::EventBus;
