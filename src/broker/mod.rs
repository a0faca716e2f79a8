//! Broker client adapter.
//!
//! This module owns the transport seam between the bus and a message
//! broker: queue declaration, raw publishing, and consumer registration.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                     EventBus (core)                     │
//! │  publish(event) / subscribe::<E, H>() / unsubscribe     │
//! └─────────────────────────────────────────────────────────┘
//!                            │
//!                            ▼
//! ┌─────────────────────────────────────────────────────────┐
//! │                      Broker trait                       │
//! │  ensure_queue(name)                                     │
//! │  publish_raw(queue, bytes)                              │
//! │  start_consuming(queue, on_message) -> ConsumerHandle   │
//! └─────────────────────────────────────────────────────────┘
//!          │                                  │
//!          ▼                                  ▼
//! ┌─────────────────┐              ┌─────────────────────┐
//! │ InMemoryBroker  │              │  AMQP / NATS / ...  │
//! │   (included)    │              │     (external)      │
//! └─────────────────┘              └─────────────────────┘
//! ```
//!
//! ## Delivery semantics
//!
//! The adapter is deliberately minimal: one queue per event kind (the
//! queue name IS the routing scheme), best-effort publish with no
//! confirmation wait, and automatic acknowledgment. A message counts as
//! delivered the moment the consumer loop takes it off the queue, before
//! handler dispatch runs, so a failing handler never causes redelivery.

mod in_memory;
mod transport;

pub use in_memory::InMemoryBroker;
pub use transport::{Broker, ConsumerHandle, ConsumerStats, OnMessage, TransportError};
