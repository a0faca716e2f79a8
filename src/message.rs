//! Message envelope traits: commands and events.
//!
//! Every message on the bus carries a creation timestamp. Commands stay
//! in-process and are handled by exactly one handler; events cross the
//! broker and fan out to every subscribed handler.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Common envelope data carried by every message.
pub trait Message: Send + Sync + 'static {
    /// When the message was created (business time).
    fn created_at(&self) -> DateTime<Utc>;
}

/// An in-process request message.
///
/// Commands represent intent ("transfer 100 from account 1 to account 2")
/// and are routed to the single handler registered for their concrete type.
/// They are never serialized or sent over the broker.
pub trait Command: Message {}

/// A broker-routed domain event.
///
/// Events represent facts ("a transfer was created") and are serialized to
/// JSON at publish time. The `kind` is the unqualified name of the event
/// type; it is both the wire discriminator and the broker queue name, so
/// the receiving side can pick the concrete type to deserialize into
/// before parsing the body.
///
/// ## Example
///
/// ```ignore
/// #[derive(Clone, Debug, Serialize, Deserialize)]
/// struct TransferCreatedEvent {
///     from: u32,
///     to: u32,
///     amount: Decimal,
///     created_at: DateTime<Utc>,
/// }
///
/// impl Event for TransferCreatedEvent {
///     fn kind() -> &'static str {
///         "TransferCreatedEvent"
///     }
/// }
/// ```
pub trait Event: Message + Clone + Serialize + DeserializeOwned {
    /// Stable kind discriminator; doubles as the queue name.
    fn kind() -> &'static str;
}
