mod broker;
mod bus;
mod dispatch;
mod handler;
mod message;
mod scope;

pub use broker::{Broker, ConsumerHandle, ConsumerStats, InMemoryBroker, OnMessage, TransportError};
pub use bus::{EventBus, PublishError, SubscribeError};
pub use dispatch::{CommandDispatcher, DispatchError};
pub use handler::{CommandHandler, EventHandler, HandlerError};
pub use message::{Command, Event, Message};
pub use scope::{handler_id, HandlerProvider, HandlerScope, ScopeFactory};
