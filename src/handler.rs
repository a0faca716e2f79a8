//! Handler traits for commands and events.

use std::error::Error;

use crate::message::{Command, Event};

/// Boxed error returned by command and event handlers.
///
/// Handlers are user code with arbitrary failure modes, so the error type
/// is deliberately open. The bus never inspects it beyond logging.
pub type HandlerError = Box<dyn Error + Send + Sync>;

/// Handles a command and returns a boolean result.
///
/// Exactly one handler is registered per command type; the result is
/// returned synchronously to the caller of `send_command`. A handler
/// failure fails the originating request.
pub trait CommandHandler<C: Command>: Send + Sync {
    fn handle(&self, command: C) -> Result<bool, HandlerError>;
}

/// Handles an event delivered from the broker.
///
/// Many handler types may subscribe to the same event kind; within one
/// delivery they are invoked sequentially, in subscription order. A
/// handler failure is reported at the consumer-loop boundary and does not
/// affect other handlers, other kinds, or the publisher.
pub trait EventHandler<E: Event>: Send + Sync {
    fn handle(&self, event: &E) -> Result<(), HandlerError>;
}
