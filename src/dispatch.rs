//! In-process command dispatch.
//!
//! `CommandDispatcher` routes a command to the single handler registered
//! for its concrete type and returns the handler's boolean result
//! synchronously. There is no queue and no broker on this path; commands
//! are request/response, not fire-and-forget.
//!
//! ## Example
//!
//! ```ignore
//! let dispatcher = CommandDispatcher::new();
//! dispatcher.register::<CreateTransferCommand, _>(TransferCommandHandler::new(bus))?;
//!
//! let handled = dispatcher.send(CreateTransferCommand::new(1, 2, amount))?;
//! assert!(handled);
//! ```

use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::error::Error;
use std::fmt;
use std::sync::RwLock;

use crate::handler::{CommandHandler, HandlerError};
use crate::message::Command;

/// Error type for command dispatch operations.
#[derive(Debug)]
pub enum DispatchError {
    /// No handler is registered for this command type.
    NoHandlerFound(&'static str),
    /// A handler is already registered for this command type.
    DuplicateHandler(&'static str),
    /// The handler itself failed.
    Handler(HandlerError),
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchError::NoHandlerFound(command) => {
                write!(f, "no handler registered for command {}", command)
            }
            DispatchError::DuplicateHandler(command) => {
                write!(f, "a handler is already registered for command {}", command)
            }
            DispatchError::Handler(e) => write!(f, "command handler failed: {}", e),
        }
    }
}

impl Error for DispatchError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            DispatchError::Handler(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

/// A registered handler, erased behind an invoke closure.
struct RegisteredHandler {
    invoke: Box<dyn Fn(Box<dyn Any>) -> Result<bool, DispatchError> + Send + Sync>,
}

/// Routes commands to their single registered handler.
///
/// The registry is keyed by the command's `TypeId`, so a command type can
/// never have more than one handler; an ambiguous registration is rejected
/// up front rather than discovered at send time. Registration uses interior
/// mutability because handlers are typically constructed after the bus they
/// publish through already exists.
pub struct CommandDispatcher {
    handlers: RwLock<HashMap<TypeId, RegisteredHandler>>,
}

impl Default for CommandDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandDispatcher {
    /// Create a dispatcher with no registered handlers.
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(HashMap::new()),
        }
    }

    /// Register the handler for command type `C`.
    ///
    /// Fails with `DispatchError::DuplicateHandler` if a handler for `C`
    /// is already registered. This is a configuration error: callers are
    /// expected to register each command type exactly once at startup.
    pub fn register<C, H>(&self, handler: H) -> Result<(), DispatchError>
    where
        C: Command,
        H: CommandHandler<C> + 'static,
    {
        let mut handlers = self.handlers.write().unwrap();

        if handlers.contains_key(&TypeId::of::<C>()) {
            return Err(DispatchError::DuplicateHandler(type_name::<C>()));
        }

        handlers.insert(
            TypeId::of::<C>(),
            RegisteredHandler {
                invoke: Box::new(move |command| match command.downcast::<C>() {
                    Ok(command) => handler.handle(*command).map_err(DispatchError::Handler),
                    Err(_) => Err(DispatchError::Handler(
                        format!("command payload is not a {}", type_name::<C>()).into(),
                    )),
                }),
            },
        );

        Ok(())
    }

    /// Send a command to its registered handler and return the result.
    ///
    /// Routes by the command's exact runtime type. Fails with
    /// `DispatchError::NoHandlerFound` when nothing is registered for it;
    /// handler failures propagate as `DispatchError::Handler`.
    pub fn send<C: Command>(&self, command: C) -> Result<bool, DispatchError> {
        let handlers = self.handlers.read().unwrap();

        let entry = handlers
            .get(&TypeId::of::<C>())
            .ok_or(DispatchError::NoHandlerFound(type_name::<C>()))?;

        (entry.invoke)(Box::new(command))
    }

    /// Number of registered command types.
    pub fn len(&self) -> usize {
        self.handlers.read().unwrap().len()
    }

    /// Check whether no handlers are registered.
    pub fn is_empty(&self) -> bool {
        self.handlers.read().unwrap().is_empty()
    }
}
