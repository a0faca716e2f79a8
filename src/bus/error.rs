//! Error types for bus operations.

use std::error::Error;
use std::fmt;

use crate::broker::TransportError;

/// Error type for `EventBus::publish`.
///
/// Publish-path errors are synchronous: they bubble to whatever code
/// published the event (typically a command handler), failing that
/// request. They never affect consumer loops.
#[derive(Debug)]
pub enum PublishError {
    /// Serializing the event to JSON failed.
    Serialization(serde_json::Error),
    /// The broker rejected the queue declaration or the send.
    Transport(TransportError),
}

impl fmt::Display for PublishError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PublishError::Serialization(e) => write!(f, "event serialization failed: {}", e),
            PublishError::Transport(e) => write!(f, "publish failed: {}", e),
        }
    }
}

impl Error for PublishError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            PublishError::Serialization(e) => Some(e),
            PublishError::Transport(e) => Some(e),
        }
    }
}

impl From<TransportError> for PublishError {
    fn from(err: TransportError) -> Self {
        PublishError::Transport(err)
    }
}

impl From<serde_json::Error> for PublishError {
    fn from(err: serde_json::Error) -> Self {
        PublishError::Serialization(err)
    }
}

/// Error type for `EventBus::subscribe`.
#[derive(Debug)]
pub enum SubscribeError {
    /// This handler type is already subscribed to this event kind.
    DuplicateSubscriber {
        kind: &'static str,
        handler: &'static str,
    },
    /// Declaring the queue or starting the consumer loop failed.
    Transport(TransportError),
}

impl fmt::Display for SubscribeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubscribeError::DuplicateSubscriber { kind, handler } => {
                write!(f, "handler {} is already subscribed to '{}'", handler, kind)
            }
            SubscribeError::Transport(e) => write!(f, "subscribe failed: {}", e),
        }
    }
}

impl Error for SubscribeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            SubscribeError::Transport(e) => Some(e),
            _ => None,
        }
    }
}

impl From<TransportError> for SubscribeError {
    fn from(err: TransportError) -> Self {
        SubscribeError::Transport(err)
    }
}
