//! The event bus: publish, subscribe, unsubscribe, and inbound dispatch.

use std::any::{type_name, Any};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use tracing::{debug, warn};

use crate::broker::{Broker, ConsumerHandle, OnMessage, TransportError};
use crate::dispatch::{CommandDispatcher, DispatchError};
use crate::handler::EventHandler;
use crate::message::{Command, Event};
use crate::scope::ScopeFactory;

use super::error::{PublishError, SubscribeError};
use super::registry::{
    AddOutcome, DecodeFn, InvokeFn, RemoveOutcome, SubscriberEntry, SubscriberRegistry,
};

/// Typed event bus over a message broker.
///
/// Owns the kind/subscriber registries and the per-kind consumer loops.
/// Publishing serializes the event to JSON and sends it to the queue named
/// after the event's kind; subscribing registers a handler type and, for
/// the first handler of a kind, starts that kind's consumer loop (one loop
/// per kind, however many handlers subscribe).
///
/// ## Example
///
/// ```ignore
/// let broker = Arc::new(InMemoryBroker::new());
/// let dispatcher = Arc::new(CommandDispatcher::new());
/// let provider = HandlerProvider::new()
///     .register(move || TransferEventHandler::new(transfers.clone()));
///
/// let bus = Arc::new(EventBus::new(broker, dispatcher.clone(), Arc::new(provider)));
///
/// bus.subscribe::<TransferCreatedEvent, TransferEventHandler>()?;
/// bus.publish(&TransferCreatedEvent::new(1, 2, amount))?;
/// ```
pub struct EventBus<B: Broker> {
    broker: Arc<B>,
    dispatcher: Arc<CommandDispatcher>,
    scope_factory: Arc<dyn ScopeFactory>,
    registry: Arc<RwLock<SubscriberRegistry>>,
    /// One consumer loop per registered kind. Also serializes
    /// subscribe/unsubscribe against each other.
    consumers: Mutex<HashMap<String, ConsumerHandle>>,
}

impl<B: Broker> EventBus<B> {
    /// Create a bus over the given broker, command dispatcher, and scope
    /// factory. The registries start empty.
    pub fn new(
        broker: Arc<B>,
        dispatcher: Arc<CommandDispatcher>,
        scope_factory: Arc<dyn ScopeFactory>,
    ) -> Self {
        Self {
            broker,
            dispatcher,
            scope_factory,
            registry: Arc::new(RwLock::new(SubscriberRegistry::new())),
            consumers: Mutex::new(HashMap::new()),
        }
    }

    /// Hand a command to the in-process dispatcher and return its result.
    pub fn send_command<C: Command>(&self, command: C) -> Result<bool, DispatchError> {
        self.dispatcher.send(command)
    }

    /// Serialize an event to JSON and send it to its kind's queue.
    ///
    /// Fire-and-forget: the queue is declared if absent, the payload is
    /// handed to the broker, and the call returns without waiting for any
    /// subscriber. A transport or serialization failure bubbles to the
    /// caller; downstream handler failures never do.
    pub fn publish<E: Event>(&self, event: &E) -> Result<(), PublishError> {
        let payload = serde_json::to_vec(event)?;
        self.broker.ensure_queue(E::kind())?;
        self.broker.publish_raw(E::kind(), &payload)?;
        Ok(())
    }

    /// Subscribe handler type `H` to event kind `E`.
    ///
    /// The kind is registered idempotently; the `(kind, handler)` pair
    /// must be unique and a repeat subscription fails with
    /// `SubscribeError::DuplicateSubscriber`, leaving the registries
    /// unchanged. The first successful subscription for a kind starts its
    /// consumer loop.
    ///
    /// `H` itself is not stored; a live instance is resolved from the
    /// scope factory per delivery (and silently skipped when the factory
    /// does not know the type).
    pub fn subscribe<E, H>(&self) -> Result<(), SubscribeError>
    where
        E: Event,
        H: EventHandler<E> + 'static,
    {
        let kind = E::kind();
        let handler_id = type_name::<H>();

        let decode: DecodeFn = Arc::new(|payload: &[u8]| {
            serde_json::from_slice::<E>(payload)
                .map(|event| Box::new(event) as Box<dyn Any + Send + Sync>)
        });

        let invoke: InvokeFn = Arc::new(
            |instance: &Arc<dyn Any + Send + Sync>, event: &(dyn Any + Send + Sync)| {
                let Some(handler) = instance.downcast_ref::<H>() else {
                    return Err(format!("resolved instance is not a {}", type_name::<H>()).into());
                };
                let Some(event) = event.downcast_ref::<E>() else {
                    return Err(format!("decoded event is not a {}", E::kind()).into());
                };
                handler.handle(event)
            },
        );

        let mut consumers = self.consumers.lock().unwrap();

        let outcome = self.registry.write().unwrap().add(
            kind,
            decode,
            SubscriberEntry { handler_id, invoke },
        );

        match outcome {
            AddOutcome::Duplicate => Err(SubscribeError::DuplicateSubscriber {
                kind,
                handler: handler_id,
            }),
            AddOutcome::Added => Ok(()),
            AddOutcome::FirstForKind => match self.start_consumer(kind) {
                Ok(handle) => {
                    consumers.insert(kind.to_string(), handle);
                    Ok(())
                }
                Err(e) => {
                    // Roll back so the registries never claim a kind
                    // nothing is consuming.
                    self.registry.write().unwrap().remove(kind, handler_id);
                    Err(SubscribeError::Transport(e))
                }
            },
        }
    }

    /// Remove handler type `H` from event kind `E`'s subscriber list.
    ///
    /// Returns `true` if the handler was subscribed. Removing the last
    /// handler for a kind removes the kind from the registries and stops
    /// its consumer loop (the queue itself stays declared on the broker,
    /// so a later re-subscribe picks up where it left off). Must not be
    /// called from inside a handler for the same kind: stopping the loop
    /// waits for the in-flight delivery to finish.
    pub fn unsubscribe<E, H>(&self) -> bool
    where
        E: Event,
        H: EventHandler<E> + 'static,
    {
        let kind = E::kind();
        let handler_id = type_name::<H>();

        let mut consumers = self.consumers.lock().unwrap();
        let outcome = self.registry.write().unwrap().remove(kind, handler_id);

        match outcome {
            RemoveOutcome::NotSubscribed => false,
            RemoveOutcome::Removed => true,
            RemoveOutcome::RemovedLast => {
                if let Some(handle) = consumers.remove(kind) {
                    let stats = handle.stop();
                    debug!(kind, delivered = stats.delivered, "consumer loop stopped");
                }
                true
            }
        }
    }

    /// Event kinds currently holding at least one subscriber.
    pub fn kinds(&self) -> Vec<String> {
        self.registry.read().unwrap().kinds()
    }

    /// Handler type identifiers subscribed to a kind, in subscription order.
    pub fn subscribers(&self, kind: &str) -> Vec<&'static str> {
        self.registry.read().unwrap().handlers(kind)
    }

    /// The underlying broker.
    pub fn broker(&self) -> &B {
        &self.broker
    }

    fn start_consumer(&self, kind: &'static str) -> Result<ConsumerHandle, TransportError> {
        self.broker.ensure_queue(kind)?;

        let registry = Arc::clone(&self.registry);
        let scope_factory = Arc::clone(&self.scope_factory);
        let on_message: OnMessage = Arc::new(move |kind: &str, payload: &[u8]| {
            dispatch_delivery(&registry, scope_factory.as_ref(), kind, payload);
        });

        self.broker.start_consuming(kind, on_message)
    }
}

/// Dispatch one inbound delivery to every handler subscribed to its kind.
///
/// Unknown kinds are dropped silently: an event nobody subscribes to is
/// not an error, it is simply undeliverable. For a known kind the payload
/// is decoded once, one scope is opened for the whole batch, and handlers
/// run sequentially in subscription order. A failing handler is reported
/// and skipped; it cannot kill the consumer loop or starve the handlers
/// after it.
fn dispatch_delivery(
    registry: &RwLock<SubscriberRegistry>,
    scope_factory: &dyn ScopeFactory,
    kind: &str,
    payload: &[u8],
) {
    let Some((decode, subscribers)) = registry.read().unwrap().snapshot(kind) else {
        return;
    };

    let event = match decode(payload) {
        Ok(event) => event,
        Err(e) => {
            warn!(kind, error = %e, "dropping undecodable event payload");
            return;
        }
    };

    let mut scope = scope_factory.create_scope();

    for subscriber in &subscribers {
        // Resolution miss: the container does not know this handler type.
        // Skipped by policy; not fatal to the delivery.
        let Some(instance) = scope.resolve(subscriber.handler_id) else {
            continue;
        };

        if let Err(e) = (subscriber.invoke)(&instance, event.as_ref()) {
            warn!(
                kind,
                handler = subscriber.handler_id,
                error = %e,
                "event handler failed"
            );
        }
    }
}
