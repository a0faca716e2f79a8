//! Subscriber registry: the bus's dispatch table.
//!
//! Maps each event kind to a decode closure plus the ordered list of
//! subscriber entries. The kind set and the subscriber lists are one
//! structure, so removing the last subscriber for a kind removes the kind
//! itself in the same operation; the two can never drift apart.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use crate::handler::HandlerError;

/// Deserializes a raw payload into the kind's concrete event type.
pub(crate) type DecodeFn =
    Arc<dyn Fn(&[u8]) -> Result<Box<dyn Any + Send + Sync>, serde_json::Error> + Send + Sync>;

/// Invokes one handler instance with the decoded event.
pub(crate) type InvokeFn = Arc<
    dyn Fn(&Arc<dyn Any + Send + Sync>, &(dyn Any + Send + Sync)) -> Result<(), HandlerError>
        + Send
        + Sync,
>;

/// One subscribed handler type for a kind.
#[derive(Clone)]
pub(crate) struct SubscriberEntry {
    /// Identifier the scope resolves the handler instance by.
    pub handler_id: &'static str,
    /// Statically-typed invoke closure built at subscription time.
    pub invoke: InvokeFn,
}

struct KindEntry {
    decode: DecodeFn,
    subscribers: Vec<SubscriberEntry>,
}

pub(crate) enum AddOutcome {
    /// First subscriber for this kind; the caller should start a consumer.
    FirstForKind,
    Added,
    /// Already subscribed; the registry was left unchanged.
    Duplicate,
}

pub(crate) enum RemoveOutcome {
    NotSubscribed,
    Removed,
    /// Last subscriber removed; the kind is gone and the caller should
    /// stop its consumer.
    RemovedLast,
}

pub(crate) struct SubscriberRegistry {
    kinds: HashMap<String, KindEntry>,
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self {
            kinds: HashMap::new(),
        }
    }

    pub fn add(&mut self, kind: &str, decode: DecodeFn, entry: SubscriberEntry) -> AddOutcome {
        match self.kinds.get_mut(kind) {
            None => {
                self.kinds.insert(
                    kind.to_string(),
                    KindEntry {
                        decode,
                        subscribers: vec![entry],
                    },
                );
                AddOutcome::FirstForKind
            }
            Some(existing) => {
                if existing
                    .subscribers
                    .iter()
                    .any(|s| s.handler_id == entry.handler_id)
                {
                    return AddOutcome::Duplicate;
                }
                existing.subscribers.push(entry);
                AddOutcome::Added
            }
        }
    }

    pub fn remove(&mut self, kind: &str, handler_id: &str) -> RemoveOutcome {
        let Some(entry) = self.kinds.get_mut(kind) else {
            return RemoveOutcome::NotSubscribed;
        };

        let before = entry.subscribers.len();
        entry.subscribers.retain(|s| s.handler_id != handler_id);

        if entry.subscribers.len() == before {
            return RemoveOutcome::NotSubscribed;
        }

        if entry.subscribers.is_empty() {
            self.kinds.remove(kind);
            return RemoveOutcome::RemovedLast;
        }

        RemoveOutcome::Removed
    }

    /// Snapshot a kind's decode closure and subscriber list.
    ///
    /// The dispatch path clones these and releases the registry lock
    /// before running handlers, so a slow handler never blocks
    /// subscription changes on other kinds.
    pub fn snapshot(&self, kind: &str) -> Option<(DecodeFn, Vec<SubscriberEntry>)> {
        self.kinds
            .get(kind)
            .map(|entry| (Arc::clone(&entry.decode), entry.subscribers.clone()))
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.kinds.contains_key(kind)
    }

    pub fn kinds(&self) -> Vec<String> {
        self.kinds.keys().cloned().collect()
    }

    pub fn handlers(&self, kind: &str) -> Vec<&'static str> {
        self.kinds
            .get(kind)
            .map(|entry| entry.subscribers.iter().map(|s| s.handler_id).collect())
            .unwrap_or_default()
    }
}
