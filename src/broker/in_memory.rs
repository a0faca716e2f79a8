//! In-memory broker for testing and single-process scenarios.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Mutex, RwLock};
use std::thread;
use std::time::Duration;

use tracing::debug;

use super::transport::{Broker, ConsumerHandle, ConsumerStats, OnMessage, TransportError};

type Queue = Arc<Mutex<VecDeque<Vec<u8>>>>;

/// In-memory broker with named FIFO queues.
///
/// Features:
/// - Thread-safe (can be shared across threads via `Clone`)
/// - One polling consumer thread per `start_consuming` call
/// - FIFO delivery within a queue; no ordering across queues
/// - Auto-acknowledge: a message is gone from the queue once the consumer
///   loop takes it, whatever the downstream dispatch does with it
///
/// ## Example
///
/// ```ignore
/// let broker = InMemoryBroker::new();
/// broker.ensure_queue("TransferCreatedEvent")?;
/// broker.publish_raw("TransferCreatedEvent", br#"{"from":1}"#)?;
///
/// let handle = broker.start_consuming("TransferCreatedEvent", on_message)?;
/// // ...
/// let stats = handle.stop();
/// ```
#[derive(Clone)]
pub struct InMemoryBroker {
    /// Named queues.
    queues: Arc<RwLock<HashMap<String, Queue>>>,
    /// Live consumer count per queue.
    consumers: Arc<RwLock<HashMap<String, Arc<AtomicUsize>>>>,
    /// How long a consumer loop sleeps when its queue is empty.
    poll_interval: Duration,
}

impl Default for InMemoryBroker {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryBroker {
    /// Create a broker with the default poll interval (5ms).
    pub fn new() -> Self {
        Self::with_poll_interval(Duration::from_millis(5))
    }

    /// Create a broker with a custom consumer poll interval.
    pub fn with_poll_interval(poll_interval: Duration) -> Self {
        Self {
            queues: Arc::new(RwLock::new(HashMap::new())),
            consumers: Arc::new(RwLock::new(HashMap::new())),
            poll_interval,
        }
    }

    /// Number of messages currently waiting in a queue (0 if absent).
    pub fn queue_len(&self, name: &str) -> usize {
        self.queues
            .read()
            .unwrap()
            .get(name)
            .map_or(0, |q| q.lock().unwrap().len())
    }

    /// Names of all declared queues.
    pub fn queue_names(&self) -> Vec<String> {
        self.queues.read().unwrap().keys().cloned().collect()
    }

    /// Number of live consumer loops on a queue.
    pub fn consumer_count(&self, name: &str) -> usize {
        self.consumers
            .read()
            .unwrap()
            .get(name)
            .map_or(0, |c| c.load(Ordering::SeqCst))
    }
}

impl Broker for InMemoryBroker {
    fn ensure_queue(&self, name: &str) -> Result<(), TransportError> {
        let mut queues = self.queues.write().unwrap();
        if !queues.contains_key(name) {
            queues.insert(name.to_string(), Arc::new(Mutex::new(VecDeque::new())));
            debug!(queue = name, "queue declared");
        }
        Ok(())
    }

    fn publish_raw(&self, queue: &str, payload: &[u8]) -> Result<(), TransportError> {
        let queues = self.queues.read().unwrap();
        let q = queues
            .get(queue)
            .ok_or_else(|| TransportError::UnknownQueue(queue.to_string()))?;

        q.lock().unwrap().push_back(payload.to_vec());
        Ok(())
    }

    fn start_consuming(
        &self,
        queue: &str,
        on_message: OnMessage,
    ) -> Result<ConsumerHandle, TransportError> {
        self.ensure_queue(queue)?;

        let q = {
            let queues = self.queues.read().unwrap();
            Arc::clone(
                queues
                    .get(queue)
                    .ok_or_else(|| TransportError::UnknownQueue(queue.to_string()))?,
            )
        };

        let counter = {
            let mut consumers = self.consumers.write().unwrap();
            Arc::clone(consumers.entry(queue.to_string()).or_default())
        };
        counter.fetch_add(1, Ordering::SeqCst);

        let (stop_tx, stop_rx) = mpsc::channel();
        let queue_name = queue.to_string();
        let poll_interval = self.poll_interval;

        let handle = thread::spawn(move || {
            let mut stats = ConsumerStats::default();
            debug!(queue = %queue_name, "consumer started");

            loop {
                // Check for stop signal
                match stop_rx.try_recv() {
                    Ok(()) | Err(mpsc::TryRecvError::Disconnected) => break,
                    Err(mpsc::TryRecvError::Empty) => {}
                }

                stats.polls += 1;

                // Taking the message off the queue is the acknowledgment.
                let next = q.lock().unwrap().pop_front();

                match next {
                    Some(payload) => {
                        on_message(&queue_name, &payload);
                        stats.delivered += 1;
                    }
                    // Small sleep to avoid busy-waiting
                    None => thread::sleep(poll_interval),
                }
            }

            counter.fetch_sub(1, Ordering::SeqCst);
            debug!(queue = %queue_name, delivered = stats.delivered, "consumer stopped");
            stats
        });

        Ok(ConsumerHandle::new(stop_tx, handle))
    }
}
