//! Broker trait and transport primitives.

use std::error::Error;
use std::fmt;
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread::JoinHandle;

/// Callback invoked by a consumer loop for each delivered message.
///
/// Receives the queue name (which is the event kind) and the raw payload.
pub type OnMessage = Arc<dyn Fn(&str, &[u8]) + Send + Sync>;

/// Error type for broker transport operations.
#[derive(Debug)]
pub enum TransportError {
    /// Connecting to the broker failed.
    ConnectionFailed(String),
    /// The target queue does not exist.
    UnknownQueue(String),
    /// Other transport error.
    Other(Box<dyn Error + Send + Sync>),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::ConnectionFailed(msg) => write!(f, "connection failed: {}", msg),
            TransportError::UnknownQueue(queue) => write!(f, "unknown queue: {}", queue),
            TransportError::Other(e) => write!(f, "transport error: {}", e),
        }
    }
}

impl Error for TransportError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            TransportError::Other(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

/// A message broker the bus can publish to and consume from.
///
/// Implementations own connection lifecycle and queue topology. The bus
/// calls `ensure_queue` before every publish and before every consumer
/// registration, so implementations must make declaration idempotent
/// (declare-if-absent). Brokers are long-lived and shared behind `Arc`;
/// nothing on the publish path opens per-call connections.
pub trait Broker: Send + Sync + 'static {
    /// Declare a queue if it does not exist yet. Safe to call repeatedly.
    fn ensure_queue(&self, name: &str) -> Result<(), TransportError>;

    /// Send raw bytes to a queue, routed by queue name only.
    ///
    /// Best-effort: no confirmation wait, no persistence flag, and never
    /// blocks waiting for a consumer.
    fn publish_raw(&self, queue: &str, payload: &[u8]) -> Result<(), TransportError>;

    /// Start a dedicated consumer loop for a queue.
    ///
    /// Each delivered message is auto-acknowledged before `on_message`
    /// runs. A transport failure inside the loop ends that loop only;
    /// other queues' loops and the publish path are unaffected.
    fn start_consuming(&self, queue: &str, on_message: OnMessage)
        -> Result<ConsumerHandle, TransportError>;
}

/// Statistics from a consumer loop.
#[derive(Debug, Default, Clone)]
pub struct ConsumerStats {
    /// Number of poll cycles completed.
    pub polls: usize,
    /// Number of messages taken off the queue and dispatched.
    pub delivered: usize,
}

/// Handle to a background consumer loop. Drop or call `stop()` to shut down.
pub struct ConsumerHandle {
    stop_tx: Sender<()>,
    handle: Option<JoinHandle<ConsumerStats>>,
}

impl ConsumerHandle {
    /// Create a handle from the loop's stop channel and join handle.
    pub fn new(stop_tx: Sender<()>, handle: JoinHandle<ConsumerStats>) -> Self {
        Self {
            stop_tx,
            handle: Some(handle),
        }
    }

    /// Stop the consumer loop and wait for it to finish. Returns stats.
    pub fn stop(mut self) -> ConsumerStats {
        let _ = self.stop_tx.send(());
        if let Some(handle) = self.handle.take() {
            handle.join().unwrap_or_default()
        } else {
            ConsumerStats::default()
        }
    }

    /// Signal stop without waiting.
    pub fn signal_stop(&self) {
        let _ = self.stop_tx.send(());
    }
}

impl Drop for ConsumerHandle {
    fn drop(&mut self) {
        let _ = self.stop_tx.send(());
    }
}
