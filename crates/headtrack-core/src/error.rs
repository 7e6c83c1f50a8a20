use std::time::Duration;

/// Errors returned by [`MessageQueue`](crate::queue::MessageQueue).
///
/// A full queue is not an error: `post` blocks until space is available.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum QueueError {
    /// Capacity must be a non-zero power of two.
    #[error("Invalid queue capacity {0}: must be a non-zero power of two")]
    InvalidCapacity(usize),

    /// A bounded post gave up before the given phase completed.
    #[error("Post timed out after {waited:?} while waiting for {phase}")]
    Timeout { phase: WaitPhase, waited: Duration },
}

/// The blocking phase of a post that ran out of time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitPhase {
    /// Waiting for a free slot.
    Space,
    /// Waiting for the consumer to dequeue the message.
    Received,
    /// Waiting for the consumer to finish processing the message.
    Processed,
}

impl core::fmt::Display for WaitPhase {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            WaitPhase::Space => write!(f, "queue space"),
            WaitPhase::Received => write!(f, "receipt"),
            WaitPhase::Processed => write!(f, "processing"),
        }
    }
}

/// Errors surfaced by the worker or the tracker front end.
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    /// The worker thread could not be created.
    #[error("Failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),

    /// The worker thread panicked before it could be joined.
    #[error("Worker thread panicked")]
    Panicked,

    /// The session backend failed to initialize.
    #[error("Backend initialization failed: {0}")]
    BackendInit(String),

    #[error(transparent)]
    Queue(#[from] QueueError),
}
