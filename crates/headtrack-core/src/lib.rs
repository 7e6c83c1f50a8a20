//! Lifecycle message queue and session reconciliation worker for head tracking.
//!
//! A caller thread posts lifecycle [`Message`]s into a bounded [`MessageQueue`].
//! A dedicated worker thread drains it, keeps the drawable surface and the
//! tracking session in step with the `resumed` and window facts, and samples
//! head poses while a session is active. [`HeadTracker`] wraps both ends.

/// Worker tuning knobs and their defaults.
pub mod config;

/// Error types for the queue and the worker.
pub mod error;

/// Listener registry and latest tracking data.
pub mod listeners;

/// Fixed-shape lifecycle messages.
pub mod message;

/// Bounded blocking message queue.
pub mod queue;

/// Caller-thread front end.
pub mod tracker;

/// Worker event loop and reconciliation state machine.
pub mod worker;

pub use config::WorkerConfig;
pub use error::{QueueError, WaitPhase, WorkerError};
pub use listeners::{HeadTrackingData, TrackingListener, TrackingListeners};
pub use message::{Message, MessageTag, WaitMode, MAX_MESSAGE_PARMS};
pub use queue::MessageQueue;
pub use tracker::HeadTracker;
pub use worker::{spawn_worker, Reconciler, SessionState, Worker};
