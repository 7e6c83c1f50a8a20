//! Worker tuning knobs.

use std::time::Duration;

/// Default queue capacity (messages). Must be a power of two.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// Default pause between pose samples while a session is active (~60 Hz).
pub const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// Default pause before a producer re-checks a full queue.
pub const DEFAULT_POST_RETRY_DELAY: Duration = Duration::from_millis(1);

/// Default CPU performance level requested for a session.
pub const DEFAULT_CPU_LEVEL: i32 = 2;

/// Default GPU performance level requested for a session.
pub const DEFAULT_GPU_LEVEL: i32 = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerConfig {
    pub queue_capacity: usize,
    pub frame_interval: Duration,
    pub post_retry_delay: Duration,
    pub cpu_level: i32,
    pub gpu_level: i32,
    /// Name given to the worker thread.
    pub thread_name: String,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            frame_interval: DEFAULT_FRAME_INTERVAL,
            post_retry_delay: DEFAULT_POST_RETRY_DELAY,
            cpu_level: DEFAULT_CPU_LEVEL,
            gpu_level: DEFAULT_GPU_LEVEL,
            thread_name: "headtrack-worker".to_string(),
        }
    }
}
