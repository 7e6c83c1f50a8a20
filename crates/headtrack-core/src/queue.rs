//! Bounded lifecycle message queue between one producer role and one consumer role.
//!
//! Producers block on three things: a full ring (backpressure, retried after a
//! short fixed delay), receipt of a `WaitReceived` message, and completion of a
//! `WaitProcessed` message. Each wait is tied to the sequence number of the
//! message being posted, so a signal meant for one message never releases the
//! producer of another.
//!
//! Completion of a `WaitProcessed` message is signalled either explicitly with
//! [`MessageQueue::complete_processed`] or, at the latest, at the start of the
//! consumer's next [`MessageQueue::fetch_next`] call.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use crate::config::{DEFAULT_POST_RETRY_DELAY, DEFAULT_QUEUE_CAPACITY};
use crate::error::{QueueError, WaitPhase};
use crate::message::{Message, MessageTag, WaitMode};

struct QueueState {
    ring: Box<[Message]>,
    /// Sequence number of the next message to dequeue.
    head: u64,
    /// Sequence number the next posted message will get.
    tail: u64,
    enabled: bool,
    /// The consumer is gone; every rendezvous completes immediately.
    closed: bool,
    /// Dequeued `WaitProcessed` message whose completion is not yet signalled.
    pending_processed: Option<u64>,
    /// Every `WaitProcessed` message with a lower sequence number is done.
    processed_through: u64,
}

impl QueueState {
    fn len(&self) -> usize {
        (self.tail - self.head) as usize
    }
}

pub struct MessageQueue {
    state: Mutex<QueueState>,
    posted: Condvar,
    received: Condvar,
    processed: Condvar,
    capacity: usize,
    retry_delay: Duration,
}

impl Default for MessageQueue {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_QUEUE_CAPACITY, DEFAULT_POST_RETRY_DELAY)
            .unwrap_or_else(|_| unreachable!("default capacity is a power of two"))
    }
}

impl MessageQueue {
    /// Create a disabled queue holding up to `capacity` messages.
    pub fn new(capacity: usize) -> Result<Self, QueueError> {
        Self::with_capacity(capacity, DEFAULT_POST_RETRY_DELAY)
    }

    /// Like [`new`](Self::new), with the delay a producer sleeps before
    /// re-checking a full queue.
    pub fn with_capacity(capacity: usize, retry_delay: Duration) -> Result<Self, QueueError> {
        if capacity == 0 || !capacity.is_power_of_two() {
            return Err(QueueError::InvalidCapacity(capacity));
        }

        let blank = Message::new(MessageTag::Start, WaitMode::None);
        Ok(Self {
            state: Mutex::new(QueueState {
                ring: vec![blank; capacity].into_boxed_slice(),
                head: 0,
                tail: 0,
                enabled: false,
                closed: false,
                pending_processed: None,
                processed_through: 0,
            }),
            posted: Condvar::new(),
            received: Condvar::new(),
            processed: Condvar::new(),
            capacity,
            retry_delay,
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of messages currently queued.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_enabled(&self) -> bool {
        self.lock().enabled
    }

    /// Gate acceptance of new posts. Already queued messages stay queued.
    ///
    /// A closed queue cannot be enabled again.
    pub fn enable(&self, enabled: bool) {
        let mut state = self.lock();
        state.enabled = enabled && !state.closed;
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Mark the consumer as gone.
    ///
    /// Disables the queue and releases every producer blocked on space,
    /// receipt or processing. Messages still queued are never delivered.
    pub fn close(&self) {
        let mut state = self.lock();
        state.closed = true;
        state.enabled = false;
        state.pending_processed = None;
        self.posted.notify_all();
        self.received.notify_all();
        self.processed.notify_all();
    }

    /// Queue `message`, blocking according to its wait mode.
    ///
    /// Does nothing while the queue is disabled. Blocks without bound while the
    /// queue is full, so a stalled consumer stalls the producer too.
    pub fn post(&self, message: Message) {
        if let Err(err) = self.post_until(message, None) {
            // Unreachable without a deadline.
            log::error!("Unbounded post failed: {err}");
        }
    }

    /// Like [`post`](Self::post), but gives up once `timeout` has elapsed.
    ///
    /// On a [`WaitPhase::Received`] or [`WaitPhase::Processed`] timeout the
    /// message stays queued and will still be delivered.
    pub fn post_with_deadline(&self, message: Message, timeout: Duration) -> Result<(), QueueError> {
        self.post_until(message, Some(Instant::now() + timeout))
    }

    fn post_until(&self, message: Message, deadline: Option<Instant>) -> Result<(), QueueError> {
        let started = Instant::now();
        let mut state = self.lock();
        if !state.enabled {
            return Ok(());
        }

        while state.len() >= self.capacity {
            drop(state);
            if let Some(deadline) = deadline {
                if Instant::now() >= deadline {
                    return Err(QueueError::Timeout {
                        phase: WaitPhase::Space,
                        waited: started.elapsed(),
                    });
                }
            }
            thread::sleep(self.retry_delay);
            state = self.lock();
            if !state.enabled {
                return Ok(());
            }
        }

        let seq = state.tail;
        let slot = (seq as usize) & (self.capacity - 1);
        state.ring[slot] = message;
        state.tail += 1;
        self.posted.notify_all();

        match message.wait {
            WaitMode::None => {}
            WaitMode::WaitReceived => {
                self.wait_for(state, &self.received, deadline, started, WaitPhase::Received, |s| {
                    s.closed || s.head > seq
                })?;
            }
            WaitMode::WaitProcessed => {
                self.wait_for(state, &self.processed, deadline, started, WaitPhase::Processed, |s| {
                    s.closed || s.processed_through > seq
                })?;
            }
        }
        Ok(())
    }

    /// Dequeue the next message.
    ///
    /// First signals completion of the previously fetched `WaitProcessed` message
    /// if nobody did so yet. With `block_if_empty` the call sleeps until a message
    /// is posted; otherwise it returns `None` on an empty queue.
    pub fn fetch_next(&self, block_if_empty: bool) -> Option<Message> {
        let mut state = self.lock();
        self.resolve_processed(&mut state);

        if block_if_empty {
            state = self
                .posted
                .wait_while(state, |s| !s.closed && s.tail == s.head)
                .unwrap_or_else(PoisonError::into_inner);
        }

        if state.tail == state.head {
            return None;
        }

        let seq = state.head;
        let message = state.ring[(seq as usize) & (self.capacity - 1)];
        state.head += 1;

        match message.wait {
            WaitMode::None => {}
            WaitMode::WaitReceived => self.received.notify_all(),
            WaitMode::WaitProcessed => state.pending_processed = Some(seq),
        }
        Some(message)
    }

    /// Signal that the last fetched `WaitProcessed` message has been handled.
    ///
    /// No-op when nothing is pending.
    pub fn complete_processed(&self) {
        let mut state = self.lock();
        self.resolve_processed(&mut state);
    }

    fn resolve_processed(&self, state: &mut QueueState) {
        if let Some(seq) = state.pending_processed.take() {
            state.processed_through = state.processed_through.max(seq + 1);
            self.processed.notify_all();
        }
    }

    fn wait_for(
        &self,
        mut state: MutexGuard<'_, QueueState>,
        condvar: &Condvar,
        deadline: Option<Instant>,
        started: Instant,
        phase: WaitPhase,
        done: impl Fn(&QueueState) -> bool,
    ) -> Result<(), QueueError> {
        let Some(deadline) = deadline else {
            drop(
                condvar
                    .wait_while(state, |s| !done(s))
                    .unwrap_or_else(PoisonError::into_inner),
            );
            return Ok(());
        };

        loop {
            if done(&state) {
                return Ok(());
            }
            let now = Instant::now();
            if now >= deadline {
                return Err(QueueError::Timeout {
                    phase,
                    waited: now - started,
                });
            }
            let (guard, _) = condvar
                .wait_timeout(state, deadline - now)
                .unwrap_or_else(PoisonError::into_inner);
            state = guard;
        }
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
