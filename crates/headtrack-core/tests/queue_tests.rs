//! Integration tests for MessageQueue: ordering, backpressure and the three
//! wait contracts.
//!
//! Blocking behavior is observed from a producer thread that reports back over
//! a channel once `post` returns.

use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use headtrack_core::{Message, MessageQueue, MessageTag, QueueError, WaitMode, WaitPhase};

/// Long enough that a blocked producer would have reported by now.
const STILL_BLOCKED: Duration = Duration::from_millis(100);
/// Generous bound for a producer that should be released.
const RELEASED: Duration = Duration::from_secs(2);

fn enabled_queue(capacity: usize) -> Arc<MessageQueue> {
    let queue = MessageQueue::new(capacity).expect("valid capacity");
    queue.enable(true);
    Arc::new(queue)
}

fn numbered(n: i32, wait: WaitMode) -> Message {
    let mut message = Message::new(MessageTag::KeyEvent, wait);
    message.set_int_parm(0, n);
    message
}

/// Post `message` from another thread; the receiver fires once `post` returns.
fn post_in_background(queue: &Arc<MessageQueue>, message: Message) -> mpsc::Receiver<()> {
    let (tx, rx) = mpsc::channel();
    let queue = Arc::clone(queue);
    thread::spawn(move || {
        queue.post(message);
        let _ = tx.send(());
    });
    rx
}

fn wait_for_len(queue: &MessageQueue, len: usize) {
    for _ in 0..2000 {
        if queue.len() == len {
            return;
        }
        thread::sleep(Duration::from_millis(1));
    }
    panic!("queue never reached length {len}, has {}", queue.len());
}

// ============================================================================
// Construction and gating
// ============================================================================

mod construction_tests {
    use super::*;

    #[test]
    fn rejects_non_power_of_two_capacity() {
        assert_eq!(
            MessageQueue::new(1000).err(),
            Some(QueueError::InvalidCapacity(1000))
        );
        assert_eq!(MessageQueue::new(0).err(), Some(QueueError::InvalidCapacity(0)));
    }

    #[test]
    fn default_queue_holds_1024_and_starts_disabled() {
        let queue = MessageQueue::default();
        assert_eq!(queue.capacity(), 1024);
        assert!(!queue.is_enabled());
        assert!(queue.is_empty());
    }

    #[test]
    fn post_to_disabled_queue_is_noop() {
        let queue = MessageQueue::new(8).unwrap();
        queue.post(numbered(1, WaitMode::WaitProcessed));
        assert_eq!(queue.len(), 0);
        assert_eq!(queue.fetch_next(false), None);
    }

    #[test]
    fn disabling_keeps_queued_messages() {
        let queue = enabled_queue(8);
        queue.post(numbered(1, WaitMode::None));
        queue.enable(false);
        queue.post(numbered(2, WaitMode::None));

        assert_eq!(queue.len(), 1);
        assert_eq!(queue.fetch_next(false).map(|m| m.int_parm(0)), Some(1));
        assert_eq!(queue.fetch_next(false), None);
    }
}

// ============================================================================
// Ordering
// ============================================================================

mod fifo_tests {
    use super::*;

    #[test]
    fn fetch_returns_messages_in_post_order() {
        let queue = enabled_queue(128);
        for n in 0..100 {
            queue.post(numbered(n, WaitMode::None));
        }
        for n in 0..100 {
            assert_eq!(queue.fetch_next(false).map(|m| m.int_parm(0)), Some(n));
        }
        assert_eq!(queue.fetch_next(false), None);
    }

    #[test]
    fn order_survives_ring_wraparound() {
        let queue = enabled_queue(4);
        let mut next_expected = 0;
        for n in 0..40 {
            queue.post(numbered(n, WaitMode::None));
            if n % 3 == 2 {
                while let Some(message) = queue.fetch_next(false) {
                    assert_eq!(message.int_parm(0), next_expected);
                    next_expected += 1;
                }
            }
        }
        while let Some(message) = queue.fetch_next(false) {
            assert_eq!(message.int_parm(0), next_expected);
            next_expected += 1;
        }
        assert_eq!(next_expected, 40);
    }

    #[test]
    fn blocking_fetch_waits_for_post() {
        let queue = enabled_queue(8);
        let consumer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.fetch_next(true))
        };
        thread::sleep(Duration::from_millis(20));
        queue.post(numbered(7, WaitMode::None));

        let message = consumer.join().unwrap().expect("blocking fetch returns a message");
        assert_eq!(message.int_parm(0), 7);
    }

    #[test]
    fn single_producer_thread_to_single_consumer_thread() {
        let queue = enabled_queue(16);
        let producer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || {
                for n in 0..500 {
                    queue.post(numbered(n, WaitMode::None));
                }
            })
        };

        for n in 0..500 {
            let message = queue.fetch_next(true).unwrap();
            assert_eq!(message.int_parm(0), n);
        }
        producer.join().unwrap();
        assert!(queue.is_empty());
    }
}

// ============================================================================
// Backpressure
// ============================================================================

mod backpressure_tests {
    use super::*;

    #[test]
    fn post_to_full_queue_blocks_until_fetch() {
        let queue = enabled_queue(4);
        for n in 0..4 {
            queue.post(numbered(n, WaitMode::None));
        }

        let done = post_in_background(&queue, numbered(4, WaitMode::None));
        assert!(done.recv_timeout(STILL_BLOCKED).is_err(), "post must block on a full queue");

        assert_eq!(queue.fetch_next(false).map(|m| m.int_parm(0)), Some(0));
        done.recv_timeout(RELEASED).expect("post completes once space exists");

        assert_eq!(queue.len(), 4);
        let rest: Vec<i32> = std::iter::from_fn(|| queue.fetch_next(false))
            .map(|m| m.int_parm(0))
            .collect();
        assert_eq!(rest, vec![1, 2, 3, 4]);
    }

    #[test]
    fn bounded_post_to_full_queue_times_out() {
        let queue = enabled_queue(1);
        queue.post(numbered(0, WaitMode::None));

        let err = queue
            .post_with_deadline(numbered(1, WaitMode::None), Duration::from_millis(20))
            .unwrap_err();
        assert!(matches!(
            err,
            QueueError::Timeout {
                phase: WaitPhase::Space,
                ..
            }
        ));
        assert_eq!(queue.len(), 1);
    }
}

// ============================================================================
// Wait contracts
// ============================================================================

mod wait_mode_tests {
    use super::*;

    #[test]
    fn wait_none_returns_without_consumer() {
        let queue = enabled_queue(8);
        let done = post_in_background(&queue, numbered(1, WaitMode::None));
        done.recv_timeout(RELEASED).expect("WaitMode::None never blocks");
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn wait_received_unblocks_on_dequeue() {
        let queue = enabled_queue(8);
        let done = post_in_background(&queue, numbered(1, WaitMode::WaitReceived));
        wait_for_len(&queue, 1);
        assert!(done.recv_timeout(STILL_BLOCKED).is_err());

        queue.fetch_next(false).unwrap();
        done.recv_timeout(RELEASED).expect("released by dequeue");
    }

    #[test]
    fn wait_received_ignores_earlier_messages() {
        let queue = enabled_queue(8);
        queue.post(numbered(0, WaitMode::None));
        let done = post_in_background(&queue, numbered(1, WaitMode::WaitReceived));
        wait_for_len(&queue, 2);

        assert_eq!(queue.fetch_next(false).map(|m| m.int_parm(0)), Some(0));
        assert!(
            done.recv_timeout(STILL_BLOCKED).is_err(),
            "dequeuing an earlier message must not release the producer"
        );

        assert_eq!(queue.fetch_next(false).map(|m| m.int_parm(0)), Some(1));
        done.recv_timeout(RELEASED).expect("released by its own dequeue");
    }

    #[test]
    fn wait_processed_unblocks_lazily_on_next_fetch() {
        let queue = enabled_queue(8);
        let done = post_in_background(&queue, numbered(1, WaitMode::WaitProcessed));
        wait_for_len(&queue, 1);

        queue.fetch_next(false).unwrap();
        assert!(
            done.recv_timeout(STILL_BLOCKED).is_err(),
            "dequeue alone does not complete processing"
        );

        assert_eq!(queue.fetch_next(false), None);
        done.recv_timeout(RELEASED).expect("next fetch signals processed");
    }

    #[test]
    fn complete_processed_unblocks_immediately() {
        let queue = enabled_queue(8);
        let done = post_in_background(&queue, numbered(1, WaitMode::WaitProcessed));
        wait_for_len(&queue, 1);

        queue.fetch_next(false).unwrap();
        assert!(done.recv_timeout(STILL_BLOCKED).is_err());

        queue.complete_processed();
        done.recv_timeout(RELEASED).expect("explicit completion releases the producer");

        // Nothing pending anymore; a second completion is harmless.
        queue.complete_processed();
    }

    #[test]
    fn bounded_wait_received_times_out_and_message_stays_queued() {
        let queue = enabled_queue(8);
        let err = queue
            .post_with_deadline(numbered(9, WaitMode::WaitReceived), Duration::from_millis(20))
            .unwrap_err();
        assert!(matches!(
            err,
            QueueError::Timeout {
                phase: WaitPhase::Received,
                ..
            }
        ));
        assert_eq!(queue.fetch_next(false).map(|m| m.int_parm(0)), Some(9));
    }

    #[test]
    fn bounded_wait_processed_times_out_when_never_completed() {
        let queue = enabled_queue(8);
        let consumer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.fetch_next(true).map(|m| m.int_parm(0)))
        };

        let err = queue
            .post_with_deadline(numbered(3, WaitMode::WaitProcessed), STILL_BLOCKED)
            .unwrap_err();
        assert!(matches!(
            err,
            QueueError::Timeout {
                phase: WaitPhase::Processed,
                ..
            }
        ));
        assert_eq!(consumer.join().unwrap(), Some(3));
        assert!(queue.is_empty());
    }

    #[test]
    fn bounded_wait_processed_succeeds_with_live_consumer() {
        let queue = enabled_queue(8);
        let consumer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || {
                let message = queue.fetch_next(true).unwrap();
                queue.complete_processed();
                message.int_parm(0)
            })
        };

        queue
            .post_with_deadline(numbered(5, WaitMode::WaitProcessed), RELEASED)
            .expect("consumer completes within the deadline");
        assert_eq!(consumer.join().unwrap(), 5);
    }
}

// ============================================================================
// Closing
// ============================================================================

mod close_tests {
    use super::*;

    #[test]
    fn close_releases_waiting_producers() {
        let queue = enabled_queue(8);
        let received = post_in_background(&queue, numbered(1, WaitMode::WaitReceived));
        let processed = post_in_background(&queue, numbered(2, WaitMode::WaitProcessed));
        wait_for_len(&queue, 2);
        assert!(received.recv_timeout(STILL_BLOCKED).is_err());

        queue.close();
        received.recv_timeout(RELEASED).expect("close releases WaitReceived");
        processed.recv_timeout(RELEASED).expect("close releases WaitProcessed");
    }

    #[test]
    fn close_releases_producer_blocked_on_full_queue() {
        let queue = enabled_queue(1);
        queue.post(numbered(0, WaitMode::None));
        let done = post_in_background(&queue, numbered(1, WaitMode::None));
        assert!(done.recv_timeout(STILL_BLOCKED).is_err());

        queue.close();
        done.recv_timeout(RELEASED).expect("close releases backpressure");
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn closed_queue_stays_disabled() {
        let queue = enabled_queue(8);
        queue.close();
        queue.enable(true);

        assert!(queue.is_closed());
        assert!(!queue.is_enabled());
        queue.post(numbered(1, WaitMode::WaitProcessed));
        assert!(queue.is_empty());
    }
}
