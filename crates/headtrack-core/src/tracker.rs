//! Caller-thread front end: turns lifecycle calls into queued messages.

use std::sync::Arc;
use std::thread::JoinHandle;

use headtrack_hal::{ContextManager, HostSink, NativeWindow, SessionBackend};

use crate::config::WorkerConfig;
use crate::error::WorkerError;
use crate::listeners::{HeadTrackingData, TrackingListener, TrackingListeners};
use crate::message::{Message, MessageTag, WaitMode};
use crate::queue::MessageQueue;
use crate::worker::spawn_worker;

/// Owns the queue and the worker thread for one tracking session.
///
/// Every lifecycle call except input events waits until the worker has
/// processed it. Dropping a running tracker stops it.
pub struct HeadTracker {
    queue: Arc<MessageQueue>,
    worker: Option<JoinHandle<u64>>,
    listeners: Arc<TrackingListeners>,
    window: Option<NativeWindow>,
}

impl HeadTracker {
    /// Spawn the worker and post `Start`.
    pub fn start<C, B>(context: C, backend: B, config: WorkerConfig) -> Result<Self, WorkerError>
    where
        C: ContextManager + Send + 'static,
        B: SessionBackend + Send + 'static,
    {
        let queue = Arc::new(MessageQueue::with_capacity(
            config.queue_capacity,
            config.post_retry_delay,
        )?);
        let listeners = Arc::new(TrackingListeners::new());
        let sink: Arc<dyn HostSink> = listeners.clone();

        let worker = spawn_worker(context, backend, sink, Arc::clone(&queue), &config)?;

        queue.enable(true);
        queue.post(Message::new(MessageTag::Start, WaitMode::WaitProcessed));
        log::info!("Head tracker started");

        Ok(Self {
            queue,
            worker: Some(worker),
            listeners,
            window: None,
        })
    }

    pub fn resume(&self) {
        self.post_processed(MessageTag::Resume);
    }

    pub fn pause(&self) {
        self.post_processed(MessageTag::Pause);
    }

    /// Report the current window: `Some` on surface creation or change, `None`
    /// on destruction.
    ///
    /// Reporting the window already in use posts nothing. A different window
    /// posts `SurfaceDestroyed` for the old one before `SurfaceCreated`.
    pub fn set_window(&mut self, window: Option<NativeWindow>) {
        if self.window == window {
            return;
        }
        if self.window.take().is_some() {
            self.post_processed(MessageTag::SurfaceDestroyed);
        }
        if let Some(window) = window {
            if window.is_portrait() {
                log::warn!(
                    "Surface not in landscape mode ({}x{})",
                    window.width,
                    window.height
                );
            }
            self.window = Some(window);
            self.queue
                .post(Message::surface_created(&window, WaitMode::WaitProcessed));
        }
    }

    pub fn window(&self) -> Option<NativeWindow> {
        self.window
    }

    pub fn key_event(&self, key_code: i32, action: i32) {
        self.queue.post(Message::key_event(key_code, action));
    }

    pub fn touch_event(&self, action: i32, x: f32, y: f32) {
        self.queue.post(Message::touch_event(action, x, y));
    }

    /// Register a listener. Returns false if it was already registered.
    pub fn add_listener(&self, listener: Arc<dyn TrackingListener>) -> bool {
        self.listeners.add(listener)
    }

    pub fn remove_listener(&self, listener: &Arc<dyn TrackingListener>) -> bool {
        self.listeners.remove(listener)
    }

    pub fn clear_listeners(&self) {
        self.listeners.clear();
    }

    /// Latest data reported by the worker, including the most recent pose.
    pub fn data(&self) -> HeadTrackingData {
        self.listeners.data()
    }

    pub fn has_started(&self) -> bool {
        self.listeners.data().started
    }

    pub fn error_message(&self) -> String {
        self.listeners.data().error_message
    }

    /// Stop the worker and wait for it to exit.
    ///
    /// Returns the number of messages the worker handled.
    pub fn stop(mut self) -> Result<u64, WorkerError> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Result<u64, WorkerError> {
        let Some(worker) = self.worker.take() else {
            return Ok(0);
        };

        if worker.is_finished() || self.queue.is_closed() {
            log::warn!("Worker thread exited before Stop");
            self.window = None;
        } else {
            if self.window.is_some() {
                self.set_window(None);
            }
            self.post_processed(MessageTag::Stop);
        }
        self.queue.enable(false);

        let handled = worker.join().map_err(|_| WorkerError::Panicked)?;
        log::info!("Head tracker stopped");
        Ok(handled)
    }

    fn post_processed(&self, tag: MessageTag) {
        self.queue.post(Message::new(tag, WaitMode::WaitProcessed));
    }
}

impl Drop for HeadTracker {
    fn drop(&mut self) {
        if let Err(err) = self.shutdown() {
            log::error!("Head tracker shutdown failed: {err}");
        }
    }
}
