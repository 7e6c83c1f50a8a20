//! Listener registry and latest tracking data, fed by the worker thread.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use headtrack_hal::{Capabilities, HostSink, Pose};

/// Snapshot of everything the worker has reported so far.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeadTrackingData {
    pub capabilities: Capabilities,
    /// Most recently predicted pose.
    pub pose: Pose,
    pub started: bool,
    /// Last error reported, empty if none.
    pub error_message: String,
}

/// Receives head tracking events. All methods default to no-ops.
pub trait TrackingListener: Send + Sync {
    fn started(&self, _data: &HeadTrackingData) {}

    fn error(&self, _message: &str) {}

    fn updated(&self, _data: &HeadTrackingData) {}

    fn key(&self, _key_code: i32, _action: i32) {}

    fn touch(&self, _action: i32, _x: f32, _y: f32) {}
}

/// [`HostSink`] that records the latest data and fans events out to listeners.
///
/// The listener list is copied before each notification, so a listener may
/// add or remove listeners from inside a callback.
#[derive(Default)]
pub struct TrackingListeners {
    data: Mutex<HeadTrackingData>,
    listeners: Mutex<Vec<Arc<dyn TrackingListener>>>,
}

fn same_listener(a: &Arc<dyn TrackingListener>, b: &Arc<dyn TrackingListener>) -> bool {
    Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
}

impl TrackingListeners {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `listener`. Returns false if it was already registered.
    pub fn add(&self, listener: Arc<dyn TrackingListener>) -> bool {
        let mut listeners = self.lock_listeners();
        if listeners.iter().any(|l| same_listener(l, &listener)) {
            return false;
        }
        listeners.push(listener);
        true
    }

    /// Unregister `listener`. Returns false if it was not registered.
    pub fn remove(&self, listener: &Arc<dyn TrackingListener>) -> bool {
        let mut listeners = self.lock_listeners();
        let before = listeners.len();
        listeners.retain(|l| !same_listener(l, listener));
        listeners.len() != before
    }

    pub fn clear(&self) {
        self.lock_listeners().clear();
    }

    pub fn len(&self) -> usize {
        self.lock_listeners().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of the latest data.
    pub fn data(&self) -> HeadTrackingData {
        self.lock_data().clone()
    }

    fn snapshot(&self) -> Vec<Arc<dyn TrackingListener>> {
        self.lock_listeners().clone()
    }

    fn lock_data(&self) -> MutexGuard<'_, HeadTrackingData> {
        self.data.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_listeners(&self) -> MutexGuard<'_, Vec<Arc<dyn TrackingListener>>> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl HostSink for TrackingListeners {
    fn on_started(&self, capabilities: &Capabilities) {
        let data = {
            let mut data = self.lock_data();
            data.capabilities = *capabilities;
            data.started = true;
            data.clone()
        };
        for listener in self.snapshot() {
            listener.started(&data);
        }
    }

    fn on_error(&self, message: &str) {
        self.lock_data().error_message = message.to_string();
        for listener in self.snapshot() {
            listener.error(message);
        }
    }

    fn on_pose(&self, pose: &Pose) {
        let data = {
            let mut data = self.lock_data();
            data.pose = *pose;
            data.clone()
        };
        for listener in self.snapshot() {
            listener.updated(&data);
        }
    }

    fn on_key(&self, key_code: i32, action: i32) {
        for listener in self.snapshot() {
            listener.key(key_code, action);
        }
    }

    fn on_touch(&self, action: i32, x: f32, y: f32) {
        for listener in self.snapshot() {
            listener.touch(action, x, y);
        }
    }
}
