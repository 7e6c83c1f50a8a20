//! Listener that logs tracking callbacks.

use std::sync::atomic::{AtomicU64, Ordering};

use headtrack_core::{HeadTrackingData, TrackingListener};

/// Logs start, error and input callbacks, plus every `pose_every`-th pose.
pub struct LoggingListener {
    pose_every: u64,
    poses: AtomicU64,
}

impl LoggingListener {
    pub fn new(pose_every: u64) -> Self {
        Self {
            pose_every: pose_every.max(1),
            poses: AtomicU64::new(0),
        }
    }

    pub fn poses(&self) -> u64 {
        self.poses.load(Ordering::Relaxed)
    }
}

impl TrackingListener for LoggingListener {
    fn started(&self, data: &HeadTrackingData) {
        let caps = &data.capabilities;
        log::info!(
            "tracking started: fov {}x{} deg, ipd {:.4} m",
            caps.fov_x,
            caps.fov_y,
            caps.interpupillary_distance
        );
    }

    fn error(&self, message: &str) {
        log::error!("tracking error: {message}");
    }

    fn updated(&self, data: &HeadTrackingData) {
        let n = self.poses.fetch_add(1, Ordering::Relaxed) + 1;
        if n % self.pose_every == 0 {
            let (axis, angle) = data.pose.orientation.to_axis_angle();
            log::info!(
                "pose #{n}: t={:.3}s rotation {:.1} deg about {axis:?}",
                data.pose.timestamp,
                angle.to_degrees()
            );
        }
    }

    fn key(&self, key_code: i32, action: i32) {
        log::info!("key {key_code} action {action}");
    }

    fn touch(&self, action: i32, x: f32, y: f32) {
        log::info!("touch action {action} at ({x}, {y})");
    }
}
