//! Collaborator boundary for the head-tracking worker.
//!
//! The worker thread owns one [`ContextManager`] and one [`SessionBackend`] and
//! reports everything it learns through a [`HostSink`]. None of these are ever
//! touched from the caller thread.

use glam::{Quat, Vec3};

/// Opaque platform window the drawable surface is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NativeWindow {
    /// Platform handle, pointer-sized. Never dereferenced by the worker.
    pub handle: usize,
    pub width: i32,
    pub height: i32,
}

impl NativeWindow {
    pub fn new(handle: usize, width: i32, height: i32) -> Self {
        Self {
            handle,
            width,
            height,
        }
    }

    /// Returns true if the window is taller than it is wide.
    ///
    /// Relaunched apps can get a portrait surface first, which is replaced
    /// almost immediately by a landscape one.
    pub fn is_portrait(&self) -> bool {
        self.width < self.height
    }
}

/// Parameters handed to the backend when a session is entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionParams {
    pub window: NativeWindow,
    pub cpu_level: i32,
    pub gpu_level: i32,
}

/// Device capabilities reported once a session has started.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Capabilities {
    /// Horizontal field of view, degrees.
    pub fov_x: f32,
    /// Vertical field of view, degrees.
    pub fov_y: f32,
    /// Interpupillary distance, meters.
    pub interpupillary_distance: f32,
}

/// Predicted rigid-body head state at a given absolute time.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Pose {
    /// Absolute time of the pose, seconds.
    pub timestamp: f64,
    pub orientation: Quat,
    pub linear_velocity: Vec3,
    pub angular_velocity: Vec3,
    pub linear_acceleration: Vec3,
    pub angular_acceleration: Vec3,
}

impl Default for Pose {
    fn default() -> Self {
        Self {
            timestamp: 0.0,
            orientation: Quat::IDENTITY,
            linear_velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            linear_acceleration: Vec3::ZERO,
            angular_acceleration: Vec3::ZERO,
        }
    }
}

/// Manages the graphics context and the drawable surface bound to a window.
pub trait ContextManager {
    type Error: core::fmt::Debug + core::fmt::Display;

    /// Create the graphics context. Called once when the worker starts.
    fn create_context(&mut self) -> Result<(), Self::Error>;

    /// Create the drawable surface for `window`.
    fn create_surface(&mut self, window: &NativeWindow) -> Result<(), Self::Error>;

    /// Destroy the drawable surface created by [`create_surface`](Self::create_surface).
    fn destroy_surface(&mut self) -> Result<(), Self::Error>;

    /// Release the graphics context. Called once during teardown.
    fn destroy_context(&mut self) -> Result<(), Self::Error>;
}

/// Manages the tracking session and head-pose prediction.
pub trait SessionBackend {
    /// Handle to an active session.
    type Session;
    type Error: core::fmt::Debug + core::fmt::Display;

    /// Initialize the backend. A failure here is fatal for every later session.
    fn initialize(&mut self) -> Result<(), Self::Error>;

    /// Enter a session bound to the current surface.
    fn enter_session(&mut self, params: &SessionParams) -> Result<Self::Session, Self::Error>;

    /// Leave a session previously returned by [`enter_session`](Self::enter_session).
    fn leave_session(&mut self, session: Self::Session);

    /// Predict the head pose for the display time of `frame_index`.
    fn predicted_pose(&mut self, session: &Self::Session, frame_index: u64) -> Pose;

    /// Device capabilities (field of view, interpupillary distance).
    fn capabilities(&self) -> Capabilities;

    /// Shut the backend down. Called once during teardown.
    fn shutdown(&mut self);
}

/// Receives notifications from the worker thread.
///
/// Implementations are called from the worker thread, and `on_error` may also be
/// called from the caller thread when the worker cannot be spawned.
pub trait HostSink: Send + Sync {
    /// A session was entered for the first time.
    fn on_started(&self, capabilities: &Capabilities);

    /// Something failed. The worker never retries on its own.
    fn on_error(&self, message: &str);

    /// A new predicted pose is available.
    fn on_pose(&self, pose: &Pose);

    fn on_key(&self, _key_code: i32, _action: i32) {}

    fn on_touch(&self, _action: i32, _x: f32, _y: f32) {}

    /// The worker has torn down and is about to exit.
    fn on_detached(&self) {}
}
