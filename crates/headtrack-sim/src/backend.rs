//! Simulated session backend: a head turning at a constant yaw rate.

use std::time::{Duration, Instant};

use glam::{Quat, Vec3};
use headtrack_hal::{Capabilities, Pose, SessionBackend, SessionParams};

/// How far ahead of "now" each pose is predicted.
const PREDICTION_AHEAD: Duration = Duration::from_millis(16);

pub const SIM_CAPABILITIES: Capabilities = Capabilities {
    fov_x: 90.0,
    fov_y: 90.0,
    interpupillary_distance: 0.0635,
};

#[derive(Debug)]
pub struct SimBackendError(String);

impl core::fmt::Display for SimBackendError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Active simulated session.
pub struct SimSession {
    id: u32,
    entered: Instant,
}

pub struct SimBackend {
    /// Radians per second around +Y.
    yaw_rate: f32,
    fail_init: bool,
    sessions_entered: u32,
}

impl SimBackend {
    pub fn new(yaw_rate: f32, fail_init: bool) -> Self {
        Self {
            yaw_rate,
            fail_init,
            sessions_entered: 0,
        }
    }
}

impl SessionBackend for SimBackend {
    type Session = SimSession;
    type Error = SimBackendError;

    fn initialize(&mut self) -> Result<(), Self::Error> {
        if self.fail_init {
            return Err(SimBackendError("simulated initialization error".to_string()));
        }
        log::info!("sim: backend initialized");
        Ok(())
    }

    fn enter_session(&mut self, params: &SessionParams) -> Result<Self::Session, Self::Error> {
        self.sessions_entered += 1;
        log::info!(
            "sim: session {} entered (cpu level {}, gpu level {})",
            self.sessions_entered,
            params.cpu_level,
            params.gpu_level
        );
        Ok(SimSession {
            id: self.sessions_entered,
            entered: Instant::now(),
        })
    }

    fn leave_session(&mut self, session: Self::Session) {
        log::info!(
            "sim: session {} left after {:?}",
            session.id,
            session.entered.elapsed()
        );
    }

    fn predicted_pose(&mut self, session: &Self::Session, frame_index: u64) -> Pose {
        let t = (session.entered.elapsed() + PREDICTION_AHEAD).as_secs_f64();
        let yaw = self.yaw_rate * t as f32;
        log::trace!("sim: frame {frame_index} yaw {yaw:.3}");
        Pose {
            timestamp: t,
            orientation: Quat::from_rotation_y(yaw),
            angular_velocity: Vec3::Y * self.yaw_rate,
            ..Pose::default()
        }
    }

    fn capabilities(&self) -> Capabilities {
        SIM_CAPABILITIES
    }

    fn shutdown(&mut self) {
        log::info!("sim: backend shut down after {} sessions", self.sessions_entered);
    }
}
