//! Mock collaborators sharing one call log, so tests can assert the global
//! order of context, backend and sink calls.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use headtrack_core::WorkerConfig;
use headtrack_hal::{
    Capabilities, ContextManager, HostSink, NativeWindow, Pose, SessionBackend, SessionParams,
};

/// One recorded collaborator call.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    CreateContext,
    CreateSurface(usize),
    DestroySurface,
    DestroyContext,
    Initialize,
    EnterSession(u32),
    LeaveSession(u32),
    PredictedPose(u64),
    Shutdown,
    Started,
    Error(String),
    Pose,
    Key(i32, i32),
    Touch(i32),
    Detached,
}

#[derive(Clone, Default)]
pub struct CallLog {
    calls: Arc<Mutex<Vec<Call>>>,
}

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Calls excluding pose sampling, which depends on timing.
    pub fn lifecycle_calls(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| !matches!(c, Call::PredictedPose(_) | Call::Pose))
            .collect()
    }

    pub fn count(&self, call: &Call) -> usize {
        self.calls().iter().filter(|c| *c == call).count()
    }

    pub fn clear(&self) {
        self.calls.lock().unwrap().clear();
    }

    pub fn position(&self, call: &Call) -> Option<usize> {
        self.lifecycle_calls().iter().position(|c| c == call)
    }
}

pub struct MockContext {
    pub log: CallLog,
    pub fail_surface: bool,
    pub fail_destroy_surface: bool,
}

#[derive(Debug)]
pub struct MockError(pub &'static str);

impl core::fmt::Display for MockError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl ContextManager for MockContext {
    type Error = MockError;

    fn create_context(&mut self) -> Result<(), Self::Error> {
        self.log.push(Call::CreateContext);
        Ok(())
    }

    fn create_surface(&mut self, window: &NativeWindow) -> Result<(), Self::Error> {
        self.log.push(Call::CreateSurface(window.handle));
        if self.fail_surface {
            return Err(MockError("no surface for you"));
        }
        Ok(())
    }

    fn destroy_surface(&mut self) -> Result<(), Self::Error> {
        self.log.push(Call::DestroySurface);
        if self.fail_destroy_surface {
            return Err(MockError("surface still bound"));
        }
        Ok(())
    }

    fn destroy_context(&mut self) -> Result<(), Self::Error> {
        self.log.push(Call::DestroyContext);
        Ok(())
    }
}

pub struct MockBackend {
    pub log: CallLog,
    pub fail_init: bool,
    pub fail_enter: bool,
    next_session: u32,
}

pub const TEST_CAPABILITIES: Capabilities = Capabilities {
    fov_x: 90.0,
    fov_y: 90.0,
    interpupillary_distance: 0.0635,
};

impl SessionBackend for MockBackend {
    type Session = u32;
    type Error = MockError;

    fn initialize(&mut self) -> Result<(), Self::Error> {
        self.log.push(Call::Initialize);
        if self.fail_init {
            return Err(MockError("initialization refused"));
        }
        Ok(())
    }

    fn enter_session(&mut self, _params: &SessionParams) -> Result<Self::Session, Self::Error> {
        self.next_session += 1;
        self.log.push(Call::EnterSession(self.next_session));
        if self.fail_enter {
            return Err(MockError("display busy"));
        }
        Ok(self.next_session)
    }

    fn leave_session(&mut self, session: Self::Session) {
        self.log.push(Call::LeaveSession(session));
    }

    fn predicted_pose(&mut self, _session: &Self::Session, frame_index: u64) -> Pose {
        self.log.push(Call::PredictedPose(frame_index));
        Pose {
            timestamp: frame_index as f64 * 0.016,
            ..Pose::default()
        }
    }

    fn capabilities(&self) -> Capabilities {
        TEST_CAPABILITIES
    }

    fn shutdown(&mut self) {
        self.log.push(Call::Shutdown);
    }
}

pub struct RecordingSink {
    pub log: CallLog,
}

impl HostSink for RecordingSink {
    fn on_started(&self, _capabilities: &Capabilities) {
        self.log.push(Call::Started);
    }

    fn on_error(&self, message: &str) {
        self.log.push(Call::Error(message.to_string()));
    }

    fn on_pose(&self, _pose: &Pose) {
        self.log.push(Call::Pose);
    }

    fn on_key(&self, key_code: i32, action: i32) {
        self.log.push(Call::Key(key_code, action));
    }

    fn on_touch(&self, action: i32, _x: f32, _y: f32) {
        self.log.push(Call::Touch(action));
    }

    fn on_detached(&self) {
        self.log.push(Call::Detached);
    }
}

pub fn mocks(log: &CallLog) -> (MockContext, MockBackend) {
    (
        MockContext {
            log: log.clone(),
            fail_surface: false,
            fail_destroy_surface: false,
        },
        MockBackend {
            log: log.clone(),
            fail_init: false,
            fail_enter: false,
            next_session: 0,
        },
    )
}

pub fn landscape_window() -> NativeWindow {
    NativeWindow::new(0x1000, 1920, 1080)
}

pub fn fast_config() -> WorkerConfig {
    WorkerConfig {
        frame_interval: Duration::from_millis(1),
        ..WorkerConfig::default()
    }
}

/// Poll `condition` until it holds or two seconds pass.
pub fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(1));
    }
    condition()
}
