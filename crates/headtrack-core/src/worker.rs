//! Worker thread: drains the lifecycle queue and keeps surface and session in
//! step with the latest `resumed` / window facts.
//!
//! The worker is the only owner of the context manager and the session backend.
//! While no session is active it sleeps in [`MessageQueue::fetch_next`]; while a
//! session is active it drains the queue without blocking, samples one pose per
//! frame and sleeps for the frame interval.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use headtrack_hal::{ContextManager, HostSink, NativeWindow, Pose, SessionBackend, SessionParams};

use crate::config::WorkerConfig;
use crate::error::WorkerError;
use crate::message::{Message, MessageTag};
use crate::queue::MessageQueue;

/// Resource state derived from the surface and session handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No surface, no session.
    Idle,
    /// Surface present, no session.
    SurfaceOnly,
    /// Surface present and session active.
    Active,
}

/// Reconciliation state machine over the two external resources.
///
/// Inputs are `resumed` and the current window. [`reconcile`](Self::reconcile)
/// performs the minimal acquire/release sequence and makes no collaborator call
/// when inputs did not change since the last run.
pub struct Reconciler<C: ContextManager, B: SessionBackend> {
    context: C,
    backend: B,
    sink: Arc<dyn HostSink>,
    cpu_level: i32,
    gpu_level: i32,
    resumed: bool,
    window: Option<NativeWindow>,
    surface: bool,
    session: Option<B::Session>,
    started_notified: bool,
    context_created: bool,
    /// Set when the context or backend failed to come up; no session is ever entered.
    failed: bool,
}

impl<C: ContextManager, B: SessionBackend> Reconciler<C, B> {
    pub fn new(context: C, backend: B, sink: Arc<dyn HostSink>, config: &WorkerConfig) -> Self {
        Self {
            context,
            backend,
            sink,
            cpu_level: config.cpu_level,
            gpu_level: config.gpu_level,
            resumed: false,
            window: None,
            surface: false,
            session: None,
            started_notified: false,
            context_created: false,
            failed: false,
        }
    }

    /// Bring up the backend and the graphics context.
    ///
    /// Failures are reported through the sink and leave the reconciler unable to
    /// enter sessions. It keeps accepting messages so producers are never stuck.
    pub fn start(&mut self) -> Result<(), WorkerError> {
        if let Err(err) = self.backend.initialize() {
            return Err(self.fail(WorkerError::BackendInit(err.to_string())));
        }
        if let Err(err) = self.context.create_context() {
            return Err(self.fail(WorkerError::BackendInit(format!(
                "graphics context creation failed: {err}"
            ))));
        }
        self.context_created = true;
        Ok(())
    }

    fn fail(&mut self, err: WorkerError) -> WorkerError {
        log::error!("{err}");
        self.sink.on_error(&err.to_string());
        self.failed = true;
        err
    }

    pub fn set_resumed(&mut self, resumed: bool) {
        self.resumed = resumed;
    }

    pub fn set_window(&mut self, window: Option<NativeWindow>) {
        self.window = window;
    }

    pub fn is_resumed(&self) -> bool {
        self.resumed
    }

    pub fn window(&self) -> Option<NativeWindow> {
        self.window
    }

    pub fn has_failed(&self) -> bool {
        self.failed
    }

    pub fn is_session_active(&self) -> bool {
        self.session.is_some()
    }

    pub fn state(&self) -> SessionState {
        match (self.surface, self.session.is_some()) {
            (_, true) => SessionState::Active,
            (true, false) => SessionState::SurfaceOnly,
            (false, false) => SessionState::Idle,
        }
    }

    /// Apply one lifecycle message to the inputs. Returns true for `Stop`.
    ///
    /// Input events are forwarded to the sink and do not touch the inputs.
    pub fn apply(&mut self, message: &Message) -> bool {
        match message.tag {
            MessageTag::Start => {}
            MessageTag::Resume => self.resumed = true,
            MessageTag::Pause => self.resumed = false,
            MessageTag::Stop => return true,
            MessageTag::SurfaceCreated => self.window = Some(message.window()),
            MessageTag::SurfaceDestroyed => self.window = None,
            MessageTag::KeyEvent => self.sink.on_key(message.int_parm(0), message.int_parm(1)),
            MessageTag::TouchEvent => {
                self.sink
                    .on_touch(message.int_parm(0), message.float_parm(1), message.float_parm(2))
            }
        }
        false
    }

    /// Bring surface and session in line with the inputs.
    ///
    /// Order is fixed: surface creation before session entry, session exit
    /// before surface destruction.
    pub fn reconcile(&mut self) {
        if self.failed {
            return;
        }

        if let (Some(window), false) = (self.window, self.surface) {
            match self.context.create_surface(&window) {
                Ok(()) => {
                    log::debug!("Surface created for window {:#x}", window.handle);
                    self.surface = true;
                }
                Err(err) => self.report(&format!("Surface creation failed: {err}")),
            }
        }

        let wanted = self.resumed && self.window.is_some();
        if wanted && self.surface && self.session.is_none() {
            self.enter_session();
        } else if !wanted {
            if let Some(session) = self.session.take() {
                self.backend.leave_session(session);
                log::info!("Session left");
            }
        }

        if self.window.is_none() && self.surface {
            match self.context.destroy_surface() {
                Ok(()) => log::debug!("Surface destroyed"),
                Err(err) => self.report(&format!("Surface destruction failed: {err}")),
            }
            self.surface = false;
        }
    }

    fn enter_session(&mut self) {
        let Some(window) = self.window else {
            return;
        };
        let params = SessionParams {
            window,
            cpu_level: self.cpu_level,
            gpu_level: self.gpu_level,
        };
        match self.backend.enter_session(&params) {
            Ok(session) => {
                log::info!("Session entered");
                self.session = Some(session);
                if !self.started_notified {
                    self.started_notified = true;
                    let capabilities = self.backend.capabilities();
                    log::info!(
                        "Tracking started: fov={}x{}, ipd={}",
                        capabilities.fov_x,
                        capabilities.fov_y,
                        capabilities.interpupillary_distance
                    );
                    self.sink.on_started(&capabilities);
                }
            }
            Err(err) => self.report(&format!("Entering session failed: {err}")),
        }
    }

    fn report(&self, message: &str) {
        log::error!("{message}");
        self.sink.on_error(message);
    }

    /// Predict the pose for `frame_index` and push it to the sink.
    ///
    /// Returns `None` without a session.
    pub fn sample_pose(&mut self, frame_index: u64) -> Option<Pose> {
        let session = self.session.as_ref()?;
        let pose = self.backend.predicted_pose(session, frame_index);
        self.sink.on_pose(&pose);
        Some(pose)
    }

    /// Release everything in reverse order of acquisition.
    pub fn teardown(&mut self) {
        if let Some(session) = self.session.take() {
            self.backend.leave_session(session);
            log::info!("Session left during teardown");
        }
        if self.surface {
            if let Err(err) = self.context.destroy_surface() {
                log::error!("Surface destruction failed during teardown: {err}");
            }
            self.surface = false;
        }
        if self.context_created {
            if let Err(err) = self.context.destroy_context() {
                log::error!("Graphics context destruction failed: {err}");
            }
            self.context_created = false;
        }
        self.backend.shutdown();
        self.sink.on_detached();
    }
}

/// Event loop around a [`Reconciler`] and the queue it drains.
pub struct Worker<C: ContextManager, B: SessionBackend> {
    reconciler: Reconciler<C, B>,
    queue: Arc<MessageQueue>,
    frame_interval: Duration,
    frame_index: u64,
    shutting_down: bool,
    processed: u64,
}

impl<C: ContextManager, B: SessionBackend> Worker<C, B> {
    pub fn new(reconciler: Reconciler<C, B>, queue: Arc<MessageQueue>, config: &WorkerConfig) -> Self {
        Self {
            reconciler,
            queue,
            frame_interval: config.frame_interval,
            frame_index: 0,
            shutting_down: false,
            processed: 0,
        }
    }

    /// Run until a `Stop` message has been handled, then tear down.
    ///
    /// Returns the number of messages handled.
    pub fn run(mut self) -> u64 {
        // Failures are already reported to the sink.
        let _ = self.reconciler.start();
        log::info!("Worker thread running");

        while !self.shutting_down {
            self.drain();

            if self.shutting_down {
                break;
            }
            self.frame_index += 1;
            if self.reconciler.sample_pose(self.frame_index).is_some() {
                thread::sleep(self.frame_interval);
            }
        }

        self.reconciler.teardown();
        self.queue.complete_processed();
        log::info!("Worker thread stopped after {} messages", self.processed);
        self.processed
    }

    /// Handle queued messages, blocking for the first one while no session is active.
    fn drain(&mut self) {
        loop {
            let block = !self.reconciler.is_session_active() && !self.shutting_down;
            let Some(message) = self.queue.fetch_next(block) else {
                break;
            };
            log::debug!("Handling {:?} ({:?})", message.tag, message.wait);

            if self.reconciler.apply(&message) {
                self.shutting_down = true;
            }
            self.reconciler.reconcile();
            self.processed += 1;
            self.queue.complete_processed();
        }
    }
}

/// Closes the queue when the worker thread exits, including by unwinding.
struct CloseOnExit(Arc<MessageQueue>);

impl Drop for CloseOnExit {
    fn drop(&mut self) {
        if thread::panicking() {
            log::error!("Worker thread panicked, closing queue");
        }
        self.0.close();
    }
}

/// Spawn the worker thread.
///
/// The reconciler is built on the worker thread itself, so session handles never
/// cross threads. Spawn failures are reported to `sink` and returned. Once the
/// thread exits, normally or by panic, the queue is closed so no producer stays
/// blocked on it.
pub fn spawn_worker<C, B>(
    context: C,
    backend: B,
    sink: Arc<dyn HostSink>,
    queue: Arc<MessageQueue>,
    config: &WorkerConfig,
) -> Result<JoinHandle<u64>, WorkerError>
where
    C: ContextManager + Send + 'static,
    B: SessionBackend + Send + 'static,
{
    let thread_config = config.clone();
    let thread_sink = Arc::clone(&sink);
    let spawned = thread::Builder::new()
        .name(config.thread_name.clone())
        .spawn(move || {
            let _close = CloseOnExit(Arc::clone(&queue));
            let reconciler = Reconciler::new(context, backend, thread_sink, &thread_config);
            Worker::new(reconciler, queue, &thread_config).run()
        });

    spawned.map_err(|err| {
        let err = WorkerError::Spawn(err);
        log::error!("{err}");
        sink.on_error(&err.to_string());
        err
    })
}
