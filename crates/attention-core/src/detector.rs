//! Detection loop: camera acquisition, model loading, and the per-frame cycle.
//!
//! A [`Detector`] holds the collaborators. Each call to [`Detector::start`]
//! creates an independent [`DetectionSession`] owned by the caller, backed by
//! one worker thread that runs the whole lifecycle:
//!
//! ```text
//! Idle -> AcquiringCamera -> [LoadingModel] -> Running -> Stopped
//!              \                  \               \
//!               +------------------+---------------+--> Failed(reason)
//! ```
//!
//! Cycles run one after another on the worker, so a new frame is never
//! sampled while an inference call is outstanding.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use std::thread::{self, ThreadId};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use tracing::{debug, error, info, info_span, warn};

use crate::domain::{
    DetectionError, DetectionFrame, FailureReason, LoopState, StartError, VideoFrame,
};
use crate::features::compute_ear;
use crate::ports::{
    CameraConstraints, CameraSource, Detection, FrameClock, LandmarkProvider, RefreshClock,
    RenderTarget, ResultSink,
};
use crate::scheduler::{spawn_thread, wait_cancellable, wait_for, CancellationToken, Rearm, Wait};
use crate::session::CameraSession;
use crate::tracker::{classify, DEFAULT_EAR_THRESHOLD};

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// Configuration for a detection session.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectorConfig {
    /// Averaged EAR must be strictly above this for eyes to count as open.
    pub ear_threshold: f32,

    /// Requested camera parameters.
    pub constraints: CameraConstraints,

    /// How long the render target may take to become ready.
    pub ready_timeout: Duration,

    /// Consecutive failed cycles that end the session. `None` keeps the
    /// session running through any number of per-frame failures.
    pub max_consecutive_failures: Option<u32>,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            ear_threshold: DEFAULT_EAR_THRESHOLD,
            constraints: CameraConstraints::default(),
            ready_timeout: Duration::from_secs(5),
            max_consecutive_failures: None,
        }
    }
}

impl DetectorConfig {
    /// Sets the EAR threshold.
    #[must_use]
    pub const fn with_ear_threshold(mut self, threshold: f32) -> Self {
        self.ear_threshold = threshold;
        self
    }

    /// Sets the requested camera parameters.
    #[must_use]
    pub const fn with_constraints(mut self, constraints: CameraConstraints) -> Self {
        self.constraints = constraints;
        self
    }

    /// Sets the render target readiness timeout.
    #[must_use]
    pub const fn with_ready_timeout(mut self, timeout: Duration) -> Self {
        self.ready_timeout = timeout;
        self
    }

    /// Ends the session after `limit` consecutive failed cycles.
    #[must_use]
    pub const fn with_max_consecutive_failures(mut self, limit: Option<u32>) -> Self {
        self.max_consecutive_failures = limit;
        self
    }

    fn validate(&self) -> Result<(), StartError> {
        if !self.ear_threshold.is_finite() || !(0.0..=1.0).contains(&self.ear_threshold) {
            return Err(StartError::InvalidThreshold(self.ear_threshold));
        }
        if self.constraints.width == 0 || self.constraints.height == 0 {
            return Err(StartError::InvalidConstraints);
        }
        Ok(())
    }
}

/// Factory for detection sessions sharing one camera source and one
/// landmark provider.
pub struct Detector {
    camera: Arc<dyn CameraSource>,
    provider: Arc<dyn LandmarkProvider>,
    clock: Arc<dyn FrameClock>,
    config: DetectorConfig,
}

impl Detector {
    /// Creates a detector with the default configuration and a 60 Hz clock.
    #[must_use]
    pub fn new(camera: Arc<dyn CameraSource>, provider: Arc<dyn LandmarkProvider>) -> Self {
        Self {
            camera,
            provider,
            clock: Arc::new(RefreshClock::default()),
            config: DetectorConfig::default(),
        }
    }

    /// Replaces the frame clock.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn FrameClock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replaces the configuration.
    #[must_use]
    pub fn with_config(mut self, config: DetectorConfig) -> Self {
        self.config = config;
        self
    }

    /// Returns the active configuration.
    #[must_use]
    pub const fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Starts a session rendering into `target` and reporting to `sink`.
    ///
    /// Only malformed input is rejected here. Camera and model failures are
    /// reported asynchronously as a single error frame on `sink`.
    ///
    /// # Errors
    ///
    /// Returns a [`StartError`] if the target is detached, the configuration
    /// is invalid, or the worker thread cannot be spawned.
    pub fn start(
        &self,
        target: Arc<dyn RenderTarget>,
        sink: impl ResultSink + 'static,
    ) -> Result<DetectionSession, StartError> {
        if !target.is_attached() {
            return Err(StartError::TargetDetached);
        }
        self.config.validate()?;

        let id = NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed);
        let cancel = CancellationToken::new();
        let shared = Arc::new(Shared {
            id,
            state: Mutex::new(LoopState::Idle),
            camera: CameraSession::new(Arc::clone(&self.camera)),
            emitter: Emitter::new(Box::new(sink), cancel.clone()),
            cancel,
            worker: OnceLock::new(),
        });

        let (done_tx, done_rx) = crossbeam_channel::bounded(0);
        let worker = Worker {
            shared: Arc::clone(&shared),
            target,
            provider: Arc::clone(&self.provider),
            clock: Arc::clone(&self.clock),
            config: self.config.clone(),
            _done: done_tx,
        };

        spawn_thread(format!("attention-session-{id}"), move || worker.run())
            .map_err(|e| StartError::WorkerSpawn(e.to_string()))?;

        Ok(DetectionSession {
            shared,
            done: done_rx,
        })
    }
}

/// A running detection session, owned by the caller.
///
/// Dropping the session stops it.
pub struct DetectionSession {
    shared: Arc<Shared>,
    done: Receiver<()>,
}

impl DetectionSession {
    /// Process-unique session identifier.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.shared.id
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> LoopState {
        self.shared.state()
    }

    /// Returns true while the per-frame cycle is active.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state() == LoopState::Running
    }

    /// Number of frames delivered to the sink so far.
    #[must_use]
    pub fn frames_emitted(&self) -> u64 {
        self.shared.emitter.emitted()
    }

    /// Stops the session.
    ///
    /// Cancels any pending tick or readiness wait, releases the camera, and
    /// unregisters the sink. An inference call still in flight is not waited
    /// for; its result is discarded. No frame is delivered after this returns.
    /// Calling it again is a no-op.
    pub fn stop(&self) {
        let stopped = self.shared.transition(LoopState::Stopped);
        self.shared.cancel.cancel();
        if self.shared.camera.release() {
            debug!("Session {} released camera on stop", self.shared.id);
        }
        // Inside the sink callback the worker holds the sink lock; it clears
        // the registration itself once the callback returns.
        if self.shared.worker.get() != Some(&thread::current().id()) {
            self.shared.emitter.clear();
        }
        if stopped {
            info!("Detection session {} stopped", self.shared.id);
        }
    }

    /// Waits until the worker thread has finished.
    ///
    /// Returns false if it is still running after `timeout`.
    pub fn wait(&self, timeout: Duration) -> bool {
        matches!(
            self.done.recv_timeout(timeout),
            Err(RecvTimeoutError::Disconnected)
        )
    }
}

impl Drop for DetectionSession {
    fn drop(&mut self) {
        self.stop();
    }
}

/// State shared between the caller's session handle and the worker.
struct Shared {
    id: u64,
    state: Mutex<LoopState>,
    camera: CameraSession,
    emitter: Emitter,
    cancel: CancellationToken,
    worker: OnceLock<ThreadId>,
}

impl Shared {
    fn state(&self) -> LoopState {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Moves to `next` if the state machine allows it.
    fn transition(&self, next: LoopState) -> bool {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if !state.can_transition_to(&next) {
            return false;
        }
        debug!(
            "Session {}: {} -> {}",
            self.id,
            state.label(),
            next.label()
        );
        *state = next;
        true
    }

    /// Ends the session with a fatal startup error.
    fn fail(&self, err: &DetectionError) {
        let reason = match err {
            DetectionError::CameraUnavailable(msg) => FailureReason::CameraUnavailable(msg.clone()),
            DetectionError::ModelLoadFailed(msg) => FailureReason::ModelLoadFailed(msg.clone()),
            other => FailureReason::InferenceFailed(other.to_string()),
        };
        self.end_with(reason, err.to_string());
    }

    /// Moves to `Failed`, releases the camera, then reports exactly one
    /// error frame carrying `message`.
    fn end_with(&self, reason: FailureReason, message: String) {
        if !self.transition(LoopState::Failed(reason)) {
            return;
        }
        error!("Detection session {} failed: {}", self.id, message);
        self.camera.release();
        self.emitter.emit(DetectionFrame::error(message));
    }
}

/// Delivers frames to the registered sink until the session is cancelled.
struct Emitter {
    sink: Mutex<Option<Box<dyn ResultSink>>>,
    cancel: CancellationToken,
    emitted: AtomicU64,
}

impl Emitter {
    fn new(sink: Box<dyn ResultSink>, cancel: CancellationToken) -> Self {
        Self {
            sink: Mutex::new(Some(sink)),
            cancel,
            emitted: AtomicU64::new(0),
        }
    }

    /// Delivers `frame` unless the session was cancelled. The cancellation
    /// check and the delivery happen under the same lock `clear` takes.
    #[allow(clippy::significant_drop_tightening)]
    fn emit(&self, frame: DetectionFrame) -> bool {
        let guard = self.sink.lock().unwrap_or_else(PoisonError::into_inner);
        if self.cancel.is_cancelled() {
            return false;
        }
        let Some(sink) = guard.as_ref() else {
            return false;
        };
        sink.on_frame(frame);
        self.emitted.fetch_add(1, Ordering::SeqCst);
        true
    }

    fn clear(&self) {
        self.sink
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    fn emitted(&self) -> u64 {
        self.emitted.load(Ordering::SeqCst)
    }
}

/// Startup ended without reaching `Running`.
enum Abort {
    Cancelled,
    Failed(DetectionError),
}

/// Everything the worker thread owns for the lifetime of a session.
struct Worker {
    shared: Arc<Shared>,
    target: Arc<dyn RenderTarget>,
    provider: Arc<dyn LandmarkProvider>,
    clock: Arc<dyn FrameClock>,
    config: DetectorConfig,
    // Dropped when the worker exits, which wakes `DetectionSession::wait`.
    _done: Sender<()>,
}

impl Worker {
    fn run(self) {
        let _ = self.shared.worker.set(thread::current().id());
        let span = info_span!("detection.session", id = self.shared.id);
        let _guard = span.enter();

        match self.startup() {
            Ok(()) => self.run_cycles(),
            Err(Abort::Cancelled) => debug!("Session cancelled during startup"),
            Err(Abort::Failed(err)) => self.shared.fail(&err),
        }

        self.shared.camera.release();
        self.shared.emitter.clear();
        debug!("Session worker exiting in state {}", self.shared.state().label());
    }

    fn startup(&self) -> Result<(), Abort> {
        let cancel = &self.shared.cancel;

        if !self.shared.transition(LoopState::AcquiringCamera) {
            return Err(Abort::Cancelled);
        }

        let ready = self
            .shared
            .camera
            .acquire(&self.config.constraints, Arc::clone(&self.target))
            .map_err(|e| Abort::Failed(DetectionError::CameraUnavailable(e.to_string())))?;
        if cancel.is_cancelled() {
            return Err(Abort::Cancelled);
        }

        match wait_for(&ready, self.config.ready_timeout, cancel) {
            Wait::Ready(Ok(())) => debug!("Render target ready"),
            Wait::Ready(Err(reason)) => {
                return Err(Abort::Failed(DetectionError::CameraUnavailable(reason)));
            }
            Wait::TimedOut => {
                return Err(Abort::Failed(DetectionError::CameraUnavailable(format!(
                    "video surface not ready after {} ms",
                    self.config.ready_timeout.as_millis()
                ))));
            }
            Wait::Disconnected => {
                return Err(Abort::Failed(DetectionError::CameraUnavailable(
                    "render target closed before becoming ready".into(),
                )));
            }
            Wait::Cancelled => return Err(Abort::Cancelled),
        }

        if !self.provider.is_loaded() {
            if !self.shared.transition(LoopState::LoadingModel) {
                return Err(Abort::Cancelled);
            }
            self.load_model()?;
        }

        if self.shared.transition(LoopState::Running) {
            info!("Detection running");
            Ok(())
        } else {
            Err(Abort::Cancelled)
        }
    }

    /// Loads the model on a helper thread so that stopping the session does
    /// not wait for a slow download.
    fn load_model(&self) -> Result<(), Abort> {
        let (tx, rx) = crossbeam_channel::bounded(1);
        let provider = Arc::clone(&self.provider);
        spawn_thread("landmark-model-load", move || {
            let _ = tx.send(provider.load());
        })
        .map_err(|e| Abort::Failed(DetectionError::ModelLoadFailed(e.to_string())))?;

        match wait_cancellable(&rx, &self.shared.cancel) {
            Wait::Ready(Ok(())) => Ok(()),
            Wait::Ready(Err(e)) => Err(Abort::Failed(DetectionError::ModelLoadFailed(e.0))),
            Wait::Disconnected => Err(Abort::Failed(DetectionError::ModelLoadFailed(
                "model loader exited without a result".into(),
            ))),
            Wait::Cancelled | Wait::TimedOut => Err(Abort::Cancelled),
        }
    }

    fn run_cycles(&self) {
        let rearm = Rearm::new(self.clock.ticks(), self.shared.cancel.clone());
        let mut consecutive_failures = 0u32;

        while rearm.next_tick().is_some() {
            let Some(frame) = self.target.sample() else {
                continue;
            };
            let sequence = frame.sequence;
            let result = self.process(&frame);

            if self.shared.cancel.is_cancelled() {
                debug!("Discarding result for frame {} after stop", sequence);
                break;
            }

            match result {
                Ok(detection) => {
                    consecutive_failures = 0;
                    self.shared.emitter.emit(detection);
                }
                Err(err) => {
                    consecutive_failures = consecutive_failures.saturating_add(1);
                    warn!("Frame {} failed: {}", sequence, err);

                    if self
                        .config
                        .max_consecutive_failures
                        .is_some_and(|limit| consecutive_failures >= limit)
                    {
                        let reason = FailureReason::InferenceFailed(format!(
                            "{consecutive_failures} consecutive frames failed (last: {err})"
                        ));
                        let message = reason.to_string();
                        self.shared.end_with(reason, message);
                        break;
                    }
                    self.shared.emitter.emit(DetectionFrame::error(err.to_string()));
                }
            }
        }

        // The tick source closed without a stop request.
        if !self.shared.cancel.is_cancelled() && self.shared.transition(LoopState::Stopped) {
            info!("Frame clock closed, detection session {} stopped", self.shared.id);
        }
    }

    /// Runs the landmark provider on one frame and derives the eye state.
    fn process(&self, frame: &VideoFrame) -> Result<DetectionFrame, DetectionError> {
        let detection = self
            .provider
            .detect(frame)
            .map_err(|e| DetectionError::TransientInference(format!("{e:#}")))?;

        let face = match detection {
            Detection::NotDetected => return Ok(DetectionFrame::no_signal()),
            Detection::Detected(face) => face,
        };

        let (left, right) = face.eyes()?;
        let left_ear = compute_ear(&left)?;
        let right_ear = compute_ear(&right)?;
        let eyes_open = classify(left_ear, right_ear, self.config.ear_threshold);

        debug!(
            "Frame {}: left_ear={:.3}, right_ear={:.3}, open={}",
            frame.sequence, left_ear, right_ear, eyes_open
        );

        Ok(DetectionFrame::detected(
            left_ear,
            right_ear,
            eyes_open,
            face.bounding_box,
        ))
    }
}
