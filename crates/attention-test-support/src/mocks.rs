//! Mock implementations of core port traits.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use attention_core::ports::{
    AcquisitionError, CameraConstraints, CameraSource, Detection, FrameClock, LandmarkProvider,
    ModelLoadError, ReadySignal, RenderTarget, ResultSink, SharedStream, VideoStream,
};
use attention_core::{DetectionFrame, VideoFrame};
use crossbeam_channel::{Receiver, Sender};

use crate::builders::SyntheticFrame;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Access {
    Grant,
    PermissionDenied,
    NoDevice,
}

/// Mock implementation of `CameraSource` for testing.
///
/// Every stream it hands out has one capture track. Live tracks are counted
/// across all streams, so tests can assert that nothing leaked.
#[derive(Clone)]
pub struct MockCameraSource {
    access: Access,
    delay: Option<Duration>,
    metadata: bool,
    live_tracks: Arc<AtomicUsize>,
    streams_opened: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<CameraConstraints>>>,
}

impl MockCameraSource {
    /// Creates a source that grants every request.
    #[must_use]
    pub fn new() -> Self {
        Self {
            access: Access::Grant,
            delay: None,
            metadata: true,
            live_tracks: Arc::new(AtomicUsize::new(0)),
            streams_opened: Arc::new(AtomicUsize::new(0)),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Creates a source that refuses permission.
    #[must_use]
    pub fn denied() -> Self {
        Self {
            access: Access::PermissionDenied,
            ..Self::new()
        }
    }

    /// Creates a source with no devices.
    #[must_use]
    pub fn no_device() -> Self {
        Self {
            access: Access::NoDevice,
            ..Self::new()
        }
    }

    /// Delays every request by `delay`, simulating a slow permission prompt.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Hands out streams that never report their dimensions.
    #[must_use]
    pub fn without_metadata(mut self) -> Self {
        self.metadata = false;
        self
    }

    /// Number of capture tracks still live across every stream.
    #[must_use]
    pub fn live_tracks(&self) -> usize {
        self.live_tracks.load(Ordering::SeqCst)
    }

    /// Number of streams handed out so far.
    #[must_use]
    pub fn streams_opened(&self) -> usize {
        self.streams_opened.load(Ordering::SeqCst)
    }

    /// Constraints of every request received so far.
    #[must_use]
    pub fn requests(&self) -> Vec<CameraConstraints> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Default for MockCameraSource {
    fn default() -> Self {
        Self::new()
    }
}

impl CameraSource for MockCameraSource {
    fn request_stream(
        &self,
        constraints: &CameraConstraints,
    ) -> Result<Box<dyn VideoStream>, AcquisitionError> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(*constraints);
        if let Some(delay) = self.delay {
            thread::sleep(delay);
        }
        match self.access {
            Access::PermissionDenied => Err(AcquisitionError::PermissionDenied),
            Access::NoDevice => Err(AcquisitionError::NoDevice("no mock devices".into())),
            Access::Grant => {
                let index = self.streams_opened.fetch_add(1, Ordering::SeqCst);
                self.live_tracks.fetch_add(1, Ordering::SeqCst);
                Ok(Box::new(MockStream {
                    label: format!("mock-camera-{index}"),
                    width: constraints.width,
                    height: constraints.height,
                    metadata: self.metadata,
                    sequence: 0,
                    tracks: 1,
                    live_total: Arc::clone(&self.live_tracks),
                }))
            }
        }
    }
}

/// Stream handed out by [`MockCameraSource`].
///
/// Dropping it without calling `stop_tracks` leaves its track counted as
/// live, the way an unreleased device stays on.
pub struct MockStream {
    label: String,
    width: u32,
    height: u32,
    metadata: bool,
    sequence: u64,
    tracks: usize,
    live_total: Arc<AtomicUsize>,
}

impl VideoStream for MockStream {
    fn label(&self) -> String {
        self.label.clone()
    }

    fn dimensions(&self) -> Option<(u32, u32)> {
        self.metadata.then_some((self.width, self.height))
    }

    fn next_frame(&mut self) -> Option<VideoFrame> {
        if self.tracks == 0 {
            return None;
        }
        let frame = SyntheticFrame::gray(self.sequence, self.width.min(64), self.height.min(48));
        self.sequence += 1;
        Some(frame)
    }

    fn stop_tracks(&mut self) {
        if self.tracks > 0 {
            self.live_total.fetch_sub(self.tracks, Ordering::SeqCst);
            self.tracks = 0;
        }
    }

    fn live_tracks(&self) -> usize {
        self.tracks
    }
}

/// How a [`MockRenderTarget`] reports readiness after a bind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness {
    /// Ready as soon as a stream is bound.
    Immediate,
    /// Never becomes ready.
    Never,
    /// Reports the given failure.
    Fail(String),
}

/// Mock implementation of `RenderTarget` for testing.
pub struct MockRenderTarget {
    attached: bool,
    readiness: Readiness,
    bound: Mutex<Option<SharedStream>>,
    pending: Mutex<Vec<Sender<Result<(), String>>>>,
    binds: AtomicUsize,
    unbinds: AtomicUsize,
    samples: AtomicUsize,
}

impl MockRenderTarget {
    /// Creates an attached target that is ready immediately.
    #[must_use]
    pub fn new() -> Self {
        Self::with_readiness(Readiness::Immediate)
    }

    /// Creates an attached target with the given readiness behavior.
    #[must_use]
    pub fn with_readiness(readiness: Readiness) -> Self {
        Self {
            attached: true,
            readiness,
            bound: Mutex::new(None),
            pending: Mutex::new(Vec::new()),
            binds: AtomicUsize::new(0),
            unbinds: AtomicUsize::new(0),
            samples: AtomicUsize::new(0),
        }
    }

    /// Creates a target that is not attached to any surface.
    #[must_use]
    pub fn detached() -> Self {
        Self {
            attached: false,
            ..Self::new()
        }
    }

    /// Returns true while a stream is bound.
    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.bound
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Number of `bind` calls.
    #[must_use]
    pub fn bind_count(&self) -> usize {
        self.binds.load(Ordering::SeqCst)
    }

    /// Number of `unbind` calls.
    #[must_use]
    pub fn unbind_count(&self) -> usize {
        self.unbinds.load(Ordering::SeqCst)
    }

    /// Number of `sample` calls.
    #[must_use]
    pub fn sample_count(&self) -> usize {
        self.samples.load(Ordering::SeqCst)
    }
}

impl Default for MockRenderTarget {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderTarget for MockRenderTarget {
    fn is_attached(&self) -> bool {
        self.attached
    }

    fn bind(&self, stream: SharedStream) -> ReadySignal {
        self.binds.fetch_add(1, Ordering::SeqCst);
        *self.bound.lock().unwrap_or_else(PoisonError::into_inner) = Some(stream);

        let (tx, rx) = crossbeam_channel::bounded(1);
        match &self.readiness {
            Readiness::Immediate => {
                let _ = tx.send(Ok(()));
            }
            Readiness::Fail(reason) => {
                let _ = tx.send(Err(reason.clone()));
            }
            Readiness::Never => self
                .pending
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(tx),
        }
        rx
    }

    fn sample(&self) -> Option<VideoFrame> {
        self.samples.fetch_add(1, Ordering::SeqCst);
        let stream = self
            .bound
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()?;
        let mut stream = stream.lock().unwrap_or_else(PoisonError::into_inner);
        stream.next_frame()
    }

    fn unbind(&self) {
        self.unbinds.fetch_add(1, Ordering::SeqCst);
        self.bound
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }
}

/// Mock implementation of `LandmarkProvider` for testing.
///
/// Returns scripted results in order, then repeats the fallback.
pub struct MockLandmarkProvider {
    loaded: AtomicBool,
    load_error: Option<String>,
    load_delay: Option<Duration>,
    load_calls: AtomicUsize,
    script: Mutex<VecDeque<Result<Detection, String>>>,
    fallback: Result<Detection, String>,
    detect_calls: AtomicUsize,
    entered: (Sender<u64>, Receiver<u64>),
    gate: Mutex<Option<Receiver<()>>>,
}

impl MockLandmarkProvider {
    /// Creates a loaded provider that never finds a face.
    #[must_use]
    pub fn new() -> Self {
        Self {
            loaded: AtomicBool::new(true),
            load_error: None,
            load_delay: None,
            load_calls: AtomicUsize::new(0),
            script: Mutex::new(VecDeque::new()),
            fallback: Ok(Detection::NotDetected),
            detect_calls: AtomicUsize::new(0),
            entered: crossbeam_channel::unbounded(),
            gate: Mutex::new(None),
        }
    }

    /// Creates a provider that must be loaded before use.
    #[must_use]
    pub fn unloaded() -> Self {
        Self {
            loaded: AtomicBool::new(false),
            ..Self::new()
        }
    }

    /// Makes every load attempt fail with `message`.
    #[must_use]
    pub fn with_load_failure(mut self, message: impl Into<String>) -> Self {
        self.loaded = AtomicBool::new(false);
        self.load_error = Some(message.into());
        self
    }

    /// Delays every load attempt by `delay`.
    #[must_use]
    pub fn with_load_delay(mut self, delay: Duration) -> Self {
        self.load_delay = Some(delay);
        self
    }

    /// Queues results returned by successive `detect` calls.
    #[must_use]
    pub fn with_detections(self, results: Vec<Result<Detection, String>>) -> Self {
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(results);
        self
    }

    /// Sets the result returned once the script is exhausted.
    #[must_use]
    pub fn with_fallback(mut self, result: Result<Detection, String>) -> Self {
        self.fallback = result;
        self
    }

    /// Blocks every `detect` call until the returned gate lets it through.
    #[must_use]
    pub fn hold_detections(&self) -> DetectGate {
        let (tx, rx) = crossbeam_channel::bounded(0);
        *self.gate.lock().unwrap_or_else(PoisonError::into_inner) = Some(rx);
        DetectGate { release: tx }
    }

    /// Waits until a `detect` call starts, returning its frame sequence.
    #[must_use]
    pub fn wait_for_detect(&self, timeout: Duration) -> Option<u64> {
        self.entered.1.recv_timeout(timeout).ok()
    }

    /// Number of `load` calls.
    #[must_use]
    pub fn load_calls(&self) -> usize {
        self.load_calls.load(Ordering::SeqCst)
    }

    /// Number of `detect` calls.
    #[must_use]
    pub fn detect_calls(&self) -> usize {
        self.detect_calls.load(Ordering::SeqCst)
    }
}

impl Default for MockLandmarkProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl LandmarkProvider for MockLandmarkProvider {
    fn load(&self) -> Result<(), ModelLoadError> {
        self.load_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.load_delay {
            thread::sleep(delay);
        }
        if let Some(message) = &self.load_error {
            return Err(ModelLoadError(message.clone()));
        }
        self.loaded.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::SeqCst)
    }

    fn detect(&self, frame: &VideoFrame) -> anyhow::Result<Detection> {
        self.detect_calls.fetch_add(1, Ordering::SeqCst);
        let _ = self.entered.0.send(frame.sequence);

        let gate = self
            .gate
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(gate) = gate {
            let _ = gate.recv();
        }

        let next = self
            .script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());
        next.map_err(|message| anyhow::anyhow!(message))
    }
}

/// Holds `detect` calls of a [`MockLandmarkProvider`].
///
/// Dropping the gate lets every held and future call through.
pub struct DetectGate {
    release: Sender<()>,
}

impl DetectGate {
    /// Lets one held `detect` call through, waiting up to `timeout` for one
    /// to arrive.
    pub fn release_one(&self, timeout: Duration) -> bool {
        self.release.send_timeout((), timeout).is_ok()
    }
}

/// Frame clock that ticks only when the test asks it to.
pub struct ManualClock {
    tx: Mutex<Option<Sender<Instant>>>,
    rx: Receiver<Instant>,
}

impl ManualClock {
    /// Creates a clock with no pending ticks.
    #[must_use]
    pub fn new() -> Self {
        let (tx, rx) = crossbeam_channel::bounded(0);
        Self {
            tx: Mutex::new(Some(tx)),
            rx,
        }
    }

    /// Delivers one tick to a waiting loop.
    ///
    /// Returns false if no loop picked it up within two seconds.
    pub fn tick(&self) -> bool {
        self.try_tick(Duration::from_secs(2))
    }

    /// Delivers `n` ticks, stopping at the first one not picked up.
    pub fn tick_n(&self, n: usize) -> usize {
        (0..n).take_while(|_| self.tick()).count()
    }

    /// Delivers one tick if a loop is waiting within `timeout`.
    pub fn try_tick(&self, timeout: Duration) -> bool {
        let tx = self
            .tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        tx.is_some_and(|tx| tx.send_timeout(Instant::now(), timeout).is_ok())
    }

    /// Shuts the clock down. Loops waiting on it see the tick source close.
    pub fn close(&self) {
        self.tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameClock for ManualClock {
    fn ticks(&self) -> Receiver<Instant> {
        self.rx.clone()
    }
}

#[derive(Default)]
struct Recorded {
    frames: Mutex<Vec<DetectionFrame>>,
    changed: Condvar,
}

/// Mock implementation of `ResultSink` for testing.
///
/// Clones share the same record, so a test keeps one clone and hands the
/// other to the detector.
#[derive(Clone, Default)]
pub struct RecordingSink {
    inner: Arc<Recorded>,
}

impl RecordingSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all captured frames.
    #[must_use]
    pub fn frames(&self) -> Vec<DetectionFrame> {
        self.inner
            .frames
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of captured frames.
    #[must_use]
    pub fn count(&self) -> usize {
        self.inner
            .frames
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns the most recent frame, if any.
    #[must_use]
    pub fn last(&self) -> Option<DetectionFrame> {
        self.inner
            .frames
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
    }

    /// Waits until at least `n` frames were captured.
    ///
    /// Returns false if `timeout` elapsed first.
    pub fn wait_for(&self, n: usize, timeout: Duration) -> bool {
        let frames = self
            .inner
            .frames
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let (frames, _) = self
            .inner
            .changed
            .wait_timeout_while(frames, timeout, |frames| frames.len() < n)
            .unwrap_or_else(PoisonError::into_inner);
        frames.len() >= n
    }
}

impl ResultSink for RecordingSink {
    fn on_frame(&self, frame: DetectionFrame) {
        self.inner
            .frames
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(frame);
        self.inner.changed.notify_all();
    }
}
