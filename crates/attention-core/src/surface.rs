//! In-memory render target backed directly by the bound stream.

use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use tracing::{debug, warn};

use crate::domain::VideoFrame;
use crate::ports::{ReadySignal, RenderTarget, SharedStream};
use crate::scheduler::spawn_thread;

/// Render target that samples frames straight from the bound stream.
///
/// Readiness is reported once the stream exposes its dimensions, which is
/// the point a browser video element would fire its metadata event.
pub struct FrameSurface {
    name: String,
    attached: bool,
    bound: Mutex<Option<SharedStream>>,
    poll_interval: Duration,
}

impl FrameSurface {
    /// Creates an attached surface.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attached: true,
            bound: Mutex::new(None),
            poll_interval: Duration::from_millis(10),
        }
    }

    /// Creates a surface that is not attached to any display, which
    /// `Detector::start` rejects.
    #[must_use]
    pub fn detached(name: impl Into<String>) -> Self {
        Self {
            attached: false,
            ..Self::new(name)
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

    fn current(&self) -> Option<SharedStream> {
        self.bound
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl RenderTarget for FrameSurface {
    fn is_attached(&self) -> bool {
        self.attached
    }

    fn bind(&self, stream: SharedStream) -> ReadySignal {
        let (tx, rx) = crossbeam_channel::bounded(1);
        *self.bound.lock().unwrap_or_else(PoisonError::into_inner) = Some(Arc::clone(&stream));

        let has_metadata = stream
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .dimensions()
            .is_some();
        if has_metadata {
            let _ = tx.send(Ok(()));
            return rx;
        }

        // Poll until the stream reports metadata or is released.
        let weak = Arc::downgrade(&stream);
        drop(stream);
        let interval = self.poll_interval;
        let spawned = spawn_thread(format!("{}-ready", self.name), move || {
            while let Some(stream) = weak.upgrade() {
                let dims = stream
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .dimensions();
                drop(stream);
                if let Some((w, h)) = dims {
                    debug!("Surface ready at {}x{}", w, h);
                    let _ = tx.send(Ok(()));
                    return;
                }
                thread::sleep(interval);
            }
        });
        if let Err(e) = spawned {
            warn!("Failed to spawn readiness watcher: {e}");
        }
        rx
    }

    fn sample(&self) -> Option<VideoFrame> {
        let stream = self.current()?;
        let mut stream = stream.lock().unwrap_or_else(PoisonError::into_inner);
        stream.next_frame()
    }

    fn unbind(&self) {
        if self
            .bound
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .is_some()
        {
            debug!("Unbound surface {}", self.name);
        }
    }
}
