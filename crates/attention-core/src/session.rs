//! Camera session: exclusive ownership of the live capture stream.

use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, info, warn};

use crate::ports::{
    AcquisitionError, CameraConstraints, CameraSource, ReadySignal, RenderTarget, SharedStream,
};

/// A live camera stream together with the render target it is bound to.
///
/// Dropping the handle stops every capture track and unbinds the target.
pub struct CameraHandle {
    stream: SharedStream,
    target: Option<Arc<dyn RenderTarget>>,
    label: String,
    released: bool,
}

impl CameraHandle {
    fn new(stream: SharedStream, label: String) -> Self {
        Self {
            stream,
            target: None,
            label,
            released: false,
        }
    }

    /// Describes the underlying stream.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Binds the stream to `target` and returns its readiness signal.
    pub fn bind(&mut self, target: Arc<dyn RenderTarget>) -> ReadySignal {
        let ready = target.bind(Arc::clone(&self.stream));
        self.target = Some(target);
        ready
    }

    /// Stops every track and unbinds the target. Later calls do nothing.
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;

        let remaining = {
            let mut stream = self.stream.lock().unwrap_or_else(PoisonError::into_inner);
            stream.stop_tracks();
            stream.live_tracks()
        };
        if remaining > 0 {
            warn!("{} tracks still live after stop on {}", remaining, self.label);
        }
        if let Some(target) = self.target.take() {
            target.unbind();
        }
        debug!("Released camera {}", self.label);
    }
}

impl Drop for CameraHandle {
    fn drop(&mut self) {
        self.release();
    }
}

/// Owner of at most one [`CameraHandle`] per detection session.
pub struct CameraSession {
    source: Arc<dyn CameraSource>,
    handle: Mutex<Option<CameraHandle>>,
}

impl CameraSession {
    /// Creates a session that acquires from `source`.
    #[must_use]
    pub fn new(source: Arc<dyn CameraSource>) -> Self {
        Self {
            source,
            handle: Mutex::new(None),
        }
    }

    /// Acquires a stream and binds it to `target`, returning the readiness
    /// signal of the bound surface.
    ///
    /// The session lock is not held while the source negotiates the stream,
    /// so [`release`](Self::release) never waits on a slow device.
    ///
    /// # Errors
    ///
    /// Returns [`AcquisitionError::AlreadyActive`] if a handle is already
    /// held, or the source's error if no device grants access.
    pub fn acquire(
        &self,
        constraints: &CameraConstraints,
        target: Arc<dyn RenderTarget>,
    ) -> Result<ReadySignal, AcquisitionError> {
        if self.is_active() {
            return Err(AcquisitionError::AlreadyActive);
        }

        let stream = self.source.request_stream(constraints)?;
        let label = stream.label();
        info!(
            "Acquired camera {} (requested {}x{}, {:?})",
            label, constraints.width, constraints.height, constraints.facing
        );

        let mut handle = CameraHandle::new(Arc::new(Mutex::new(stream)), label);
        let ready = handle.bind(target);

        let mut slot = self.handle.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_some() {
            // Dropping `handle` releases the stream we just opened.
            return Err(AcquisitionError::AlreadyActive);
        }
        *slot = Some(handle);
        Ok(ready)
    }

    /// Releases the handle if one is held. Returns true if this call released it.
    pub fn release(&self) -> bool {
        let handle = self
            .handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        handle.is_some_and(|mut handle| {
            handle.release();
            true
        })
    }

    /// Returns true while a handle is held.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}
