//! Lazily-loaded landmark provider.

use anyhow::Result;
use once_cell::sync::OnceCell;
use tracing::{debug, info};

use crate::domain::VideoFrame;
use crate::ports::{Detection, LandmarkProvider, ModelLoadError};

/// A loaded landmark model that can run detection.
pub trait LandmarkModel: Send + Sync {
    /// Runs detection on one frame.
    ///
    /// # Errors
    ///
    /// Returns an error for a failure confined to this frame.
    fn detect(&self, frame: &VideoFrame) -> Result<Detection>;
}

type Loader<M> = Box<dyn Fn() -> Result<M> + Send + Sync>;

/// A landmark provider that defers loading until the first session asks for it.
///
/// A successful load is cached for the lifetime of the provider. A failed
/// load is not cached, so a later session retries.
pub struct LazyLandmarkProvider<M> {
    name: String,
    loader: Loader<M>,
    model: OnceCell<M>,
}

impl<M: LandmarkModel> LazyLandmarkProvider<M> {
    /// Creates a new lazy provider.
    ///
    /// The model will not be loaded until [`LandmarkProvider::load`] is called.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        loader: impl Fn() -> Result<M> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            loader: Box::new(loader),
            model: OnceCell::new(),
        }
    }

    /// Wraps an already-loaded model.
    #[must_use]
    pub fn loaded(name: impl Into<String>, model: M) -> Self {
        Self {
            name: name.into(),
            loader: Box::new(|| -> Result<M> { anyhow::bail!("model is preloaded") }),
            model: OnceCell::with_value(model),
        }
    }

    /// Gets the model, loading it if necessary.
    ///
    /// # Errors
    ///
    /// Returns an error if the loader fails.
    pub fn get(&self) -> Result<&M> {
        self.model.get_or_try_init(|| {
            debug!("Loading landmark model {}", self.name);
            let model = (self.loader)()?;
            info!("Landmark model {} ready", self.name);
            Ok(model)
        })
    }
}

impl<M: LandmarkModel> LandmarkProvider for LazyLandmarkProvider<M> {
    fn load(&self) -> Result<(), ModelLoadError> {
        self.get().map(|_| ()).map_err(ModelLoadError::from)
    }

    fn is_loaded(&self) -> bool {
        self.model.get().is_some()
    }

    fn detect(&self, frame: &VideoFrame) -> Result<Detection> {
        let model = self
            .model
            .get()
            .ok_or_else(|| anyhow::anyhow!("landmark model {} is not loaded", self.name))?;
        model.detect(frame)
    }
}
