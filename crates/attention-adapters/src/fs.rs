//! Filesystem camera that replays a directory of images as a live stream.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Context;
use attention_core::ports::{AcquisitionError, CameraConstraints, CameraSource, VideoStream};
use attention_core::VideoFrame;
use tracing::{debug, info, warn};

/// Supported image extensions.
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "webp", "tiff", "tif", "gif"];

/// Camera source backed by a directory of recorded frames.
///
/// Files are played in lexicographic order, one per sample. Each stream has
/// a single capture track.
pub struct DirectoryCamera {
    dir: PathBuf,
    looping: bool,
    exhausted: Arc<AtomicBool>,
}

impl DirectoryCamera {
    /// Creates a camera replaying the images in `dir`.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            looping: false,
            exhausted: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Restarts from the first frame after the last one.
    #[must_use]
    pub const fn with_looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    /// Returns the replayed directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns true once a non-looping stream has played its last frame.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.exhausted.load(Ordering::SeqCst)
    }

    /// Lists the frame files in playback order.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be read.
    pub fn frame_paths(&self) -> anyhow::Result<Vec<PathBuf>> {
        let entries = std::fs::read_dir(&self.dir)
            .with_context(|| format!("Failed to read frame directory: {}", self.dir.display()))?;

        let mut files: Vec<PathBuf> = entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && is_supported_image(path))
            .collect();
        files.sort();
        Ok(files)
    }

    /// Number of frames one pass plays.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be read.
    pub fn frame_count(&self) -> anyhow::Result<usize> {
        Ok(self.frame_paths()?.len())
    }
}

impl CameraSource for DirectoryCamera {
    fn request_stream(
        &self,
        constraints: &CameraConstraints,
    ) -> Result<Box<dyn VideoStream>, AcquisitionError> {
        if !self.dir.is_dir() {
            return Err(AcquisitionError::NoDevice(format!(
                "frame directory {} does not exist",
                self.dir.display()
            )));
        }
        let files = self.frame_paths()?;
        let Some(first) = files.first() else {
            return Err(AcquisitionError::NoDevice(format!(
                "no image files in {}",
                self.dir.display()
            )));
        };

        let dimensions = image::image_dimensions(first)
            .with_context(|| format!("Failed to read image header: {}", first.display()))?;
        if dimensions != (constraints.width, constraints.height) {
            debug!(
                "Recorded frames are {}x{}, requested {}x{}",
                dimensions.0, dimensions.1, constraints.width, constraints.height
            );
        }

        info!(
            "Replaying {} frames from {}{}",
            files.len(),
            self.dir.display(),
            if self.looping { " (looping)" } else { "" }
        );
        self.exhausted.store(false, Ordering::SeqCst);

        Ok(Box::new(DirectoryStream {
            label: self.dir.display().to_string(),
            files,
            cursor: 0,
            sequence: 0,
            looping: self.looping,
            dimensions,
            live: true,
            exhausted: Arc::clone(&self.exhausted),
        }))
    }
}

/// Stream over the files of a [`DirectoryCamera`].
pub struct DirectoryStream {
    label: String,
    files: Vec<PathBuf>,
    cursor: usize,
    sequence: u64,
    looping: bool,
    dimensions: (u32, u32),
    live: bool,
    exhausted: Arc<AtomicBool>,
}

impl DirectoryStream {
    fn next_path(&mut self) -> Option<PathBuf> {
        if self.cursor >= self.files.len() {
            if !self.looping {
                self.exhausted.store(true, Ordering::SeqCst);
                return None;
            }
            self.cursor = 0;
        }
        let path = self.files.get(self.cursor).cloned();
        self.cursor += 1;
        path
    }
}

impl VideoStream for DirectoryStream {
    fn label(&self) -> String {
        self.label.clone()
    }

    fn dimensions(&self) -> Option<(u32, u32)> {
        Some(self.dimensions)
    }

    fn next_frame(&mut self) -> Option<VideoFrame> {
        if !self.live {
            return None;
        }
        // Undecodable files are skipped; a full pass of failures yields nothing.
        for _ in 0..self.files.len() {
            let path = self.next_path()?;
            match image::open(&path) {
                Ok(image) => {
                    let frame =
                        VideoFrame::new(self.sequence, path.display().to_string(), image.to_rgb8());
                    self.sequence += 1;
                    return Some(frame);
                }
                Err(e) => warn!("Skipping unreadable frame {}: {e}", path.display()),
            }
        }
        None
    }

    fn stop_tracks(&mut self) {
        if self.live {
            debug!("Stopped replay of {}", self.label);
        }
        self.live = false;
    }

    fn live_tracks(&self) -> usize {
        usize::from(self.live)
    }
}

/// Checks if a path has a supported image extension.
fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .is_some_and(|e| IMAGE_EXTENSIONS.contains(&e.as_str()))
}
