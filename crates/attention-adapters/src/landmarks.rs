//! Landmark model that replays recorded annotations.
//!
//! Each frame `name.png` may have a sidecar `name.landmarks.json` holding
//! either the face landmarks
//!
//! ```json
//! { "boundingBox": { "x": 0, "y": 0, "width": 10, "height": 10 },
//!   "leftEye": [{ "x": 0, "y": 0 }, ...], "rightEye": [...] }
//! ```
//!
//! or `{ "face": null }` when no face was found.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use attention_core::ports::Detection;
use attention_core::{FaceLandmarks, LandmarkModel, LazyLandmarkProvider, VideoFrame};
use serde_json::Value;
use tracing::{debug, info};

/// Suffix identifying sidecar files.
pub const SIDECAR_SUFFIX: &str = ".landmarks.json";

/// Parses one sidecar: a bare face object, or `{"face": ...}` where `null`
/// means no face.
fn parse_sidecar(text: &str) -> Result<Option<FaceLandmarks>> {
    let mut value: Value = serde_json::from_str(text)?;
    if let Some(face) = value.as_object_mut().and_then(|obj| obj.remove("face")) {
        return Ok(serde_json::from_value(face)?);
    }
    Ok(Some(serde_json::from_value(value)?))
}

/// Landmark model answering from sidecar annotation files.
///
/// Frames are matched by the file stem of [`VideoFrame::source`]. A frame
/// without a sidecar is reported as having no face.
pub struct SidecarLandmarkModel {
    entries: HashMap<String, Option<FaceLandmarks>>,
}

impl SidecarLandmarkModel {
    /// Loads every sidecar in `dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be read or any sidecar is
    /// malformed.
    pub fn load(dir: &Path) -> Result<Self> {
        if !dir.is_dir() {
            anyhow::bail!("landmark directory {} does not exist", dir.display());
        }

        let mut entries = HashMap::new();
        let listing = std::fs::read_dir(dir)
            .with_context(|| format!("Failed to read landmark directory: {}", dir.display()))?;

        for entry in listing.flatten() {
            let path = entry.path();
            let Some(stem) = sidecar_stem(&path) else {
                continue;
            };
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let face = parse_sidecar(&text)
                .with_context(|| format!("Malformed landmark file: {}", path.display()))?;
            entries.insert(stem, face);
        }

        info!(
            "Loaded {} landmark annotations from {}",
            entries.len(),
            dir.display()
        );
        Ok(Self { entries })
    }

    /// Number of annotated frames.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no frame is annotated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl LandmarkModel for SidecarLandmarkModel {
    fn detect(&self, frame: &VideoFrame) -> Result<Detection> {
        let stem = Path::new(&frame.source)
            .file_stem()
            .and_then(|s| s.to_str())
            .with_context(|| format!("Frame source has no file name: {}", frame.source))?;

        match self.entries.get(stem) {
            Some(Some(face)) => Ok(Detection::Detected(face.clone())),
            Some(None) => Ok(Detection::NotDetected),
            None => {
                debug!("No landmarks recorded for {}", frame.source);
                Ok(Detection::NotDetected)
            }
        }
    }
}

/// Creates a provider that loads the sidecars in `dir` on first use.
#[must_use]
pub fn sidecar_provider(dir: impl Into<PathBuf>) -> LazyLandmarkProvider<SidecarLandmarkModel> {
    let dir = dir.into();
    let name = format!("sidecar:{}", dir.display());
    LazyLandmarkProvider::new(name, move || SidecarLandmarkModel::load(&dir))
}

/// Returns the frame stem for a sidecar path, or `None` for other files.
fn sidecar_stem(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_str()?;
    let stem = name.strip_suffix(SIDECAR_SUFFIX)?;
    (!stem.is_empty()).then(|| stem.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sidecar_stem() {
        assert_eq!(
            sidecar_stem(Path::new("/rec/frame-001.landmarks.json")).as_deref(),
            Some("frame-001")
        );
        assert_eq!(sidecar_stem(Path::new("/rec/frame-001.json")), None);
        assert_eq!(sidecar_stem(Path::new("/rec/.landmarks.json")), None);
    }

    #[test]
    fn test_sidecar_shapes() {
        let face = parse_sidecar(
            r#"{"boundingBox":{"x":1,"y":2,"width":3,"height":4},"leftEye":[],"rightEye":[]}"#,
        );
        assert!(matches!(face, Ok(Some(_))));

        let wrapped = parse_sidecar(
            r#"{"face":{"boundingBox":{"x":1,"y":2,"width":3,"height":4},"leftEye":[],"rightEye":[]}}"#,
        );
        assert!(matches!(wrapped, Ok(Some(_))));

        assert!(matches!(parse_sidecar(r#"{"face":null}"#), Ok(None)));
        assert!(parse_sidecar(r#"{"leftEye":[]}"#).is_err());
        assert!(parse_sidecar("not json").is_err());
    }
}
