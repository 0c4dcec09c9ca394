//! Attention Adapters - External adapters for attention-gate.
//!
//! This crate provides adapters for:
//! - Replaying a directory of recorded frames as a camera
//! - Replaying recorded landmark annotations as a landmark model

pub mod fs;
pub mod landmarks;

pub use fs::{DirectoryCamera, DirectoryStream};
pub use landmarks::{sidecar_provider, SidecarLandmarkModel, SIDECAR_SUFFIX};
