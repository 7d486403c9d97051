//! depthkit capture - posed depth frames from several sources
//!
//! This crate provides implementations of the [`DepthSource`] trait:
//!
//! - [`SyntheticScene`]: a procedural room rendered from a swaying camera
//! - [`RecordedSource`]: a directory of PNG frames plus `manifest.json`
//!
//! [`RecordingWriter`] saves any source's frames in the recorded format.
//!
//! ## Example
//!
//! ```ignore
//! use depthkit_capture::{DepthSource, SyntheticScene};
//!
//! let mut source = SyntheticScene::default();
//! while let Some(frame) = source.next_frame()? {
//!     // Feed frame.depth and frame.camera_to_world to the kernel...
//! }
//! ```

mod recorded;
mod source;
mod synthetic;

pub use recorded::{FrameEntry, MANIFEST_FILE, Manifest, RecordedSource, RecordingWriter};
pub use source::{CaptureError, CapturedFrame, DepthSource};
pub use synthetic::{SyntheticConfig, SyntheticScene};
