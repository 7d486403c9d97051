//! Recorded sessions on disk.
//!
//! A recording is a directory holding `manifest.json` and one set of PNGs per
//! frame:
//!
//! - depth: 16-bit grayscale, millimeters, `0` = missing
//! - confidence (optional): 8-bit grayscale
//! - color (optional): 8-bit RGB, converted to YUV420 on load
//!
//! Poses are stored as column-major camera-to-world matrices.

use crate::source::{CaptureError, CapturedFrame, DepthSource};
use depthkit_data::{CameraIntrinsics, DepthFrame, YuvImage};
use glam::Mat4;
use image::{GrayImage, ImageBuffer, Luma, RgbImage};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const MANIFEST_FILE: &str = "manifest.json";

/// Top-level `manifest.json` contents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub intrinsics: CameraIntrinsics,
    #[serde(default)]
    pub frame_rate: Option<f32>,
    pub frames: Vec<FrameEntry>,
}

/// One frame of a recording; paths are relative to the recording directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameEntry {
    pub timestamp: f64,
    pub depth: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<PathBuf>,
    pub camera_to_world: [f32; 16],
}

/// Replays a recording directory frame by frame.
#[derive(Debug)]
pub struct RecordedSource {
    root: PathBuf,
    manifest: Manifest,
    cursor: usize,
}

impl RecordedSource {
    /// Open a recording and validate its manifest.
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self, CaptureError> {
        let root = root.as_ref().to_path_buf();
        let manifest_path = root.join(MANIFEST_FILE);
        if !manifest_path.is_file() {
            return Err(CaptureError::NotFound(manifest_path.display().to_string()));
        }

        let manifest: Manifest = serde_json::from_str(&fs::read_to_string(&manifest_path)?)?;
        let k = &manifest.intrinsics;
        if k.width == 0 || k.height == 0 {
            return Err(CaptureError::InvalidManifest(format!(
                "intrinsics describe an empty image ({}x{})",
                k.width, k.height
            )));
        }
        if !(k.fx > 0.0 && k.fy > 0.0) {
            return Err(CaptureError::InvalidManifest(format!(
                "focal length must be positive (fx = {}, fy = {})",
                k.fx, k.fy
            )));
        }
        if let Some(rate) = manifest.frame_rate {
            if !(rate.is_finite() && rate > 0.0) {
                return Err(CaptureError::InvalidManifest(format!(
                    "frame rate must be positive, got {rate}"
                )));
            }
        }

        info!(
            "Opened recording {} ({} frames, {}x{})",
            root.display(),
            manifest.frames.len(),
            k.width,
            k.height
        );
        Ok(Self {
            root,
            manifest,
            cursor: 0,
        })
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn len(&self) -> usize {
        self.manifest.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.manifest.frames.is_empty()
    }

    /// Start replaying from the first frame again.
    pub fn rewind(&mut self) {
        self.cursor = 0;
    }

    /// Load frame `index` without moving the cursor.
    pub fn load(&self, index: usize) -> Result<CapturedFrame, CaptureError> {
        let entry = self.manifest.frames.get(index).ok_or_else(|| {
            CaptureError::InvalidManifest(format!(
                "frame {index} out of range ({} frames)",
                self.len()
            ))
        })?;
        let k = self.manifest.intrinsics;

        let depth_image = image::open(self.root.join(&entry.depth))?.into_luma16();
        if depth_image.dimensions() != k.dimensions() {
            return Err(CaptureError::InvalidManifest(format!(
                "depth image {} is {:?}, intrinsics expect {:?}",
                entry.depth.display(),
                depth_image.dimensions(),
                k.dimensions()
            )));
        }
        let mut depth = DepthFrame::from_millimeters(k.width, k.height, depth_image.as_raw(), k)?
            .with_timestamp(entry.timestamp);

        if let Some(path) = &entry.confidence {
            let confidence = image::open(self.root.join(path))?.into_luma8();
            depth = depth.with_confidence(confidence.into_raw())?;
        }

        let camera_to_world = Mat4::from_cols_array(&entry.camera_to_world);
        if !camera_to_world.is_finite() {
            warn!("Frame {} has a non-finite pose", index);
        }

        let mut frame = CapturedFrame::new(depth, camera_to_world);
        if let Some(path) = &entry.color {
            let rgb = image::open(self.root.join(path))?.into_rgb8();
            frame = frame.with_image(YuvImage::from_rgb(&rgb)?);
        }
        Ok(frame)
    }
}

impl DepthSource for RecordedSource {
    fn next_frame(&mut self) -> Result<Option<CapturedFrame>, CaptureError> {
        if !self.is_active() {
            return Ok(None);
        }
        let frame = self.load(self.cursor)?;
        debug!("Replayed frame {} / {}", self.cursor + 1, self.len());
        self.cursor += 1;
        Ok(Some(frame))
    }

    fn resolution(&self) -> (u32, u32) {
        self.manifest.intrinsics.dimensions()
    }

    fn frame_rate(&self) -> Option<f32> {
        self.manifest.frame_rate
    }

    fn is_active(&self) -> bool {
        self.cursor < self.manifest.frames.len()
    }
}

/// Writes captured frames into a recording directory.
///
/// Frames are written as they arrive; the manifest is written by
/// [`finish`](Self::finish).
#[derive(Debug)]
pub struct RecordingWriter {
    root: PathBuf,
    intrinsics: Option<CameraIntrinsics>,
    frame_rate: Option<f32>,
    frames: Vec<FrameEntry>,
}

impl RecordingWriter {
    pub fn create<P: AsRef<Path>>(root: P) -> Result<Self, CaptureError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            intrinsics: None,
            frame_rate: None,
            frames: Vec::new(),
        })
    }

    pub fn with_frame_rate(mut self, frame_rate: Option<f32>) -> Self {
        self.frame_rate = frame_rate;
        self
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Append one frame. All frames must share the first frame's intrinsics.
    pub fn write(&mut self, frame: &CapturedFrame) -> Result<(), CaptureError> {
        let k = *frame.depth.intrinsics();
        match self.intrinsics {
            None => self.intrinsics = Some(k),
            Some(first) if first != k => {
                return Err(CaptureError::InvalidManifest(
                    "frames in one recording must share intrinsics".to_string(),
                ));
            }
            Some(_) => {}
        }

        let index = self.frames.len();
        let (w, h) = frame.depth.dimensions();

        let depth_mm: Vec<u16> = frame
            .depth
            .depth()
            .iter()
            .map(|&z| (z * 1000.0).round().clamp(0.0, u16::MAX as f32) as u16)
            .collect();
        let depth_path = PathBuf::from(format!("depth_{index:05}.png"));
        let depth_image: ImageBuffer<Luma<u16>, Vec<u16>> = ImageBuffer::from_raw(w, h, depth_mm)
            .ok_or_else(|| CaptureError::InvalidManifest("depth buffer size".to_string()))?;
        depth_image.save(self.root.join(&depth_path))?;

        let confidence = match frame.depth.confidence() {
            Some(values) => {
                let path = PathBuf::from(format!("confidence_{index:05}.png"));
                let image = GrayImage::from_raw(w, h, values.to_vec()).ok_or_else(|| {
                    CaptureError::InvalidManifest("confidence buffer size".to_string())
                })?;
                image.save(self.root.join(&path))?;
                Some(path)
            }
            None => None,
        };

        let color = match &frame.image {
            Some(yuv) => {
                let path = PathBuf::from(format!("color_{index:05}.png"));
                to_rgb_image(yuv).save(self.root.join(&path))?;
                Some(path)
            }
            None => None,
        };

        self.frames.push(FrameEntry {
            timestamp: frame.timestamp(),
            depth: depth_path,
            confidence,
            color,
            camera_to_world: frame.camera_to_world.to_cols_array(),
        });
        Ok(())
    }

    /// Write the manifest and return its path.
    pub fn finish(self) -> Result<PathBuf, CaptureError> {
        let intrinsics = self.intrinsics.ok_or_else(|| {
            CaptureError::InvalidManifest("cannot finish an empty recording".to_string())
        })?;
        let manifest = Manifest {
            intrinsics,
            frame_rate: self.frame_rate,
            frames: self.frames,
        };
        let path = self.root.join(MANIFEST_FILE);
        fs::write(&path, serde_json::to_string_pretty(&manifest)?)?;
        info!(
            "Wrote recording {} ({} frames)",
            self.root.display(),
            manifest.frames.len()
        );
        Ok(path)
    }
}

fn to_rgb_image(yuv: &YuvImage) -> RgbImage {
    RgbImage::from_fn(yuv.width(), yuv.height(), |x, y| {
        let rgb = yuv.rgb_at(x, y) * 255.0;
        image::Rgb([rgb.x, rgb.y, rgb.z].map(|c| c.round().clamp(0.0, 255.0) as u8))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synthetic::{SyntheticConfig, SyntheticScene};
    use glam::Vec3;
    use tempfile::tempdir;

    fn scene() -> SyntheticScene {
        SyntheticScene::new(SyntheticConfig {
            depth_width: 32,
            depth_height: 24,
            color_size: Some((64, 48)),
            frame_count: Some(3),
            ..SyntheticConfig::default()
        })
    }

    #[test]
    fn test_missing_manifest_is_not_found() {
        let dir = tempdir().unwrap();
        let err = RecordedSource::open(dir.path()).unwrap_err();
        assert!(matches!(err, CaptureError::NotFound(_)));
    }

    #[test]
    fn test_rejects_empty_intrinsics() {
        let dir = tempdir().unwrap();
        let manifest = r#"{
            "intrinsics": { "fx": 1.0, "fy": 1.0, "cx": 0.0, "cy": 0.0, "width": 0, "height": 4 },
            "frames": []
        }"#;
        fs::write(dir.path().join(MANIFEST_FILE), manifest).unwrap();
        let err = RecordedSource::open(dir.path()).unwrap_err();
        assert!(matches!(err, CaptureError::InvalidManifest(_)));
    }

    #[test]
    fn test_rejects_non_positive_frame_rate() {
        let dir = tempdir().unwrap();
        for rate in ["0.0", "-30.0"] {
            let manifest = format!(
                r#"{{
                "intrinsics": {{ "fx": 1.0, "fy": 1.0, "cx": 0.0, "cy": 0.0, "width": 2, "height": 2 }},
                "frame_rate": {rate},
                "frames": []
            }}"#
            );
            fs::write(dir.path().join(MANIFEST_FILE), manifest).unwrap();
            let err = RecordedSource::open(dir.path()).unwrap_err();
            assert!(matches!(err, CaptureError::InvalidManifest(_)), "rate {rate}");
        }
    }

    #[test]
    fn test_round_trip_synthetic_session() {
        let dir = tempdir().unwrap();
        let mut source = scene();
        let mut writer = RecordingWriter::create(dir.path())
            .unwrap()
            .with_frame_rate(source.frame_rate());
        let mut originals = Vec::new();
        while let Some(frame) = source.next_frame().unwrap() {
            writer.write(&frame).unwrap();
            originals.push(frame);
        }
        writer.finish().unwrap();

        let mut replay = RecordedSource::open(dir.path()).unwrap();
        assert_eq!(replay.len(), 3);
        assert_eq!(replay.resolution(), (32, 24));
        assert_eq!(replay.frame_rate(), Some(30.0));

        for original in &originals {
            let frame = replay.next_frame().unwrap().unwrap();
            assert_eq!(frame.timestamp(), original.timestamp());
            assert_eq!(frame.camera_to_world, original.camera_to_world);
            // Millimeter storage is lossless for millimeter input.
            assert_eq!(frame.depth.depth(), original.depth.depth());
            assert_eq!(frame.depth.confidence(), original.depth.confidence());
            assert_eq!(frame.image.as_ref().unwrap().dimensions(), (64, 48));
        }
        assert!(replay.next_frame().unwrap().is_none());

        replay.rewind();
        assert!(replay.is_active());
    }

    #[test]
    fn test_depth_png_is_millimeters() {
        let dir = tempdir().unwrap();
        let k = CameraIntrinsics::centered(2.0, 2, 2);
        let raw: Vec<u16> = vec![0, 500, 1000, 65535];
        ImageBuffer::<Luma<u16>, Vec<u16>>::from_raw(2, 2, raw)
            .unwrap()
            .save(dir.path().join("d.png"))
            .unwrap();
        let manifest = Manifest {
            intrinsics: k,
            frame_rate: None,
            frames: vec![FrameEntry {
                timestamp: 1.5,
                depth: "d.png".into(),
                confidence: None,
                color: None,
                camera_to_world: Mat4::from_translation(Vec3::X).to_cols_array(),
            }],
        };
        fs::write(
            dir.path().join(MANIFEST_FILE),
            serde_json::to_string(&manifest).unwrap(),
        )
        .unwrap();

        let frame = RecordedSource::open(dir.path()).unwrap().load(0).unwrap();
        let expected = [0.0, 0.5, 1.0, 65.535];
        for (got, want) in frame.depth.depth().iter().zip(expected) {
            assert!((got - want).abs() < 1e-4, "{got} vs {want}");
        }
        assert_eq!(frame.timestamp(), 1.5);
        assert!(frame.image.is_none());
        assert_eq!(frame.camera_to_world.w_axis.truncate(), Vec3::X);
    }

    #[test]
    fn test_depth_size_must_match_intrinsics() {
        let dir = tempdir().unwrap();
        ImageBuffer::<Luma<u16>, Vec<u16>>::from_raw(3, 1, vec![1, 2, 3])
            .unwrap()
            .save(dir.path().join("d.png"))
            .unwrap();
        let manifest = Manifest {
            intrinsics: CameraIntrinsics::centered(2.0, 2, 2),
            frame_rate: None,
            frames: vec![FrameEntry {
                timestamp: 0.0,
                depth: "d.png".into(),
                confidence: None,
                color: None,
                camera_to_world: Mat4::IDENTITY.to_cols_array(),
            }],
        };
        fs::write(
            dir.path().join(MANIFEST_FILE),
            serde_json::to_string(&manifest).unwrap(),
        )
        .unwrap();

        let err = RecordedSource::open(dir.path()).unwrap().load(0).unwrap_err();
        assert!(matches!(err, CaptureError::InvalidManifest(_)));
    }
}
