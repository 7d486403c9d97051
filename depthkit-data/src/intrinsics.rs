//! Pinhole camera intrinsics.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Pinhole intrinsics of a depth image.
///
/// Focal lengths and principal point are in pixels of an image that is
/// `width × height` pixels large.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraIntrinsics {
    /// Focal length along x (pixels).
    pub fx: f32,
    /// Focal length along y (pixels).
    pub fy: f32,
    /// Principal point x (pixels).
    pub cx: f32,
    /// Principal point y (pixels).
    pub cy: f32,
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
}

impl CameraIntrinsics {
    pub fn new(fx: f32, fy: f32, cx: f32, cy: f32, width: u32, height: u32) -> Self {
        Self {
            fx,
            fy,
            cx,
            cy,
            width,
            height,
        }
    }

    /// Intrinsics with square pixels and the principal point at the image centre.
    pub fn centered(focal_length: f32, width: u32, height: u32) -> Self {
        Self::new(
            focal_length,
            focal_length,
            width as f32 / 2.0,
            height as f32 / 2.0,
            width,
            height,
        )
    }

    /// Rescale to another resolution of the same sensor.
    pub fn scaled_to(&self, width: u32, height: u32) -> Self {
        let sx = width as f32 / self.width as f32;
        let sy = height as f32 / self.height as f32;
        Self {
            fx: self.fx * sx,
            fy: self.fy * sy,
            cx: self.cx * sx,
            cy: self.cy * sy,
            width,
            height,
        }
    }

    pub fn focal_length(&self) -> Vec2 {
        Vec2::new(self.fx, self.fy)
    }

    pub fn principal_point(&self) -> Vec2 {
        Vec2::new(self.cx, self.cy)
    }

    /// Pixel at the centre of the image.
    pub fn center_pixel(&self) -> Vec2 {
        Vec2::new(self.width as f32 / 2.0, self.height as f32 / 2.0)
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scaled_to_halves_everything() {
        let k = CameraIntrinsics::new(200.0, 180.0, 80.0, 60.0, 160, 120);
        let half = k.scaled_to(80, 60);
        assert_eq!(half.fx, 100.0);
        assert_eq!(half.fy, 90.0);
        assert_eq!(half.cx, 40.0);
        assert_eq!(half.cy, 30.0);
        assert_eq!(half.dimensions(), (80, 60));
    }

    #[test]
    fn test_centered_principal_point() {
        let k = CameraIntrinsics::centered(120.0, 160, 120);
        assert_eq!(k.principal_point(), Vec2::new(80.0, 60.0));
        assert_eq!(k.center_pixel(), Vec2::new(80.0, 60.0));
    }
}
