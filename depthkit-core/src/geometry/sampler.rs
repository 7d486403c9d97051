//! Depth lookups and pinhole (un)projection over a single frame.

use depthkit_data::{CameraIntrinsics, DepthFrame, INVALID_VERTEX};
use glam::{Mat4, Vec2, Vec3};

/// Read-only view of one depth frame.
///
/// Camera space follows the image: +x right, +y down the rows, +z forward.
#[derive(Debug, Clone, Copy)]
pub struct DepthSampler<'a> {
    frame: &'a DepthFrame,
}

impl<'a> DepthSampler<'a> {
    pub fn new(frame: &'a DepthFrame) -> Self {
        Self { frame }
    }

    pub fn frame(&self) -> &'a DepthFrame {
        self.frame
    }

    pub fn intrinsics(&self) -> &'a CameraIntrinsics {
        self.frame.intrinsics()
    }

    /// Depth in meters at a pixel, `0.0` when out of range or missing.
    pub fn depth_at(&self, x: i32, y: i32) -> f32 {
        match self.pixel(x, y) {
            Some((x, y)) => self.frame.depth()[self.frame.index(x, y)],
            None => 0.0,
        }
    }

    /// Confidence at a pixel; `None` when the frame carries no confidence
    /// or the pixel is out of range.
    pub fn confidence_at(&self, x: i32, y: i32) -> Option<u8> {
        let (x, y) = self.pixel(x, y)?;
        self.frame
            .confidence()
            .map(|confidence| confidence[self.frame.index(x, y)])
    }

    /// Pinhole unprojection into camera space.
    ///
    /// Returns [`INVALID_VERTEX`] for a zero depth.
    pub fn unproject(&self, x: f32, y: f32, depth: f32) -> Vec3 {
        if depth == 0.0 {
            return INVALID_VERTEX;
        }
        let k = self.intrinsics();
        Vec3::new((x - k.cx) * depth / k.fx, (y - k.cy) * depth / k.fy, depth)
    }

    /// Camera-space vertex at a pixel, or the sentinel when depth is missing.
    pub fn vertex_at(&self, x: i32, y: i32) -> Vec3 {
        self.unproject(x as f32, y as f32, self.depth_at(x, y))
    }

    /// Forward projection of a camera-space point to pixel coordinates.
    ///
    /// Points on or behind the image plane have no projection.
    pub fn project(&self, point: Vec3) -> Option<Vec2> {
        if !point.is_finite() || point.z <= f32::EPSILON {
            return None;
        }
        let k = self.intrinsics();
        Some(Vec2::new(
            k.fx * point.x / point.z + k.cx,
            k.fy * point.y / point.z + k.cy,
        ))
    }

    /// `true` when a projected point lies inside `[0, width] × [0, height]`.
    pub fn in_bounds(&self, pixel: Vec2) -> bool {
        let (w, h) = self.frame.dimensions();
        (0.0..=w as f32).contains(&pixel.x) && (0.0..=h as f32).contains(&pixel.y)
    }

    /// Clamp a pixel position onto the screen rectangle.
    pub fn clamp_to_screen(&self, pixel: Vec2) -> Vec2 {
        let (w, h) = self.frame.dimensions();
        pixel.clamp(Vec2::ZERO, Vec2::new(w as f32, h as f32))
    }

    fn pixel(&self, x: i32, y: i32) -> Option<(u32, u32)> {
        let (w, h) = self.frame.dimensions();
        if x < 0 || y < 0 || x as u32 >= w || y as u32 >= h {
            return None;
        }
        Some((x as u32, y as u32))
    }
}

/// Apply an external 4x4 transform; the invalid sentinel passes through.
pub fn to_world_space(vertex: Vec3, transform: &Mat4) -> Vec3 {
    if !vertex.is_finite() {
        return INVALID_VERTEX;
    }
    transform.transform_point3(vertex)
}

#[cfg(test)]
mod tests {
    use super::*;
    use depthkit_data::is_valid_vertex;

    fn frame() -> DepthFrame {
        let k = CameraIntrinsics::new(100.0, 100.0, 2.0, 2.0, 4, 4);
        let mut depth = vec![2.0; 16];
        depth[5] = 0.0;
        DepthFrame::new(4, 4, depth, k)
            .unwrap()
            .with_confidence((0..16).map(|i| i as u8 * 10).collect())
            .unwrap()
    }

    #[test]
    fn test_depth_at_out_of_range_is_zero() {
        let frame = frame();
        let sampler = DepthSampler::new(&frame);
        assert_eq!(sampler.depth_at(-1, 0), 0.0);
        assert_eq!(sampler.depth_at(0, 4), 0.0);
        assert_eq!(sampler.depth_at(1, 1), 0.0);
        assert_eq!(sampler.depth_at(3, 3), 2.0);
    }

    #[test]
    fn test_confidence_lookup() {
        let frame = frame();
        let sampler = DepthSampler::new(&frame);
        assert_eq!(sampler.confidence_at(3, 0), Some(30));
        assert_eq!(sampler.confidence_at(9, 0), None);
    }

    #[test]
    fn test_unproject_pinhole() {
        let frame = frame();
        let sampler = DepthSampler::new(&frame);
        let v = sampler.unproject(4.0, 0.0, 2.0);
        assert!((v - Vec3::new(0.04, -0.04, 2.0)).length() < 1e-6);
    }

    #[test]
    fn test_zero_depth_never_yields_a_vertex() {
        let frame = frame();
        let sampler = DepthSampler::new(&frame);
        assert!(!is_valid_vertex(sampler.unproject(1.0, 1.0, 0.0)));
        assert!(!is_valid_vertex(sampler.vertex_at(1, 1)));
        assert!(!is_valid_vertex(sampler.vertex_at(40, 1)));
    }

    #[test]
    fn test_project_inverts_unproject() {
        let frame = frame();
        let sampler = DepthSampler::new(&frame);
        let v = sampler.unproject(3.0, 1.0, 1.7);
        let p = sampler.project(v).unwrap();
        assert!((p - Vec2::new(3.0, 1.0)).length() < 1e-4);
        assert!(sampler.project(Vec3::new(0.0, 0.0, -1.0)).is_none());
    }

    #[test]
    fn test_world_transform_keeps_sentinel() {
        let t = Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(to_world_space(Vec3::ZERO, &t), Vec3::new(1.0, 2.0, 3.0));
        assert!(!is_valid_vertex(to_world_space(INVALID_VERTEX, &t)));
    }
}
