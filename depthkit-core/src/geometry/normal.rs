//! Surface normals from a weighted mean depth gradient.
//!
//! The estimate looks at a square window around the target pixel, rejects
//! neighbours whose depth differs from the centre by more than a fixed
//! fraction of the centre depth, and averages `Δdepth / Δpixel` per axis.
//! The averaged slopes are turned into metric slopes with the width of one
//! pixel at the centre depth.
//!
//! The result is expressed in the *view frame*: +x right, +y up (opposite to
//! image rows), and a normal facing the camera has a negative z. Use
//! [`view_to_camera`] to bring it into the unprojection frame.

use crate::geometry::DepthSampler;
use depthkit_data::INVALID_VERTEX;
use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Tunables for [`NormalEstimator`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalEstimatorConfig {
    /// Half-size of the square search window, in pixels.
    pub radius: i32,
    /// Neighbours further than `outlier_ratio * centre depth` are ignored.
    pub outlier_ratio: f32,
}

impl Default for NormalEstimatorConfig {
    fn default() -> Self {
        Self {
            radius: 4,
            outlier_ratio: 0.2,
        }
    }
}

/// Estimates surface normals from neighbouring depth samples.
#[derive(Debug, Clone, Copy, Default)]
pub struct NormalEstimator {
    config: NormalEstimatorConfig,
}

impl NormalEstimator {
    pub fn new(config: NormalEstimatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &NormalEstimatorConfig {
        &self.config
    }

    /// Normal at `(x, y)` in the view frame, or `None` when it is undefined.
    pub fn estimate(&self, sampler: &DepthSampler<'_>, x: i32, y: i32) -> Option<Vec3> {
        let normal = self.estimate_raw(sampler, x, y);
        normal.is_finite().then_some(normal)
    }

    /// Same as [`estimate`](Self::estimate) but returns [`INVALID_VERTEX`]
    /// instead of `None`.
    pub fn estimate_raw(&self, sampler: &DepthSampler<'_>, x: i32, y: i32) -> Vec3 {
        let d0 = sampler.depth_at(x, y);
        if d0 == 0.0 {
            return INVALID_VERTEX;
        }
        let outlier_threshold = self.config.outlier_ratio * d0;
        let r = self.config.radius;

        let mut correlation_x = 0.0f32;
        let mut correlation_y = 0.0f32;
        let mut confidence_x = 0.0f32;
        let mut confidence_y = 0.0f32;

        for dy in -r..=r {
            for dx in -r..=r {
                if dx == 0 && dy == 0 {
                    continue;
                }
                let neighbour = sampler.depth_at(x + dx, y + dy);
                if neighbour == 0.0 {
                    continue;
                }
                let delta = neighbour - d0;
                if delta.abs() > outlier_threshold {
                    continue;
                }
                if dx != 0 {
                    correlation_x += delta / dx as f32;
                    confidence_x += 1.0;
                }
                if dy != 0 {
                    correlation_y += delta / dy as f32;
                    confidence_y += 1.0;
                }
            }
        }

        if confidence_x == 0.0 && confidence_y == 0.0 {
            return INVALID_VERTEX;
        }

        let pixel_width = d0 / sampler.intrinsics().fx;
        // An axis without samples divides 0 by 0; the NaN rejects the normal below.
        let slope_x = correlation_x / (pixel_width * confidence_x);
        let slope_y = correlation_y / (pixel_width * confidence_y);

        let normal = Vec3::new(slope_x, -slope_y, -1.0).normalize();
        if normal.is_finite() {
            normal
        } else {
            INVALID_VERTEX
        }
    }
}

/// Flip a view-frame normal into the camera (unprojection) frame.
pub fn view_to_camera(normal: Vec3) -> Vec3 {
    Vec3::new(normal.x, -normal.y, normal.z)
}

#[cfg(test)]
mod tests {
    use super::*;
    use depthkit_data::{CameraIntrinsics, DepthFrame, is_valid_vertex};

    const W: u32 = 21;
    const H: u32 = 21;
    const FX: f32 = 50.0;

    fn frame_from(f: impl Fn(i32, i32) -> f32) -> DepthFrame {
        let depth = (0..H as i32)
            .flat_map(|y| (0..W as i32).map(move |x| (x, y)))
            .map(|(x, y)| f(x, y))
            .collect();
        DepthFrame::new(W, H, depth, CameraIntrinsics::centered(FX, W, H)).unwrap()
    }

    #[test]
    fn test_isolated_pixel_has_no_normal() {
        let frame = frame_from(|x, y| if (x, y) == (10, 10) { 1.5 } else { 0.0 });
        let sampler = DepthSampler::new(&frame);
        assert_eq!(NormalEstimator::default().estimate(&sampler, 10, 10), None);
    }

    #[test]
    fn test_missing_centre_has_no_normal() {
        let frame = frame_from(|x, y| if (x, y) == (10, 10) { 0.0 } else { 1.0 });
        let sampler = DepthSampler::new(&frame);
        assert_eq!(NormalEstimator::default().estimate(&sampler, 10, 10), None);
    }

    #[test]
    fn test_single_row_of_depth_has_no_normal() {
        // Only dy == 0 neighbours exist, so the row slope is undefined.
        let frame = frame_from(|x, y| if y == 10 { 2.0 + 0.01 * x as f32 } else { 0.0 });
        let sampler = DepthSampler::new(&frame);
        let estimator = NormalEstimator::default();
        assert_eq!(estimator.estimate(&sampler, 10, 10), None);
        assert!(!is_valid_vertex(estimator.estimate_raw(&sampler, 10, 10)));
    }

    #[test]
    fn test_single_column_of_depth_has_no_normal() {
        let frame = frame_from(|x, y| if x == 10 { 2.0 + 0.01 * y as f32 } else { 0.0 });
        let sampler = DepthSampler::new(&frame);
        assert_eq!(NormalEstimator::default().estimate(&sampler, 10, 10), None);
    }

    #[test]
    fn test_fronto_parallel_plane_faces_camera() {
        let frame = frame_from(|_, _| 2.0);
        let sampler = DepthSampler::new(&frame);
        let n = NormalEstimator::default().estimate(&sampler, 10, 10).unwrap();
        assert!((n - Vec3::NEG_Z).length() < 1e-6);
    }

    #[test]
    fn test_plane_sloped_along_x() {
        let (d0, k) = (2.0, 0.01);
        let frame = frame_from(|x, _| d0 + k * (x - 10) as f32);
        let sampler = DepthSampler::new(&frame);
        let n = NormalEstimator::default().estimate(&sampler, 10, 10).unwrap();

        let slope = k / (d0 / FX);
        let expected = Vec3::new(slope, 0.0, -1.0).normalize();
        assert!((n - expected).length() < 1e-4, "{n} vs {expected}");
    }

    #[test]
    fn test_plane_sloped_along_rows_flips_y() {
        let (d0, k) = (1.0, -0.005);
        let frame = frame_from(|_, y| d0 + k * (y - 10) as f32);
        let sampler = DepthSampler::new(&frame);
        let n = NormalEstimator::default().estimate(&sampler, 10, 10).unwrap();

        let slope = k / (d0 / FX);
        let expected = Vec3::new(0.0, -slope, -1.0).normalize();
        assert!((n - expected).length() < 1e-4, "{n} vs {expected}");
        assert!((view_to_camera(n) - Vec3::new(0.0, slope, -1.0).normalize()).length() < 1e-4);
    }

    #[test]
    fn test_outliers_are_ignored() {
        // A depth discontinuity to the right must not tilt the normal.
        let frame = frame_from(|x, _| if x > 12 { 5.0 } else { 2.0 });
        let sampler = DepthSampler::new(&frame);
        let n = NormalEstimator::default().estimate(&sampler, 10, 10).unwrap();
        assert!((n - Vec3::NEG_Z).length() < 1e-6);
    }

    #[test]
    fn test_window_clipped_at_border() {
        let (d0, k) = (2.0, 0.02);
        let frame = frame_from(|x, _| d0 + k * x as f32);
        let sampler = DepthSampler::new(&frame);
        let n = NormalEstimator::default().estimate(&sampler, 0, 0).unwrap();
        let expected = Vec3::new(k / (d0 / FX), 0.0, -1.0).normalize();
        assert!((n - expected).length() < 1e-4);
    }
}
