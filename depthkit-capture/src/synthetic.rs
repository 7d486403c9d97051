//! Procedural depth source.
//!
//! Renders a small room (floor, back wall, one box) from a camera that sways
//! left and right, producing millimeter depth, confidence and a YUV image
//! per frame. Useful for demos and for exercising the kernel without a
//! device.

use crate::source::{CaptureError, CapturedFrame, DepthSource};
use depthkit_data::{CameraIntrinsics, DepthFrame, YuvImage, rgb_to_yuv};
use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

const WALL_Z: f32 = -3.0;
const BOX_MIN: Vec3 = Vec3::new(-0.4, 0.0, -1.6);
const BOX_MAX: Vec3 = Vec3::new(0.2, 0.6, -1.0);

/// Settings for [`SyntheticScene`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntheticConfig {
    pub depth_width: u32,
    pub depth_height: u32,
    /// Horizontal field of view of the depth camera, in degrees.
    pub fov_degrees: f32,
    /// Camera image resolution; `None` disables color.
    pub color_size: Option<(u32, u32)>,
    pub frame_rate: f32,
    /// Stop after this many frames; `None` runs forever.
    pub frame_count: Option<u64>,
    /// Sideways sway of the camera, in meters.
    pub sway: f32,
    /// Samples further than this are reported as missing.
    pub max_range: f32,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            depth_width: 160,
            depth_height: 120,
            fov_degrees: 65.0,
            color_size: Some((320, 240)),
            frame_rate: 30.0,
            frame_count: None,
            sway: 0.4,
            max_range: 8.0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Hit {
    t: f32,
    normal: Vec3,
    color: Vec3,
}

/// A synthetic depth camera looking into a box-and-wall room.
#[derive(Debug, Clone)]
pub struct SyntheticScene {
    config: SyntheticConfig,
    intrinsics: CameraIntrinsics,
    frame_number: u64,
}

impl SyntheticScene {
    pub fn new(config: SyntheticConfig) -> Self {
        let half_fov = (config.fov_degrees.to_radians() / 2.0).tan();
        let focal = config.depth_width as f32 / 2.0 / half_fov;
        let intrinsics =
            CameraIntrinsics::centered(focal, config.depth_width, config.depth_height);
        info!(
            "Synthetic scene {}x{} (f = {:.1}px)",
            config.depth_width, config.depth_height, focal
        );
        Self {
            config,
            intrinsics,
            frame_number: 0,
        }
    }

    pub fn intrinsics(&self) -> &CameraIntrinsics {
        &self.intrinsics
    }

    /// Camera-to-world pose at time `t` seconds.
    pub fn pose_at(&self, t: f64) -> Mat4 {
        let sway = self.config.sway * (t as f32 * 0.5).sin();
        let eye = Vec3::new(sway, 1.3, 1.5);
        look_at(eye, Vec3::new(0.0, 0.4, -1.5))
    }

    /// Render one frame at time `t` seconds.
    pub fn render(&self, t: f64) -> Result<CapturedFrame, CaptureError> {
        let pose = self.pose_at(t);
        let k = &self.intrinsics;
        let (w, h) = (k.width, k.height);

        let mut depth_mm = Vec::with_capacity((w * h) as usize);
        let mut confidence = Vec::with_capacity((w * h) as usize);
        for py in 0..h {
            for px in 0..w {
                match self.trace_pixel(&pose, k, px, py) {
                    Some((hit, direction)) if hit.t <= self.config.max_range => {
                        depth_mm.push((hit.t * 1000.0).round().min(u16::MAX as f32) as u16);
                        let facing = hit.normal.dot(-direction.normalize()).abs();
                        confidence.push((facing * 255.0).round().clamp(1.0, 255.0) as u8);
                    }
                    _ => {
                        depth_mm.push(0);
                        confidence.push(0);
                    }
                }
            }
        }

        let depth = DepthFrame::from_millimeters(w, h, &depth_mm, *k)?
            .with_confidence(confidence)?
            .with_timestamp(t);
        let mut frame = CapturedFrame::new(depth, pose);

        if let Some((cw, ch)) = self.config.color_size {
            frame = frame.with_image(self.render_color(&pose, cw, ch)?);
        }
        Ok(frame)
    }

    fn render_color(&self, pose: &Mat4, width: u32, height: u32) -> Result<YuvImage, CaptureError> {
        let k = self.intrinsics.scaled_to(width, height);
        let (cw, ch) = (width.div_ceil(2) as usize, height.div_ceil(2) as usize);
        let mut y_plane = vec![0u8; (width * height) as usize];
        let mut u_plane = vec![128u8; cw * ch];
        let mut v_plane = vec![128u8; cw * ch];

        for py in 0..height {
            for px in 0..width {
                let color = self
                    .trace_pixel(pose, &k, px, py)
                    .map_or(Vec3::ZERO, |(hit, _)| hit.color);
                let [y, u, v] = rgb_to_yuv(color);
                y_plane[(py * width + px) as usize] = y;
                if px % 2 == 0 && py % 2 == 0 {
                    let c = (py / 2) as usize * cw + (px / 2) as usize;
                    u_plane[c] = u;
                    v_plane[c] = v;
                }
            }
        }

        Ok(YuvImage::new(
            width,
            height,
            y_plane,
            u_plane,
            v_plane,
            width as usize,
            cw,
            1,
        )?)
    }

    /// Cast the ray through pixel `(px, py)`; the returned direction has a
    /// camera-space z of one, so `hit.t` is the camera depth.
    fn trace_pixel(
        &self,
        pose: &Mat4,
        k: &CameraIntrinsics,
        px: u32,
        py: u32,
    ) -> Option<(Hit, Vec3)> {
        let camera_dir = Vec3::new((px as f32 - k.cx) / k.fx, (py as f32 - k.cy) / k.fy, 1.0);
        let origin = pose.w_axis.truncate();
        let direction = pose.transform_vector3(camera_dir);
        cast(origin, direction).map(|hit| (hit, direction))
    }
}

impl Default for SyntheticScene {
    fn default() -> Self {
        Self::new(SyntheticConfig::default())
    }
}

impl DepthSource for SyntheticScene {
    fn next_frame(&mut self) -> Result<Option<CapturedFrame>, CaptureError> {
        if !self.is_active() {
            return Ok(None);
        }
        let t = self.frame_number as f64 / self.config.frame_rate as f64;
        let frame = self.render(t)?;
        debug!(
            "Synthetic frame {} ({} valid pixels)",
            self.frame_number,
            frame.depth.valid_count()
        );
        self.frame_number += 1;
        Ok(Some(frame))
    }

    fn resolution(&self) -> (u32, u32) {
        self.intrinsics.dimensions()
    }

    fn frame_rate(&self) -> Option<f32> {
        Some(self.config.frame_rate)
    }

    fn is_active(&self) -> bool {
        self.config
            .frame_count
            .is_none_or(|count| self.frame_number < count)
    }
}

/// Camera-to-world transform for a camera at `eye` looking at `target`.
fn look_at(eye: Vec3, target: Vec3) -> Mat4 {
    let forward = (target - eye).normalize();
    let right = forward.cross(Vec3::Y).normalize();
    let down = forward.cross(right);
    Mat4::from_cols(
        right.extend(0.0),
        down.extend(0.0),
        forward.extend(0.0),
        eye.extend(1.0),
    )
}

fn cast(origin: Vec3, direction: Vec3) -> Option<Hit> {
    let mut best: Option<Hit> = None;
    let mut consider = |hit: Hit| {
        if hit.t > 1e-4 && best.is_none_or(|b| hit.t < b.t) {
            best = Some(hit);
        }
    };

    if direction.y < 0.0 {
        let t = -origin.y / direction.y;
        let p = origin + direction * t;
        let checker = ((p.x * 2.0).floor() + (p.z * 2.0).floor()) as i32 & 1;
        let shade = if checker == 0 { 0.35 } else { 0.7 };
        consider(Hit {
            t,
            normal: Vec3::Y,
            color: Vec3::splat(shade),
        });
    }
    if direction.z < 0.0 {
        consider(Hit {
            t: (WALL_Z - origin.z) / direction.z,
            normal: Vec3::Z,
            color: Vec3::new(0.6, 0.7, 0.9),
        });
    }
    if let Some((t, normal)) = intersect_box(origin, direction, BOX_MIN, BOX_MAX) {
        consider(Hit {
            t,
            normal,
            color: Vec3::new(0.9, 0.45, 0.1),
        });
    }
    best
}

/// Slab test; returns the entry distance and the face normal.
fn intersect_box(origin: Vec3, direction: Vec3, min: Vec3, max: Vec3) -> Option<(f32, Vec3)> {
    let mut t_near = f32::NEG_INFINITY;
    let mut t_far = f32::INFINITY;
    let mut normal = Vec3::ZERO;

    for axis in 0..3 {
        let (o, d) = (origin[axis], direction[axis]);
        if d.abs() < 1e-9 {
            if o < min[axis] || o > max[axis] {
                return None;
            }
            continue;
        }
        let (mut t0, mut t1) = ((min[axis] - o) / d, (max[axis] - o) / d);
        if t0 > t1 {
            std::mem::swap(&mut t0, &mut t1);
        }
        if t0 > t_near {
            t_near = t0;
            normal = Vec3::ZERO;
            normal[axis] = -d.signum();
        }
        t_far = t_far.min(t1);
    }

    (t_near <= t_far && t_near > 0.0).then_some((t_near, normal))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small() -> SyntheticConfig {
        SyntheticConfig {
            depth_width: 48,
            depth_height: 36,
            color_size: Some((96, 72)),
            frame_count: Some(2),
            ..SyntheticConfig::default()
        }
    }

    fn on_surface(p: Vec3) -> bool {
        let eps = 0.01;
        let on_box = p.cmpge(BOX_MIN - eps).all() && p.cmple(BOX_MAX + eps).all();
        p.y.abs() < eps || (p.z - WALL_Z).abs() < eps || on_box
    }

    #[test]
    fn test_frames_have_expected_shape() {
        let mut scene = SyntheticScene::new(small());
        let frame = scene.next_frame().unwrap().unwrap();
        assert_eq!(frame.depth.dimensions(), (48, 36));
        assert_eq!(frame.image.as_ref().unwrap().dimensions(), (96, 72));
        assert!(frame.depth.confidence().is_some());
        assert!(frame.depth.valid_count() > 48 * 36 * 9 / 10);
    }

    #[test]
    fn test_source_exhausts_after_frame_count() {
        let mut scene = SyntheticScene::new(small());
        assert!(scene.next_frame().unwrap().is_some());
        assert!(scene.next_frame().unwrap().is_some());
        assert!(!scene.is_active());
        assert!(scene.next_frame().unwrap().is_none());
    }

    #[test]
    fn test_depth_unprojects_onto_scene_surfaces() {
        let scene = SyntheticScene::new(small());
        let frame = scene.render(0.7).unwrap();
        let k = frame.depth.intrinsics();

        for py in 0..k.height {
            for px in 0..k.width {
                let z = frame.depth.depth()[frame.depth.index(px, py)];
                if z == 0.0 {
                    continue;
                }
                let camera = Vec3::new(
                    (px as f32 - k.cx) * z / k.fx,
                    (py as f32 - k.cy) * z / k.fy,
                    z,
                );
                let world = frame.camera_to_world.transform_point3(camera);
                assert!(on_surface(world), "pixel ({px}, {py}) -> {world}");
            }
        }
    }

    #[test]
    fn test_look_at_points_forward() {
        let pose = look_at(Vec3::ZERO, Vec3::NEG_Z);
        assert!((pose.transform_vector3(Vec3::Z) - Vec3::NEG_Z).length() < 1e-6);
        assert!((pose.transform_vector3(Vec3::Y) - Vec3::NEG_Y).length() < 1e-6);
        assert!((pose.transform_vector3(Vec3::X) - Vec3::X).length() < 1e-6);
    }

    #[test]
    fn test_box_hit_from_front() {
        let (t, normal) = intersect_box(
            Vec3::new(-0.1, 0.3, 0.0),
            Vec3::NEG_Z,
            BOX_MIN,
            BOX_MAX,
        )
        .unwrap();
        assert!((t - 1.0).abs() < 1e-6);
        assert_eq!(normal, Vec3::Z);
    }
}
