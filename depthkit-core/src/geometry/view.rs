//! A depth frame seen from a posed camera.

use crate::geometry::{DepthSampler, to_world_space, view_to_camera};
use depthkit_data::DepthFrame;
use glam::{Mat4, Vec2, Vec3};

/// Couples a frame with its camera-to-world transform for one update.
///
/// Nothing here outlives the update: the frame is borrowed, never copied.
#[derive(Debug, Clone, Copy)]
pub struct FrameView<'a> {
    sampler: DepthSampler<'a>,
    camera_to_world: Mat4,
    world_to_camera: Mat4,
}

impl<'a> FrameView<'a> {
    pub fn new(frame: &'a DepthFrame, camera_to_world: Mat4) -> Self {
        Self {
            sampler: DepthSampler::new(frame),
            camera_to_world,
            world_to_camera: camera_to_world.inverse(),
        }
    }

    pub fn sampler(&self) -> &DepthSampler<'a> {
        &self.sampler
    }

    pub fn camera_to_world(&self) -> &Mat4 {
        &self.camera_to_world
    }

    pub fn camera_position(&self) -> Vec3 {
        self.camera_to_world.w_axis.truncate()
    }

    /// Rotate a camera-space direction into world space.
    pub fn direction_to_world(&self, direction: Vec3) -> Vec3 {
        self.camera_to_world.transform_vector3(direction)
    }

    pub fn to_world(&self, vertex: Vec3) -> Vec3 {
        to_world_space(vertex, &self.camera_to_world)
    }

    pub fn to_camera(&self, point: Vec3) -> Vec3 {
        self.world_to_camera.transform_point3(point)
    }

    /// Pixel position of a world point, `None` behind the camera.
    pub fn project_world(&self, point: Vec3) -> Option<Vec2> {
        self.sampler.project(self.to_camera(point))
    }

    /// World-space vertex behind a (possibly fractional) screen pixel.
    pub fn world_vertex_at(&self, pixel: Vec2) -> Vec3 {
        let (x, y) = (pixel.x.floor() as i32, pixel.y.floor() as i32);
        self.to_world(self.sampler.vertex_at(x, y))
    }

    /// Unit world-space normal from a view-frame normal.
    pub fn normal_to_world(&self, view_normal: Vec3) -> Vec3 {
        self.direction_to_world(view_to_camera(view_normal))
            .normalize()
    }
}
