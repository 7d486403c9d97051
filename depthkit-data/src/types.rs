//! Core point types and the invalid-vertex sentinel.
//!
//! `CloudPoint` is the CPU representation used by the accumulator and the
//! exporters; `CloudVertex` is its `bytemuck`-castable twin for GPU upload.

use bytemuck::{Pod, Zeroable};
use glam::Vec3;

/// Sentinel returned wherever a vertex cannot be reconstructed
/// (missing depth, undefined normal).
pub const INVALID_VERTEX: Vec3 = Vec3::NEG_INFINITY;

/// Returns `true` unless `v` carries a non-finite component.
pub fn is_valid_vertex(v: Vec3) -> bool {
    v.is_finite()
}

/// A colored point in world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CloudPoint {
    /// Position in world space.
    pub position: Vec3,
    /// RGB color (0-1 range).
    pub color: Vec3,
}

impl CloudPoint {
    pub fn new(position: Vec3, color: Vec3) -> Self {
        Self { position, color }
    }

    /// Create a white point at the given position.
    pub fn white(position: Vec3) -> Self {
        Self {
            position,
            color: Vec3::ONE,
        }
    }

    /// Color quantized to 8 bits per channel.
    pub fn color_u8(&self) -> [u8; 3] {
        let c = (self.color.clamp(Vec3::ZERO, Vec3::ONE) * 255.0).round();
        [c.x as u8, c.y as u8, c.z as u8]
    }
}

/// GPU layout of a cloud point.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct CloudVertex {
    pub position: [f32; 3],
    pub color: [f32; 3],
}

impl From<&CloudPoint> for CloudVertex {
    fn from(point: &CloudPoint) -> Self {
        Self {
            position: point.position.to_array(),
            color: point.color.to_array(),
        }
    }
}
