//! Fixed-capacity ring buffer of colored points.

use depthkit_data::{CloudPoint, CloudVertex};
use glam::Vec3;

/// Circular point store that overwrites the oldest entries once full.
///
/// Slots `0..count` are valid; anything past `count` is stale and never
/// exposed. `indices` mirrors the slots (`indices[i] == i`) so a renderer
/// can draw the valid prefix as a point-topology mesh.
#[derive(Debug, Clone)]
pub struct PointCloudBuffer {
    positions: Vec<Vec3>,
    colors: Vec<Vec3>,
    indices: Vec<u32>,
    count: usize,
    write_index: usize,
}

impl PointCloudBuffer {
    /// Create a buffer holding at most `capacity` points (at least one).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            positions: vec![Vec3::ZERO; capacity],
            colors: vec![Vec3::ZERO; capacity],
            indices: (0..capacity as u32).collect(),
            count: 0,
            write_index: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.positions.len()
    }

    /// Number of valid points.
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn is_full(&self) -> bool {
        self.count == self.capacity()
    }

    /// Slot the next point will be written to.
    pub fn write_index(&self) -> usize {
        self.write_index
    }

    /// Store a point, evicting the oldest one when full.
    pub fn push(&mut self, position: Vec3, color: Vec3) {
        self.positions[self.write_index] = position;
        self.colors[self.write_index] = color;
        self.write_index = (self.write_index + 1) % self.capacity();
        if self.count < self.capacity() {
            self.count += 1;
        }
    }

    /// Forget every point. Storage is kept.
    pub fn clear(&mut self) {
        self.count = 0;
        self.write_index = 0;
    }

    /// Valid positions in slot order.
    pub fn positions(&self) -> &[Vec3] {
        &self.positions[..self.count]
    }

    /// Valid colors in slot order.
    pub fn colors(&self) -> &[Vec3] {
        &self.colors[..self.count]
    }

    /// Index array for the valid slots.
    pub fn indices(&self) -> &[u32] {
        &self.indices[..self.count]
    }

    /// Valid points from oldest to newest.
    pub fn iter_oldest_first(&self) -> impl Iterator<Item = CloudPoint> + '_ {
        let start = if self.is_full() { self.write_index } else { 0 };
        (0..self.count)
            .map(move |i| (start + i) % self.capacity())
            .map(move |slot| CloudPoint::new(self.positions[slot], self.colors[slot]))
    }

    /// Valid points in slot order.
    pub fn points(&self) -> Vec<CloudPoint> {
        self.positions()
            .iter()
            .zip(self.colors())
            .map(|(&position, &color)| CloudPoint::new(position, color))
            .collect()
    }

    /// GPU-ready copy of the valid slots.
    pub fn vertices(&self) -> Vec<CloudVertex> {
        self.points().iter().map(CloudVertex::from).collect()
    }

    /// Raw bytes of [`vertices`](Self::vertices), ready for a vertex buffer.
    pub fn vertex_bytes(&self) -> Vec<u8> {
        bytemuck::cast_slice(&self.vertices()).to_vec()
    }
}
