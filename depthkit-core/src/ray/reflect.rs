//! Reflection helpers.

use glam::Vec3;

/// Mirror `direction` about the plane with unit normal `normal`.
pub fn reflect(direction: Vec3, normal: Vec3) -> Vec3 {
    direction - 2.0 * normal.dot(direction) * normal
}

/// Outgoing direction after a bounce: the reflection bent towards the normal.
///
/// Non-finite inputs produce a non-finite result; callers must check.
pub fn bounce_direction(direction: Vec3, normal: Vec3) -> Vec3 {
    (normal + 0.5 * reflect(direction, normal)).normalize()
}
