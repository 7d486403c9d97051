//! Laser ray state machine.
//!
//! ```text
//! Inactive --fire--> Tracking <--> OffScreen
//!     ^                 |             |
//!     +---- reset / lifetime elapsed -+
//! ```
//!
//! `fire` resolves the transient "fire" state immediately: the ray either
//! starts tracking or, when no surface sits behind the target pixel, stays
//! inactive.

use crate::geometry::{FrameView, NormalEstimator, NormalEstimatorConfig};
use crate::ray::bounce_direction;
use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::{debug, info};

/// Where a ray is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RayState {
    #[default]
    Inactive,
    Tracking,
    OffScreen,
}

/// Ray tunables.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RayConfig {
    /// Travel speed in meters per second.
    pub velocity: f32,
    /// Launch point relative to the camera, in camera space (+y is down).
    pub origin_offset: [f32; 3],
    /// A fired direction shorter than this means no surface was hit.
    pub min_direction_magnitude: f32,
    /// Seconds before an active ray switches itself off.
    pub max_lifetime: f32,
    /// Bounce vertices kept for the polyline; older ones are dropped.
    pub max_bounces: usize,
}

impl Default for RayConfig {
    fn default() -> Self {
        Self {
            velocity: 1.0,
            origin_offset: [0.0, 0.1, 0.0],
            min_direction_magnitude: 0.95,
            max_lifetime: 10.0,
            max_bounces: 32,
        }
    }
}

/// An active ray in world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    /// Unit direction of travel.
    pub direction: Vec3,
    pub position: Vec3,
    /// Seconds since the ray was fired.
    pub age: f32,
}

/// Marches a single ray through successive depth frames.
#[derive(Debug, Clone)]
pub struct RayBouncer {
    config: RayConfig,
    estimator: NormalEstimator,
    state: RayState,
    ray: Option<Ray>,
    bounces: VecDeque<Vec3>,
    /// Set once a bounce vertex has been evicted; the origin no longer
    /// connects to the oldest kept vertex.
    history_truncated: bool,
    screen_point: Vec2,
}

impl RayBouncer {
    pub fn new(config: RayConfig, normals: NormalEstimatorConfig) -> Self {
        Self {
            config,
            estimator: NormalEstimator::new(normals),
            state: RayState::Inactive,
            ray: None,
            bounces: VecDeque::with_capacity(config.max_bounces),
            history_truncated: false,
            screen_point: Vec2::ZERO,
        }
    }

    pub fn config(&self) -> &RayConfig {
        &self.config
    }

    pub fn state(&self) -> RayState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state != RayState::Inactive
    }

    pub fn ray(&self) -> Option<&Ray> {
        self.ray.as_ref()
    }

    /// Last projected screen position of the ray head, clamped to the screen.
    pub fn screen_point(&self) -> Vec2 {
        self.screen_point
    }

    /// Polyline for rendering: origin, bounce points, then the current head.
    /// Empty while inactive.
    ///
    /// Once older bounces have been dropped by `max_bounces`, the line starts
    /// at the oldest kept bounce instead of the origin.
    pub fn polyline(&self) -> Vec<Vec3> {
        let Some(ray) = &self.ray else {
            return Vec::new();
        };
        let mut points = Vec::with_capacity(self.bounces.len() + 2);
        if !self.history_truncated {
            points.push(ray.origin);
        }
        points.extend(self.bounces.iter().copied());
        points.push(ray.position);
        points
    }

    /// Fire a new ray at `target` (screen centre when `None`).
    ///
    /// Any previous ray is discarded first.
    pub fn fire(&mut self, target: Option<Vec2>, view: &FrameView<'_>) -> RayState {
        self.reset();

        let target = target.unwrap_or_else(|| view.sampler().intrinsics().center_pixel());
        let origin =
            view.camera_position() + view.direction_to_world(Vec3::from(self.config.origin_offset));
        let hit = view.world_vertex_at(target);
        let direction = if hit.is_finite() {
            (hit - origin).normalize_or_zero()
        } else {
            Vec3::ZERO
        };

        if direction.length() < self.config.min_direction_magnitude {
            debug!(pixel = ?target, "No surface behind target, ray stays inactive");
            return self.state;
        }

        info!(origin = ?origin, direction = ?direction, "Ray fired");
        self.ray = Some(Ray {
            origin,
            direction,
            position: origin,
            age: 0.0,
        });
        self.screen_point = target;
        self.state = RayState::Tracking;
        self.state
    }

    /// Drop the ray and any rendered geometry.
    pub fn reset(&mut self) {
        if self.state != RayState::Inactive {
            debug!("Ray reset");
        }
        self.state = RayState::Inactive;
        self.ray = None;
        self.bounces.clear();
        self.history_truncated = false;
    }

    /// Advance the ray by `dt` seconds against the current frame.
    pub fn step(&mut self, dt: f32, view: &FrameView<'_>) -> RayState {
        let Some(mut ray) = self.ray else {
            return self.state;
        };

        ray.age += dt;
        if ray.age >= self.config.max_lifetime {
            info!(age = ray.age, "Ray lifetime elapsed");
            self.reset();
            return self.state;
        }

        let stride = self.config.velocity * dt;
        ray.position += ray.direction * stride;

        let pixel = view.project_world(ray.position);
        let on_screen = pixel.filter(|p| view.sampler().in_bounds(*p));

        match (self.state, on_screen) {
            (RayState::Tracking, Some(pixel)) => {
                self.screen_point = pixel;
                if let Some(hit) = self.try_bounce(&mut ray, pixel, stride, view) {
                    self.push_bounce(hit);
                }
            }
            (RayState::OffScreen, Some(pixel)) => {
                self.screen_point = pixel;
                self.state = RayState::Tracking;
            }
            (_, None) => {
                if let Some(pixel) = pixel {
                    self.screen_point = view.sampler().clamp_to_screen(pixel);
                }
                if self.state == RayState::Tracking {
                    debug!("Ray left the screen");
                }
                self.state = RayState::OffScreen;
            }
            (RayState::Inactive, Some(_)) => {}
        }

        self.ray = Some(ray);
        self.state
    }

    /// Reflect off the surface if the ray has passed behind it.
    ///
    /// Returns the bounce point. Leaves the ray untouched when the surface is
    /// missing or its normal is undefined.
    fn try_bounce(
        &self,
        ray: &mut Ray,
        pixel: Vec2,
        stride: f32,
        view: &FrameView<'_>,
    ) -> Option<Vec3> {
        let (x, y) = (pixel.x.floor() as i32, pixel.y.floor() as i32);
        let surface_depth = view.sampler().depth_at(x, y);
        if surface_depth == 0.0 {
            return None;
        }
        let ray_depth = view.to_camera(ray.position).z;
        if ray_depth <= surface_depth {
            return None;
        }

        let normal = view.normal_to_world(self.estimator.estimate(view.sampler(), x, y)?);
        let direction = bounce_direction(ray.direction, normal);
        if !direction.is_finite() {
            return None;
        }

        let hit = ray.position;
        ray.direction = direction;
        ray.position += direction * stride;
        debug!(hit = ?hit, normal = ?normal, "Ray bounced");
        Some(hit)
    }

    fn push_bounce(&mut self, point: Vec3) {
        if self.config.max_bounces == 0 {
            self.history_truncated = true;
            return;
        }
        if self.bounces.len() == self.config.max_bounces {
            self.bounces.pop_front();
            self.history_truncated = true;
        }
        self.bounces.push_back(point);
    }
}

impl Default for RayBouncer {
    fn default() -> Self {
        Self::new(RayConfig::default(), NormalEstimatorConfig::default())
    }
}
