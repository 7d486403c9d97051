//! Laser rays that bounce off the reconstructed depth surface
//!
//! A ray is fired from just below the camera towards a screen pixel, marches
//! through the scene every update, and reflects whenever it dives behind the
//! sampled depth surface.

pub mod bouncer;
pub mod reflect;

pub use bouncer::{Ray, RayBouncer, RayConfig, RayState};
pub use reflect::{bounce_direction, reflect};
