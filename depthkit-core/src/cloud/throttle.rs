//! Adaptive update interval for point cloud accumulation.

use serde::{Deserialize, Serialize};

/// Interval bounds for [`UpdateThrottle`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThrottleConfig {
    /// Interval used when frames are fast (seconds).
    pub min_interval: f32,
    /// Interval used when frames are at or slower than `slow_frame_time`.
    pub max_interval: f32,
    /// Frame time at which the interval reaches `max_interval`.
    pub slow_frame_time: f32,
    /// Weight of the newest frame time in the moving average.
    pub smoothing: f32,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            min_interval: 0.1,
            max_interval: 0.5,
            slow_frame_time: 1.0 / 15.0,
            smoothing: 0.1,
        }
    }
}

impl ThrottleConfig {
    /// A throttle that fires every `interval` seconds regardless of load.
    pub fn fixed(interval: f32) -> Self {
        Self {
            min_interval: interval,
            max_interval: interval,
            ..Self::default()
        }
    }
}

/// Decides whether enough time has passed for another accumulation.
///
/// The interval slides from `min_interval` to `max_interval` as the smoothed
/// frame time approaches `slow_frame_time`, so slow devices accumulate less.
#[derive(Debug, Clone)]
pub struct UpdateThrottle {
    config: ThrottleConfig,
    smoothed_frame_time: Option<f32>,
    since_last: f32,
}

impl UpdateThrottle {
    pub fn new(config: ThrottleConfig) -> Self {
        Self {
            config,
            smoothed_frame_time: None,
            since_last: f32::INFINITY,
        }
    }

    /// Current interval in seconds.
    pub fn interval(&self) -> f32 {
        let frame_time = self.smoothed_frame_time.unwrap_or(0.0);
        let t = if self.config.slow_frame_time > 0.0 {
            (frame_time / self.config.slow_frame_time).clamp(0.0, 1.0)
        } else {
            1.0
        };
        self.config.min_interval + (self.config.max_interval - self.config.min_interval) * t
    }

    /// Record a frame of `dt` seconds; returns `true` when an update is due.
    pub fn tick(&mut self, dt: f32) -> bool {
        let alpha = self.config.smoothing.clamp(0.0, 1.0);
        self.smoothed_frame_time = Some(match self.smoothed_frame_time {
            Some(previous) => previous + alpha * (dt - previous),
            None => dt,
        });

        self.since_last += dt;
        if self.since_last >= self.interval() {
            self.since_last = 0.0;
            true
        } else {
            false
        }
    }

    /// Make the next tick fire unconditionally.
    pub fn reset(&mut self) {
        self.since_last = f32::INFINITY;
    }
}
