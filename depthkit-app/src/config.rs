//! Kernel configuration: optional JSON file plus command-line overrides.

use crate::errors::AppError;
use depthkit_core::{AccumulationPolicy, KernelConfig};
use std::fs;
use std::path::Path;
use tracing::info;

/// Fields the command line may override on top of the file.
#[derive(Debug, Clone, Copy, Default)]
pub struct Overrides {
    pub capacity: Option<usize>,
    pub policy: Option<AccumulationPolicy>,
    pub velocity: Option<f32>,
    pub stride: Option<u32>,
}

/// Load `path` (when given) and apply `overrides`. Missing fields fall back
/// to defaults.
pub fn load_config(path: Option<&Path>, overrides: Overrides) -> Result<KernelConfig, AppError> {
    let mut config = match path {
        Some(path) => {
            let text = fs::read_to_string(path).map_err(|source| AppError::ConfigRead {
                path: path.to_path_buf(),
                source,
            })?;
            let config: KernelConfig =
                serde_json::from_str(&text).map_err(|source| AppError::ConfigParse {
                    path: path.to_path_buf(),
                    source,
                })?;
            info!("Loaded config from {}", path.display());
            config
        }
        None => KernelConfig::default(),
    };

    if let Some(capacity) = overrides.capacity {
        if capacity == 0 {
            return Err(AppError::InvalidArgument(
                "cloud capacity must be at least 1".to_string(),
            ));
        }
        config.cloud.capacity = capacity;
    }
    if let Some(policy) = overrides.policy {
        config.cloud.policy = policy;
    }
    if let Some(velocity) = overrides.velocity {
        if !(velocity > 0.0) {
            return Err(AppError::InvalidArgument(format!(
                "ray velocity must be positive, got {velocity}"
            )));
        }
        config.ray.velocity = velocity;
    }
    if let Some(stride) = overrides.stride {
        config.cloud.stride = stride.max(1);
    }
    Ok(config)
}
