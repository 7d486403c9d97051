//! Files written at the end of a run.

use crate::errors::AppError;
use depthkit_core::PointCloudBuffer;
use depthkit_data::{DepthFrame, write_ascii_ply};
use glam::Vec3;
use image::GrayImage;
use serde::Serialize;
use std::fs;
use std::path::Path;
use tracing::info;

/// Write the valid cloud points, oldest first, as ASCII PLY.
pub fn export_cloud(path: &Path, cloud: &PointCloudBuffer) -> Result<usize, AppError> {
    if cloud.is_empty() {
        return Err(AppError::NothingToExport("point cloud is empty"));
    }
    let points: Vec<_> = cloud.iter_oldest_first().collect();
    let written = write_ascii_ply(path, &points)?;
    info!("Wrote {} points to {}", written, path.display());
    Ok(written)
}

/// Grayscale rendering of a depth frame: near is bright, missing is black.
pub fn depth_preview(frame: &DepthFrame) -> GrayImage {
    let (near, far) = frame
        .depth()
        .iter()
        .filter(|z| **z > 0.0)
        .fold((f32::INFINITY, 0.0f32), |(lo, hi), &z| (lo.min(z), hi.max(z)));
    let span = (far - near).max(1e-6);

    let (width, height) = frame.dimensions();
    GrayImage::from_fn(width, height, |x, y| {
        let z = frame.depth()[frame.index(x, y)];
        if z <= 0.0 {
            return image::Luma([0]);
        }
        let t = (z - near) / span;
        image::Luma([(255.0 - t * 223.0).round() as u8])
    })
}

pub fn export_depth_preview(path: &Path, frame: &DepthFrame) -> Result<(), AppError> {
    depth_preview(frame).save(path)?;
    info!("Wrote depth preview to {}", path.display());
    Ok(())
}

#[derive(Debug, Serialize)]
struct RayPath {
    vertices: Vec<[f32; 3]>,
}

/// Write the ray polyline as JSON (`{"vertices": [[x, y, z], ...]}`).
pub fn export_ray(path: &Path, polyline: &[Vec3]) -> Result<(), AppError> {
    if polyline.is_empty() {
        return Err(AppError::NothingToExport("no active ray"));
    }
    let ray = RayPath {
        vertices: polyline.iter().map(|v| v.to_array()).collect(),
    };
    fs::write(path, serde_json::to_string_pretty(&ray)?)?;
    info!("Wrote {} ray vertices to {}", polyline.len(), path.display());
    Ok(())
}
