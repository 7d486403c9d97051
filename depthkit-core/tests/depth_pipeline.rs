//! End-to-end checks of the kernel against synthetic depth scenes.

use depthkit_core::geometry::{DepthSampler, FrameView, NormalEstimator};
use depthkit_core::ray::RayState;
use depthkit_core::cloud::ThrottleConfig;
use depthkit_core::{CloudConfig, DepthKernel, FireRequest, FrameInputs, KernelConfig, RayConfig};
use depthkit_data::{CameraIntrinsics, DepthFrame, YuvImage, is_valid_vertex};
use glam::{Mat4, Vec3};

const W: u32 = 64;
const H: u32 = 48;
const FX: f32 = 50.0;

/// Depth of the plane `z = d0 + a * x` (camera space) seen through each pixel.
fn tilted_plane(d0: f32, a: f32) -> DepthFrame {
    let k = CameraIntrinsics::centered(FX, W, H);
    let mut depth = Vec::with_capacity((W * H) as usize);
    for _ in 0..H {
        for px in 0..W {
            let rx = (px as f32 - k.cx) / k.fx;
            depth.push(d0 / (1.0 - a * rx));
        }
    }
    DepthFrame::new(W, H, depth, k).unwrap()
}

fn quiet_ray() -> RayConfig {
    RayConfig {
        origin_offset: [0.0; 3],
        velocity: 1.0,
        ..RayConfig::default()
    }
}

#[test]
fn tilted_plane_normal_matches_geometry() {
    let a = 0.5;
    let frame = tilted_plane(1.0, a);
    let sampler = DepthSampler::new(&frame);

    let normal = NormalEstimator::default()
        .estimate(&sampler, (W / 2) as i32, (H / 2) as i32)
        .unwrap();
    let expected = Vec3::new(a, 0.0, -1.0).normalize();
    assert!((normal - expected).length() < 1e-2, "{normal} vs {expected}");
}

#[test]
fn ray_reflects_off_tilted_plane() {
    let frame = tilted_plane(1.0, 0.5);
    let mut kernel = DepthKernel::new(KernelConfig {
        ray: quiet_ray(),
        ..KernelConfig::default()
    });

    let fired = kernel.step(
        0.05,
        FrameInputs::new(&frame, Mat4::IDENTITY).with_fire(FireRequest::Center),
    );
    assert_eq!(fired.ray_state, RayState::Tracking);

    let mut polyline = Vec::new();
    for _ in 0..25 {
        let out = kernel.step(0.05, FrameInputs::new(&frame, Mat4::IDENTITY));
        polyline = out.ray_polyline;
        if polyline.len() > 2 {
            break;
        }
    }

    assert_eq!(polyline.len(), 3, "expected exactly one bounce");
    let bounce = polyline[1];
    assert!((bounce.z - 1.0).abs() < 0.06, "bounce at {bounce}");

    let direction = kernel.ray().ray().unwrap().direction;
    assert!(direction.z < 0.0 && direction.x > 0.0, "direction {direction}");
}

#[test]
fn zero_depth_never_reaches_the_cloud() {
    let mut depth = vec![0.0; (W * H) as usize];
    depth[10] = 1.0;
    depth[200] = 2.0;
    let frame = DepthFrame::new(W, H, depth, CameraIntrinsics::centered(FX, W, H)).unwrap();
    let mut kernel = DepthKernel::default();

    let out = kernel.step(0.016, FrameInputs::new(&frame, Mat4::IDENTITY));
    assert_eq!(out.cloud_added, Some(2));
    assert!(kernel.cloud().positions().iter().all(|p| is_valid_vertex(*p)));
}

#[test]
fn cloud_never_exceeds_capacity_and_keeps_latest_frame() {
    let capacity = 1000;
    let mut kernel = DepthKernel::new(KernelConfig {
        cloud: CloudConfig {
            capacity,
            throttle: ThrottleConfig::fixed(0.0),
            ..CloudConfig::default()
        },
        ..KernelConfig::default()
    });

    let image = YuvImage::solid(W, H, [128, 128, 128]).unwrap();
    for i in 0..3 {
        let frame = DepthFrame::new(
            W,
            H,
            vec![1.0 + i as f32; (W * H) as usize],
            CameraIntrinsics::centered(FX, W, H),
        )
        .unwrap();
        let out = kernel.step(
            0.016,
            FrameInputs::new(&frame, Mat4::IDENTITY).with_image(&image),
        );
        assert!(out.cloud_count <= capacity);
    }

    let cloud = kernel.cloud();
    assert_eq!(cloud.len(), capacity);
    // Each frame has 3072 points, so the window holds only the last frame.
    assert!(cloud.iter_oldest_first().all(|p| p.position.z == 3.0));
    for color in cloud.colors() {
        assert!((color.x - 0.5).abs() < 0.01);
    }
}

#[test]
fn ray_follows_camera_pose() {
    let frame = tilted_plane(2.0, 0.0);
    let pose = Mat4::from_translation(Vec3::new(1.0, 0.0, 0.0));
    let view = FrameView::new(&frame, pose);
    let mut bouncer = depthkit_core::RayBouncer::new(quiet_ray(), Default::default());

    bouncer.fire(None, &view);
    let ray = bouncer.ray().unwrap();
    assert_eq!(ray.origin, Vec3::new(1.0, 0.0, 0.0));
    assert!((ray.direction - Vec3::Z).length() < 1e-5);
}
