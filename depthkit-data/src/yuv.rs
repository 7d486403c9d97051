//! YUV420 camera images and BT.601 color conversion.

use crate::frame::FrameError;
use glam::Vec3;
use image::RgbImage;

const U_MAX: f32 = 0.436;
const V_MAX: f32 = 0.615;

/// Convert one 8-bit YUV sample to linear RGB in `[0, 1]`.
///
/// U and V are rescaled to `[-0.436, 0.436]` and `[-0.615, 0.615]` before the
/// BT.601 matrix is applied.
pub fn yuv_to_rgb(y: u8, u: u8, v: u8) -> Vec3 {
    let y = y as f32 / 255.0;
    let u = (u as f32 / 255.0 - 0.5) * 2.0 * U_MAX;
    let v = (v as f32 / 255.0 - 0.5) * 2.0 * V_MAX;

    Vec3::new(
        y + 1.13983 * v,
        y - 0.39465 * u - 0.58060 * v,
        y + 2.03211 * u,
    )
    .clamp(Vec3::ZERO, Vec3::ONE)
}

/// Inverse of [`yuv_to_rgb`], used when a recording only ships RGB frames.
pub fn rgb_to_yuv(rgb: Vec3) -> [u8; 3] {
    let y = 0.299 * rgb.x + 0.587 * rgb.y + 0.114 * rgb.z;
    let u = -0.14713 * rgb.x - 0.28886 * rgb.y + 0.436 * rgb.z;
    let v = 0.615 * rgb.x - 0.51499 * rgb.y - 0.10001 * rgb.z;

    let quantize = |value: f32| (value * 255.0).round().clamp(0.0, 255.0) as u8;
    [
        quantize(y),
        quantize(u / (2.0 * U_MAX) + 0.5),
        quantize(v / (2.0 * V_MAX) + 0.5),
    ]
}

/// A YUV420 image with explicit plane strides.
///
/// Chroma planes are subsampled 2x in both directions; `uv_pixel_stride`
/// is 1 for planar layouts and 2 for interleaved (NV12/NV21) ones.
#[derive(Debug, Clone, PartialEq)]
pub struct YuvImage {
    width: u32,
    height: u32,
    y: Vec<u8>,
    u: Vec<u8>,
    v: Vec<u8>,
    y_row_stride: usize,
    uv_row_stride: usize,
    uv_pixel_stride: usize,
}

impl YuvImage {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        width: u32,
        height: u32,
        y: Vec<u8>,
        u: Vec<u8>,
        v: Vec<u8>,
        y_row_stride: usize,
        uv_row_stride: usize,
        uv_pixel_stride: usize,
    ) -> Result<Self, FrameError> {
        if width == 0 || height == 0 {
            return Err(FrameError::Empty { width, height });
        }
        let (w, h) = (width as usize, height as usize);
        let (cw, ch) = (w.div_ceil(2), h.div_ceil(2));

        if y_row_stride < w {
            return Err(FrameError::InvalidStride(format!(
                "y row stride {y_row_stride} is smaller than width {w}"
            )));
        }
        if uv_pixel_stride == 0 || uv_row_stride < uv_pixel_stride * (cw - 1) + 1 {
            return Err(FrameError::InvalidStride(format!(
                "uv strides (row {uv_row_stride}, pixel {uv_pixel_stride}) cannot hold {cw} chroma samples"
            )));
        }

        let y_needed = y_row_stride * (h - 1) + w;
        let uv_needed = uv_row_stride * (ch - 1) + uv_pixel_stride * (cw - 1) + 1;
        for (plane, len, expected) in [
            ("y", y.len(), y_needed),
            ("u", u.len(), uv_needed),
            ("v", v.len(), uv_needed),
        ] {
            if len < expected {
                return Err(FrameError::BufferSize {
                    plane,
                    expected,
                    actual: len,
                });
            }
        }

        Ok(Self {
            width,
            height,
            y,
            u,
            v,
            y_row_stride,
            uv_row_stride,
            uv_pixel_stride,
        })
    }

    /// Planar YUV420 image filled with one color.
    pub fn solid(width: u32, height: u32, yuv: [u8; 3]) -> Result<Self, FrameError> {
        let (w, h) = (width as usize, height as usize);
        let (cw, ch) = (w.div_ceil(2), h.div_ceil(2));
        Self::new(
            width,
            height,
            vec![yuv[0]; w * h],
            vec![yuv[1]; cw * ch],
            vec![yuv[2]; cw * ch],
            w,
            cw,
            1,
        )
    }

    /// Convert an RGB image to planar YUV420, averaging chroma over 2x2 blocks.
    pub fn from_rgb(image: &RgbImage) -> Result<Self, FrameError> {
        let (width, height) = image.dimensions();
        let (w, h) = (width as usize, height as usize);
        let (cw, ch) = (w.div_ceil(2), h.div_ceil(2));

        let mut y_plane = vec![0u8; w * h];
        let mut u_sum = vec![0f32; cw * ch];
        let mut v_sum = vec![0f32; cw * ch];
        let mut counts = vec![0f32; cw * ch];

        for (x, y, pixel) in image.enumerate_pixels() {
            let rgb = Vec3::new(
                pixel[0] as f32 / 255.0,
                pixel[1] as f32 / 255.0,
                pixel[2] as f32 / 255.0,
            );
            let [luma, u, v] = rgb_to_yuv(rgb);
            y_plane[y as usize * w + x as usize] = luma;

            let c = (y as usize / 2) * cw + x as usize / 2;
            u_sum[c] += u as f32;
            v_sum[c] += v as f32;
            counts[c] += 1.0;
        }

        let average = |sums: Vec<f32>| -> Vec<u8> {
            sums.iter()
                .zip(&counts)
                .map(|(s, n)| (s / n.max(1.0)).round() as u8)
                .collect()
        };
        let u_plane = average(u_sum);
        let v_plane = average(v_sum);

        Self::new(width, height, y_plane, u_plane, v_plane, w, cw, 1)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Raw `(y, u, v)` bytes at a pixel.
    ///
    /// # Panics
    ///
    /// Panics if `(x, y)` lies outside the image.
    pub fn sample(&self, x: u32, y: u32) -> [u8; 3] {
        assert!(
            x < self.width && y < self.height,
            "pixel ({x}, {y}) outside {}x{} image",
            self.width,
            self.height
        );
        let (x, y) = (x as usize, y as usize);
        let luma = self.y[y * self.y_row_stride + x];
        let c = (y / 2) * self.uv_row_stride + (x / 2) * self.uv_pixel_stride;
        [luma, self.u[c], self.v[c]]
    }

    /// RGB color at a pixel.
    pub fn rgb_at(&self, x: u32, y: u32) -> Vec3 {
        let [y, u, v] = self.sample(x, y);
        yuv_to_rgb(y, u, v)
    }
}
