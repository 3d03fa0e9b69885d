//! 二值化预处理：去噪 -> 锐化 -> 灰度 -> 自适应阈值 -> 闭/开运算

use super::frame::FrameBuffer;
use crate::core::config::PreprocessConfig;
use image::{imageops, GrayImage, Luma};
use imageproc::distance_transform::Norm;
use imageproc::filter::{filter3x3, gaussian_blur_f32, median_filter};
use imageproc::morphology::{close, open};

const SHARPEN_KERNEL: [f32; 9] = [0.0, -1.0, 0.0, -1.0, 5.0, -1.0, 0.0, -1.0, 0.0];

pub struct Preprocessor {
    config: PreprocessConfig,
}

impl Preprocessor {
    pub fn new(config: PreprocessConfig) -> Self {
        Self { config }
    }

    /// 输出与输入同尺寸的二值掩码（0 / 255）
    pub fn run(&self, frame: &FrameBuffer) -> GrayImage {
        let rgb = frame.to_rgb();

        let denoised = if self.config.median_radius > 0 {
            median_filter(&rgb, self.config.median_radius, self.config.median_radius)
        } else {
            rgb
        };

        let sharpened = if self.config.sharpen {
            filter3x3::<_, f32, u8>(&denoised, &SHARPEN_KERNEL)
        } else {
            denoised
        };

        let gray = imageops::grayscale(&sharpened);
        let binary = adaptive_threshold(
            &gray,
            self.config.threshold_sigma,
            self.config.threshold_offset,
        );

        let k = self.config.morph_radius;
        if k == 0 {
            return binary;
        }
        let closed = close(&binary, Norm::LInf, k);
        open(&closed, Norm::LInf, k)
    }
}

/// 像素值大于 (高斯局部均值 - offset) 即为前景，减法在 0 处饱和
pub fn adaptive_threshold(gray: &GrayImage, sigma: f32, offset: u8) -> GrayImage {
    let local_mean = gaussian_blur_f32(gray, sigma);
    let mut binary = GrayImage::new(gray.width(), gray.height());

    for (x, y, pixel) in binary.enumerate_pixels_mut() {
        let value = gray.get_pixel(x, y)[0];
        let threshold = local_mean.get_pixel(x, y)[0].saturating_sub(offset);
        *pixel = Luma([if value > threshold { 255 } else { 0 }]);
    }

    binary
}
