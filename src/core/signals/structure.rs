//! 内部结构：子区域计数 + 简化 HOG 梯度方向均匀度

use super::{CycleInputs, SignalBundle, SignalSource};
use crate::core::config::{ScoreWeights, StructureConfig};
use crate::core::vision::SubRegionKind;
use image::GrayImage;
use imageproc::gradients::{horizontal_sobel, vertical_sobel};

const ORIENTATION_BINS: usize = 9;

#[derive(Debug, Clone)]
pub struct StructureEvidence {
    pub bundle: SignalBundle,
    pub photos: usize,
    pub stamps: usize,
    pub text_fields: usize,
    pub unknown: usize,
    pub gradient_uniformity: f64,
}

pub struct StructureSignal {
    config: StructureConfig,
    weights: ScoreWeights,
}

impl StructureSignal {
    pub fn new(config: StructureConfig, weights: ScoreWeights) -> Self {
        Self { config, weights }
    }

    pub fn extract(&self, inputs: &CycleInputs) -> StructureEvidence {
        let analysis = inputs.analysis;
        let photos = analysis.count(SubRegionKind::Photo);
        let stamps = analysis.count(SubRegionKind::Stamp);
        let text_fields = analysis.count(SubRegionKind::TextField);
        let unknown = analysis.count(SubRegionKind::Unknown);

        let mut bundle = SignalBundle::new(SignalSource::Structure);
        bundle.check(
            photos >= self.config.min_photos,
            self.weights.photo,
            format!("Photo regions: {}", photos),
        );
        bundle.check(
            stamps >= self.config.min_stamps,
            self.weights.stamp,
            format!("Stamp regions: {}", stamps),
        );
        bundle.check(
            text_fields >= self.config.min_text_fields,
            self.weights.text_fields,
            format!("Text fields: {}", text_fields),
        );

        let gradient_uniformity = if self.weights.gradient > 0 {
            let uniformity = gradient_uniformity(inputs.gray, inputs.region);
            bundle.check(
                uniformity > self.config.min_gradient_uniformity,
                self.weights.gradient,
                format!("Gradient structure {:.2}", uniformity),
            );
            uniformity
        } else {
            0.0
        };

        StructureEvidence {
            bundle,
            photos,
            stamps,
            text_fields,
            unknown,
            gradient_uniformity,
        }
    }
}

/// 区域内 Sobel 梯度方向直方图（0-180°，9 个桶），min-max 归一化后
/// `1 - sqrt(Σ(h_i - 1/9)² / 9)`。区域内没有梯度返回 0。
pub fn gradient_uniformity(gray: &GrayImage, region: &GrayImage) -> f64 {
    let gx = horizontal_sobel(gray);
    let gy = vertical_sobel(gray);

    let mut histogram = [0u32; ORIENTATION_BINS];
    let mut counted = 0u32;
    for (x, y, mask) in region.enumerate_pixels() {
        if mask[0] == 0 {
            continue;
        }
        let dx = gx.get_pixel(x, y)[0];
        let dy = gy.get_pixel(x, y)[0];
        if dx == 0 && dy == 0 {
            continue;
        }

        let mut angle = (dy as f64).atan2(dx as f64).to_degrees();
        if angle < 0.0 {
            angle += 180.0;
        }
        let bin = ((angle / 180.0 * ORIENTATION_BINS as f64) as usize) % ORIENTATION_BINS;
        histogram[bin] += 1;
        counted += 1;
    }

    if counted == 0 {
        return 0.0;
    }

    let max = histogram.iter().copied().max().unwrap_or(0) as f64;
    let min = histogram.iter().copied().min().unwrap_or(0) as f64;
    let range = max - min;
    let expected = 1.0 / ORIENTATION_BINS as f64;

    let deviation: f64 = histogram
        .iter()
        .map(|&h| {
            let normalized = if range > 0.0 { (h as f64 - min) / range } else { 0.0 };
            (normalized - expected).powi(2)
        })
        .sum();

    1.0 - (deviation / ORIENTATION_BINS as f64).sqrt()
}
