//! 颜色与光照，只统计外框内部像素

use super::{CycleInputs, SignalBundle, SignalSource};
use crate::core::config::{ColorConfig, ScoreWeights};

#[derive(Debug, Clone)]
pub struct ColorimetryEvidence {
    pub bundle: SignalBundle,
    pub color_fraction: f64,
    pub mean_luminance: f64,
    pub luminance_std: f64,
}

pub struct ColorimetrySignal {
    config: ColorConfig,
    weights: ScoreWeights,
}

impl ColorimetrySignal {
    pub fn new(config: ColorConfig, weights: ScoreWeights) -> Self {
        Self { config, weights }
    }

    pub fn extract(&self, inputs: &CycleInputs) -> ColorimetryEvidence {
        let mut inside = 0u64;
        let mut in_band = 0u64;
        let mut sum = 0.0f64;
        let mut sum_sq = 0.0f64;

        for (x, y, mask) in inputs.region.enumerate_pixels() {
            if mask[0] == 0 {
                continue;
            }
            inside += 1;

            let [r, g, b] = inputs.rgb.get_pixel(x, y).0;
            let (h, s, v) = rgb_to_hsv(r, g, b);
            if self.config.bands.iter().any(|band| band.contains(h, s, v)) {
                in_band += 1;
            }

            let luma = inputs.gray.get_pixel(x, y)[0] as f64;
            sum += luma;
            sum_sq += luma * luma;
        }

        let (color_fraction, mean_luminance, luminance_std) = if inside == 0 {
            (0.0, 0.0, 0.0)
        } else {
            let n = inside as f64;
            let mean = sum / n;
            let variance = (sum_sq / n - mean * mean).max(0.0);
            (in_band as f64 / n, mean, variance.sqrt())
        };

        let mut bundle = SignalBundle::new(SignalSource::Colorimetry);
        bundle.check(
            color_fraction > self.config.min_color_fraction,
            self.weights.color,
            format!("Document color {:.1}%", color_fraction * 100.0),
        );
        bundle.check(
            mean_luminance > self.config.lighting_min && mean_luminance < self.config.lighting_max,
            self.weights.lighting,
            format!("Lighting {:.0}", mean_luminance),
        );
        bundle.check(
            inside > 0 && luminance_std < self.config.max_luminance_std,
            self.weights.uniformity,
            format!("Lighting uniformity σ={:.1}", luminance_std),
        );

        ColorimetryEvidence {
            bundle,
            color_fraction,
            mean_luminance,
            luminance_std,
        }
    }
}

/// RGB -> HSV，8 位刻度：H 0-180，S/V 0-255
pub fn rgb_to_hsv(r: u8, g: u8, b: u8) -> (u8, u8, u8) {
    let r_n = r as f32 / 255.0;
    let g_n = g as f32 / 255.0;
    let b_n = b as f32 / 255.0;

    let max = r_n.max(g_n).max(b_n);
    let min = r_n.min(g_n).min(b_n);
    let delta = max - min;

    let h = if delta < 1e-6 {
        0.0
    } else if (max - r_n).abs() < 1e-6 {
        60.0 * (((g_n - b_n) / delta) % 6.0)
    } else if (max - g_n).abs() < 1e-6 {
        60.0 * (((b_n - r_n) / delta) + 2.0)
    } else {
        60.0 * (((r_n - g_n) / delta) + 4.0)
    };
    let h = if h < 0.0 { h + 360.0 } else { h };

    let s = if max < 1e-6 { 0.0 } else { delta / max };

    (
        (h / 2.0).round().min(180.0) as u8,
        (s * 255.0).round() as u8,
        (max * 255.0).round() as u8,
    )
}
