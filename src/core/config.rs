//! 检测配置
//!
//! 所有阈值都是经验值，集中在这里，可以从 JSON5 字符串整体覆盖。

use crate::core::error::DetectorError;
use serde::{Deserialize, Serialize};

/// 护照关键词（俄 / 英）
pub const DEFAULT_KEYWORDS: [&str; 12] = [
    "паспорт", "passport", "россия", "russia", "фмс", "мвд", "личность", "identity", "фамилия",
    "surname", "имя", "name",
];

pub const MIN_INTERVAL_MS: u64 = 200;
pub const MAX_INTERVAL_MS: u64 = 1500;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    pub sampler: SamplerConfig,
    pub preprocess: PreprocessConfig,
    pub contours: ContourConfig,
    pub geometry: GeometryConfig,
    pub structure: StructureConfig,
    pub color: ColorConfig,
    pub text: TextConfig,
    pub classifier: ClassifierConfig,
    pub weights: ScoreWeights,
    pub scheduler: SchedulerConfig,
}

impl DetectorConfig {
    /// 解析 JSON5 并校验，未给出的字段使用默认值
    pub fn from_json5(source: &str) -> Result<Self, DetectorError> {
        let config: DetectorConfig = json5::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, DetectorError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), DetectorError> {
        if self.sampler.target_width == 0 || self.sampler.target_height == 0 {
            return Err(DetectorError::InvalidConfig(
                "sampler target dimensions must be non-zero".into(),
            ));
        }

        let total = self.weights.total();
        if total != 100 {
            return Err(DetectorError::InvalidConfig(format!(
                "score weights must sum to 100, got {}",
                total
            )));
        }

        if !(MIN_INTERVAL_MS..=MAX_INTERVAL_MS).contains(&self.scheduler.interval_ms) {
            return Err(DetectorError::InvalidConfig(format!(
                "scheduler interval {}ms outside {}-{}ms",
                self.scheduler.interval_ms, MIN_INTERVAL_MS, MAX_INTERVAL_MS
            )));
        }

        if self.scheduler.acceptance_threshold > 100 {
            return Err(DetectorError::InvalidConfig(format!(
                "acceptance threshold {} exceeds 100",
                self.scheduler.acceptance_threshold
            )));
        }

        if self.contours.min_outer_vertices > self.contours.max_outer_vertices {
            return Err(DetectorError::InvalidConfig(
                "outer vertex range is empty".into(),
            ));
        }

        if self.contours.approx_epsilon_ratio <= 0.0 {
            return Err(DetectorError::InvalidConfig(
                "approx_epsilon_ratio must be positive".into(),
            ));
        }

        if self.preprocess.threshold_sigma <= 0.0 {
            return Err(DetectorError::InvalidConfig(
                "threshold_sigma must be positive".into(),
            ));
        }

        regex::RegexSet::new(self.text.patterns())
            .map_err(|e| DetectorError::InvalidConfig(format!("keyword pattern: {}", e)))?;

        Ok(())
    }
}

/// 取景框
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerConfig {
    pub target_width: u32,
    pub target_height: u32,
    /// 取景框四周额外带入的像素
    pub margin: u32,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            target_width: 350,
            target_height: 490,
            margin: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    pub median_radius: u32,
    pub sharpen: bool,
    /// 自适应阈值的高斯 sigma（2.0 对应 11px 窗口）
    pub threshold_sigma: f32,
    pub threshold_offset: u8,
    /// 形态学结构元半径，1 => 3x3
    pub morph_radius: u8,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            median_radius: 1,
            sharpen: true,
            threshold_sigma: 2.0,
            threshold_offset: 2,
            morph_radius: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContourConfig {
    pub min_outer_area: f64,
    pub min_outer_vertices: usize,
    pub max_outer_vertices: usize,
    /// 多边形近似 epsilon 占周长比例
    pub approx_epsilon_ratio: f64,
    pub sub_region_min_area: f64,
    pub sub_region_max_area: f64,
    pub photo_min_area: f64,
    pub photo_max_area: f64,
    pub photo_aspect_tolerance: f64,
    pub stamp_max_area: f64,
    pub stamp_aspect_tolerance: f64,
    pub text_field_min_area: f64,
}

impl Default for ContourConfig {
    fn default() -> Self {
        Self {
            min_outer_area: 1000.0,
            min_outer_vertices: 4,
            max_outer_vertices: 6,
            approx_epsilon_ratio: 0.02,
            sub_region_min_area: 50.0,
            sub_region_max_area: 2000.0,
            photo_min_area: 300.0,
            photo_max_area: 1200.0,
            photo_aspect_tolerance: 0.3,
            stamp_max_area: 300.0,
            stamp_aspect_tolerance: 0.2,
            text_field_min_area: 100.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeometryConfig {
    pub min_area_ratio: f64,
    pub max_area_ratio: f64,
    /// 护照页 88:125
    pub ideal_aspect: f64,
    pub aspect_tolerance: f64,
    pub min_solidity: f64,
}

impl Default for GeometryConfig {
    fn default() -> Self {
        Self {
            min_area_ratio: 0.60,
            max_area_ratio: 1.00,
            ideal_aspect: 88.0 / 125.0,
            aspect_tolerance: 0.2,
            min_solidity: 0.85,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StructureConfig {
    pub min_photos: usize,
    pub min_stamps: usize,
    pub min_text_fields: usize,
    pub min_gradient_uniformity: f64,
}

impl Default for StructureConfig {
    fn default() -> Self {
        Self {
            min_photos: 1,
            min_stamps: 1,
            min_text_fields: 2,
            min_gradient_uniformity: 0.3,
        }
    }
}

/// HSV 区间，H 为 0-180（OpenCV 约定），S/V 为 0-255
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HsvBand {
    pub hue_min: u8,
    pub hue_max: u8,
    pub sat_min: u8,
    pub sat_max: u8,
    pub val_min: u8,
    pub val_max: u8,
}

impl HsvBand {
    pub fn contains(&self, h: u8, s: u8, v: u8) -> bool {
        (self.hue_min..=self.hue_max).contains(&h)
            && (self.sat_min..=self.sat_max).contains(&s)
            && (self.val_min..=self.val_max).contains(&v)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorConfig {
    /// 文档主色，默认是护照封皮的红色（跨 0° 所以两段）
    pub bands: Vec<HsvBand>,
    pub min_color_fraction: f64,
    pub lighting_min: f64,
    pub lighting_max: f64,
    pub max_luminance_std: f64,
}

impl Default for ColorConfig {
    fn default() -> Self {
        Self {
            bands: vec![
                HsvBand {
                    hue_min: 0,
                    hue_max: 10,
                    sat_min: 50,
                    sat_max: 255,
                    val_min: 50,
                    val_max: 255,
                },
                HsvBand {
                    hue_min: 170,
                    hue_max: 180,
                    sat_min: 50,
                    sat_max: 255,
                    val_min: 50,
                    val_max: 255,
                },
            ],
            min_color_fraction: 0.15,
            lighting_min: 50.0,
            lighting_max: 200.0,
            max_luminance_std: 60.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextConfig {
    pub keywords: Vec<String>,
    pub min_keywords: usize,
    pub min_confidence: f32,
}

impl TextConfig {
    /// 每个关键词一条大小写不敏感的子串模式
    pub fn patterns(&self) -> Vec<String> {
        self.keywords
            .iter()
            .map(|k| format!("(?i){}", regex::escape(k)))
            .collect()
    }
}

impl Default for TextConfig {
    fn default() -> Self {
        Self {
            keywords: DEFAULT_KEYWORDS.iter().map(|k| k.to_string()).collect(),
            min_keywords: 2,
            min_confidence: 50.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// 概率向量中"目标文档"的下标
    pub positive_class: usize,
    /// 百分比
    pub min_probability: f32,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            positive_class: 1,
            min_probability: 50.0,
        }
    }
}

/// 各项得分，总和必须为 100
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    pub area: u8,
    pub aspect: u8,
    pub vertices: u8,
    pub solidity: u8,
    pub photo: u8,
    pub stamp: u8,
    pub text_fields: u8,
    pub gradient: u8,
    pub keywords: u8,
    pub ocr_quality: u8,
    pub classifier: u8,
    pub color: u8,
    pub lighting: u8,
    pub uniformity: u8,
}

impl ScoreWeights {
    pub fn geometry(&self) -> u32 {
        self.area as u32 + self.aspect as u32 + self.vertices as u32 + self.solidity as u32
    }

    pub fn structure(&self) -> u32 {
        self.photo as u32 + self.stamp as u32 + self.text_fields as u32 + self.gradient as u32
    }

    pub fn text(&self) -> u32 {
        self.keywords as u32 + self.ocr_quality as u32
    }

    pub fn colorimetry(&self) -> u32 {
        self.color as u32 + self.lighting as u32 + self.uniformity as u32
    }

    pub fn total(&self) -> u32 {
        self.geometry() + self.structure() + self.text() + self.colorimetry() + self.classifier as u32
    }

    /// 只用几何 + 结构（无 OCR / 模型 / 颜色）的经典分配
    pub fn geometry_only() -> Self {
        Self {
            area: 30,
            aspect: 20,
            vertices: 15,
            solidity: 10,
            photo: 10,
            stamp: 8,
            text_fields: 7,
            gradient: 0,
            keywords: 0,
            ocr_quality: 0,
            classifier: 0,
            color: 0,
            lighting: 0,
            uniformity: 0,
        }
    }
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            area: 15,
            aspect: 10,
            vertices: 5,
            solidity: 5,
            photo: 8,
            stamp: 5,
            text_fields: 7,
            gradient: 5,
            keywords: 15,
            ocr_quality: 5,
            classifier: 15,
            color: 3,
            lighting: 1,
            uniformity: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub interval_ms: u64,
    pub acceptance_threshold: u8,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval_ms: 500,
            acceptance_threshold: 70,
        }
    }
}

impl SchedulerConfig {
    pub fn responsive() -> Self {
        Self {
            interval_ms: MIN_INTERVAL_MS,
            ..Default::default()
        }
    }

    pub fn battery_saver() -> Self {
        Self {
            interval_ms: MAX_INTERVAL_MS,
            ..Default::default()
        }
    }
}
