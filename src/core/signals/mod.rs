//! 证据信号
//!
//! 每个提取器只读同一份周期输入，互不依赖，可以并发执行；
//! 输出一个 SignalBundle（得分 + ✓/✗ 说明）和各自的原始测量值。

pub mod classifier;
pub mod colorimetry;
pub mod geometry;
pub mod structure;
pub mod text;

use crate::core::vision::{ContourAnalysis, FrameBuffer, OuterCandidate};
use image::{GrayImage, RgbImage};
use serde::Serialize;

pub use classifier::{ClassifierEvidence, ClassifierSignal};
pub use colorimetry::{ColorimetryEvidence, ColorimetrySignal};
pub use geometry::{GeometryEvidence, GeometrySignal};
pub use structure::{StructureEvidence, StructureSignal};
pub use text::{TextEvidence, TextSignal};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SignalSource {
    Geometry,
    Structure,
    Colorimetry,
    Text,
    Classifier,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SignalBundle {
    pub source: SignalSource,
    /// 0-100 刻度上的得分
    pub score: u32,
    pub features: Vec<String>,
}

impl SignalBundle {
    pub fn new(source: SignalSource) -> Self {
        Self {
            source,
            score: 0,
            features: Vec::new(),
        }
    }

    /// 通过则加分，说明前缀 ✓，否则 ✗
    pub fn check(&mut self, passed: bool, points: u8, description: impl AsRef<str>) {
        if passed {
            self.score += points as u32;
            self.features.push(format!("✓ {}", description.as_ref()));
        } else {
            self.features.push(format!("✗ {}", description.as_ref()));
        }
    }
}

/// 一个周期内所有提取器共享的只读输入
pub struct CycleInputs<'a> {
    pub frame: &'a FrameBuffer,
    pub rgb: &'a RgbImage,
    pub gray: &'a GrayImage,
    /// 外框填充掩码
    pub region: &'a GrayImage,
    /// 外框外接矩形裁剪，给 OCR / 分类模型
    pub crop: &'a RgbImage,
    pub analysis: &'a ContourAnalysis,
    pub outer: &'a OuterCandidate,
}
