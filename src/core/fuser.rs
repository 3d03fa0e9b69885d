//! 证据融合：各信号得分相加并截断到 0-100

use crate::core::signals::{
    ClassifierEvidence, ColorimetryEvidence, GeometryEvidence, StructureEvidence, TextEvidence,
};
use serde::{Deserialize, Serialize};

pub const NO_OUTLINE_FEATURE: &str = "✗ Document outline not found";

/// 单帧检测结果，创建后不再修改
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    pub probability: u8,
    pub features: Vec<String>,
    pub stats: DetectionStats,
}

impl DetectionResult {
    pub fn no_candidate(total_contours: usize) -> Self {
        Self {
            probability: 0,
            features: vec![NO_OUTLINE_FEATURE.to_string()],
            stats: DetectionStats {
                total_contours,
                ..Default::default()
            },
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionStats {
    pub candidate_found: bool,
    pub total_contours: usize,
    pub area_ratio: f64,
    pub aspect_ratio: f64,
    pub vertices: usize,
    pub solidity: f64,
    pub sub_regions: usize,
    pub photos: usize,
    pub stamps: usize,
    pub text_fields: usize,
    pub unknown_regions: usize,
    pub gradient_uniformity: f64,
    pub color_fraction: f64,
    pub mean_luminance: f64,
    pub luminance_std: f64,
    pub keywords_found: Vec<String>,
    pub ocr_confidence: Option<f32>,
    pub classifier_probability: Option<f32>,
}

/// 一个周期内所有信号的输出
pub struct CycleEvidence {
    pub total_contours: usize,
    pub geometry: GeometryEvidence,
    pub structure: StructureEvidence,
    pub colorimetry: ColorimetryEvidence,
    pub text: TextEvidence,
    pub classifier: ClassifierEvidence,
}

pub fn fuse(evidence: CycleEvidence) -> DetectionResult {
    let CycleEvidence {
        total_contours,
        geometry,
        structure,
        colorimetry,
        text,
        classifier,
    } = evidence;

    let bundles = [
        &geometry.bundle,
        &structure.bundle,
        &colorimetry.bundle,
        &text.bundle,
        &classifier.bundle,
    ];
    let score: u32 = bundles.iter().map(|b| b.score).sum();
    let features = bundles
        .iter()
        .flat_map(|b| b.features.iter().cloned())
        .collect();

    let stats = DetectionStats {
        candidate_found: true,
        total_contours,
        area_ratio: geometry.area_ratio,
        aspect_ratio: geometry.aspect_ratio,
        vertices: geometry.vertices,
        solidity: geometry.solidity,
        sub_regions: structure.photos + structure.stamps + structure.text_fields + structure.unknown,
        photos: structure.photos,
        stamps: structure.stamps,
        text_fields: structure.text_fields,
        unknown_regions: structure.unknown,
        gradient_uniformity: structure.gradient_uniformity,
        color_fraction: colorimetry.color_fraction,
        mean_luminance: colorimetry.mean_luminance,
        luminance_std: colorimetry.luminance_std,
        keywords_found: text.keywords_found,
        ocr_confidence: text.confidence,
        classifier_probability: classifier.probability,
    };

    DetectionResult {
        probability: score.min(100) as u8,
        features,
        stats,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::signals::{SignalBundle, SignalSource};

    fn bundle(source: SignalSource, score: u32, feature: &str) -> SignalBundle {
        SignalBundle {
            source,
            score,
            features: vec![feature.to_string()],
        }
    }

    fn evidence(scores: [u32; 5]) -> CycleEvidence {
        CycleEvidence {
            total_contours: 12,
            geometry: GeometryEvidence {
                bundle: bundle(SignalSource::Geometry, scores[0], "g"),
                area_ratio: 0.7,
                aspect_ratio: 0.7,
                vertices: 4,
                solidity: 0.99,
            },
            structure: StructureEvidence {
                bundle: bundle(SignalSource::Structure, scores[1], "s"),
                photos: 1,
                stamps: 0,
                text_fields: 2,
                unknown: 3,
                gradient_uniformity: 0.5,
            },
            colorimetry: ColorimetryEvidence {
                bundle: bundle(SignalSource::Colorimetry, scores[2], "c"),
                color_fraction: 0.0,
                mean_luminance: 150.0,
                luminance_std: 20.0,
            },
            text: TextEvidence {
                bundle: bundle(SignalSource::Text, scores[3], "t"),
                keywords_found: vec!["passport".into()],
                confidence: Some(60.0),
            },
            classifier: ClassifierEvidence {
                bundle: bundle(SignalSource::Classifier, scores[4], "m"),
                probability: None,
            },
        }
    }

    #[test]
    fn test_fuse_sums_and_orders() {
        let result = fuse(evidence([35, 15, 2, 20, 0]));

        assert_eq!(result.probability, 72);
        assert_eq!(result.features, vec!["g", "s", "c", "t", "m"]);
        assert_eq!(result.stats.sub_regions, 6);
        assert_eq!(result.stats.total_contours, 12);
        assert!(result.stats.candidate_found);
    }

    #[test]
    fn test_fuse_clamps() {
        let result = fuse(evidence([80, 80, 0, 0, 0]));
        assert_eq!(result.probability, 100);
    }

    #[test]
    fn test_no_candidate() {
        let result = DetectionResult::no_candidate(3);

        assert_eq!(result.probability, 0);
        assert_eq!(result.features, vec![NO_OUTLINE_FEATURE]);
        assert!(!result.stats.candidate_found);
        assert!(result.to_json().unwrap().contains("\"probability\":0"));
    }
}
