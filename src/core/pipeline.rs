//! 单帧检测流水线
//!
//! 采样 -> 二值化 -> 轮廓 -> 五路信号（rayon 并发）-> 融合

use crate::core::config::DetectorConfig;
use crate::core::engines::{ImageClassifier, TextRecognizer};
use crate::core::error::DetectorError;
use crate::core::fuser::{fuse, CycleEvidence, DetectionResult};
use crate::core::signals::{
    ClassifierSignal, ColorimetrySignal, CycleInputs, GeometrySignal, StructureSignal, TextSignal,
};
use crate::core::vision::geometry::region_mask;
use crate::core::vision::{
    ContourAnalysis, ContourExtractor, FrameBuffer, FrameSampler, Preprocessor, VideoSource,
};
use image::{imageops, GrayImage};
use log::debug;
use std::sync::Arc;

/// 一帧的完整分析产物（叠加图需要轮廓）
pub struct FrameAnalysis {
    pub result: DetectionResult,
    pub contours: ContourAnalysis,
}

pub struct DetectionPipeline {
    config: DetectorConfig,
    sampler: FrameSampler,
    preprocessor: Preprocessor,
    extractor: ContourExtractor,
    geometry: GeometrySignal,
    structure: StructureSignal,
    colorimetry: ColorimetrySignal,
    text: TextSignal,
    classifier: ClassifierSignal,
}

impl DetectionPipeline {
    pub fn new(config: DetectorConfig) -> Result<Self, DetectorError> {
        config.validate()?;

        let weights = config.weights.clone();
        let vertex_range = config.contours.min_outer_vertices..=config.contours.max_outer_vertices;

        Ok(Self {
            sampler: FrameSampler::new(config.sampler.clone()),
            preprocessor: Preprocessor::new(config.preprocess.clone()),
            extractor: ContourExtractor::new(config.contours.clone()),
            geometry: GeometrySignal::new(config.geometry.clone(), vertex_range, weights.clone()),
            structure: StructureSignal::new(config.structure.clone(), weights.clone()),
            colorimetry: ColorimetrySignal::new(config.color.clone(), weights.clone()),
            text: TextSignal::new(config.text.clone(), weights.clone())?,
            classifier: ClassifierSignal::new(config.classifier.clone(), weights),
            config,
        })
    }

    pub fn with_text_recognizer(mut self, engine: Arc<dyn TextRecognizer>) -> Self {
        self.text.set_engine(engine);
        self
    }

    pub fn with_classifier(mut self, engine: Arc<dyn ImageClassifier>) -> Self {
        self.classifier.set_engine(engine);
        self
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    pub fn sampler(&self) -> &FrameSampler {
        &self.sampler
    }

    /// 从视频源取一帧
    pub fn capture(&self, source: &dyn VideoSource) -> Result<FrameBuffer, DetectorError> {
        if !source.is_active() {
            return Err(DetectorError::CameraInactive);
        }
        self.sampler.sample(source).ok_or(DetectorError::NoFrame)
    }

    /// 单次检测，不经过调度器
    pub fn capture_and_analyze(&self, source: &dyn VideoSource) -> Result<DetectionResult, DetectorError> {
        let frame = self.capture(source)?;
        Ok(self.analyze(&frame))
    }

    pub fn analyze(&self, frame: &FrameBuffer) -> DetectionResult {
        self.inspect(frame).result
    }

    pub fn inspect(&self, frame: &FrameBuffer) -> FrameAnalysis {
        let mask = self.preprocessor.run(frame);
        self.inspect_mask(frame, &mask)
    }

    pub(crate) fn inspect_mask(&self, frame: &FrameBuffer, mask: &GrayImage) -> FrameAnalysis {
        let contours = self.extractor.extract(mask);

        let Some(outer) = contours.outer.as_ref() else {
            debug!("📄 Frame #{}: no outline", frame.frame_number());
            return FrameAnalysis {
                result: DetectionResult::no_candidate(contours.total_contours),
                contours,
            };
        };

        let rgb = frame.to_rgb();
        let gray = imageops::grayscale(&rgb);
        let region = region_mask(frame.width(), frame.height(), &outer.shape.points);
        let bounds = outer.shape.bounds;
        let crop = imageops::crop_imm(
            &rgb,
            bounds.x.max(0) as u32,
            bounds.y.max(0) as u32,
            bounds.width,
            bounds.height,
        )
        .to_image();

        let inputs = CycleInputs {
            frame,
            rgb: &rgb,
            gray: &gray,
            region: &region,
            crop: &crop,
            analysis: &contours,
            outer,
        };

        let ((geometry, structure), (colorimetry, (text, classifier))) = rayon::join(
            || {
                rayon::join(
                    || self.geometry.extract(&inputs),
                    || self.structure.extract(&inputs),
                )
            },
            || {
                rayon::join(
                    || self.colorimetry.extract(&inputs),
                    || {
                        rayon::join(
                            || self.text.extract(inputs.crop),
                            || self.classifier.extract(inputs.crop),
                        )
                    },
                )
            },
        );

        let result = fuse(CycleEvidence {
            total_contours: contours.total_contours,
            geometry,
            structure,
            colorimetry,
            text,
            classifier,
        });
        debug!(
            "📄 Frame #{}: {}% ({} features)",
            frame.frame_number(),
            result.probability,
            result.features.len()
        );

        FrameAnalysis { result, contours }
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::passport_frame;
    use super::*;
    use crate::core::engines::{MockClassifier, MockTextRecognizer};
    use crate::core::fuser::NO_OUTLINE_FEATURE;
    use crate::core::vision::contours::fixtures::{document_mask, passport_mask, HEIGHT, WIDTH};
    use crate::core::vision::{RgbaFrame, SharedFrameSource, VideoFrame};
    use image::{Rgba, RgbaImage};
    use imageproc::rect::Rect;

    fn pipeline() -> DetectionPipeline {
        DetectionPipeline::new(DetectorConfig::default()).unwrap()
    }

    fn has_feature(result: &DetectionResult, prefix: &str) -> bool {
        result.features.iter().any(|f| f.starts_with(prefix))
    }

    #[test]
    fn test_rejects_invalid_config() {
        let mut config = DetectorConfig::default();
        config.weights.area = 90;
        assert!(matches!(
            DetectionPipeline::new(config),
            Err(DetectorError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_passport_accepted() {
        let pipeline = pipeline().with_text_recognizer(Arc::new(MockTextRecognizer::with_text(
            "РОССИЙСКАЯ ФЕДЕРАЦИЯ\nПАСПОРТ / PASSPORT",
            85.0,
        )));

        // 走完整的二值化，不用手画掩码
        let analysis = pipeline.inspect(&passport_frame());
        let result = analysis.result;

        let outer = analysis.contours.outer.as_ref().unwrap();
        assert_eq!((outer.shape.bounds.x, outer.shape.bounds.y), (30, 38));
        assert_eq!((outer.shape.bounds.width, outer.shape.bounds.height), (290, 413));

        assert!(result.probability >= 70, "probability {}", result.probability);
        assert!(has_feature(&result, "✓ Photo regions: 1"));
        assert!(has_feature(&result, "✓ Stamp regions: 1"));
        assert!(has_feature(&result, "✓ Text fields: 2"));
        assert!(has_feature(&result, "✓ Keywords"));
        assert_eq!(result.stats.vertices, 4);
        assert!(result.stats.mean_luminance > 50.0 && result.stats.mean_luminance < 200.0);
    }

    #[test]
    fn test_passport_mask_structure() {
        let result = pipeline().inspect_mask(&passport_frame(), &passport_mask()).result;

        assert_eq!(result.stats.photos, 1);
        assert_eq!(result.stats.stamps, 1);
        assert_eq!(result.stats.text_fields, 2);
        assert!(has_feature(&result, "✓ Aspect ratio"));
    }

    #[test]
    fn test_black_frame_scores_zero() {
        let frame = FrameBuffer::new(
            RgbaImage::from_pixel(WIDTH, HEIGHT, Rgba([0, 0, 0, 255])),
            0,
        );
        let result = pipeline().analyze(&frame);

        assert_eq!(result.probability, 0);
        assert_eq!(result.features, vec![NO_OUTLINE_FEATURE]);
    }

    #[test]
    fn test_wide_candidate_partial_score() {
        let mask = document_mask(Rect::at(10, 190).of_size(330, 110), &[]);
        let result = pipeline().inspect_mask(&passport_frame(), &mask).result;

        assert!(result.probability > 0 && result.probability < 70);
        assert!(has_feature(&result, "✗ Aspect ratio 3.00"));
        assert!(has_feature(&result, "✓ Outline vertices"));
    }

    #[test]
    fn test_idempotent() {
        let pipeline = pipeline();
        let frame = passport_frame();

        let first = pipeline.analyze(&frame);
        let second = pipeline.analyze(&frame);
        assert_eq!(first, second);

        let masked_first = pipeline.inspect_mask(&frame, &passport_mask()).result;
        let masked_second = pipeline.inspect_mask(&frame, &passport_mask()).result;
        assert_eq!(masked_first, masked_second);
    }

    #[test]
    fn test_engine_failures_are_absorbed() {
        let baseline = pipeline().inspect_mask(&passport_frame(), &passport_mask()).result;

        let failing = pipeline()
            .with_text_recognizer(Arc::new(MockTextRecognizer::failing("timeout")))
            .with_classifier(Arc::new(MockClassifier::failing("oom")));
        let result = failing.inspect_mask(&passport_frame(), &passport_mask()).result;

        assert_eq!(result.probability, baseline.probability);
        assert_eq!(result.features, baseline.features);
    }

    #[test]
    fn test_classifier_contributes() {
        let baseline = pipeline().inspect_mask(&passport_frame(), &passport_mask()).result;
        let with_model = pipeline()
            .with_classifier(Arc::new(MockClassifier::with_probabilities(vec![0.25, 0.75])));
        let result = with_model.inspect_mask(&passport_frame(), &passport_mask()).result;

        assert_eq!(result.probability, baseline.probability + 15);
        assert_eq!(result.stats.classifier_probability, Some(75.0));
    }

    #[test]
    fn test_capture_and_analyze_misuse() {
        let pipeline = pipeline();
        let source = SharedFrameSource::new();
        assert!(matches!(
            pipeline.capture_and_analyze(&source),
            Err(DetectorError::CameraInactive)
        ));

        source.set_active(true);
        assert!(matches!(
            pipeline.capture_and_analyze(&source),
            Err(DetectorError::NoFrame)
        ));

        source.publish(Some(VideoFrame::Rgba(RgbaFrame {
            width: 640,
            height: 640,
            data: vec![0u8; 640 * 640 * 4],
            frame_number: 3,
        })));
        let result = pipeline.capture_and_analyze(&source).unwrap();
        assert_eq!(result.probability, 0);
    }
}
