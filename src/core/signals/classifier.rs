use super::{SignalBundle, SignalSource};
use crate::core::config::{ClassifierConfig, ScoreWeights};
use crate::core::engines::ImageClassifier;
use image::RgbImage;
use log::warn;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct ClassifierEvidence {
    pub bundle: SignalBundle,
    /// 百分比；模型不可用时为 None
    pub probability: Option<f32>,
}

pub struct ClassifierSignal {
    config: ClassifierConfig,
    weights: ScoreWeights,
    engine: Option<Arc<dyn ImageClassifier>>,
}

impl ClassifierSignal {
    pub fn new(config: ClassifierConfig, weights: ScoreWeights) -> Self {
        Self {
            config,
            weights,
            engine: None,
        }
    }

    pub fn set_engine(&mut self, engine: Arc<dyn ImageClassifier>) {
        self.engine = Some(engine);
    }

    pub fn extract(&self, crop: &RgbImage) -> ClassifierEvidence {
        let unavailable = ClassifierEvidence {
            bundle: SignalBundle::new(SignalSource::Classifier),
            probability: None,
        };

        let Some(engine) = self.engine.as_ref().filter(|e| e.is_ready()) else {
            return unavailable;
        };

        let probabilities = match engine.classify(crop) {
            Ok(p) => p,
            Err(e) => {
                warn!("⚠️ Classifier failed, skipping: {}", e);
                return unavailable;
            }
        };

        let Some(&raw) = probabilities.get(self.config.positive_class) else {
            warn!(
                "⚠️ Classifier returned {} classes, expected index {}",
                probabilities.len(),
                self.config.positive_class
            );
            return unavailable;
        };

        let probability = raw.clamp(0.0, 1.0) * 100.0;
        let mut bundle = SignalBundle::new(SignalSource::Classifier);
        bundle.check(
            probability > self.config.min_probability,
            self.weights.classifier,
            format!("Classifier {:.1}%", probability),
        );

        ClassifierEvidence {
            bundle,
            probability: Some(probability),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::engines::MockClassifier;

    fn with_engine(engine: MockClassifier) -> ClassifierSignal {
        let mut signal = ClassifierSignal::new(ClassifierConfig::default(), ScoreWeights::default());
        signal.set_engine(Arc::new(engine));
        signal
    }

    #[test]
    fn test_positive_class() {
        let evidence = with_engine(MockClassifier::with_probabilities(vec![0.125, 0.875]))
            .extract(&RgbImage::new(8, 8));

        assert_eq!(evidence.bundle.score, 15);
        assert_eq!(evidence.probability, Some(87.5));
        assert_eq!(evidence.bundle.features, vec!["✓ Classifier 87.5%"]);
    }

    #[test]
    fn test_disagreement_still_explained() {
        let evidence = with_engine(MockClassifier::with_probabilities(vec![0.75, 0.25]))
            .extract(&RgbImage::new(8, 8));

        assert_eq!(evidence.bundle.score, 0);
        assert_eq!(evidence.bundle.features, vec!["✗ Classifier 25.0%"]);
    }

    #[test]
    fn test_unavailable_engines() {
        for engine in [
            MockClassifier::failing("oom"),
            MockClassifier::not_ready(),
            MockClassifier::with_probabilities(vec![0.9]),
        ] {
            let evidence = with_engine(engine).extract(&RgbImage::new(8, 8));
            assert_eq!(evidence.bundle.score, 0);
            assert!(evidence.bundle.features.is_empty());
            assert!(evidence.probability.is_none());
        }
    }
}
