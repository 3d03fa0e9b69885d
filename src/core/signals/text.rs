//! OCR 关键词证据

use super::{SignalBundle, SignalSource};
use crate::core::config::{ScoreWeights, TextConfig};
use crate::core::engines::TextRecognizer;
use crate::core::error::DetectorError;
use image::RgbImage;
use log::{debug, warn};
use regex::RegexSet;
use std::sync::Arc;

const PREVIEW_CHARS: usize = 48;

#[derive(Debug, Clone)]
pub struct TextEvidence {
    pub bundle: SignalBundle,
    pub keywords_found: Vec<String>,
    /// 引擎不可用时为 None
    pub confidence: Option<f32>,
}

impl TextEvidence {
    fn unavailable() -> Self {
        Self {
            bundle: SignalBundle::new(SignalSource::Text),
            keywords_found: Vec::new(),
            confidence: None,
        }
    }
}

pub struct TextSignal {
    config: TextConfig,
    weights: ScoreWeights,
    matcher: RegexSet,
    engine: Option<Arc<dyn TextRecognizer>>,
}

impl TextSignal {
    pub fn new(config: TextConfig, weights: ScoreWeights) -> Result<Self, DetectorError> {
        let matcher = RegexSet::new(config.patterns())
            .map_err(|e| DetectorError::InvalidConfig(format!("keyword pattern: {}", e)))?;
        Ok(Self {
            config,
            weights,
            matcher,
            engine: None,
        })
    }

    pub fn set_engine(&mut self, engine: Arc<dyn TextRecognizer>) {
        self.engine = Some(engine);
    }

    /// 文本中出现的关键词（大小写不敏感，按配置顺序）
    pub fn match_keywords(&self, text: &str) -> Vec<String> {
        self.matcher
            .matches(text)
            .into_iter()
            .map(|i| self.config.keywords[i].clone())
            .collect()
    }

    pub fn extract(&self, crop: &RgbImage) -> TextEvidence {
        let Some(engine) = self.engine.as_ref().filter(|e| e.is_ready()) else {
            return TextEvidence::unavailable();
        };

        let recognized = match engine.recognize(crop) {
            Ok(recognized) => recognized,
            Err(e) => {
                warn!("⚠️ OCR failed, skipping text evidence: {}", e);
                return TextEvidence::unavailable();
            }
        };

        let preview: String = recognized
            .text
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .chars()
            .take(PREVIEW_CHARS)
            .collect();
        debug!("🔤 OCR ({:.0}%): {}", recognized.confidence, preview);

        let keywords_found = self.match_keywords(&recognized.text);

        let mut bundle = SignalBundle::new(SignalSource::Text);
        let keyword_list = if keywords_found.is_empty() {
            "none".to_string()
        } else {
            keywords_found.join(", ")
        };
        bundle.check(
            keywords_found.len() >= self.config.min_keywords,
            self.weights.keywords,
            format!("Keywords: {}", keyword_list),
        );
        bundle.check(
            recognized.confidence > self.config.min_confidence,
            self.weights.ocr_quality,
            format!("OCR confidence {:.0}%", recognized.confidence),
        );

        TextEvidence {
            bundle,
            keywords_found,
            confidence: Some(recognized.confidence),
        }
    }
}
