//! 外部引擎接口：OCR 与预训练分类模型
//!
//! 引擎由宿主注入；未注入、未就绪或单次调用失败时对应信号记 0 分，
//! 周期照常进行。

use crate::core::error::EngineError;
use image::RgbImage;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Clone, PartialEq)]
pub struct RecognizedText {
    pub text: String,
    /// 0-100
    pub confidence: f32,
}

pub trait TextRecognizer: Send + Sync {
    fn is_ready(&self) -> bool {
        true
    }

    fn recognize(&self, image: &RgbImage) -> Result<RecognizedText, EngineError>;
}

pub trait ImageClassifier: Send + Sync {
    fn is_ready(&self) -> bool {
        true
    }

    /// 每个类别的概率
    fn classify(&self, image: &RgbImage) -> Result<Vec<f32>, EngineError>;
}

/// 模拟 OCR（测试用）
pub struct MockTextRecognizer {
    outcome: Result<RecognizedText, EngineError>,
    ready: bool,
    calls: AtomicUsize,
}

impl MockTextRecognizer {
    pub fn with_text(text: &str, confidence: f32) -> Self {
        Self {
            outcome: Ok(RecognizedText {
                text: text.to_string(),
                confidence,
            }),
            ready: true,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            outcome: Err(EngineError::Failed(message.to_string())),
            ready: true,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn not_ready() -> Self {
        Self {
            outcome: Err(EngineError::NotReady),
            ready: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl TextRecognizer for MockTextRecognizer {
    fn is_ready(&self) -> bool {
        self.ready
    }

    fn recognize(&self, _image: &RgbImage) -> Result<RecognizedText, EngineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.outcome.clone()
    }
}

/// 模拟分类模型（测试用）
pub struct MockClassifier {
    outcome: Result<Vec<f32>, EngineError>,
    ready: bool,
}

impl MockClassifier {
    pub fn with_probabilities(probabilities: Vec<f32>) -> Self {
        Self {
            outcome: Ok(probabilities),
            ready: true,
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            outcome: Err(EngineError::Failed(message.to_string())),
            ready: true,
        }
    }

    pub fn not_ready() -> Self {
        Self {
            outcome: Err(EngineError::NotReady),
            ready: false,
        }
    }
}

impl ImageClassifier for MockClassifier {
    fn is_ready(&self) -> bool {
        self.ready
    }

    fn classify(&self, _image: &RgbImage) -> Result<Vec<f32>, EngineError> {
        self.outcome.clone()
    }
}
