//! 证件真实性检测核心
//!
//! 1. 采样 - 取景框居中裁剪
//! 2. 二值化 - 去噪、锐化、自适应阈值、形态学
//! 3. 轮廓 - 文档外框 + 照片 / 印章 / 文字框子区域
//! 4. 证据 - 几何、结构、颜色光照、OCR 关键词、分类模型
//! 5. 融合 - 加权得分 0-100
//! 6. 调度 - 固定间隔、单周期在途、达到阈值即交付并停止

pub mod config;
pub mod engines;
pub mod error;
pub mod fuser;
pub mod pipeline;
pub mod scheduler;
pub mod signals;
pub mod vision;

pub use config::{DetectorConfig, SchedulerConfig, ScoreWeights};
pub use engines::{ImageClassifier, RecognizedText, TextRecognizer};
pub use error::{DetectorError, EngineError};
pub use fuser::{DetectionResult, DetectionStats};
pub use pipeline::{DetectionPipeline, FrameAnalysis};
pub use scheduler::{AcceptedDocument, DetectionLoop, DetectionSession, LoopHandle};
pub use vision::{FrameBuffer, SharedFrameSource, VideoFrame, VideoSource};
